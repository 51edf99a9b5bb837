//! Task manager library.
//!
//! Workers create tasks, assign them to each other and complete them
//! against deadlines. The crate is layered: [`forms`] validate input,
//! [`db`] persists it, [`access`] decides who may do what, [`services`]
//! tie those together and [`http`] exposes them.

pub mod access;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod http;
pub mod logging;
pub mod services;
pub mod types;
