//! Unified configuration system.
//!
//! Settings come from four tiers, merged field by field:
//! 1. **Defaults** - built into the binary
//! 2. **Project** - `$CWD/task-manager/config.yaml`
//! 3. **User** - `~/.task-manager/config.yaml`
//! 4. **Environment** - the variables below
//!
//! CLI flags are applied on top by the binary.
//!
//! ## Environment Variables
//! - `TASK_MANAGER_CONFIG_PATH` - Explicit config file (replaces the project and user tiers)
//! - `TASK_MANAGER_DB_PATH` - Database path
//! - `TASK_MANAGER_HOST` - Listen address
//! - `TASK_MANAGER_PORT` - Listen port

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
