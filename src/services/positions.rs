//! Positions. Anyone logged in may list them; only staff change them.

use crate::access;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::forms::NameForm;
use crate::types::{Position, Worker};
use tracing::{info, warn};

fn require_manager(actor: &Worker) -> Result<()> {
    if access::can_manage_positions(actor) {
        Ok(())
    } else {
        warn!(actor = actor.id, "Position change denied");
        Err(Error::permission_denied(
            "Only staff members can manage positions.",
        ))
    }
}

pub fn list(db: &Database) -> Result<Vec<Position>> {
    db.list_positions()
}

pub fn create(db: &Database, actor: &Worker, form: &NameForm) -> Result<Position> {
    require_manager(actor)?;
    let name = form.clean().map_err(Error::Validation)?;
    let position = db.create_position(&name)?;
    info!(position_id = position.id, actor = actor.id, "Created position");
    Ok(position)
}

pub fn update(db: &Database, actor: &Worker, id: i64, form: &NameForm) -> Result<Position> {
    require_manager(actor)?;
    let name = form.clean().map_err(Error::Validation)?;
    let position = db.rename_position(id, &name)?;
    info!(position_id = id, actor = actor.id, "Renamed position");
    Ok(position)
}

/// Delete a position. Workers holding it are left without one.
pub fn delete(db: &Database, actor: &Worker, id: i64) -> Result<()> {
    require_manager(actor)?;
    db.delete_position(id)?;
    info!(position_id = id, actor = actor.id, "Deleted position");
    Ok(())
}
