//! Step-wise committed movement.
//!
//! A move updates logical state immediately, one cell at a time: the old
//! cell is cleared before the next one is claimed, so no unit is ever
//! recorded on two cells. The waypoints are handed to presentation as a
//! [`SimEvent::UnitMoved`] for replay at whatever pace it likes.

use tracing::debug;

use crate::battlefield::{Battlefield, SimEvent};
use crate::error::{GameError, Result};
use crate::math::GridPos;
use crate::unit::UnitId;

/// Walk `unit` along `path`, spending at most `budget` cost points.
///
/// `path` must start on the unit's cell. Traversal stops early when the
/// budget runs out, when the next cell is occupied, or when the step is
/// not allowed. Returns the cells entered (empty if the unit did not
/// move). Sets `has_moved` when at least one cell was entered.
pub fn walk_path(
    field: &mut Battlefield,
    unit: UnitId,
    path: &[GridPos],
    budget: u32,
) -> Result<Vec<GridPos>> {
    let (start, movement) = {
        let u = field.roster.require(unit)?;
        (u.position, u.template.movement_type)
    };
    match path.first() {
        Some(&first) if first == start => {}
        Some(&first) => {
            return Err(GameError::InvalidState(format!(
                "path for unit {unit} starts at {first}, unit stands on {start}"
            )))
        }
        None => return Ok(Vec::new()),
    }

    let mut spent = 0u32;
    let mut current = start;
    let mut waypoints = Vec::new();

    for &next in &path[1..] {
        if !field.grid.is_free(next) {
            debug!(%unit, cell = %next, "Move aborted: cell occupied");
            break;
        }
        let Some(step) = field.grid.step_cost(movement, current, next) else {
            break;
        };
        if spent + step > budget {
            break;
        }

        field.grid.set_occupant(current, None)?;
        field.grid.set_occupant(next, Some(unit))?;
        field.roster.require_mut(unit)?.position = next;

        spent += step;
        current = next;
        waypoints.push(next);
    }

    if !waypoints.is_empty() {
        field.roster.require_mut(unit)?.flags.has_moved = true;
        debug!(%unit, from = %start, to = %current, cost = spent, "Unit moved");
        field.push_event(SimEvent::UnitMoved {
            unit,
            from: start,
            to: current,
            waypoints: waypoints.clone(),
        });
    }
    Ok(waypoints)
}
