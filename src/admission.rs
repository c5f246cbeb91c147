//! Admission Control
//!
//! Pure WIP-limit checks for columns. Nothing here mutates state.

use crate::error::{SyncError, SyncResult};
use crate::models::{BoardColumn, Task, TaskId};
use crate::store::NormalizedStore;

/// `wip_limit` absent, or occupancy strictly below it
pub fn can_admit(column: &BoardColumn, occupancy: usize) -> bool {
    match column.wip_limit {
        None => true,
        Some(limit) => occupancy < limit as usize,
    }
}

/// Tasks resident in `column`, not counting `moving`
pub fn occupancy(tasks: &NormalizedStore<Task>, column: &BoardColumn, moving: TaskId) -> usize {
    tasks
        .iter()
        .filter(|t| t.column_id == column.id && t.id != moving)
        .count()
}

/// Reject with `AdmissionRejected` when `moving` may not enter `column`
pub fn check_admission(
    tasks: &NormalizedStore<Task>,
    column: &BoardColumn,
    moving: TaskId,
) -> SyncResult<()> {
    let occupancy = occupancy(tasks, column, moving);
    if can_admit(column, occupancy) {
        return Ok(());
    }
    Err(SyncError::AdmissionRejected {
        column_id: column.id,
        limit: column.wip_limit.unwrap_or_default(),
        occupancy,
    })
}
