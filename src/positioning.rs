//! Task Positioning
//!
//! Dense ranks per container. Columns rank by `order`; sprints and the
//! backlog rank by `sprint_order`, so a sprint move never disturbs a column.
//! Every move recomputes the ranks of the containers it touches so that no
//! two members share a rank.

use crate::models::{Container, Task, TaskId, TaskStatus};
use crate::store::NormalizedStore;

/// Members of `container` in display order (by rank, then id)
pub fn members(tasks: &NormalizedStore<Task>, container: Container) -> Vec<Task> {
    let mut list: Vec<Task> = tasks.iter().filter(|t| t.is_in(container)).cloned().collect();
    list.sort_by_key(|t| (t.rank_in(container), t.id));
    list
}

/// Index of `task_id` in the display order of `container`
pub fn index_of(tasks: &NormalizedStore<Task>, container: Container, task_id: TaskId) -> Option<usize> {
    members(tasks, container).iter().position(|t| t.id == task_id)
}

/// Reindex the container's rank to be sequential (0, 1, 2, ...)
pub fn reindex(list: &mut [Task], container: Container) {
    for (pos, task) in list.iter_mut().enumerate() {
        task.set_rank(container, pos as i32);
    }
}

/// Point a task at `container`; status columns also set the status
pub fn place(task: &mut Task, container: Container, column_status: Option<TaskStatus>) {
    match container {
        Container::Column(id) => {
            task.column_id = id;
            if let Some(status) = column_status {
                task.status = status;
            }
        }
        Container::Sprint(id) => task.sprint_id = Some(id),
        Container::Backlog => task.sprint_id = None,
    }
}

/// New records for every task whose placement or order changes when
/// `task_id` moves from `source` to `target` at `target_index`
///
/// `target_index` is the position in the target list after the move and is
/// clamped to its length. Returns `None` if the task is unknown.
pub fn plan_move(
    tasks: &NormalizedStore<Task>,
    task_id: TaskId,
    source: Container,
    target: Container,
    target_index: usize,
    column_status: Option<TaskStatus>,
) -> Option<Vec<Task>> {
    let mut moving = tasks.get(&task_id)?.clone();

    let mut source_list: Vec<Task> = members(tasks, source)
        .into_iter()
        .filter(|t| t.id != task_id)
        .collect();

    place(&mut moving, target, column_status);

    let mut changed = Vec::new();
    if source == target {
        let at = target_index.min(source_list.len());
        source_list.insert(at, moving);
        reindex(&mut source_list, source);
        changed.extend(source_list);
    } else {
        let mut target_list: Vec<Task> = members(tasks, target)
            .into_iter()
            .filter(|t| t.id != task_id)
            .collect();
        let at = target_index.min(target_list.len());
        target_list.insert(at, moving);
        reindex(&mut source_list, source);
        reindex(&mut target_list, target);
        changed.extend(source_list);
        changed.extend(target_list);
    }

    // Only hand back records that differ from what the store holds
    changed.retain(|t| tasks.get(&t.id) != Some(t));
    Some(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> NormalizedStore<Task> {
        NormalizedStore::from_entities(vec![
            Task::new(1, "T1", 100, 0),
            Task::new(2, "T2", 100, 1),
            Task::new(3, "T3", 100, 2),
            Task::new(4, "T4", 200, 0),
        ])
    }

    fn apply(store: &mut NormalizedStore<Task>, changed: Vec<Task>) {
        for task in changed {
            store.update(task);
        }
    }

    fn orders(store: &NormalizedStore<Task>, container: Container) -> Vec<(u32, i32)> {
        members(store, container)
            .iter()
            .map(|t| (t.id, t.rank_in(container)))
            .collect()
    }

    #[test]
    fn test_members_sorted_by_order_then_id() {
        let store = NormalizedStore::from_entities(vec![
            Task::new(5, "a", 1, 2),
            Task::new(3, "b", 1, 0),
            Task::new(4, "c", 1, 0),
        ]);
        let ids: Vec<_> = members(&store, Container::Column(1)).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_move_across_columns_closes_and_opens_gap() {
        let mut store = board();
        let changed = plan_move(&store, 1, Container::Column(100), Container::Column(200), 0, None).unwrap();
        apply(&mut store, changed);

        assert_eq!(orders(&store, Container::Column(100)), vec![(2, 0), (3, 1)]);
        assert_eq!(orders(&store, Container::Column(200)), vec![(1, 0), (4, 1)]);
    }

    #[test]
    fn test_move_within_column() {
        let mut store = board();
        let changed = plan_move(&store, 1, Container::Column(100), Container::Column(100), 2, None).unwrap();
        apply(&mut store, changed);

        assert_eq!(orders(&store, Container::Column(100)), vec![(2, 0), (3, 1), (1, 2)]);
    }

    #[test]
    fn test_index_clamped_to_end() {
        let mut store = board();
        let changed = plan_move(&store, 2, Container::Column(100), Container::Column(200), 99, None).unwrap();
        apply(&mut store, changed);

        assert_eq!(orders(&store, Container::Column(200)), vec![(4, 0), (2, 1)]);
    }

    #[test]
    fn test_status_column_sets_status() {
        let store = board();
        let changed = plan_move(
            &store,
            4,
            Container::Column(200),
            Container::Column(100),
            0,
            Some(TaskStatus::Done),
        )
        .unwrap();

        let moved = changed.iter().find(|t| t.id == 4).unwrap();
        assert_eq!(moved.column_id, 100);
        assert_eq!(moved.status, TaskStatus::Done);
    }

    #[test]
    fn test_sprint_and_backlog_moves() {
        let mut store = board();
        let changed = plan_move(&store, 3, Container::Backlog, Container::Sprint(7), 0, None).unwrap();
        apply(&mut store, changed);
        assert_eq!(store.get(&3).unwrap().sprint_id, Some(7));
        assert_eq!(index_of(&store, Container::Sprint(7), 3), Some(0));

        let changed = plan_move(&store, 3, Container::Sprint(7), Container::Backlog, 0, None).unwrap();
        apply(&mut store, changed);
        assert_eq!(store.get(&3).unwrap().sprint_id, None);
    }

    #[test]
    fn test_sprint_reorder_leaves_column_orders_alone() {
        // T1 and T2 share column 100; T2 and T3 share sprint 5
        let mut store = NormalizedStore::from_entities(vec![
            Task::new(1, "T1", 100, 0),
            Task::new(2, "T2", 100, 1).with_sprint(5).with_sprint_order(1),
            Task::new(3, "T3", 200, 0).with_sprint(5).with_sprint_order(0),
        ]);
        let changed = plan_move(&store, 2, Container::Sprint(5), Container::Sprint(5), 0, None).unwrap();
        apply(&mut store, changed);

        assert_eq!(orders(&store, Container::Sprint(5)), vec![(2, 0), (3, 1)]);
        assert_eq!(orders(&store, Container::Column(100)), vec![(1, 0), (2, 1)]);
        assert_eq!(orders(&store, Container::Column(200)), vec![(3, 0)]);
    }

    #[test]
    fn test_unchanged_records_are_skipped() {
        let store = board();
        let changed = plan_move(&store, 3, Container::Column(100), Container::Column(100), 2, None).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn test_unknown_task() {
        assert!(plan_move(&board(), 42, Container::Backlog, Container::Backlog, 0, None).is_none());
    }
}
