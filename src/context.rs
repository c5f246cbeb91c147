//! Reactive Board View
//!
//! The sync core lives in `Rc`s on the UI thread. Components render from this
//! `reactive_stores` copy instead, refreshed with [`publish`] after every
//! protocol action.

use leptos::prelude::*;
use reactive_stores::Store;

use crate::board::BoardSync;
use crate::error::SyncError;
use crate::models::{BoardColumn, Container, Sprint, Task};

/// What the board components render, with field-level reactivity
#[derive(Clone, Debug, Default, Store)]
pub struct BoardView {
    /// Every known task
    pub tasks: Vec<Task>,
    /// Columns in display order
    pub columns: Vec<BoardColumn>,
    pub sprints: Vec<Sprint>,
    /// Last user-visible failure (limit reached, rollback, ...)
    pub last_error: Option<String>,
    /// Bumped on every publish
    pub revision: u64,
}

impl BoardView {
    /// Tasks of `container` in display order
    pub fn tasks_in(&self, container: Container) -> Vec<Task> {
        let mut list: Vec<Task> = self.tasks.iter().filter(|t| t.is_in(container)).cloned().collect();
        list.sort_by_key(|t| (t.rank_in(container), t.id));
        list
    }
}

/// Type alias for the store
pub type BoardStore = Store<BoardView>;

/// Create the view store and provide it to children
pub fn provide_board_view() -> BoardStore {
    let store = Store::new(BoardView::default());
    provide_context(store);
    store
}

/// Get the board view from context
pub fn use_board_view() -> BoardStore {
    expect_context::<BoardStore>()
}

/// Copy the current core state into the view
pub fn publish(store: &BoardStore, sync: &BoardSync) {
    *store.tasks().write() = sync.all_tasks();
    *store.columns().write() = sync.all_columns();
    *store.sprints().write() = sync.all_sprints();
    *store.revision().write() += 1;
}

/// Show `err` unless it is a silent outcome
pub fn report_error(store: &BoardStore, err: &SyncError) {
    if err.is_user_visible() {
        store.last_error().set(Some(err.to_string()));
    }
}

pub fn clear_error(store: &BoardStore) {
    store.last_error().set(None);
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::cache::{default_ttl, ManualClock};
    use crate::commands::RemoteApi;
    use crate::models::TaskQuery;
    use crate::testing::MockApi;

    fn sync_with_tasks() -> BoardSync {
        let api: Rc<dyn RemoteApi> = Rc::new(MockApi::new());
        let sync = BoardSync::new(api, default_ttl(), Rc::new(ManualClock::default()));
        sync.tasks().borrow_mut().write::<TaskQuery>(
            None,
            vec![Task::new(1, "T1", 10, 1), Task::new(2, "T2", 10, 0), Task::new(3, "T3", 20, 0)],
        );
        sync.set_columns(vec![BoardColumn::new(20, "Done", 1), BoardColumn::new(10, "Todo", 0)]);
        sync
    }

    #[test]
    fn test_publish_copies_core_state() {
        let owner = Owner::new();
        owner.with(|| {
            let store = provide_board_view();
            publish(&store, &sync_with_tasks());

            let view = use_board_view().get_untracked();
            assert_eq!(view.revision, 1);
            assert_eq!(view.tasks.len(), 3);
            assert_eq!(view.columns.iter().map(|c| c.id).collect::<Vec<_>>(), vec![10, 20]);
            let ids: Vec<_> = view.tasks_in(Container::Column(10)).iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![2, 1]);
        });
    }

    #[test]
    fn test_report_error_skips_silent_outcomes() {
        let owner = Owner::new();
        owner.with(|| {
            let store = provide_board_view();

            report_error(&store, &SyncError::Superseded { task_id: 1 });
            assert_eq!(store.last_error().get_untracked(), None);

            report_error(&store, &SyncError::DragInProgress);
            assert_eq!(
                store.last_error().get_untracked(),
                Some("a drag is already in progress".to_string())
            );

            clear_error(&store);
            assert_eq!(store.last_error().get_untracked(), None);
        });
    }
}
