//! End-to-end flows through `BoardSync` against the in-memory server.

use std::rc::Rc;

use board_sync::cache::default_ttl;
use board_sync::commands::NewSprint;
use board_sync::testing::MockApi;
use board_sync::{
    ApiError, Board, BoardColumn, BoardSync, Container, DropOutcome, ManualClock, RemoteApi,
    SprintStatus, SyncError, Task, TaskQuery, TaskStatus,
};
use chrono::TimeDelta;
use pretty_assertions::assert_eq;

const TODO: u32 = 1;
const DOING: u32 = 2;
const DONE: u32 = 3;

fn board_record() -> Board {
    Board {
        id: 7,
        name: "Team board".to_string(),
        project_id: Some(1),
        columns: vec![
            BoardColumn::new(TODO, "Todo", 0).with_status(TaskStatus::Todo),
            BoardColumn::new(DOING, "Doing", 1)
                .with_status(TaskStatus::InProgress)
                .with_wip_limit(2),
            BoardColumn::new(DONE, "Done", 2).with_status(TaskStatus::Done),
        ],
    }
}

fn tasks() -> Vec<Task> {
    vec![
        Task::new(10, "Write parser", TODO, 0),
        Task::new(11, "Review PR", TODO, 1),
        Task::new(12, "Fix login", DOING, 0).with_status(TaskStatus::InProgress),
        Task::new(13, "Ship it", DOING, 1).with_status(TaskStatus::InProgress),
    ]
}

struct Harness {
    sync: BoardSync,
    api: Rc<MockApi>,
    clock: ManualClock,
}

fn harness() -> Harness {
    let api = Rc::new(MockApi::new().with_board(board_record()).with_tasks(tasks()));
    let clock = ManualClock::default();
    let dyn_api: Rc<dyn RemoteApi> = api.clone();
    let sync = BoardSync::new(dyn_api, default_ttl(), Rc::new(clock.clone()));
    Harness { sync, api, clock }
}

async fn loaded() -> Harness {
    let h = harness();
    h.sync.load_board(7).await.unwrap();
    h.sync.fetch_tasks(&TaskQuery::for_board(7)).await.unwrap();
    h
}

#[tokio::test]
async fn identical_queries_within_ttl_fetch_once() {
    let h = harness();
    let query = TaskQuery {
        board_id: Some(7),
        status: Some(TaskStatus::Todo),
        ..Default::default()
    };

    h.sync.fetch_tasks(&query).await.unwrap();
    h.clock.advance(TimeDelta::seconds(30));
    h.sync.fetch_tasks(&query.clone()).await.unwrap();
    assert_eq!(h.api.count("GET /tasks"), 1);

    h.clock.advance(TimeDelta::minutes(5));
    h.sync.fetch_tasks(&query).await.unwrap();
    assert_eq!(h.api.count("GET /tasks"), 2);
}

#[tokio::test]
async fn drag_into_full_column_sends_nothing() {
    let h = loaded().await;
    let before = h.sync.all_tasks();
    let calls_before = h.api.calls().len();
    let protocol = h.sync.reorder();

    protocol.begin(10, Container::Column(TODO), 0).unwrap();
    let err = protocol.drop(Container::Column(DOING), 0).await.unwrap_err();

    assert!(matches!(err, SyncError::AdmissionRejected { column_id: DOING, limit: 2, occupancy: 2 }));
    assert_eq!(h.sync.all_tasks(), before);
    assert_eq!(h.api.calls().len(), calls_before);
}

#[tokio::test]
async fn drag_to_status_column_commits_and_refetches() {
    let h = loaded().await;
    let protocol = h.sync.reorder();

    protocol.begin(13, Container::Column(DOING), 1).unwrap();
    let outcome = protocol.drop(Container::Column(DONE), 0).await.unwrap();

    let DropOutcome::Committed(moved) = outcome else {
        panic!("expected a committed move");
    };
    assert_eq!(moved.column_id, DONE);
    assert_eq!(moved.status, TaskStatus::Done);
    assert_eq!(h.api.server_task(13).unwrap().status, TaskStatus::Done);

    // a slot opened up in Doing
    protocol.begin(10, Container::Column(TODO), 0).unwrap();
    assert!(protocol.drop(Container::Column(DOING), 1).await.is_ok());

    // committed moves dropped the cached board query
    h.sync.fetch_tasks(&TaskQuery::for_board(7)).await.unwrap();
    assert_eq!(h.api.count("GET /tasks"), 2);
}

#[tokio::test]
async fn failed_drag_rolls_back_to_snapshot() {
    let h = loaded().await;
    let before = h.sync.all_tasks();
    h.api.fail_when("PUT /tasks/11", ApiError::Network("offline".to_string()));
    let protocol = h.sync.reorder();

    protocol.begin(11, Container::Column(TODO), 1).unwrap();
    let err = protocol.drop(Container::Column(TODO), 0).await.unwrap_err();

    assert!(err.rolled_back());
    assert!(err.is_user_visible());
    assert_eq!(h.sync.all_tasks(), before);
    assert_eq!(
        h.sync
            .tasks_in(Container::Column(TODO))
            .iter()
            .map(|t| t.id)
            .collect::<Vec<_>>(),
        vec![10, 11]
    );
}

#[tokio::test]
async fn sprint_planning_flow() {
    let h = loaded().await;
    let lifecycle = h.sync.lifecycle();

    let sprint = lifecycle.create_sprint(&NewSprint::new("Sprint 1")).await.unwrap();
    lifecycle.add_task(sprint.id, 10).await.unwrap();
    lifecycle.add_task(sprint.id, 12).await.unwrap();

    // drag the remaining backlog task into the sprint
    let protocol = h.sync.reorder();
    protocol.begin(11, Container::Backlog, 0).unwrap();
    protocol.drop(Container::Sprint(sprint.id), 0).await.unwrap();
    assert_eq!(h.api.server_sprint(sprint.id).unwrap().task_ids.len(), 3);

    lifecycle.start(sprint.id).await.unwrap();
    assert!(matches!(
        lifecycle.start(sprint.id).await,
        Err(SyncError::InvalidTransition { from: SprintStatus::Active, .. })
    ));
    assert_eq!(lifecycle.status_of(sprint.id), Ok(SprintStatus::Active));

    lifecycle.complete(sprint.id).await.unwrap();
    assert_eq!(
        lifecycle.remove_task(sprint.id, 10).await,
        Err(SyncError::SprintClosed { sprint_id: sprint.id })
    );

    let progress = h
        .sync
        .lifecycle()
        .sprint(sprint.id)
        .unwrap()
        .progress(h.sync.all_tasks().iter());
    assert_eq!(progress.total, 3);
    assert_eq!(progress.done, 0);
}

#[tokio::test]
async fn leaving_the_board_cancels_pending_moves() {
    let h = loaded().await;
    let protocol = h.sync.reorder();
    h.api.hold();

    protocol.begin(10, Container::Column(TODO), 0).unwrap();
    let (result, ()) = tokio::join!(protocol.drop(Container::Column(DONE), 0), async {
        h.sync.clear();
        h.api.release();
    });

    assert_eq!(result, Err(SyncError::Superseded { task_id: 10 }));
    assert!(h.sync.all_tasks().is_empty());
    assert!(h.sync.in_flight().is_empty());
}
