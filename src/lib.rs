//! Board Sync
//!
//! Client-side data core for a board/sprint tracker: a normalized entity
//! cache with TTL'd queries, WIP-limit admission, optimistic drag-and-drop
//! with rollback, and the sprint lifecycle. Runs on the browser's single
//! event loop; shared state is `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::rc::Rc;

pub mod admission;
pub mod board;
pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod logging;
pub mod models;
pub mod positioning;
pub mod reorder;
pub mod sprint;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wire;

/// State shared between the hub and the protocols
pub type Shared<T> = Rc<RefCell<T>>;

pub use board::BoardSync;
pub use cache::{CacheManager, Clock, ManualClock, SystemClock};
pub use commands::{HttpApi, RemoteApi};
pub use config::SyncConfig;
pub use error::{ApiError, SyncError, SyncResult};
pub use models::{Board, BoardColumn, Container, Sprint, SprintStatus, Task, TaskQuery, TaskStatus};
pub use reorder::{DropOutcome, InFlightMoves, ReorderPhase, ReorderProtocol};
pub use sprint::{SprintAction, SprintLifecycle};
pub use store::NormalizedStore;
