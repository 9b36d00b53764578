//! # Homework Core Library
//!
//! Business logic for the homework tracker: a local, offline-first item list
//! that can be reconciled with a remote table shared across devices.
//!
//! ## Architecture
//!
//! - **Items**: value-semantics collection mutations (add, toggle, remove)
//! - **Storage**: async key-value stores, the `homeworks` cache, TOML config
//! - **Sync**: pure last-writer-wins reconciler, remote mirror adapters and an
//!   orchestrator that runs one fetch-merge-persist-push pass at a time
//! - **Session**: owns the collection and wires the pieces together
//!
//! ## Key Components
//!
//! - [`HomeworkSession`]: the collection owner used by front ends
//! - [`reconcile`]: the merge algorithm
//! - [`SyncOrchestrator`]: drives a sync pass
//! - [`Config`]: application configuration management

pub mod error;
pub mod item;
pub mod session;
pub mod storage;
pub mod sync;
pub mod timestamp;

pub use error::{ConfigError, CoreError, RemoteError, StoreError, SyncError, ValidationError};
pub use item::{Collection, Item};
pub use session::{spawn_auto_sync, HomeworkSession};
pub use storage::{Config, JsonFileStore, LocalCache, LocalStore, MemoryStore};
pub use sync::{
    reconcile, AuthState, AuthSubscription, MemoryRemote, PostgrestRemote, Principal, RemoteRow,
    RemoteStore, SyncOrchestrator, SyncReport,
};
