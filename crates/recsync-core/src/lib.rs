//! recsync-core library.
//!
//! Client-side synchronization for a remote record API: request-ordering
//! primitives, a tracker for in-flight actions, where-clause and query
//! compilation, and two state containers (a paginated list and a single
//! record editor) that share state safely under interleaved async work.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`SyncError`]; configuration
//!   loading returns `anyhow::Result`.
//! - **Logging**: `tracing` macros with structured fields.
//! - **Concurrency**: everything runs on one cooperative executor. State is
//!   mutated only inside short synchronous `merge` closures, never across an
//!   `.await`.

pub mod action;
pub mod client;
pub mod clock;
pub mod condition;
pub mod config;
pub mod datetime;
pub mod error;
pub mod locale;
pub mod memo;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;

pub use action::{ActionState, AsyncActions, ErrorId, RecordedError};
pub use client::RecordClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SyncConfig, load_config, resolve_config};
pub use error::{ErrorCode, SyncError, TransportError};
pub use record::{Record, RecordId};
pub use store::{EditPhase, EditStore, ListPhase, ListStore, RelatedRecord};
