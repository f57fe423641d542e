//! Econsync Hub - Keeping game values in sync with a remote diagram
//!
//! This crate is the composition root of the sync engine. One [`Hub`] per
//! game owns everything that would otherwise be process-wide state:
//!
//! ## Architecture
//!
//! ```text
//! Hub
//!  ├── Registry ← source table: Coordinate → Value | unresolved
//!  │    └── CacheStore / CacheSnapshot
//!  ├── Connection (host transport, via econsync-netcode)
//!  ├── GameLifecycleProvider (host hooks)
//!  └── Consumers (SyncedObject or host types)
//!       └── Binder per property ← pulls from the Registry
//! ```
//!
//! ## Key Components
//!
//! - [`Hub`]: startup state machine, live updates, fixed-point notification
//! - [`Registry`]: source table, lookup contract, cache load/save
//! - [`SyncConsumer`]: what the hub notifies; [`SyncContext`] is what it sees
//! - [`SyncedObject`]: ready-made consumer with one binder per property
//! - [`SyncConfig`]: diagram, cache and offline settings (RON)
//!
//! ## Design Principles
//!
//! 1. **Single execution context** - callbacks run one at a time from
//!    [`Hub::poll`], so nothing is locked
//! 2. **Connectivity failures degrade, integrity failures stop** - a lost
//!    backend moves to `Offline`; unknown ids or unresolvable values are
//!    errors
//! 3. **econsync-core is standalone** - binders only see the
//!    [`econsync_core::ValueSource`] trait, which the registry implements

mod config;
mod consumer;
mod error;
mod hub;
mod lifecycle;
mod object;
mod registry;

pub use config::SyncConfig;
pub use consumer::{downcast_mut, downcast_ref, AsAny, ConsumerId, SyncConsumer, SyncContext};
pub use error::{Error, Result};
pub use hub::{Hub, SyncState};
pub use lifecycle::{FixedLifecycle, GameLifecycleProvider};
pub use object::{BindersUpdated, ObjectKind, SyncedObject};
pub use registry::Registry;
