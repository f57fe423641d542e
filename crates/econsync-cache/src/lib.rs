//! Econsync Cache - Last-known diagram values for offline play
//!
//! The hub records every value it receives from the backend into a
//! [`CacheSnapshot`]. A [`CacheStore`] persists that snapshot as a single
//! file under `<root>/<directory name>/`, overwriting it on every save.
//!
//! When the backend is unreachable, the snapshot is loaded back and each
//! entry is matched against the declared coordinates by canonical string
//! form, since state names may not round-trip identically.
//!
//! # Example
//!
//! ```rust,ignore
//! use econsync_cache::{CacheSnapshot, CacheStore};
//!
//! let store = CacheStore::new("sync_cache", "my-diagram");
//! let mut snapshot = store.load()?;
//! snapshot.record(&coordinate, value);
//! store.save(&snapshot)?;
//! ```

mod error;
mod snapshot;
mod store;

pub use error::{Error, Result};
pub use snapshot::{CacheSnapshot, CACHE_VERSION};
pub use store::{CacheFormat, CacheStore};
