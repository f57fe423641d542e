//! Econsync Netcode - Talking to the diagram backend
//!
//! This crate defines what goes over the wire and the connection seam the
//! hub drives:
//!
//! - **Wire**: event names, request payloads and the parsed form of
//!   diagram elements (`wire`)
//! - **Connection**: a non-blocking, event-named message channel
//!   (`Connection`), plus an in-memory pair for tests and demos
//!
//! # Protocol
//!
//! ```text
//!  client                                   backend
//!    │ ── api-authorize {gameName, diagramToken} ──▶ │
//!    │ ◀── api-auth-success | api-auth-deny ──────── │
//!    │ ── game-init {diagramToken, machinationsIDs} ▶│
//!    │ ◀── game-init {diagramElements} ───────────── │
//!    │ ◀── diagram-elements-updated {diagramElements}│  (any time)
//!    │ ── game-event {gameObjName, gameEvent} ─────▶ │  (fire and forget)
//! ```
//!
//! The transport itself (socket, encoding) is supplied by the host through
//! the [`Connection`] trait.

mod error;
mod transport;
pub mod wire;

pub use error::{Error, Result};
pub use transport::{memory_pair, Connection, MemoryConnection, MemoryRemote, RawEvent};
pub use wire::{
    AuthorizeRequest, DiagramElement, ElementRequest, GameEventMessage, Handshake, InitRequest,
    Inbound,
};
