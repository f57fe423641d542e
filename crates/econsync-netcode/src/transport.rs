//! Connection trait for talking to the backend
//!
//! The host implements [`Connection`] for its chosen network stack
//! (socket.io, WebSocket, ...). Everything runs on one execution context:
//! the hub drains [`Connection::recv`] from its own loop, so implementations
//! never need to be `Send`.

use crate::{Error, Result};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A named event with a JSON payload, as it crosses the connection
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub name: String,
    pub data: Json,
}

impl RawEvent {
    pub fn new(name: impl Into<String>, data: Json) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Event-named, ordered message channel to the backend
pub trait Connection {
    /// Send an event (fire and forget)
    fn emit(&mut self, event: &str, payload: Json) -> Result<()>;

    /// Receive the next inbound event (non-blocking)
    ///
    /// Returns `None` if nothing is queued.
    fn recv(&mut self) -> Option<RawEvent>;

    /// Check if the connection is still alive
    fn is_connected(&self) -> bool;

    /// Close the connection
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
struct Link {
    /// Backend to client
    inbound: VecDeque<RawEvent>,
    /// Client to backend
    outbound: Vec<RawEvent>,
    closed: bool,
}

/// Client end of an in-memory connection
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    link: Rc<RefCell<Link>>,
}

/// Backend end of an in-memory connection, driven by tests and demos
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    link: Rc<RefCell<Link>>,
}

/// Create a connected in-memory pair
pub fn memory_pair() -> (MemoryConnection, MemoryRemote) {
    let link = Rc::new(RefCell::new(Link::default()));
    (
        MemoryConnection { link: link.clone() },
        MemoryRemote { link },
    )
}

impl Connection for MemoryConnection {
    fn emit(&mut self, event: &str, payload: Json) -> Result<()> {
        let mut link = self.link.borrow_mut();
        if link.closed {
            return Err(Error::ConnectionClosed);
        }
        link.outbound.push(RawEvent::new(event, payload));
        Ok(())
    }

    fn recv(&mut self) -> Option<RawEvent> {
        self.link.borrow_mut().inbound.pop_front()
    }

    fn is_connected(&self) -> bool {
        !self.link.borrow().closed
    }

    fn close(&mut self) -> Result<()> {
        self.link.borrow_mut().closed = true;
        Ok(())
    }
}

impl MemoryRemote {
    /// Queue an event for the client
    pub fn push(&self, name: &str, data: Json) {
        self.link.borrow_mut().inbound.push_back(RawEvent::new(name, data));
    }

    /// Everything the client has sent so far
    pub fn sent(&self) -> Vec<RawEvent> {
        self.link.borrow().outbound.clone()
    }

    /// Take everything the client has sent, clearing the log
    pub fn take_sent(&self) -> Vec<RawEvent> {
        std::mem::take(&mut self.link.borrow_mut().outbound)
    }

    /// Drop the connection from the backend side
    pub fn disconnect(&self) {
        self.link.borrow_mut().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.link.borrow().closed
    }
}
