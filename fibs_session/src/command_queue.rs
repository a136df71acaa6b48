//! Outbound command FIFO with a one-in-flight gate.
//!
//! The server gives no explicit acknowledgements, so a command counts as
//! answered as soon as any server output arrives. [`CommandQueue::next`]
//! therefore yields the head only while the gate is open, and the session
//! reopens it on every received line or prompt.

use std::sync::atomic::{AtomicBool, Ordering};

use concurrent_queue::{ConcurrentQueue, PushError};

#[derive(Debug)]
pub struct CommandQueue {
    pending: ConcurrentQueue<String>,
    out_ready: AtomicBool,
}

impl CommandQueue {
    pub fn new(max_len: usize) -> Self {
        CommandQueue {
            pending: ConcurrentQueue::bounded(max_len),
            out_ready: AtomicBool::new(true),
        }
    }

    /// Append a command, without the line terminator. Returns the command
    /// back if the queue is full.
    pub fn add(&self, command: impl Into<String>) -> Result<(), String> {
        self.pending.push(command.into()).map_err(PushError::into_inner)
    }

    /// Take the next command to transmit, if one is pending and no other
    /// command is in flight.
    pub fn next(&self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        if !self.out_ready.swap(false, Ordering::AcqRel) {
            return None;
        }
        match self.pending.pop() {
            Ok(command) => Some(command),
            Err(_) => {
                // Lost a race with another consumer; reopen the gate.
                self.out_ready.store(true, Ordering::Release);
                None
            }
        }
    }

    /// Any server output answers the command in flight.
    pub fn mark_ready(&self) {
        self.out_ready.store(true, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop all pending commands, as on disconnect.
    pub fn clear(&self) {
        while self.pending.pop().is_ok() {}
        self.out_ready.store(true, Ordering::Release);
    }
}
