//! Allocation of session identifiers

use std::collections::HashMap;
use std::sync::Mutex;

/// Allocator of per (service, client) session identifiers
///
/// Session ids run from 1 through 0xFFFF and wrap back to 1; the value 0 is
/// reserved to mean "no session" and is never handed out.
#[derive(Debug, Default)]
pub struct SessionManager {
    counters: Mutex<HashMap<(u16, u16), u16>>,
}

impl SessionManager {
    /// Create an allocator with all counters at their start value
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next session id for the (service, client) pair
    #[allow(clippy::unwrap_used)]
    pub fn next(&self, service_id: u16, client_id: u16) -> u16 {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry((service_id, client_id)).or_insert(1);
        let value = *counter;
        *counter = if value == 0xFFFF { 1 } else { value + 1 };
        value
    }
}
