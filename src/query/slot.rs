//! Per-controller query slots with generation tickets.
//!
//! A slot records which key the controller currently wants and the last data
//! it committed. Every `begin` bumps the generation; a result is only
//! committed when it carries the current generation and key, so a slow
//! response for an old key can never overwrite a newer one.

use std::sync::Arc;

use super::ErrorInfo;

/// Proof of which request a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct QuerySlot<K, V> {
    generation: u64,
    key: Option<K>,
    /// Last committed data and the key it was fetched for
    data: Option<(K, Arc<V>)>,
    error: Option<ErrorInfo>,
    in_flight: bool,
}

impl<K, V> Default for QuerySlot<K, V> {
    fn default() -> Self {
        Self {
            generation: 0,
            key: None,
            data: None,
            error: None,
            in_flight: false,
        }
    }
}

impl<K: Clone + PartialEq, V> QuerySlot<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `key`, superseding any request in flight.
    pub fn begin(&mut self, key: K) -> Ticket {
        self.generation += 1;
        self.key = Some(key);
        self.error = None;
        self.in_flight = true;
        Ticket(self.generation)
    }

    /// Commit a result. Returns `false` (and changes nothing) if the ticket
    /// or key has been superseded.
    pub fn resolve(&mut self, ticket: Ticket, key: &K, result: Result<Arc<V>, ErrorInfo>) -> bool {
        if !self.accepts(ticket, key) {
            return false;
        }
        self.in_flight = false;
        match result {
            Ok(value) => {
                self.data = Some((key.clone(), value));
                self.error = None;
            }
            Err(error) => self.error = Some(error),
        }
        true
    }

    /// Start a request for `key` while showing `stale`, an expired cached
    /// value for the same key.
    pub fn revalidate(&mut self, key: K, stale: Arc<V>) -> Ticket {
        let ticket = self.begin(key.clone());
        self.data = Some((key, stale));
        ticket
    }

    /// Record that the request for `ticket` ended without a result.
    /// Returns `false` if the ticket has been superseded.
    pub fn fail(&mut self, ticket: Ticket, error: ErrorInfo) -> bool {
        if ticket.0 != self.generation || !self.in_flight {
            return false;
        }
        self.in_flight = false;
        self.error = Some(error);
        true
    }

    /// Whether a result for `ticket` and `key` would be committed.
    pub fn accepts(&self, ticket: Ticket, key: &K) -> bool {
        ticket.0 == self.generation && self.key.as_ref() == Some(key)
    }

    /// Commit cached data for `key` without a request.
    pub fn hydrate(&mut self, key: K, value: Arc<V>) {
        self.generation += 1;
        self.key = Some(key.clone());
        self.data = Some((key, value));
        self.error = None;
        self.in_flight = false;
    }

    /// Disable the slot: no wanted key, no data, nothing in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.key = None;
        self.data = None;
        self.error = None;
        self.in_flight = false;
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Last committed data, possibly for an older key.
    pub fn data(&self) -> Option<&Arc<V>> {
        self.data.as_ref().map(|(_, value)| value)
    }

    /// Last committed data together with the key it was fetched for.
    pub fn committed(&self) -> Option<(&K, &Arc<V>)> {
        self.data.as_ref().map(|(key, value)| (key, value))
    }

    /// Committed data only if it belongs to the wanted key.
    pub fn current_data(&self) -> Option<&Arc<V>> {
        match (&self.key, &self.data) {
            (Some(wanted), Some((key, value))) if wanted == key => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Whether the slot currently wants a key.
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
