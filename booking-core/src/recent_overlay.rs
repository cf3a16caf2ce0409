//! Short-lived read-your-writes overlay bridging the gap until the backend
//! catches up with a mutation. Ported from
//! `examples/original_source/src/modules/bookings/recently.py::RecentBookings`
//! — three maps behind one lock, pruned on every access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::booking::Booking;

struct State {
    created: HashMap<String, (Instant, Booking)>,
    updated: HashMap<String, (Instant, Booking)>,
    canceled: HashMap<String, Instant>,
}

pub struct RecentOverlay {
    ttl: Duration,
    state: Mutex<State>,
}

impl RecentOverlay {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(State {
                created: HashMap::new(),
                updated: HashMap::new(),
                canceled: HashMap::new(),
            }),
        }
    }

    fn prune(state: &mut State, ttl: Duration, now: Instant) {
        state.created.retain(|_, (ts, _)| *ts + ttl > now);
        state.updated.retain(|_, (ts, _)| *ts + ttl > now);
        state.canceled.retain(|_, ts| *ts + ttl > now);
    }

    pub fn mark_created(&self, id: String, booking: Booking, now: Instant) {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.created.insert(id, (now, booking));
    }

    pub fn mark_updated(&self, id: String, booking: Booking, now: Instant) {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.updated.insert(id, (now, booking));
    }

    pub fn mark_canceled(&self, id: String, now: Instant) {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        // A cancel always wins over an earlier create/update record for the
        // same id (testable property 6).
        state.created.remove(&id);
        state.updated.remove(&id);
        state.canceled.insert(id, now);
    }

    pub fn is_created(&self, id: &str, now: Instant) -> bool {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.created.contains_key(id)
    }

    pub fn is_updated(&self, id: &str, now: Instant) -> bool {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.updated.contains_key(id)
    }

    pub fn is_canceled(&self, id: &str, now: Instant) -> bool {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.canceled.contains_key(id)
    }

    pub fn get_created(&self, now: Instant) -> HashMap<String, Booking> {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state
            .created
            .iter()
            .map(|(id, (_, b))| (id.clone(), b.clone()))
            .collect()
    }

    pub fn get_updated_with_ts(&self, now: Instant) -> HashMap<String, (Instant, Booking)> {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.updated.clone()
    }

    pub fn get_canceled(&self, now: Instant) -> std::collections::HashSet<String> {
        let mut state = self.state.lock();
        Self::prune(&mut state, self.ttl, now);
        state.canceled.keys().cloned().collect()
    }
}
