//! Per-room windowed booking cache. Ported from
//! `examples/original_source/src/modules/bookings/caching.py`'s
//! `CacheForBookings` (`_prune_expired`/`_evict_oldest`/`update_cache`/
//! `get_cached_entry`), generalized with `add_booking`/`remove_booking`
//! for in-place reconciliation after a mutation, which the original never
//! needed since it only ever replaced whole slots.
//!
//! One `Mutex<Vec<CacheSlot>>` per room behind a `DashMap`, the same
//! per-key-lock shape `OrderService`'s order map and `RiskLimits`'s nested
//! counters use.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::booking::{Booking, BookingKey, RoomId};

#[derive(Debug, Clone)]
pub struct CacheSlot {
    pub room_id: RoomId,
    pub bookings: Vec<Booking>,
    pub covered_start: DateTime<FixedOffset>,
    pub covered_end: DateTime<FixedOffset>,
    pub inserted_at: Instant,
}

impl CacheSlot {
    fn covers(&self, s: DateTime<FixedOffset>, e: DateTime<FixedOffset>) -> bool {
        self.covered_start <= s && self.covered_end >= e
    }

    fn expired(&self, ttl: Duration, now: Instant) -> bool {
        self.inserted_at + ttl <= now
    }
}

pub struct WindowCache {
    ttl: Duration,
    max_slots_per_room: usize,
    rooms: DashMap<RoomId, Mutex<Vec<CacheSlot>>>,
}

impl WindowCache {
    pub fn new(ttl: Duration, max_slots_per_room: usize) -> Self {
        Self {
            ttl,
            max_slots_per_room,
            rooms: DashMap::new(),
        }
    }

    fn prune_expired(&self, slots: &mut Vec<CacheSlot>, now: Instant) {
        slots.retain(|s| !s.expired(self.ttl, now));
    }

    fn evict_oldest(&self, slots: &mut Vec<CacheSlot>) {
        while slots.len() > self.max_slots_per_room {
            let oldest_idx = slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.inserted_at)
                .map(|(idx, _)| idx)
                .expect("non-empty by loop guard");
            slots.remove(oldest_idx);
        }
    }

    pub fn put(
        &self,
        room_id: RoomId,
        bookings: Vec<Booking>,
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        now: Instant,
    ) {
        let entry = self.rooms.entry(room_id.clone()).or_default();
        let mut slots = entry.lock();
        self.prune_expired(&mut slots, now);
        slots.push(CacheSlot {
            room_id,
            bookings,
            covered_start: s,
            covered_end: e,
            inserted_at: now,
        });
        self.evict_oldest(&mut slots);
    }

    pub fn put_many(
        &self,
        bookings_by_room: HashMap<RoomId, Vec<Booking>>,
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        now: Instant,
    ) {
        for (room_id, bookings) in bookings_by_room {
            self.put(room_id, bookings, s, e, now);
        }
    }

    /// First non-expired slot strictly covering `[s, e]`. Partial overlap
    /// misses by design (§4.4): only a slot containing the full window can
    /// answer it without hiding bookings in the gap.
    pub fn get(
        &self,
        room_id: &RoomId,
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        now: Instant,
    ) -> Option<Vec<Booking>> {
        let entry = self.rooms.get(room_id)?;
        let mut slots = entry.lock();
        self.prune_expired(&mut slots, now);
        slots.iter().find(|slot| slot.covers(s, e)).map(|slot| slot.bookings.clone())
    }

    pub fn get_multi(
        &self,
        room_ids: &[RoomId],
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        now: Instant,
    ) -> (HashMap<RoomId, Vec<Booking>>, HashSet<RoomId>) {
        let mut hits = HashMap::new();
        let mut misses = HashSet::new();
        for room_id in room_ids {
            match self.get(room_id, s, e, now) {
                Some(bookings) => {
                    hits.insert(room_id.clone(), bookings);
                }
                None => {
                    misses.insert(room_id.clone());
                }
            }
        }
        (hits, misses)
    }

    /// Appends `booking` to every slot of its room that time-overlaps it,
    /// unless already present by identity. Idempotent under repeated calls
    /// (testable property 4).
    pub fn add_booking(&self, booking: Booking) {
        let Some(entry) = self.rooms.get(&booking.room_id) else {
            return;
        };
        let mut slots = entry.lock();
        let key = booking.key();
        for slot in slots.iter_mut() {
            if !booking.overlaps(slot.covered_start, slot.covered_end) {
                continue;
            }
            if slot.bookings.iter().any(|b| b.key() == key) {
                continue;
            }
            slot.bookings.push(booking.clone());
            slot.bookings.sort_by_key(|b| b.start);
        }
    }

    /// Strips `booking` from every slot it could appear in. For
    /// `outlook_id`-identified bookings this searches all rooms (a
    /// cross-room move is impossible in practice but the identity lookup
    /// stays correct even if the caller doesn't know the current room);
    /// anonymous bookings are only removed from their own room's slots.
    pub fn remove_booking(&self, booking: &Booking) {
        let key = booking.key();
        match &key {
            BookingKey::ById(_) => {
                for entry in self.rooms.iter() {
                    let mut slots = entry.value().lock();
                    for slot in slots.iter_mut() {
                        slot.bookings.retain(|b| b.key() != key);
                    }
                }
            }
            BookingKey::ByWindow(room_id, _, _) => {
                if let Some(entry) = self.rooms.get(room_id) {
                    let mut slots = entry.lock();
                    for slot in slots.iter_mut() {
                        slot.bookings.retain(|b| b.key() != key);
                    }
                }
            }
        }
    }
}
