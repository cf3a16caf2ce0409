//! Orchestrator composing the room registry, the two cache/single-flight
//! pairs, the recent-changes overlay, and the policy engine. Method shapes
//! follow `examples/original_source/src/modules/bookings/service.py` and
//! `routes.py`, generalized to the `services/orders::OrderService`
//! template (`async fn ... -> Result<_, E>` methods over `DashMap`/`Mutex`
//! state), swapped to `GatewayError` since callers need to match on error
//! kind to pick an HTTP status.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use tracing::{debug, info, warn};

use shared::GatewayError;

use crate::booking::{
    annotate_related, AccessLevel, AccountEmail, AnnotatedBooking, Attendee, Booking,
    BookingStatus, RoomId,
};
use crate::gateway::{ExchangeGateway, FreeBusyEvent, Item, UpdateFields};
use crate::policy::{can_book, PolicyInput, UserRoles};
use crate::recent_overlay::RecentOverlay;
use crate::room_registry::{Room, RoomRegistry};
use crate::single_flight::SingleFlight;
use crate::window_cache::WindowCache;

type CalendarKey = (DateTime<FixedOffset>, DateTime<FixedOffset>);
type BusyKey = (Vec<RoomId>, DateTime<FixedOffset>, DateTime<FixedOffset>);

#[derive(Debug, Clone)]
pub struct BookingServiceConfig {
    pub ttl_calendar_view: Duration,
    pub ttl_busy_info: Duration,
    pub recently_ttl: Duration,
    pub max_slots_per_room: usize,
    pub confirmation_initial_delay: Duration,
    pub confirmation_poll_interval: Duration,
    pub confirmation_max_tries: u32,
}

impl Default for BookingServiceConfig {
    fn default() -> Self {
        Self {
            ttl_calendar_view: Duration::from_secs(60),
            ttl_busy_info: Duration::from_secs(60),
            recently_ttl: Duration::from_secs(300),
            max_slots_per_room: crate::DEFAULT_MAX_SLOTS_PER_ROOM,
            confirmation_initial_delay: Duration::from_secs(2),
            confirmation_poll_interval: Duration::from_secs(1),
            confirmation_max_tries: 10,
        }
    }
}

pub struct CreateBookingInput {
    pub room_id: RoomId,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    pub organizer_email: AccountEmail,
    pub participants: Vec<AccountEmail>,
    pub user_roles: UserRoles,
    pub in_access_list: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBookingInput {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub title: Option<String>,
}

pub struct BookingService {
    registry: Arc<RoomRegistry>,
    gateway: Arc<dyn ExchangeGateway>,
    calendar_cache: Arc<WindowCache>,
    busy_cache: Arc<WindowCache>,
    calendar_sf: Arc<SingleFlight<CalendarKey, Result<Vec<Booking>, GatewayError>>>,
    busy_sf: Arc<SingleFlight<BusyKey, Result<Vec<Booking>, GatewayError>>>,
    cancel_sf: Arc<SingleFlight<String, Result<bool, GatewayError>>>,
    recent: Arc<RecentOverlay>,
    config: BookingServiceConfig,
}

impl BookingService {
    pub fn new(
        registry: Arc<RoomRegistry>,
        gateway: Arc<dyn ExchangeGateway>,
        config: BookingServiceConfig,
    ) -> Self {
        Self {
            calendar_cache: Arc::new(WindowCache::new(
                config.ttl_calendar_view,
                config.max_slots_per_room,
            )),
            busy_cache: Arc::new(WindowCache::new(
                config.ttl_busy_info,
                config.max_slots_per_room,
            )),
            calendar_sf: Arc::new(SingleFlight::new()),
            busy_sf: Arc::new(SingleFlight::new()),
            cancel_sf: Arc::new(SingleFlight::new()),
            recent: Arc::new(RecentOverlay::new(config.recently_ttl)),
            registry,
            gateway,
            config,
        }
    }

    /// §4.6.1 — bookings for a set of rooms in `[s, e]`.
    pub async fn bookings_for_rooms(
        &self,
        room_ids: &[RoomId],
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
    ) -> Result<Vec<Booking>, GatewayError> {
        debug!(rooms = room_ids.len(), "bookings_for_rooms");
        let rooms: Vec<&Room> = self.registry.by_ids(room_ids).into_iter().flatten().collect();
        let resolved_ids: Vec<RoomId> = rooms.iter().map(|r| r.id.clone()).collect();

        let mono_now = Instant::now();
        let calendar_map = self.resolve_calendar(&resolved_ids, s, e, mono_now).await?;
        let busy_map = self.resolve_busy(&rooms, s, e, mono_now).await?;

        type Key = (RoomId, DateTime<FixedOffset>, DateTime<FixedOffset>);
        let mut calendar_by_key: HashMap<Key, Vec<Booking>> = HashMap::new();
        for booking in calendar_map.into_values().flatten() {
            let key = (booking.room_id.clone(), booking.start, booking.end);
            calendar_by_key.entry(key).or_default().push(booking);
        }
        let mut busy_by_key: HashMap<Key, Vec<Booking>> = HashMap::new();
        for booking in busy_map.into_values().flatten() {
            let key = (booking.room_id.clone(), booking.start, booking.end);
            busy_by_key.entry(key).or_default().push(booking);
        }

        let mut keys: HashSet<Key> = calendar_by_key.keys().cloned().collect();
        keys.extend(busy_by_key.keys().cloned());

        let mut bookings: Vec<Booking> = Vec::with_capacity(keys.len());
        for key in keys {
            let mut cal = calendar_by_key.remove(&key).unwrap_or_default();
            let mut busy = busy_by_key.remove(&key).unwrap_or_default();
            if cal.len() + busy.len() == 1 {
                bookings.extend(cal.drain(..));
                bookings.extend(busy.drain(..));
            } else if !cal.is_empty() {
                bookings.push(cal.remove(0));
            } else {
                bookings.append(&mut busy);
            }
        }

        let mut bookings = self.apply_recent_overlay(bookings, &resolved_ids);
        bookings.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(bookings)
    }

    /// §4.6.2 — bookings for a single user across all non-red rooms,
    /// calendar-view only (free/busy carries no attendee identity).
    pub async fn bookings_for_user(
        &self,
        user_email: &AccountEmail,
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
    ) -> Result<Vec<AnnotatedBooking>, GatewayError> {
        debug!(user = %shared::logger::redact_email(user_email.as_str()), "bookings_for_user");
        let room_ids: Vec<RoomId> = self
            .registry
            .all(false)
            .into_iter()
            .map(|r| r.id.clone())
            .collect();

        let mono_now = Instant::now();
        let calendar_map = self.resolve_calendar(&room_ids, s, e, mono_now).await?;
        let bookings: Vec<Booking> = calendar_map.into_values().flatten().collect();
        let mut bookings = self.apply_recent_overlay(bookings, &room_ids);

        bookings.retain(|b| {
            let Some(attendees) = b.attendees.as_ref() else {
                return false;
            };
            let room_attendees_ok = attendees
                .iter()
                .filter(|a| a.associated_room_id.is_some())
                .all(|a| a.status != Some(BookingStatus::Decline));
            let user_attends = attendees
                .iter()
                .any(|a| &a.email == user_email && a.status != Some(BookingStatus::Decline));
            room_attendees_ok && user_attends
        });
        bookings.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(annotate_related(bookings, user_email))
    }

    /// §4.6.3 — create a booking, policy-checked, then poll until the room
    /// resource confirms or times out. Do NOT replace the poll with a single
    /// fetch: the backend is eventually consistent on resource responses.
    pub async fn create(&self, input: CreateBookingInput) -> Result<Booking, GatewayError> {
        let room = self
            .registry
            .by_id(&input.room_id)
            .ok_or_else(|| GatewayError::NotFound(format!("room {}", input.room_id)))?;

        let now = shared::time::to_msk(chrono::Utc::now());
        let decision = can_book(PolicyInput {
            roles: input.user_roles,
            room,
            start: input.start,
            end: input.end,
            now,
            in_access_list: input.in_access_list,
            is_update: false,
        });
        if !decision.allowed {
            return Err(GatewayError::PolicyDenied(decision.reason.into_owned()));
        }

        let location = format!("{} ({})", room.title, input.organizer_email);
        let mut required_attendees = vec![room.resource_email.clone(), input.organizer_email.clone()];
        required_attendees.extend(input.participants.iter().cloned());
        let body = format!("Booked via gateway by {}", input.organizer_email);

        let item_id = self
            .gateway
            .create_item(
                input.start,
                input.end,
                &input.title,
                &body,
                &location,
                std::slice::from_ref(&room.resource_email),
                &required_attendees,
            )
            .await?;

        tokio::time::sleep(self.config.confirmation_initial_delay).await;

        let mut last_known: Option<Item> = None;
        for _ in 0..self.config.confirmation_max_tries {
            match self.gateway.get_item(&item_id).await {
                Ok(Some(item)) => {
                    if let Some(attendee) = item.attendee(&room.resource_email) {
                        if attendee.status == Some(BookingStatus::Decline) {
                            let _ = self
                                .gateway
                                .cancel_item(&item_id, "Declined by room resource")
                                .await;
                            return Err(GatewayError::DeclinedByRoom);
                        }
                        if attendee.last_response_time.is_some() {
                            let booking = item_to_booking(&item, &self.registry).ok_or_else(|| {
                                GatewayError::Inconsistent(
                                    "created item has no resolvable room attendee".to_string(),
                                )
                            })?;
                            self.recent
                                .mark_created(item_id.clone(), booking.clone(), Instant::now());
                            info!(room = %room.id, "booking created");
                            return Ok(booking);
                        }
                    }
                    last_known = Some(item);
                }
                Ok(None) => {
                    if self.recent.is_canceled(&item_id, Instant::now()) {
                        return Err(GatewayError::DeclinedByRoom);
                    }
                    return Err(GatewayError::NotFound(format!(
                        "item {item_id} disappeared before confirmation"
                    )));
                }
                Err(err) => {
                    warn!(error = %err, "transient error while confirming booking, retrying");
                }
            }
            tokio::time::sleep(self.config.confirmation_poll_interval).await;
        }

        let booking = last_known
            .as_ref()
            .and_then(|item| item_to_booking(item, &self.registry))
            .unwrap_or(Booking {
                room_id: room.id.clone(),
                start: input.start,
                end: input.end,
                title: input.title.clone(),
                outlook_id: Some(item_id.clone()),
                attendees: None,
            });
        self.recent
            .mark_created(item_id, booking.clone(), Instant::now());
        Ok(booking)
    }

    /// §4.6.4 — update, confirmed by watching the room attendee's
    /// `last_response_time` change.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateBookingInput,
    ) -> Result<Option<Booking>, GatewayError> {
        let item = self
            .gateway
            .get_item(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("item {id}")))?;
        let booking = item_to_booking(&item, &self.registry)
            .ok_or_else(|| GatewayError::Inconsistent("room attendee missing".to_string()))?;
        let room = self
            .registry
            .by_id(&booking.room_id)
            .ok_or_else(|| GatewayError::NotFound(format!("room {}", booking.room_id)))?;
        let previous_response = item.attendee(&room.resource_email).and_then(|a| a.last_response_time);

        self.gateway
            .update_item(
                id,
                UpdateFields {
                    start: input.start,
                    end: input.end,
                    title: input.title.clone(),
                },
            )
            .await?;

        for _ in 0..self.config.confirmation_max_tries {
            tokio::time::sleep(self.config.confirmation_poll_interval).await;
            if let Some(refreshed) = self.gateway.get_item(id).await? {
                let response = refreshed
                    .attendee(&room.resource_email)
                    .and_then(|a| a.last_response_time);
                if response != previous_response {
                    let updated = item_to_booking(&refreshed, &self.registry).ok_or_else(|| {
                        GatewayError::Inconsistent("room attendee missing after update".to_string())
                    })?;
                    self.recent
                        .mark_updated(id.to_string(), updated.clone(), Instant::now());
                    info!(room = %room.id, "booking updated");
                    return Ok(Some(updated));
                }
            }
        }
        Ok(None)
    }

    /// §4.6.5 — cancel, coalesced through single-flight keyed by item id.
    pub async fn cancel(&self, id: &str, by: &AccountEmail) -> Result<bool, GatewayError> {
        if self.recent.is_canceled(id, Instant::now()) {
            return Ok(true);
        }
        let gateway = self.gateway.clone();
        let recent = self.recent.clone();
        let body = format!("Canceled via gateway by {by}");
        let id_owned = id.to_string();
        self.cancel_sf
            .run(
                id.to_string(),
                move || async move {
                    gateway.cancel_item(&id_owned, &body).await?;
                    recent.mark_canceled(id_owned, Instant::now());
                    Ok(true)
                },
                true,
            )
            .await
    }

    async fn resolve_calendar(
        &self,
        room_ids: &[RoomId],
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        mono_now: Instant,
    ) -> Result<HashMap<RoomId, Vec<Booking>>, GatewayError> {
        let (mut hits, misses) = self.calendar_cache.get_multi(room_ids, s, e, mono_now);
        if misses.is_empty() {
            return Ok(hits);
        }

        let gateway = self.gateway.clone();
        let registry = self.registry.clone();
        let cache = self.calendar_cache.clone();
        let fetched = self
            .calendar_sf
            .run(
                (s, e),
                move || async move {
                    let items = gateway.calendar_view(s, e).await?;
                    let mut grouped: HashMap<RoomId, Vec<Booking>> = HashMap::new();
                    for item in &items {
                        if let Some(booking) = item_to_booking(item, &registry) {
                            grouped.entry(booking.room_id.clone()).or_default().push(booking);
                        }
                    }
                    cache.put_many(grouped.clone(), s, e, Instant::now());
                    Ok(grouped.into_values().flatten().collect())
                },
                true,
            )
            .await
            .inspect_err(|err| warn!(error = %err, "calendar_view fetch failed"))?;

        for booking in fetched {
            if misses.contains(&booking.room_id) {
                hits.entry(booking.room_id.clone()).or_default().push(booking);
            }
        }
        for room_id in misses {
            hits.entry(room_id).or_default();
        }
        Ok(hits)
    }

    async fn resolve_busy(
        &self,
        rooms: &[&Room],
        s: DateTime<FixedOffset>,
        e: DateTime<FixedOffset>,
        mono_now: Instant,
    ) -> Result<HashMap<RoomId, Vec<Booking>>, GatewayError> {
        let room_ids: Vec<RoomId> = rooms.iter().map(|r| r.id.clone()).collect();
        let (mut hits, misses) = self.busy_cache.get_multi(&room_ids, s, e, mono_now);
        if misses.is_empty() {
            return Ok(hits);
        }

        let miss_rooms: Vec<Room> = rooms
            .iter()
            .filter(|r| misses.contains(&r.id))
            .map(|r| (*r).clone())
            .collect();
        let accounts: Vec<AccountEmail> = miss_rooms.iter().map(|r| r.resource_email.clone()).collect();
        let room_by_email: HashMap<AccountEmail, Room> = miss_rooms
            .iter()
            .map(|r| (r.resource_email.clone(), r.clone()))
            .collect();

        let mut sorted_misses: Vec<RoomId> = misses.iter().cloned().collect();
        sorted_misses.sort();

        let gateway = self.gateway.clone();
        let cache = self.busy_cache.clone();
        let fetched = self
            .busy_sf
            .run(
                (sorted_misses, s, e),
                move || async move {
                    let events_by_account = gateway.free_busy(&accounts, s, e).await?;
                    let mut grouped: HashMap<RoomId, Vec<Booking>> = HashMap::new();
                    for (account, events) in events_by_account {
                        if let Some(room) = room_by_email.get(&account) {
                            let bookings: Vec<Booking> = events
                                .iter()
                                .map(|event| free_busy_event_to_booking(event, room))
                                .collect();
                            grouped.insert(room.id.clone(), bookings);
                        }
                    }
                    cache.put_many(grouped.clone(), s, e, Instant::now());
                    Ok(grouped.into_values().flatten().collect())
                },
                true,
            )
            .await
            .inspect_err(|err| warn!(error = %err, "free_busy fetch failed"))?;

        for booking in fetched {
            hits.entry(booking.room_id.clone()).or_default().push(booking);
        }
        for room_id in misses {
            hits.entry(room_id).or_default();
        }
        Ok(hits)
    }

    fn apply_recent_overlay(&self, mut bookings: Vec<Booking>, requested_rooms: &[RoomId]) -> Vec<Booking> {
        let now = Instant::now();
        let canceled = self.recent.get_canceled(now);
        bookings.retain(|b| !b.outlook_id.as_ref().is_some_and(|id| canceled.contains(id)));

        let updated = self.recent.get_updated_with_ts(now);
        for b in bookings.iter_mut() {
            if let Some(id) = &b.outlook_id {
                if let Some((ts, overlay_booking)) = updated.get(id) {
                    if *ts + self.config.ttl_calendar_view > now {
                        *b = overlay_booking.clone();
                    }
                }
            }
        }

        let created = self.recent.get_created(now);
        let present_ids: HashSet<String> = bookings.iter().filter_map(|b| b.outlook_id.clone()).collect();
        for (id, booking) in created {
            if present_ids.contains(&id) {
                continue;
            }
            if requested_rooms.contains(&booking.room_id) {
                bookings.push(booking);
            }
        }
        bookings
    }
}

/// Converts one calendar item to a `Booking`, resolving the room via its
/// resource attendee. Returns `None` (logged, dropped) when no attendee
/// resolves to a known room — the `Inconsistent` case in §7 — or when the
/// room attendee declined (filtered per §4.6.1).
fn item_to_booking(item: &Item, registry: &RoomRegistry) -> Option<Booking> {
    let room_attendee = item
        .required_attendees
        .iter()
        .find(|a| registry.by_email(&a.email).is_some())?;
    if room_attendee.status == Some(BookingStatus::Decline) {
        return None;
    }
    let room = registry.by_email(&room_attendee.email)?;

    let attendees = item
        .required_attendees
        .iter()
        .map(|a| Attendee {
            email: a.email.clone(),
            status: a.status,
            associated_room_id: registry.by_email(&a.email).map(|r| r.id.clone()),
        })
        .collect();

    Some(Booking {
        room_id: room.id.clone(),
        start: item.start,
        end: item.end,
        title: item.subject.clone(),
        outlook_id: Some(item.id.clone()),
        attendees: Some(attendees),
    })
}

fn organizer_email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\(([\w.+-]+@(?:innopolis\.university|innopolis\.ru))\)").unwrap()
    })
}

/// Free/busy events carry no attendee list; the organizer's email is
/// recovered from the `"<title> (<email>)"` location convention preserved on
/// create (§9 design notes).
fn free_busy_event_to_booking(event: &FreeBusyEvent, room: &Room) -> Booking {
    let organizer = event
        .location
        .as_deref()
        .and_then(|loc| organizer_email_regex().captures(loc))
        .map(|caps| AccountEmail::from(caps[1].to_string()));

    let mut attendees = vec![Attendee {
        email: room.resource_email.clone(),
        status: None,
        associated_room_id: Some(room.id.clone()),
    }];
    if let Some(organizer) = organizer {
        attendees.push(Attendee {
            email: organizer,
            status: None,
            associated_room_id: None,
        });
    }

    Booking {
        room_id: room.id.clone(),
        start: event.start,
        end: event.end,
        title: event.subject.clone().unwrap_or_default(),
        outlook_id: None,
        attendees: Some(attendees),
    }
}
