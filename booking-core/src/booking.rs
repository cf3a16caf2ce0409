//! Core domain entities: rooms, bookings, attendees.

use chrono::{DateTime, FixedOffset};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountEmail(String);

impl AccountEmail {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountEmail {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountEmail {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The original's `Literal["yellow", "red", "special"] | None` as a closed
/// sum type. Kept as an explicit `None` variant rather than
/// `Option<AccessLevel>` because `access_level == None` participates
/// directly in policy match arms (see `policy::can_book`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Yellow,
    Red,
    Special,
    None,
}

impl AccessLevel {
    pub fn from_config_str(value: Option<&str>) -> Self {
        match value {
            Some("yellow") => AccessLevel::Yellow,
            Some("red") => AccessLevel::Red,
            Some("special") => AccessLevel::Special,
            _ => AccessLevel::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Accept,
    Tentative,
    Decline,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub email: AccountEmail,
    pub status: Option<BookingStatus>,
    pub associated_room_id: Option<RoomId>,
}

/// Identity used for dedup/removal: the backend id when present, otherwise
/// the `(room, start, end)` triple, matching `window_cache`'s identity rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookingKey {
    ById(String),
    ByWindow(RoomId, DateTime<FixedOffset>, DateTime<FixedOffset>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub room_id: RoomId,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    pub outlook_id: Option<String>,
    pub attendees: Option<Vec<Attendee>>,
}

impl Booking {
    pub fn key(&self) -> BookingKey {
        match &self.outlook_id {
            Some(id) => BookingKey::ById(id.clone()),
            None => BookingKey::ByWindow(self.room_id.clone(), self.start, self.end),
        }
    }

    /// True when `[self.start, self.end)` overlaps `[s, e)`.
    pub fn overlaps(&self, s: DateTime<FixedOffset>, e: DateTime<FixedOffset>) -> bool {
        self.start < e && s < self.end
    }

    pub fn room_attendee<'a>(&'a self, room_email: &AccountEmail) -> Option<&'a Attendee> {
        self.attendees
            .as_ref()
            .and_then(|attendees| attendees.iter().find(|a| &a.email == room_email))
    }
}

/// Output DTO carrying the "related to me" flag the original computed as a
/// dynamic attribute on `Booking`. Built by a pure pass over already-assembled
/// bookings; never stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedBooking {
    pub booking: Booking,
    pub related_to_me: bool,
}

/// `annotate_related` — pure pass computing whether `viewer` is an attendee
/// (with non-Decline status) of each booking. Does not mutate the inputs.
pub fn annotate_related(bookings: Vec<Booking>, viewer: &AccountEmail) -> Vec<AnnotatedBooking> {
    bookings
        .into_iter()
        .map(|booking| {
            let related_to_me = booking.attendees.as_ref().is_some_and(|attendees| {
                attendees
                    .iter()
                    .any(|a| &a.email == viewer && a.status != Some(BookingStatus::Decline))
            });
            AnnotatedBooking {
                booking,
                related_to_me,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn msk_at(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        shared::time::msk_offset()
            .with_ymd_and_hms(y, m, d, h, mi, 0)
            .single()
            .unwrap()
    }

    fn booking(room: &str, id: Option<&str>) -> Booking {
        let start = msk_at(2025, 3, 10, 9, 0);
        let end = msk_at(2025, 3, 10, 10, 0);
        Booking {
            room_id: RoomId::from(room),
            start,
            end,
            title: "Meeting".to_string(),
            outlook_id: id.map(|s| s.to_string()),
            attendees: None,
        }
    }

    #[test]
    fn key_prefers_outlook_id() {
        let b = booking("101", Some("abc"));
        assert_eq!(b.key(), BookingKey::ById("abc".to_string()));
    }

    #[test]
    fn key_falls_back_to_window() {
        let b = booking("101", None);
        assert_eq!(
            b.key(),
            BookingKey::ByWindow(RoomId::from("101"), b.start, b.end)
        );
    }

    #[test]
    fn annotate_related_marks_non_declined_attendee() {
        let mut b = booking("101", Some("abc"));
        b.attendees = Some(vec![Attendee {
            email: AccountEmail::from("me@example.edu"),
            status: Some(BookingStatus::Accept),
            associated_room_id: None,
        }]);
        let annotated = annotate_related(vec![b], &AccountEmail::from("me@example.edu"));
        assert!(annotated[0].related_to_me);
    }

    #[test]
    fn annotate_related_ignores_declined_attendee() {
        let mut b = booking("101", Some("abc"));
        b.attendees = Some(vec![Attendee {
            email: AccountEmail::from("me@example.edu"),
            status: Some(BookingStatus::Decline),
            associated_room_id: None,
        }]);
        let annotated = annotate_related(vec![b], &AccountEmail::from("me@example.edu"));
        assert!(!annotated[0].related_to_me);
    }
}
