//! Wire DTOs. Kept separate from `booking-core`'s domain types so the core
//! never depends on `serde` wire concerns beyond what it already needs
//! internally.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use booking_core::{AnnotatedBooking, Attendee, Booking, BookingStatus};

#[derive(Debug, Serialize)]
pub struct AttendeeDto {
    pub email: String,
    pub status: Option<&'static str>,
    pub associated_room_id: Option<String>,
}

impl From<&Attendee> for AttendeeDto {
    fn from(a: &Attendee) -> Self {
        Self {
            email: a.email.as_str().to_string(),
            status: a.status.map(status_str),
            associated_room_id: a.associated_room_id.as_ref().map(|r| r.as_str().to_string()),
        }
    }
}

fn status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Accept => "Accept",
        BookingStatus::Tentative => "Tentative",
        BookingStatus::Decline => "Decline",
        BookingStatus::Unknown => "Unknown",
    }
}

#[derive(Debug, Serialize)]
pub struct BookingDto {
    pub room_id: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    pub outlook_booking_id: Option<String>,
    pub attendees: Option<Vec<AttendeeDto>>,
    pub related_to_me: Option<bool>,
}

impl From<&Booking> for BookingDto {
    fn from(b: &Booking) -> Self {
        Self {
            room_id: b.room_id.as_str().to_string(),
            start: b.start,
            end: b.end,
            title: b.title.clone(),
            outlook_booking_id: b.outlook_id.clone(),
            attendees: b
                .attendees
                .as_ref()
                .map(|attendees| attendees.iter().map(AttendeeDto::from).collect()),
            related_to_me: None,
        }
    }
}

impl From<&AnnotatedBooking> for BookingDto {
    fn from(a: &AnnotatedBooking) -> Self {
        let mut dto = BookingDto::from(&a.booking);
        dto.related_to_me = Some(a.related_to_me);
        dto
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateBookingRequest {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub room_ids: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}
