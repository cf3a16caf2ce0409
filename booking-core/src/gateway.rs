//! Abstract EWS backend boundary (§6). Wire marshalling is out of scope;
//! this trait is the seam `BookingService` depends on, matching the
//! teacher's pattern of putting `async_trait` boundaries between services
//! and their external systems.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

use shared::GatewayError;

use crate::booking::{AccountEmail, BookingStatus};

#[derive(Debug, Clone)]
pub struct ItemAttendee {
    pub email: AccountEmail,
    pub status: Option<BookingStatus>,
    pub last_response_time: Option<DateTime<FixedOffset>>,
}

/// One calendar item as returned by `calendar_view`/`get_item`.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub subject: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub required_attendees: Vec<ItemAttendee>,
}

impl Item {
    pub fn attendee(&self, email: &AccountEmail) -> Option<&ItemAttendee> {
        self.required_attendees.iter().find(|a| &a.email == email)
    }
}

/// One busy interval as returned by `free_busy`. Lacks attendee identity;
/// `location` is the only channel carrying the organizer's email, per the
/// `"<title> (<email>)"` convention preserved on create.
#[derive(Debug, Clone)]
pub struct FreeBusyEvent {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub subject: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFields {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub title: Option<String>,
}

#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn calendar_view(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Item>, GatewayError>;

    async fn free_busy(
        &self,
        accounts: &[AccountEmail],
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<HashMap<AccountEmail, Vec<FreeBusyEvent>>, GatewayError>;

    async fn create_item(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        subject: &str,
        body: &str,
        location: &str,
        resources: &[AccountEmail],
        required_attendees: &[AccountEmail],
    ) -> Result<String, GatewayError>;

    async fn get_item(&self, id: &str) -> Result<Option<Item>, GatewayError>;

    async fn update_item(&self, id: &str, fields: UpdateFields) -> Result<(), GatewayError>;

    async fn cancel_item(&self, id: &str, body: &str) -> Result<(), GatewayError>;

    /// Registers a push subscription for `event_types` on `callback_url`,
    /// returning `(subscription_id, watermark)`. The watermark is an opaque
    /// continuation token the caller persists and replays to resume a
    /// dropped subscription without missing or duplicating events.
    async fn push_subscribe(
        &self,
        callback_url: &str,
        event_types: &[String],
    ) -> Result<(String, String), GatewayError>;
}
