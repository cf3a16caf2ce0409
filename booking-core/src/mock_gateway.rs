//! Hand-rolled `ExchangeGateway` fake for tests (fixtures behind
//! `Arc<Mutex<...>>`, no mocking framework). Exposed behind the `testing`
//! feature so `integration-tests`
//! can depend on it as a dev-dependency without linking it into release
//! builds of `booking-core`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use parking_lot::Mutex;

use shared::GatewayError;

use crate::booking::AccountEmail;
use crate::gateway::{ExchangeGateway, FreeBusyEvent, Item, UpdateFields};

#[derive(Default)]
struct Fixtures {
    items: HashMap<String, Item>,
    busy: HashMap<AccountEmail, Vec<FreeBusyEvent>>,
    next_id: u64,
    /// Bumped on every `update_item` call so each update produces a
    /// `last_response_time` distinct from the one before it, regardless of
    /// which fields actually changed.
    response_seq: i64,
}

pub struct MockExchangeGateway {
    fixtures: Mutex<Fixtures>,
    pub calendar_view_calls: AtomicU64,
    pub free_busy_calls: AtomicU64,
    pub create_calls: AtomicU64,
    pub cancel_calls: AtomicU64,
    /// Artificial latency applied to every call, to exercise timeout paths.
    pub latency: Mutex<Duration>,
    /// When set, every call fails with this error instead of running.
    pub fail_with: Mutex<Option<GatewayError>>,
}

impl Default for MockExchangeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchangeGateway {
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(Fixtures::default()),
            calendar_view_calls: AtomicU64::new(0),
            free_busy_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            cancel_calls: AtomicU64::new(0),
            latency: Mutex::new(Duration::ZERO),
            fail_with: Mutex::new(None),
        }
    }

    pub fn seed_item(&self, item: Item) {
        self.fixtures.lock().items.insert(item.id.clone(), item);
    }

    pub fn seed_busy(&self, account: AccountEmail, events: Vec<FreeBusyEvent>) {
        self.fixtures.lock().busy.insert(account, events);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn fail_next_calls_with(&self, err: GatewayError) {
        *self.fail_with.lock() = Some(err);
    }

    async fn maybe_delay_or_fail(&self) -> Result<(), GatewayError> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeGateway for MockExchangeGateway {
    async fn calendar_view(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Item>, GatewayError> {
        self.calendar_view_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_or_fail().await?;
        let fixtures = self.fixtures.lock();
        Ok(fixtures
            .items
            .values()
            .filter(|item| item.start < end && start < item.end)
            .cloned()
            .collect())
    }

    async fn free_busy(
        &self,
        accounts: &[AccountEmail],
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<HashMap<AccountEmail, Vec<FreeBusyEvent>>, GatewayError> {
        self.free_busy_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_or_fail().await?;
        let fixtures = self.fixtures.lock();
        Ok(accounts
            .iter()
            .map(|acc| (acc.clone(), fixtures.busy.get(acc).cloned().unwrap_or_default()))
            .collect())
    }

    async fn create_item(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        subject: &str,
        _body: &str,
        _location: &str,
        _resources: &[AccountEmail],
        required_attendees: &[AccountEmail],
    ) -> Result<String, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_or_fail().await?;
        let mut fixtures = self.fixtures.lock();
        fixtures.next_id += 1;
        let id = format!("mock-{}", fixtures.next_id);
        fixtures.items.insert(
            id.clone(),
            Item {
                id: id.clone(),
                subject: subject.to_string(),
                start,
                end,
                required_attendees: required_attendees
                    .iter()
                    .map(|email| crate::gateway::ItemAttendee {
                        email: email.clone(),
                        status: Some(crate::booking::BookingStatus::Accept),
                        last_response_time: Some(start),
                    })
                    .collect(),
            },
        );
        Ok(id)
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, GatewayError> {
        self.maybe_delay_or_fail().await?;
        Ok(self.fixtures.lock().items.get(id).cloned())
    }

    async fn update_item(&self, id: &str, fields: UpdateFields) -> Result<(), GatewayError> {
        self.maybe_delay_or_fail().await?;
        let mut fixtures = self.fixtures.lock();
        fixtures.response_seq += 1;
        let response_seq = fixtures.response_seq;
        let item = fixtures
            .items
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("item {id}")))?;
        if let Some(start) = fields.start {
            item.start = start;
        }
        if let Some(end) = fields.end {
            item.end = end;
        }
        if let Some(title) = fields.title {
            item.subject = title;
        }
        let response_time = item.start + Duration::seconds(response_seq);
        for attendee in item.required_attendees.iter_mut() {
            attendee.last_response_time = Some(response_time);
        }
        Ok(())
    }

    async fn cancel_item(&self, id: &str, _body: &str) -> Result<(), GatewayError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_or_fail().await?;
        self.fixtures.lock().items.remove(id);
        Ok(())
    }

    async fn push_subscribe(
        &self,
        _callback_url: &str,
        _event_types: &[String],
    ) -> Result<(String, String), GatewayError> {
        self.maybe_delay_or_fail().await?;
        let mut fixtures = self.fixtures.lock();
        fixtures.next_id += 1;
        let subscription_id = format!("mock-sub-{}", fixtures.next_id);
        let watermark = format!("mock-watermark-{}", fixtures.next_id);
        Ok((subscription_id, watermark))
    }
}

pub fn shared_mock() -> Arc<MockExchangeGateway> {
    Arc::new(MockExchangeGateway::new())
}
