//! Placeholder `ExchangeGateway` adapter. The real implementation would
//! marshal EWS SOAP calls (out of scope per the core design); this stub
//! lets the composition root build and run end-to-end, always reporting
//! the backend as unavailable rather than silently fabricating data.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use booking_core::gateway::{ExchangeGateway, FreeBusyEvent, Item, UpdateFields};
use booking_core::AccountEmail;
use shared::GatewayError;

pub struct UnimplementedExchangeGateway;

#[async_trait]
impl ExchangeGateway for UnimplementedExchangeGateway {
    async fn calendar_view(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<Item>, GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS calendar_view adapter is not wired up".to_string(),
        ))
    }

    async fn free_busy(
        &self,
        _accounts: &[AccountEmail],
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<HashMap<AccountEmail, Vec<FreeBusyEvent>>, GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS free_busy adapter is not wired up".to_string(),
        ))
    }

    async fn create_item(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
        _subject: &str,
        _body: &str,
        _location: &str,
        _resources: &[AccountEmail],
        _required_attendees: &[AccountEmail],
    ) -> Result<String, GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS create_item adapter is not wired up".to_string(),
        ))
    }

    async fn get_item(&self, _id: &str) -> Result<Option<Item>, GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS get_item adapter is not wired up".to_string(),
        ))
    }

    async fn update_item(&self, _id: &str, _fields: UpdateFields) -> Result<(), GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS update_item adapter is not wired up".to_string(),
        ))
    }

    async fn cancel_item(&self, _id: &str, _body: &str) -> Result<(), GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS cancel_item adapter is not wired up".to_string(),
        ))
    }

    async fn push_subscribe(
        &self,
        _callback_url: &str,
        _event_types: &[String],
    ) -> Result<(String, String), GatewayError> {
        Err(GatewayError::GatewayUnavailable(
            "EWS push_subscribe adapter is not wired up".to_string(),
        ))
    }
}
