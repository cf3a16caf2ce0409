use std::sync::Arc;

use booking_core::{BookingService, RoomRegistry};
use shared::config::Settings;

use crate::auth::{JwtDecoder, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<BookingService>,
    pub registry: Arc<RoomRegistry>,
    pub settings: Arc<Settings>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub jwt_decoder: Arc<JwtDecoder>,
}
