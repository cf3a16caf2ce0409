use std::collections::HashMap;
use std::sync::Arc;

use booking_core::{
    AccessGrant, AccessLevel, AccountEmail, BookingService, BookingServiceConfig, Room, RoomId, RoomRegistry,
};
use gateway_http::auth::{JwtDecoder, StaticUserDirectory};
use gateway_http::exchange_stub::UnimplementedExchangeGateway;
use gateway_http::{create_router, middleware, AppState};
use shared::config::Settings;

fn build_registry(settings: &Settings) -> anyhow::Result<Arc<RoomRegistry>> {
    let rooms: Vec<Room> = settings
        .rooms
        .iter()
        .map(|r| Room {
            id: RoomId::from(r.id.clone()),
            resource_email: AccountEmail::from(r.resource_email.clone()),
            title: r.title.clone(),
            short_name: r.short_name.clone(),
            capacity: r.capacity,
            access_level: AccessLevel::from_config_str(r.access_level.as_deref()),
            restrict_daytime: r.restrict_daytime,
        })
        .collect();

    let mut access_list: HashMap<RoomId, Vec<AccessGrant>> = HashMap::new();
    for (room_id, grants) in &settings.access_list {
        let room_id = RoomId::from(room_id.clone());
        let grants = grants
            .iter()
            .map(|g| AccessGrant {
                room_id: room_id.clone(),
                user_email: AccountEmail::from(g.user_email.clone()),
                reason: g.reason.clone(),
            })
            .collect();
        access_list.insert(room_id, grants);
    }

    Ok(Arc::new(RoomRegistry::new(rooms, access_list)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let settings = Arc::new(Settings::from_yaml_file(&config_path)?);

    shared::logger::init_logger(settings.environment != "development");

    let registry = build_registry(&settings)?;

    let booking_service = Arc::new(BookingService::new(
        registry.clone(),
        Arc::new(UnimplementedExchangeGateway),
        BookingServiceConfig {
            ttl_calendar_view: std::time::Duration::from_secs(settings.ttl_bookings_from_account_calendar),
            ttl_busy_info: std::time::Duration::from_secs(settings.ttl_bookings_from_busy_info),
            recently_ttl: std::time::Duration::from_secs(settings.recently_canceled_booking_ttl_sec),
            ..Default::default()
        },
    ));

    let user_directory = Arc::new(StaticUserDirectory::new(
        settings.accounts.staff.iter().map(|e| AccountEmail::from(e.clone())),
    ));

    let state = AppState {
        booking_service,
        registry,
        settings: settings.clone(),
        user_directory,
        jwt_decoder: Arc::new(JwtDecoder::new(settings.api_key.expose())),
    };

    let router = middleware::with_ambient_layers(create_router(state), &settings.cors_allow_origin_regex);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("room booking gateway listening on 0.0.0.0:8080");
    axum::serve(listener, router).await?;
    Ok(())
}
