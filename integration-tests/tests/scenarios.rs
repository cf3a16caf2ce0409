//! Black-box tests driving `BookingService` across the `booking-core` crate
//! boundary, through `MockExchangeGateway` rather than any single module's
//! internals.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use booking_core::gateway::{FreeBusyEvent, Item, ItemAttendee};
use booking_core::mock_gateway::MockExchangeGateway;
use booking_core::{
    AccessLevel, AccountEmail, BookingService, BookingServiceConfig, CreateBookingInput, Room, RoomId,
    RoomRegistry, UserRoles,
};

fn msk(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> chrono::DateTime<chrono::FixedOffset> {
    shared::time::to_msk(Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
}

fn room(id: &str, access_level: AccessLevel) -> Room {
    Room {
        id: RoomId::from(id),
        resource_email: AccountEmail::from(format!("{id}@rooms.example.edu")),
        title: format!("Room {id}"),
        short_name: id.to_string(),
        capacity: Some(10),
        access_level,
        restrict_daytime: false,
    }
}

fn fast_config() -> BookingServiceConfig {
    BookingServiceConfig {
        confirmation_initial_delay: std::time::Duration::from_millis(5),
        confirmation_poll_interval: std::time::Duration::from_millis(5),
        confirmation_max_tries: 20,
        ..Default::default()
    }
}

fn service(rooms: Vec<Room>, gateway: Arc<MockExchangeGateway>) -> BookingService {
    let registry = Arc::new(RoomRegistry::new(rooms, HashMap::new()).unwrap());
    BookingService::new(registry, gateway, fast_config())
}

#[tokio::test]
async fn create_then_read_back_happy_path() {
    let gateway = Arc::new(MockExchangeGateway::new());
    let svc = service(vec![room("101", AccessLevel::None)], gateway.clone());

    let start = msk(2025, 3, 10, 9, 0);
    let end = msk(2025, 3, 10, 10, 0);
    let booking = svc
        .create(CreateBookingInput {
            room_id: RoomId::from("101"),
            start,
            end,
            title: "Sync".to_string(),
            organizer_email: AccountEmail::from("staffer@example.edu"),
            participants: vec![],
            user_roles: UserRoles {
                is_student: false,
                is_staff: true,
            },
            in_access_list: false,
        })
        .await
        .expect("booking should be created");

    assert_eq!(booking.room_id, RoomId::from("101"));
    assert_eq!(gateway.create_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_is_denied_by_policy_before_touching_the_gateway() {
    let gateway = Arc::new(MockExchangeGateway::new());
    let svc = service(vec![room("101", AccessLevel::Yellow)], gateway.clone());

    // A student requesting a 4-hour booking on a yellow room with no grant.
    let start = msk(2025, 3, 10, 9, 0);
    let end = msk(2025, 3, 10, 13, 0);
    let err = svc
        .create(CreateBookingInput {
            room_id: RoomId::from("101"),
            start,
            end,
            title: "Long meeting".to_string(),
            organizer_email: AccountEmail::from("student@example.edu"),
            participants: vec![],
            user_roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            in_access_list: false,
        })
        .await
        .expect_err("policy should deny this booking");

    assert!(matches!(err, shared::GatewayError::PolicyDenied(_)));
    assert_eq!(gateway.create_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_reads_of_the_same_window_hit_the_gateway_once() {
    let gateway = Arc::new(MockExchangeGateway::new());
    gateway.set_latency(std::time::Duration::from_millis(20));
    let svc = Arc::new(service(vec![room("101", AccessLevel::None)], gateway.clone()));

    let start = msk(2025, 3, 10, 0, 0);
    let end = msk(2025, 3, 11, 0, 0);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.bookings_for_rooms(&[RoomId::from("101")], start, end).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(gateway.calendar_view_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(gateway.free_busy_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn a_freshly_created_booking_is_visible_before_the_gateway_would_report_it() {
    let gateway = Arc::new(MockExchangeGateway::new());
    let svc = service(vec![room("101", AccessLevel::None)], gateway.clone());

    let start = msk(2025, 3, 10, 9, 0);
    let end = msk(2025, 3, 10, 10, 0);
    let booking = svc
        .create(CreateBookingInput {
            room_id: RoomId::from("101"),
            start,
            end,
            title: "Standup".to_string(),
            organizer_email: AccountEmail::from("staffer@example.edu"),
            participants: vec![],
            user_roles: UserRoles {
                is_student: false,
                is_staff: true,
            },
            in_access_list: false,
        })
        .await
        .unwrap();

    // Wipe the gateway's fixtures so a fresh fetch would see nothing: the
    // booking should still surface because it was created moments ago.
    gateway.seed_item(Item {
        id: "unrelated".to_string(),
        subject: "noise".to_string(),
        start: msk(2030, 1, 1, 0, 0),
        end: msk(2030, 1, 1, 1, 0),
        required_attendees: vec![],
    });

    let results = svc
        .bookings_for_rooms(&[RoomId::from("101")], start - Duration::hours(1), end + Duration::hours(1))
        .await
        .unwrap();

    assert!(results.iter().any(|b| b.outlook_id == booking.outlook_id));
}

#[tokio::test]
async fn a_canceled_booking_is_omitted_even_though_the_gateway_still_reports_it() {
    let gateway = Arc::new(MockExchangeGateway::new());
    let svc = service(vec![room("101", AccessLevel::None)], gateway.clone());

    let start = msk(2025, 3, 10, 9, 0);
    let end = msk(2025, 3, 10, 10, 0);
    gateway.seed_item(Item {
        id: "ghost-1".to_string(),
        subject: "Ghost booking (organizer@innopolis.university)".to_string(),
        start,
        end,
        required_attendees: vec![ItemAttendee {
            email: AccountEmail::from("101@rooms.example.edu"),
            status: Some(booking_core::BookingStatus::Accept),
            last_response_time: Some(start),
        }],
    });

    let cancelled = svc.cancel("ghost-1", &AccountEmail::from("someone@example.edu")).await.unwrap();
    assert!(cancelled);

    let results = svc
        .bookings_for_rooms(&[RoomId::from("101")], start, end)
        .await
        .unwrap();
    assert!(results.iter().all(|b| b.outlook_id.as_deref() != Some("ghost-1")));
}

#[tokio::test]
async fn free_busy_events_recover_the_organizer_from_the_location_field() {
    let gateway = Arc::new(MockExchangeGateway::new());
    let r = room("101", AccessLevel::None);
    let svc = service(vec![r.clone()], gateway.clone());

    gateway.seed_busy(
        r.resource_email.clone(),
        vec![FreeBusyEvent {
            start: msk(2025, 3, 10, 9, 0),
            end: msk(2025, 3, 10, 10, 0),
            subject: Some("Blocked".to_string()),
            location: Some("Room 101 (organizer@innopolis.university)".to_string()),
        }],
    );

    let results = svc
        .bookings_for_rooms(&[RoomId::from("101")], msk(2025, 3, 10, 0, 0), msk(2025, 3, 11, 0, 0))
        .await
        .unwrap();

    let attendees = results
        .iter()
        .find(|b| b.start == msk(2025, 3, 10, 9, 0))
        .and_then(|b| b.attendees.as_ref())
        .expect("free/busy booking should carry a recovered organizer attendee");
    assert!(attendees.iter().any(|a| a.email.as_str() == "organizer@innopolis.university"));
}
