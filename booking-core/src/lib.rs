pub mod booking;
pub mod gateway;
pub mod policy;
pub mod recent_overlay;
pub mod room_registry;
pub mod service;
pub mod single_flight;
pub mod window_cache;

#[cfg(any(test, feature = "testing"))]
pub mod mock_gateway;

pub use booking::{AccessLevel, AccountEmail, Attendee, Booking, BookingStatus, RoomId};
pub use gateway::ExchangeGateway;
pub use policy::{can_book, PolicyDecision, PolicyInput, UserRoles};
pub use recent_overlay::RecentOverlay;
pub use room_registry::{AccessGrant, Room, RoomRegistry};
pub use service::{BookingService, BookingServiceConfig, CreateBookingInput, UpdateBookingInput};
pub use single_flight::SingleFlight;
pub use window_cache::{CacheSlot, WindowCache};

/// Default per-room cache slot cap. Not exposed as a config key, matching
/// the original's unconfigurable constant.
pub const DEFAULT_MAX_SLOTS_PER_ROOM: usize = 10;
