//! Pure booking policy decision function. Mirrors
//! `examples/original_source/src/modules/rules/service.py::can_book` and
//! `_check_rules`/`_is_restricted_time` one-to-one, including the exact
//! cascade order — do not reorder these branches, later branches assume
//! earlier ones have already returned.

use std::borrow::Cow;

use chrono::{DateTime, Duration, FixedOffset};

use crate::booking::AccessLevel;
use crate::room_registry::Room;

const MAX_UNRESTRICTED_HOURS: i64 = 3;
const MAX_FUTURE_DAYS: i64 = 14;
const SPECIAL_CAP_ROOM_ID: &str = "309A";

#[derive(Debug, Clone, Copy, Default)]
pub struct UserRoles {
    pub is_student: bool,
    pub is_staff: bool,
}

pub struct PolicyInput<'a> {
    pub roles: UserRoles,
    pub room: &'a Room,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub now: DateTime<FixedOffset>,
    pub in_access_list: bool,
    pub is_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Cow<'static, str>,
}

impl PolicyDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: Cow::Borrowed(""),
        }
    }

    fn deny(reason: &'static str) -> Self {
        Self {
            allowed: false,
            reason: Cow::Borrowed(reason),
        }
    }
}

/// Pure function: same inputs always yield the same decision (invariant 7).
pub fn can_book(input: PolicyInput<'_>) -> PolicyDecision {
    if input.start >= input.end {
        return PolicyDecision::deny("Start must be before end.");
    }
    if input.end < input.now || (input.start < input.now && !input.is_update) {
        return PolicyDecision::deny("Booking cannot be in the past.");
    }
    if (input.start - input.now).abs() > Duration::days(MAX_FUTURE_DAYS) {
        return PolicyDecision::deny("Booking cannot be more than two weeks in the future.");
    }

    let roles = input.roles;
    let room = input.room;
    let duration = input.end - input.start;
    let longer_than_cap = duration > Duration::hours(MAX_UNRESTRICTED_HOURS);

    if !roles.is_student && !roles.is_staff {
        return PolicyDecision::deny("You must be a student or staff member to book a room.");
    }

    if room.id.as_str() == SPECIAL_CAP_ROOM_ID && input.in_access_list && longer_than_cap {
        return PolicyDecision::deny("309A can't be booked for more than 3 hours.");
    }

    if roles.is_staff {
        if matches!(room.access_level, AccessLevel::Yellow | AccessLevel::Red) {
            return PolicyDecision::allow();
        }
        if input.in_access_list {
            return PolicyDecision::allow();
        }
        return PolicyDecision::deny("You don't have the rights to book this room.");
    }

    if roles.is_student && longer_than_cap {
        if input.in_access_list {
            return PolicyDecision::allow();
        }
        if room.access_level == AccessLevel::Yellow {
            return PolicyDecision::deny("Students can't create booking for more than 3 hours.");
        }
        // Falls through: a non-yellow room without an access grant is
        // resolved by the rules below (usually the final fallthrough deny).
    }

    if input.in_access_list {
        return PolicyDecision::allow();
    }

    if roles.is_student && room.access_level == AccessLevel::Red {
        return PolicyDecision::deny("Students can't book rooms with a red access level.");
    }

    if room.access_level == AccessLevel::Yellow {
        if !room.restrict_daytime {
            return PolicyDecision::allow();
        }
        return if shared::time::is_restricted_daytime(input.start, input.end) {
            PolicyDecision::deny(
                "This room can only be booked outside working hours (Mon-Fri 08:00-19:00 MSK).",
            )
        } else {
            PolicyDecision::allow()
        };
    }

    PolicyDecision::deny("You don't have the rights to book this room.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{AccountEmail, RoomId};
    use chrono::TimeZone;

    fn msk(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        shared::time::msk_offset()
            .with_ymd_and_hms(y, m, d, h, mi, 0)
            .single()
            .unwrap()
    }

    fn room(id: &str, access_level: AccessLevel, restrict_daytime: bool) -> Room {
        Room {
            id: RoomId::from(id),
            resource_email: AccountEmail::from(format!("{id}@rooms.example.edu")),
            title: id.to_string(),
            short_name: id.to_string(),
            capacity: None,
            access_level,
            restrict_daytime,
        }
    }

    #[test]
    fn s1_student_long_booking_yellow_room() {
        let room = room("101", AccessLevel::Yellow, false);
        let start = msk(2025, 3, 10, 9, 0);
        let end = msk(2025, 3, 10, 13, 0);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        });
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Students can't create booking for more than 3 hours.");
    }

    #[test]
    fn s2_309a_special_cap() {
        let room = room("309A", AccessLevel::Special, false);
        let start = msk(2025, 3, 10, 9, 0);
        let end = start + Duration::hours(3) + Duration::minutes(1);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: false,
                is_staff: true,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: true,
            is_update: false,
        });
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "309A can't be booked for more than 3 hours.");
    }

    #[test]
    fn s3_restricted_daytime_lecture_room() {
        let room = room("201", AccessLevel::Yellow, true);
        // Tuesday 10:00-11:00
        let start = msk(2025, 3, 11, 10, 0);
        let end = msk(2025, 3, 11, 11, 0);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        });
        assert!(!decision.allowed);

        // Saturday 10:00-11:00
        let start = msk(2025, 3, 15, 10, 0);
        let end = msk(2025, 3, 15, 11, 0);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        });
        assert!(decision.allowed);
        assert_eq!(decision.reason, "");
    }

    #[test]
    fn rejects_start_after_end() {
        let room = room("101", AccessLevel::Yellow, false);
        let start = msk(2025, 3, 10, 13, 0);
        let end = msk(2025, 3, 10, 9, 0);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        });
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Start must be before end.");
    }

    #[test]
    fn rejects_no_role() {
        let room = room("101", AccessLevel::Yellow, false);
        let start = msk(2025, 3, 10, 9, 0);
        let end = msk(2025, 3, 10, 10, 0);
        let decision = can_book(PolicyInput {
            roles: UserRoles {
                is_student: false,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        });
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "You must be a student or staff member to book a room.");
    }

    #[test]
    fn is_pure() {
        let room = room("101", AccessLevel::Yellow, false);
        let start = msk(2025, 3, 10, 9, 0);
        let end = msk(2025, 3, 10, 10, 0);
        let make_input = || PolicyInput {
            roles: UserRoles {
                is_student: true,
                is_staff: false,
            },
            room: &room,
            start,
            end,
            now: start - Duration::days(1),
            in_access_list: false,
            is_update: false,
        };
        assert_eq!(can_book(make_input()), can_book(make_input()));
    }
}
