//! Static room table, built once at startup and never mutated — grounded on
//! `examples/original_source/src/modules/rooms/repository.py::RoomsRepository`.

use std::collections::HashMap;

use shared::GatewayError;

use crate::booking::{AccessLevel, AccountEmail, RoomId};

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub resource_email: AccountEmail,
    pub title: String,
    pub short_name: String,
    pub capacity: Option<u32>,
    pub access_level: AccessLevel,
    pub restrict_daytime: bool,
}

#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub room_id: RoomId,
    pub user_email: AccountEmail,
    pub reason: String,
}

pub struct RoomRegistry {
    rooms: Vec<Room>,
    by_id: HashMap<RoomId, usize>,
    by_email: HashMap<AccountEmail, usize>,
    access_list: HashMap<RoomId, Vec<AccessGrant>>,
}

impl RoomRegistry {
    pub fn new(
        rooms: Vec<Room>,
        access_list: HashMap<RoomId, Vec<AccessGrant>>,
    ) -> Result<Self, GatewayError> {
        let mut by_id = HashMap::with_capacity(rooms.len());
        let mut by_email = HashMap::with_capacity(rooms.len());
        for (idx, room) in rooms.iter().enumerate() {
            by_id.insert(room.id.clone(), idx);
            by_email.insert(room.resource_email.clone(), idx);
        }
        for room_id in access_list.keys() {
            if !by_id.contains_key(room_id) {
                return Err(GatewayError::Validation(format!(
                    "access grant references unknown room {room_id}"
                )));
            }
        }
        Ok(Self {
            rooms,
            by_id,
            by_email,
            access_list,
        })
    }

    pub fn all(&self, include_red: bool) -> Vec<&Room> {
        self.rooms
            .iter()
            .filter(|r| include_red || r.access_level != AccessLevel::Red)
            .collect()
    }

    pub fn by_id(&self, id: &RoomId) -> Option<&Room> {
        self.by_id.get(id).map(|&idx| &self.rooms[idx])
    }

    /// Preserves order; unknown ids map to `None`.
    pub fn by_ids(&self, ids: &[RoomId]) -> Vec<Option<&Room>> {
        ids.iter().map(|id| self.by_id(id)).collect()
    }

    pub fn by_email(&self, email: &AccountEmail) -> Option<&Room> {
        self.by_email.get(email).map(|&idx| &self.rooms[idx])
    }

    /// `{room_id -> reason}` for every grant belonging to this user.
    pub fn grants_for_user(&self, email: &AccountEmail) -> HashMap<RoomId, String> {
        self.access_list
            .iter()
            .filter_map(|(room_id, grants)| {
                grants
                    .iter()
                    .find(|g| &g.user_email == email)
                    .map(|g| (room_id.clone(), g.reason.clone()))
            })
            .collect()
    }

    pub fn user_has_access(&self, email: &AccountEmail, room_id: &RoomId) -> bool {
        self.access_list
            .get(room_id)
            .is_some_and(|grants| grants.iter().any(|g| &g.user_email == email))
    }
}
