//! JWT verification and the user-directory seam.
//! Deliberately minimal: a working HS256 decode path and a trait boundary,
//! not a JWKS client — the directory is treated as an external
//! collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use booking_core::AccountEmail;
use shared::GatewayError;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

pub struct JwtDecoder {
    decoding_key: DecodingKey,
}

impl JwtDecoder {
    pub fn new(hmac_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(hmac_secret.as_bytes()),
        }
    }

    pub fn decode(&self, token: &str) -> Result<Claims, GatewayError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| GatewayError::Validation(format!("invalid token: {err}")))
    }
}

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub email: AccountEmail,
    pub is_staff: bool,
    pub is_student: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_email(&self, email: &AccountEmail) -> Result<Option<UserInfo>, GatewayError>;
}

/// Minimal directory backed by `Settings.accounts.staff`: every email in
/// that list is staff, everything else is treated as a student. Real
/// directory lookups (`accounts`/`my_uni` integration) are out of scope.
pub struct StaticUserDirectory {
    staff: HashMap<AccountEmail, ()>,
}

impl StaticUserDirectory {
    pub fn new(staff_emails: impl IntoIterator<Item = AccountEmail>) -> Self {
        Self {
            staff: staff_emails.into_iter().map(|e| (e, ())).collect(),
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn get_user_by_email(&self, email: &AccountEmail) -> Result<Option<UserInfo>, GatewayError> {
        Ok(Some(UserInfo {
            email: email.clone(),
            is_staff: self.staff.contains_key(email),
            is_student: !self.staff.contains_key(email),
        }))
    }
}
