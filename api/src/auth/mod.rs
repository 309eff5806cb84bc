pub mod claims;
pub mod extractors;
pub mod middleware;

pub use claims::{AuthUser, Claims};

use chrono::{Duration, Utc};
use common::config::AppConfig;
use jsonwebtoken::{EncodingKey, Header, encode};

/// Generates a JWT and its expiry timestamp for a given principal.
///
/// In production the bearer token comes from the external identity provider;
/// this helper exists for development tooling and the integration tests.
pub fn generate_jwt(principal_id: i64, email: &str) -> (String, String) {
    let cfg = AppConfig::global();

    let expiry = Utc::now() + Duration::minutes(60);
    let exp_timestamp = expiry.timestamp() as usize;

    let claims = Claims {
        sub: principal_id,
        email: email.to_owned(),
        exp: exp_timestamp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("Token encoding failed");

    (token, expiry.to_rfc3339())
}
