//! Signed, expiring QR session tokens.
//!
//! A token is the one wire artifact of the system: the JSON payload embedded
//! in the scannable code. Signing uses HMAC-SHA256 over a canonical string of
//! the token's fields; verification is stateless and recomputes the MAC from
//! the token's own fields, so it needs only the shared secret and the clock.

use chrono::{DateTime, Utc};
use common::config::AppConfig;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Circular acceptance zone snapshotted into the token at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

/// The QR payload. Field order in the serialized form is irrelevant; scanning
/// clients parse it as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrToken {
    pub session_id: i64,
    pub course_id: i64,
    pub faculty_id: i64,
    /// Milliseconds since the Unix epoch.
    pub issued_at: i64,
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence: Option<Geofence>,
    /// Hex-encoded HMAC-SHA256 over the other fields.
    pub signature: String,
}

impl QrToken {
    pub fn from_payload(payload: &str) -> Result<Self, AppError> {
        serde_json::from_str(payload).map_err(|_| AppError::InvalidFormat)
    }

    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).expect("token serialization")
    }
}

/// Issues and verifies tokens with a server-held secret. Constructed from
/// configuration at startup; tests construct it directly with a fixed key.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(AppConfig::global().qr_secret.as_bytes())
    }

    pub fn issue(
        &self,
        session_id: i64,
        course_id: i64,
        faculty_id: i64,
        geofence: Option<Geofence>,
        validity_seconds: i64,
        now: DateTime<Utc>,
    ) -> QrToken {
        let issued_at = now.timestamp_millis();
        let expires_at = issued_at + validity_seconds * 1000;
        let signature = self.sign(
            session_id,
            course_id,
            faculty_id,
            issued_at,
            expires_at,
            geofence,
        );

        QrToken {
            session_id,
            course_id,
            faculty_id,
            issued_at,
            expires_at,
            geofence,
            signature,
        }
    }

    /// Checks the MAC, then the expiry, in that order. The two failure kinds
    /// stay distinct so callers can report a precise reason. Once `now`
    /// reaches `expires_at` the token never becomes valid again.
    pub fn verify(&self, token: &QrToken, now: DateTime<Utc>) -> Result<(), AppError> {
        let message = Self::message(
            token.session_id,
            token.course_id,
            token.faculty_id,
            token.issued_at,
            token.expires_at,
            token.geofence,
        );
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(message.as_bytes());

        let claimed = hex::decode(&token.signature).map_err(|_| AppError::InvalidSignature)?;
        mac.verify_slice(&claimed)
            .map_err(|_| AppError::InvalidSignature)?;

        if now.timestamp_millis() >= token.expires_at {
            return Err(AppError::Expired);
        }

        Ok(())
    }

    fn sign(
        &self,
        session_id: i64,
        course_id: i64,
        faculty_id: i64,
        issued_at: i64,
        expires_at: i64,
        geofence: Option<Geofence>,
    ) -> String {
        let message = Self::message(
            session_id,
            course_id,
            faculty_id,
            issued_at,
            expires_at,
            geofence,
        );
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn message(
        session_id: i64,
        course_id: i64,
        faculty_id: i64,
        issued_at: i64,
        expires_at: i64,
        geofence: Option<Geofence>,
    ) -> String {
        match geofence {
            Some(g) => format!(
                "{session_id}.{course_id}.{faculty_id}.{issued_at}.{expires_at}.{}.{}.{}",
                g.lat, g.lon, g.radius_m
            ),
            None => format!("{session_id}.{course_id}.{faculty_id}.{issued_at}.{expires_at}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn signer() -> TokenSigner {
        TokenSigner::new(b"0123456789abcdef0123456789abcdef")
    }

    fn fence() -> Option<Geofence> {
        Some(Geofence {
            lat: 12.0,
            lon: 77.0,
            radius_m: 50.0,
        })
    }

    #[test]
    fn test_token_valid_immediately_after_issue() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(1, 2, 3, fence(), 300, now);
        assert!(signer().verify(&token, now).is_ok());
    }

    #[test]
    fn test_token_expires_at_boundary_and_stays_expired() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(1, 2, 3, fence(), 300, now);

        let just_before = now + Duration::milliseconds(299_999);
        assert!(signer().verify(&token, just_before).is_ok());

        let at_expiry = now + Duration::seconds(300);
        assert!(matches!(
            signer().verify(&token, at_expiry),
            Err(AppError::Expired)
        ));

        // Monotonic: once invalid, never valid again.
        let nine_minutes = now + Duration::minutes(9);
        assert!(matches!(
            signer().verify(&token, nine_minutes),
            Err(AppError::Expired)
        ));
    }

    #[test]
    fn test_tampering_any_field_breaks_signature() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(1, 2, 3, fence(), 300, now);

        let mut t = token.clone();
        t.session_id = 99;
        assert!(matches!(
            signer().verify(&t, now),
            Err(AppError::InvalidSignature)
        ));

        let mut t = token.clone();
        t.issued_at += 1;
        assert!(matches!(
            signer().verify(&t, now),
            Err(AppError::InvalidSignature)
        ));

        let mut t = token.clone();
        t.expires_at += 60_000;
        assert!(matches!(
            signer().verify(&t, now),
            Err(AppError::InvalidSignature)
        ));

        let mut t = token.clone();
        t.geofence = Some(Geofence {
            lat: 12.0,
            lon: 77.0,
            radius_m: 5000.0,
        });
        assert!(matches!(
            signer().verify(&t, now),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(1, 2, 3, fence(), 300, now);
        let other = TokenSigner::new(b"another-secret-entirely");
        assert!(matches!(
            other.verify(&token, now),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_payload_round_trip() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(7, 8, 9, fence(), 120, now);
        let payload = token.to_payload();
        let parsed = QrToken::from_payload(&payload).unwrap();
        assert_eq!(parsed, token);
        assert!(signer().verify(&parsed, now).is_ok());
    }

    #[test]
    fn test_malformed_payload_is_invalid_format() {
        assert!(matches!(
            QrToken::from_payload("not json at all"),
            Err(AppError::InvalidFormat)
        ));
        assert!(matches!(
            QrToken::from_payload(r#"{"session_id": 1}"#),
            Err(AppError::InvalidFormat)
        ));
    }

    #[test]
    fn test_signature_is_fixed_length_mac() {
        let now = Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap();
        let token = signer().issue(1, 2, 3, None, 300, now);
        // 32-byte HMAC-SHA256, hex-encoded.
        assert_eq!(token.signature.len(), 64);
        assert!(token.signature.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
