use sea_orm::DbErr;
use thiserror::Error;

/// Typed failure kinds for every core operation. No operation leaves partial
/// state behind on any of these; `Unavailable` is the only retryable kind.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("QR payload is not valid")]
    InvalidFormat,

    #[error("QR signature does not match")]
    InvalidSignature,

    #[error("QR code has expired")]
    Expired,

    #[error("attendance already recorded for this session")]
    AlreadyMarked,

    #[error(
        "scan location is {distance_m:.1} m from the venue, outside the allowed {radius_m:.0} m radius"
    )]
    OutOfRange { distance_m: f64, radius_m: f64 },

    #[error("{0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] DbErr),
}
