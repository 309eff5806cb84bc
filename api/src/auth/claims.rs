use serde::{Deserialize, Serialize};

/// Verified principal identity, as asserted by the identity provider's
/// bearer token. Core operations only ever see the `sub` id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);
