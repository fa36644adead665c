//! Session token claims
//!
//! Tokens are issued and signed by the backend. The client only reads the
//! payload to learn who is logged in and when the session ends; signatures
//! are checked server-side on every protected API call, never here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::core::constants::TOKEN_REFRESH_THRESHOLD_SECS;

/// Token decoding errors
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Invalid token header: {0}")]
    InvalidHeader(String),

    #[error("Invalid token payload encoding: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Invalid token claims: {0}")]
    InvalidClaims(#[from] serde_json::Error),
}

impl From<jsonwebtoken::errors::Error> for ClaimsError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ClaimsError::InvalidHeader(err.to_string())
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: i64,
    /// Username
    pub username: String,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// A token is expired once its `exp` lies strictly before `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp < now
    }

    /// Check if the token expires within the refresh threshold
    pub fn is_expiring_soon(&self, now: i64) -> bool {
        self.exp.saturating_sub(now) <= TOKEN_REFRESH_THRESHOLD_SECS
    }
}

/// Decode the claims of a session token without verifying its signature
pub fn decode_claims(token: &str) -> Result<Claims, ClaimsError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClaimsError::Malformed);
    };

    jsonwebtoken::decode_header(token)?;

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_decode_valid_token() {
        let token = valid_token(42, "alice");

        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.id, 42);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_decode_ignores_signature() {
        let token = valid_token(7, "bob");
        let (head, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{head}.not-a-real-signature");

        let claims = decode_claims(&forged).unwrap();
        assert_eq!(claims.username, "bob");
    }

    #[test]
    fn test_decode_does_not_reject_expired() {
        let token = token_with_ttl(1, "carol", -60);

        let claims = decode_claims(&token).unwrap();
        assert!(claims.is_expired(Utc::now().timestamp()));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_claims("not-a-token"),
            Err(ClaimsError::Malformed)
        ));
        assert!(matches!(decode_claims("a.b.c.d"), Err(ClaimsError::Malformed)));
        assert!(decode_claims("a.b.c").is_err());
    }

    #[test]
    fn test_decode_missing_claims() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let token = format!("{header}.{payload}.sig");

        assert!(matches!(
            decode_claims(&token),
            Err(ClaimsError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_iat_is_optional() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"id":3,"username":"dave","exp":100}"#);
        let token = format!("{header}.{payload}.sig");

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.iat, 0);
        assert_eq!(claims.exp, 100);
    }

    #[test]
    fn test_expiry_boundaries() {
        let claims = Claims {
            id: 1,
            username: "eve".to_string(),
            iat: 0,
            exp: 1_000,
        };

        assert!(!claims.is_expired(999));
        assert!(!claims.is_expired(1_000));
        assert!(claims.is_expired(1_001));
    }

    #[test]
    fn test_expiring_soon() {
        let claims = Claims {
            id: 1,
            username: "eve".to_string(),
            iat: 0,
            exp: 10_000,
        };

        assert!(!claims.is_expiring_soon(10_000 - TOKEN_REFRESH_THRESHOLD_SECS - 1));
        assert!(claims.is_expiring_soon(10_000 - TOKEN_REFRESH_THRESHOLD_SECS));
        assert!(claims.is_expiring_soon(20_000));
    }

    #[test]
    fn test_expiring_soon_extreme_exp() {
        let mut claims = Claims {
            id: 1,
            username: "eve".to_string(),
            iat: 0,
            exp: i64::MIN,
        };
        assert!(claims.is_expiring_soon(1_700_000_000));

        claims.exp = i64::MAX;
        assert!(!claims.is_expiring_soon(-1_700_000_000));
    }
}
