//! Bearer tokens: HMAC-SHA256 signed claims with an expiry.
//!
//! Wire form is `base64url(claims_json) "." base64url(mac)`, both without
//! padding. The token is opaque to clients.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub username: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

pub struct TokenSigner {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            key: secret.to_vec(),
            ttl,
        }
    }

    /// Signer with a random 32-byte key; tokens die with the process.
    pub fn ephemeral(ttl: Duration) -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(&key, ttl)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    pub fn issue(&self, sub: &str, username: &str) -> Result<String, TokenError> {
        self.issue_at(sub, username, Utc::now())
    }

    pub fn issue_at(&self, sub: &str, username: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let claims = Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        // Claims is plain strings and integers
        let body = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(body);
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{sig}"))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, sig) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        let body = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&body).map_err(|_| TokenError::Malformed)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"unit-test-secret", Duration::hours(24))
    }

    #[test]
    fn issued_token_verifies() {
        let s = signer();
        let token = s.issue("id-1", "holmes").unwrap();
        let claims = s.verify(&token).unwrap();
        assert_eq!(claims.sub, "id-1");
        assert_eq!(claims.username, "holmes");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expires_after_ttl() {
        let s = signer();
        let t0 = Utc::now();
        let token = s.issue_at("id-1", "holmes", t0).unwrap();
        assert!(s.verify_at(&token, t0 + Duration::hours(23)).is_ok());
        assert_eq!(
            s.verify_at(&token, t0 + Duration::hours(24)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn foreign_key_is_rejected() {
        let token = signer().issue("id-1", "holmes").unwrap();
        let other = TokenSigner::new(b"another-secret", Duration::hours(24));
        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let s = signer();
        let token = s.issue("id-1", "holmes").unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = Claims {
            sub: "id-2".into(),
            username: "moriarty".into(),
            iat: 0,
            exp: i64::MAX,
        };
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap()),
            sig
        );
        assert_eq!(s.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn oversized_lifetime_is_an_error() {
        let s = TokenSigner::new(b"k", Duration::hours(i64::from(u32::MAX)));
        assert_eq!(s.issue("id-1", "holmes"), Err(TokenError::LifetimeOutOfRange));
    }

    #[test]
    fn garbage_is_malformed() {
        let s = signer();
        assert_eq!(s.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(s.verify("abc.!!!"), Err(TokenError::Malformed));
    }
}
