//! Signed session tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
}

/// Claims carried by a session token. The subscription flag is computed when
/// the token is issued or refreshed and read by the route guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub subscription_valid: bool,
    pub subscription_message: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Identity and subscription state to embed in a new token.
#[derive(Debug, Clone)]
pub struct SessionSubject {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub subscription_valid: bool,
    pub subscription_message: Option<String>,
}

pub struct JwtService {
    secret: String,
    session_ttl_secs: i64,
}

impl JwtService {
    pub fn new(secret: String, session_ttl_secs: i64) -> Self {
        Self {
            secret,
            session_ttl_secs,
        }
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl_secs
    }

    pub fn issue(&self, subject: &SessionSubject) -> Result<(String, SessionClaims), JwtError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: subject.user_id.clone(),
            name: subject.name.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            subscription_valid: subject.subscription_valid,
            subscription_message: subject.subscription_message.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.session_ttl_secs)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::CreationError(e.to_string()))?;
        Ok((token, claims))
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| JwtError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SessionSubject {
        SessionSubject {
            user_id: "8d5b3c3e-7c0b-4f59-a0d4-3b1f0f4a2b11".into(),
            name: "Dana Reyes".into(),
            email: "dana@clinic.test".into(),
            role: "clinic_admin".into(),
            subscription_valid: false,
            subscription_message: Some("Subscription inactive".into()),
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let svc = JwtService::new("secret".into(), 3600);
        let (token, issued) = svc.issue(&subject()).unwrap();
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims, issued);
        assert!(!claims.subscription_valid);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let (token, _) = JwtService::new("a".into(), 60).issue(&subject()).unwrap();
        assert!(JwtService::new("b".into(), 60).validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let svc = JwtService::new("secret".into(), -3600);
        let (token, _) = svc.issue(&subject()).unwrap();
        assert!(svc.validate(&token).is_err());
    }
}
