// ============================================================================
// Clinic Core - Authentication Service
// File: crates/clinic-core/src/services/auth_service.rs
// ============================================================================
//! Login, session refresh and the subscription-validity check attached to
//! every session.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use clinic_security::jwt::SessionSubject;
use clinic_security::{JwtService, PasswordService, SessionClaims};
use clinic_shared::utils::mask_email;

use crate::domain::User;
use crate::error::DomainError;
use crate::repositories::{SubscriptionRepository, UserRepository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_valid: bool,
    pub message: String,
}

impl SubscriptionStatus {
    fn valid(message: &str) -> Self {
        Self {
            is_valid: true,
            message: message.to_string(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub clinic_id: Option<Uuid>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            clinic_id: user.clinic_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub token: String,
    pub expires_at: i64,
    pub user: UserInfo,
    pub subscription: SubscriptionStatus,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            subscriptions,
            jwt,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionResult, DomainError> {
        info!(email = %mask_email(email), "Login attempt");

        // 1. Find user by email
        let user = self.users.find_by_email(email.trim()).await?.ok_or_else(|| {
            warn!(email = %mask_email(email), "Login failed: unknown email");
            DomainError::InvalidCredentials
        })?;

        // 2. Verify password
        let valid = PasswordService::verify(password, &user.password_hash)
            .map_err(|_| DomainError::InvalidCredentials)?;
        if !valid {
            warn!(email = %mask_email(email), "Login failed: invalid password");
            return Err(DomainError::InvalidCredentials);
        }

        // 3. Issue session
        let session = self.issue_session(&user).await?;
        info!(user_id = %user.id, subscription_valid = session.subscription.is_valid, "Login successful");
        Ok(session)
    }

    /// Re-reads the user and recomputes the subscription flag.
    pub async fn refresh(&self, claims: &SessionClaims) -> Result<SessionResult, DomainError> {
        let user = self.user_from_claims(claims).await?;
        self.issue_session(&user).await
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, DomainError> {
        self.jwt
            .validate(token)
            .map_err(|e| DomainError::InvalidToken(e.to_string()))
    }

    pub async fn user_from_claims(&self, claims: &SessionClaims) -> Result<User, DomainError> {
        let id = Uuid::parse_str(&claims.sub).map_err(|e| DomainError::InvalidToken(e.to_string()))?;
        self.users.find_by_id(&id).await?.ok_or(DomainError::UserNotFound)
    }

    /// Admins and users without a clinic are always valid; everyone else
    /// follows the clinic's most recent subscription row.
    pub async fn check_subscription(&self, user: &User) -> Result<SubscriptionStatus, DomainError> {
        if user.is_admin() {
            return Ok(SubscriptionStatus::valid("Admin user - no subscription required"));
        }
        let Some(clinic_id) = user.clinic_id else {
            return Ok(SubscriptionStatus::valid("No clinic restriction"));
        };
        let status = match self.subscriptions.find_latest_by_clinic(&clinic_id).await? {
            None => SubscriptionStatus::invalid("No subscription found for this clinic"),
            Some(tier) if tier.is_active => SubscriptionStatus::valid("Subscription is active"),
            Some(_) => SubscriptionStatus::invalid("Subscription is inactive"),
        };
        Ok(status)
    }

    async fn issue_session(&self, user: &User) -> Result<SessionResult, DomainError> {
        let subscription = self.check_subscription(user).await?;
        let subject = SessionSubject {
            user_id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            subscription_valid: subscription.is_valid,
            subscription_message: Some(subscription.message.clone()),
        };
        let (token, claims) = self
            .jwt
            .issue(&subject)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;
        Ok(SessionResult {
            token,
            expires_at: claims.exp,
            user: UserInfo::from(user),
            subscription,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubscriptionTier, UserRole};
    use crate::repositories::InMemoryStore;
    use chrono::Utc;

    async fn setup(role: UserRole, clinic: Option<Uuid>) -> (Arc<InMemoryStore>, AuthService, User) {
        let store = Arc::new(InMemoryStore::new());
        let hash = PasswordService::hash("Tangerine-Violin-Orbit-77").unwrap();
        let user = User::new("Dana Reyes", "dana@sunrise.test", None, role, hash, clinic).unwrap();
        UserRepository::create(store.as_ref(), &user).await.unwrap();
        let svc = AuthService::new(
            store.clone(),
            store.clone(),
            Arc::new(JwtService::new("test-secret".into(), 3600)),
        );
        (store, svc, user)
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (_, svc, _) = setup(UserRole::Admin, None).await;
        assert!(matches!(svc.login("dana@sunrise.test", "nope").await, Err(DomainError::InvalidCredentials)));
        assert!(matches!(svc.login("ghost@sunrise.test", "x").await, Err(DomainError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_admin_is_always_valid() {
        let (_, svc, _) = setup(UserRole::Admin, None).await;
        let session = svc.login("dana@sunrise.test", "Tangerine-Violin-Orbit-77").await.unwrap();
        assert!(session.subscription.is_valid);
        let claims = svc.validate_token(&session.token).unwrap();
        assert_eq!(claims.role, "admin");
        assert!(claims.subscription_valid);
    }

    #[tokio::test]
    async fn test_clinic_user_follows_latest_subscription() {
        let clinic_id = Uuid::new_v4();
        let (store, svc, user) = setup(UserRole::ClinicAdmin, Some(clinic_id)).await;

        let status = svc.check_subscription(&user).await.unwrap();
        assert_eq!(status.message, "No subscription found for this clinic");

        let mut tier = SubscriptionTier::inactive(clinic_id, "basic_plan", Utc::now());
        store.insert(&tier).await.unwrap();
        let session = svc.login("dana@sunrise.test", "Tangerine-Violin-Orbit-77").await.unwrap();
        assert!(!session.subscription.is_valid);

        tier.is_active = true;
        store.update(&tier).await.unwrap();
        let claims = svc.validate_token(&session.token).unwrap();
        let refreshed = svc.refresh(&claims).await.unwrap();
        assert!(refreshed.subscription.is_valid);
        assert!(svc.validate_token(&refreshed.token).unwrap().subscription_valid);
    }
}
