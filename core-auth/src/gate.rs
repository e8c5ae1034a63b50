//! # Access Gate
//!
//! Decides, per request, whether the caller may receive the bytes of an audio
//! resource.
//!
//! ## Decision order
//!
//! 1. Unknown resource: `NotFound` (404), whatever the credential.
//! 2. Free content: granted without looking at the credential.
//! 3. Premium content: a valid `Bearer` credential is required
//!    (`AuthenticationRequired`, 401).
//! 4. The credential's user must hold an entitled subscription
//!    (`SubscriptionRequired`, 403).
//!
//! Any collaborator failure is a `Backend` error (500). The gate never falls
//! back to granting access, and nothing is cached between requests.
//!
//! ## Usage
//!
//! ```ignore
//! let gate = AccessGate::new(catalog, verifier, subscriptions, Arc::new(SystemClock))
//!     .with_event_bus(event_bus.clone());
//!
//! match gate.authorize("ep-42.mp3", request.header("authorization")).await {
//!     Ok(grant) => serve(grant.resource),
//!     Err(denied) => respond(denied.status_code(), denied.public_message()),
//! }
//! ```

use bridge_traits::Clock;
use core_runtime::events::{AccessEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{AccessError, CredentialFailure, Result};
use crate::lookup::{CatalogLookup, CredentialVerifier, SubscriptionLookup};
use crate::types::{AccessGrant, AuthenticatedUser, BearerToken, UserId};

pub struct AccessGate {
    catalog: Arc<dyn CatalogLookup>,
    verifier: Arc<dyn CredentialVerifier>,
    subscriptions: Arc<dyn SubscriptionLookup>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl AccessGate {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        verifier: Arc<dyn CredentialVerifier>,
        subscriptions: Arc<dyn SubscriptionLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            verifier,
            subscriptions,
            clock,
            event_bus: None,
        }
    }

    /// Publish an [`AccessEvent`] for every decision.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Authorize a byte fetch of `resource`.
    ///
    /// `authorization` is the raw `Authorization` header value, if any.
    #[instrument(skip(self, authorization), fields(has_credential = authorization.is_some()))]
    pub async fn authorize(
        &self,
        resource: &str,
        authorization: Option<&str>,
    ) -> Result<AccessGrant> {
        let decision = self.decide(resource, authorization).await;

        match &decision {
            Ok(grant) => {
                debug!(premium = grant.premium, "Access granted");
                self.publish(AccessEvent::Granted {
                    resource: resource.to_string(),
                    premium: grant.premium,
                });
            }
            Err(err) => {
                if matches!(err, AccessError::Backend(_)) {
                    warn!(error = %err, "Access check failed");
                } else {
                    debug!(status = err.status_code(), "Access denied");
                }
                self.publish(AccessEvent::Denied {
                    resource: resource.to_string(),
                    status: err.status_code(),
                    reason: err.public_message().to_string(),
                });
            }
        }

        decision
    }

    async fn decide(&self, resource: &str, authorization: Option<&str>) -> Result<AccessGrant> {
        let entry = self
            .catalog
            .content_for_resource(resource)
            .await?
            .ok_or_else(|| AccessError::NotFound {
                resource: resource.to_string(),
            })?;

        if !entry.premium {
            return Ok(AccessGrant {
                resource: resource.to_string(),
                premium: false,
                user: None,
            });
        }

        let user = self.authenticate(authorization).await?;

        if !self.has_active_subscription(&user.id).await? {
            return Err(AccessError::SubscriptionRequired);
        }

        Ok(AccessGrant {
            resource: resource.to_string(),
            premium: true,
            user: Some(user.id),
        })
    }

    /// Resolve the `Authorization` header to a user.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthenticatedUser> {
        let header = authorization
            .ok_or(AccessError::AuthenticationRequired(CredentialFailure::Missing))?;
        let token = BearerToken::from_header(header)
            .ok_or(AccessError::AuthenticationRequired(CredentialFailure::Malformed))?;

        match self.verifier.verify(&token).await? {
            Some(user) => Ok(user),
            None => {
                debug!(
                    authorization = %redact_if_sensitive("authorization", header),
                    "Credential rejected"
                );
                Err(AccessError::AuthenticationRequired(
                    CredentialFailure::Rejected,
                ))
            }
        }
    }

    /// Whether `user` holds a subscription that is entitled right now.
    pub async fn has_active_subscription(&self, user: &UserId) -> Result<bool> {
        let subscription = self.subscriptions.subscription_for_user(user).await?;
        let now = self.clock.unix_timestamp_millis();
        Ok(subscription.is_some_and(|s| s.is_entitled(now)))
    }

    fn publish(&self, event: AccessEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(CoreEvent::Access(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogEntry, Subscription, SubscriptionStatus};
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, ManualClock};
    use mockall::mock;

    const NOW: i64 = 1_700_000_000_000;

    mock! {
        Catalog {}

        #[async_trait]
        impl CatalogLookup for Catalog {
            async fn content_for_resource(&self, resource: &str) -> BridgeResult<Option<CatalogEntry>>;
        }
    }

    mock! {
        Verifier {}

        #[async_trait]
        impl CredentialVerifier for Verifier {
            async fn verify(&self, token: &BearerToken) -> BridgeResult<Option<AuthenticatedUser>>;
        }
    }

    mock! {
        Subscriptions {}

        #[async_trait]
        impl SubscriptionLookup for Subscriptions {
            async fn subscription_for_user(&self, user: &UserId) -> BridgeResult<Option<Subscription>>;
        }
    }

    fn listener() -> AuthenticatedUser {
        AuthenticatedUser {
            id: UserId::from("user-1"),
            email: "listener@example.com".to_string(),
        }
    }

    fn active_until(end: Option<i64>) -> Subscription {
        Subscription {
            id: "sub-1".to_string(),
            user_id: UserId::from("user-1"),
            plan_type: None,
            status: SubscriptionStatus::Active,
            current_period_end: end,
            cancel_at_period_end: false,
        }
    }

    fn catalog_with(entry: Option<CatalogEntry>) -> MockCatalog {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_content_for_resource()
            .returning(move |_| Ok(entry.clone()));
        catalog
    }

    fn gate(
        catalog: MockCatalog,
        verifier: MockVerifier,
        subscriptions: MockSubscriptions,
    ) -> AccessGate {
        AccessGate::new(
            Arc::new(catalog),
            Arc::new(verifier),
            Arc::new(subscriptions),
            Arc::new(ManualClock::at_millis(NOW)),
        )
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found_even_with_credential() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().never();
        let gate = gate(catalog_with(None), verifier, MockSubscriptions::new());

        let err = gate
            .authorize("missing.mp3", Some("Bearer good"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_free_content_ignores_credential() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().never();
        let mut subs = MockSubscriptions::new();
        subs.expect_subscription_for_user().never();
        let gate = gate(catalog_with(Some(CatalogEntry::free("pod-1"))), verifier, subs);

        let grant = gate.authorize("free.mp3", Some("garbage")).await.unwrap();
        assert!(!grant.premium);
        assert!(grant.user.is_none());
    }

    #[tokio::test]
    async fn test_premium_without_credential_is_401() {
        let gate = gate(
            catalog_with(Some(CatalogEntry::premium("pod-1"))),
            MockVerifier::new(),
            MockSubscriptions::new(),
        );

        let err = gate.authorize("premium.mp3", None).await.unwrap_err();
        assert!(matches!(
            err,
            AccessError::AuthenticationRequired(CredentialFailure::Missing)
        ));
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_premium_with_malformed_header_is_401() {
        let gate = gate(
            catalog_with(Some(CatalogEntry::premium("pod-1"))),
            MockVerifier::new(),
            MockSubscriptions::new(),
        );

        let err = gate
            .authorize("premium.mp3", Some("Token abc"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.public_message(), "No token provided");
    }

    #[tokio::test]
    async fn test_premium_with_rejected_token_is_401() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok(None));
        let gate = gate(
            catalog_with(Some(CatalogEntry::premium("pod-1"))),
            verifier,
            MockSubscriptions::new(),
        );

        let err = gate
            .authorize("premium.mp3", Some("Bearer expired"))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Invalid token");
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_premium_without_subscription_is_403() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok(Some(listener())));
        let mut subs = MockSubscriptions::new();
        subs.expect_subscription_for_user().returning(|_| Ok(None));
        let gate = gate(catalog_with(Some(CatalogEntry::premium("pod-1"))), verifier, subs);

        let err = gate
            .authorize("premium.mp3", Some("Bearer good"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::SubscriptionRequired));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_premium_with_lapsed_subscription_is_403() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok(Some(listener())));
        let mut subs = MockSubscriptions::new();
        subs.expect_subscription_for_user()
            .returning(|_| Ok(Some(active_until(Some(NOW - 1)))));
        let gate = gate(catalog_with(Some(CatalogEntry::premium("pod-1"))), verifier, subs);

        let err = gate
            .authorize("premium.mp3", Some("Bearer good"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_premium_with_active_subscription_is_granted() {
        let mut verifier = MockVerifier::new();
        verifier
            .expect_verify()
            .withf(|token| token.as_str() == "good")
            .returning(|_| Ok(Some(listener())));
        let mut subs = MockSubscriptions::new();
        subs.expect_subscription_for_user()
            .withf(|user| user.as_str() == "user-1")
            .returning(|_| Ok(Some(active_until(Some(NOW + 86_400_000)))));
        let gate = gate(
            catalog_with(Some(CatalogEntry::premium("pod-1").with_episode("ep-1"))),
            verifier,
            subs,
        );

        let grant = gate
            .authorize("premium.mp3", Some("Bearer good"))
            .await
            .unwrap();
        assert!(grant.premium);
        assert_eq!(grant.user, Some(UserId::from("user-1")));
    }

    #[tokio::test]
    async fn test_backend_failure_never_grants() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_content_for_resource()
            .returning(|_| Err(BridgeError::OperationFailed("db down".to_string())));
        let gate = gate(catalog, MockVerifier::new(), MockSubscriptions::new());

        let err = gate.authorize("any.mp3", None).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Failed to serve audio file");
    }

    #[tokio::test]
    async fn test_subscription_lookup_failure_is_backend_error() {
        let mut verifier = MockVerifier::new();
        verifier.expect_verify().returning(|_| Ok(Some(listener())));
        let mut subs = MockSubscriptions::new();
        subs.expect_subscription_for_user()
            .returning(|_| Err(BridgeError::NotAvailable("timeout".to_string())));
        let gate = gate(catalog_with(Some(CatalogEntry::premium("pod-1"))), verifier, subs);

        let err = gate
            .authorize("premium.mp3", Some("Bearer good"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Backend(_)));
    }

    #[tokio::test]
    async fn test_decisions_are_published() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let gate = gate(
            catalog_with(Some(CatalogEntry::premium("pod-1"))),
            MockVerifier::new(),
            MockSubscriptions::new(),
        )
        .with_event_bus(bus);

        let _ = gate.authorize("premium.mp3", None).await;

        match events.recv().await.unwrap() {
            CoreEvent::Access(AccessEvent::Denied {
                resource, status, ..
            }) => {
                assert_eq!(resource, "premium.mp3");
                assert_eq!(status, 401);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
