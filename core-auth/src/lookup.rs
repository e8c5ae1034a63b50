//! Collaborators the access gate consults.
//!
//! Each seam is a narrow async trait so the gate can run against a relational
//! store, an HTTP backend or the in-memory tables below. Lookups report
//! absence with `Ok(None)`; `Err` is reserved for the collaborator failing,
//! which the gate turns into a backend error rather than a grant.

use async_trait::async_trait;
use bridge_traits::error::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::{AuthenticatedUser, BearerToken, CatalogEntry, Subscription, UserId};

/// Maps an audio resource key to the catalog content it belongs to.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn content_for_resource(&self, resource: &str) -> Result<Option<CatalogEntry>>;
}

/// Resolves a bearer credential to a user. `Ok(None)` means rejected.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &BearerToken) -> Result<Option<AuthenticatedUser>>;
}

/// Finds the subscription record for a user.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn subscription_for_user(&self, user: &UserId) -> Result<Option<Subscription>>;
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory catalog keyed by resource.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource: impl Into<String>, entry: CatalogEntry) {
        write(&self.entries).insert(resource.into(), entry);
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn content_for_resource(&self, resource: &str) -> Result<Option<CatalogEntry>> {
        Ok(read(&self.entries).get(resource).cloned())
    }
}

/// Token table for hosts that issue opaque session tokens.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, user: AuthenticatedUser) {
        write(&self.tokens).insert(token.into(), user);
    }

    pub fn revoke(&self, token: &str) {
        write(&self.tokens).remove(token);
    }
}

#[async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &BearerToken) -> Result<Option<AuthenticatedUser>> {
        Ok(read(&self.tokens).get(token.as_str()).cloned())
    }
}

/// In-memory subscription table, one record per user.
#[derive(Debug, Default)]
pub struct InMemorySubscriptions {
    records: RwLock<HashMap<UserId, Subscription>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `subscription.user_id`.
    pub fn upsert(&self, subscription: Subscription) {
        write(&self.records).insert(subscription.user_id.clone(), subscription);
    }
}

#[async_trait]
impl SubscriptionLookup for InMemorySubscriptions {
    async fn subscription_for_user(&self, user: &UserId) -> Result<Option<Subscription>> {
        Ok(read(&self.records).get(user).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubscriptionStatus;

    #[tokio::test]
    async fn test_static_verifier_revocation() {
        let verifier = StaticTokenVerifier::new();
        verifier.insert(
            "tok",
            AuthenticatedUser {
                id: UserId::from("u1"),
                email: "u1@example.com".to_string(),
            },
        );

        let token = BearerToken::from_header("Bearer tok").unwrap();
        assert!(verifier.verify(&token).await.unwrap().is_some());

        verifier.revoke("tok");
        assert!(verifier.verify(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscription_upsert_replaces() {
        let subs = InMemorySubscriptions::new();
        let mut record = Subscription {
            id: "s1".to_string(),
            user_id: UserId::from("u1"),
            plan_type: None,
            status: SubscriptionStatus::Inactive,
            current_period_end: None,
            cancel_at_period_end: false,
        };
        subs.upsert(record.clone());
        record.status = SubscriptionStatus::Active;
        subs.upsert(record);

        let found = subs
            .subscription_for_user(&UserId::from("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, SubscriptionStatus::Active);
    }
}
