//! # Access Gate
//!
//! Premium-content authorization for audio byte fetches.
//!
//! ## Overview
//!
//! Every request for episode audio passes through [`AccessGate::authorize`]
//! before a byte is read from storage. Free content is served to anyone;
//! premium content needs a bearer credential that resolves to a user with an
//! entitled subscription.
//!
//! The gate only reads. Catalog, credential and subscription data come from
//! host-provided lookups (see [`lookup`]), and time comes from an injected
//! [`Clock`](bridge_traits::Clock) so entitlement checks are deterministic
//! under test.

pub mod error;
pub mod gate;
pub mod lookup;
pub mod types;

pub use error::{AccessError, CredentialFailure, Result};
pub use gate::AccessGate;
pub use lookup::{
    CatalogLookup, CredentialVerifier, InMemoryCatalog, InMemorySubscriptions,
    StaticTokenVerifier, SubscriptionLookup,
};
pub use types::{
    AccessGrant, AuthenticatedUser, BearerToken, CatalogEntry, PlanType, Subscription,
    SubscriptionStatus, UserId,
};
