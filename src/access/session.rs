//! Session snapshot as seen by the access-control core.
//!
//! A `Session` is produced by the identity provider (edge) or assembled from
//! the client-side load signals (guard). The core never mutates it.

use serde::{Deserialize, Serialize};

/// Authentication and organization state for a single request or render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub is_loaded: bool,
    pub is_authenticated: bool,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

impl Session {
    /// A session whose identity lookup has not finished yet.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// A resolved session with no signed-in user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            is_loaded: true,
            ..Self::default()
        }
    }

    /// A resolved session for a signed-in user, with or without an organization.
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>, organization_id: Option<String>) -> Self {
        Self {
            is_loaded: true,
            is_authenticated: true,
            user_id: Some(user_id.into()),
            organization_id: organization_id.filter(|id| !id.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn has_organization(&self) -> bool {
        self.organization_id.is_some()
    }
}
