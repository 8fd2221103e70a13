//! Organization member permissions and role checks.
//!
//! Permissions are `resource:action` strings. Holding `resource:manage`
//! grants every action on that resource. Without a member record every check
//! fails.

use super::guard::Load;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";

const MANAGE_ACTION: &str = "manage";

/// The signed-in user's membership in the active organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Member {
    #[must_use]
    pub fn new<I, S>(role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    fn grants(&self, permission: &str) -> bool {
        let resource = permission.split(':').next().unwrap_or(permission);
        let manage = format!("{resource}:{MANAGE_ACTION}");
        self.permissions
            .iter()
            .any(|held| held == permission || *held == manage)
    }
}

#[must_use]
pub fn can(member: Option<&Member>, permission: &str) -> bool {
    member.is_some_and(|member| member.grants(permission))
}

/// True when at least one of `permissions` is granted.
#[must_use]
pub fn can_any(member: Option<&Member>, permissions: &[&str]) -> bool {
    permissions.iter().any(|permission| can(member, permission))
}

/// True when every one of `permissions` is granted. A missing member is
/// refused even for an empty list.
#[must_use]
pub fn can_all(member: Option<&Member>, permissions: &[&str]) -> bool {
    member.is_some() && permissions.iter().all(|permission| can(member, permission))
}

#[must_use]
pub fn has_role(member: Option<&Member>, roles: &[&str]) -> bool {
    member.is_some_and(|member| roles.iter().any(|role| *role == member.role))
}

/// What a gated fragment requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement<'a> {
    Permission(&'a str),
    AnyPermission(&'a [&'a str]),
    AllPermissions(&'a [&'a str]),
    AnyRole(&'a [&'a str]),
}

impl Requirement<'_> {
    #[must_use]
    pub fn is_met(self, member: Option<&Member>) -> bool {
        match self {
            Self::Permission(permission) => can(member, permission),
            Self::AnyPermission(permissions) => can_any(member, permissions),
            Self::AllPermissions(permissions) => can_all(member, permissions),
            Self::AnyRole(roles) => has_role(member, roles),
        }
    }
}

/// Membership as loaded for the current organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permissions {
    member: Load<Option<Member>>,
}

impl Permissions {
    #[must_use]
    pub const fn new(member: Load<Option<Member>>) -> Self {
        Self { member }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        !self.member.is_loaded()
    }

    #[must_use]
    pub fn member(&self) -> Option<&Member> {
        self.member.loaded().and_then(Option::as_ref)
    }

    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.member().map(|member| member.role.as_str())
    }

    #[must_use]
    pub fn can(&self, permission: &str) -> bool {
        can(self.member(), permission)
    }

    #[must_use]
    pub fn can_any(&self, permissions: &[&str]) -> bool {
        can_any(self.member(), permissions)
    }

    #[must_use]
    pub fn can_all(&self, permissions: &[&str]) -> bool {
        can_all(self.member(), permissions)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(ROLE_ADMIN)
    }

    #[must_use]
    pub fn is_editor(&self) -> bool {
        self.role() == Some(ROLE_EDITOR)
    }

    #[must_use]
    pub fn is_viewer(&self) -> bool {
        self.role() == Some(ROLE_VIEWER)
    }

    /// Render `children` when `requirement` is met, `fallback` otherwise.
    /// Renders nothing while the membership is loading.
    pub fn gate<V>(
        &self,
        requirement: Requirement<'_>,
        children: impl FnOnce() -> V,
        fallback: impl FnOnce() -> V,
    ) -> Option<V> {
        if self.is_loading() {
            return None;
        }
        if requirement.is_met(self.member()) {
            Some(children())
        } else {
            Some(fallback())
        }
    }
}
