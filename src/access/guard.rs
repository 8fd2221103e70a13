//! Render-time guard.
//!
//! The guard wraps protected layouts. Auth and organization state arrive as
//! two independent signals and the guard only evaluates the decision table
//! once both have loaded. Navigation runs as an effect keyed on
//! `(auth_loaded, org_loaded, is_authenticated, organization_id)`, so it
//! fires again when any of them changes and stays quiet on plain re-renders.
//!
//! The guard is only mounted on protected layouts, so it always evaluates
//! with `RouteClass::Protected` and can only produce sign-in or onboarding
//! redirects.

use super::{
    decision::{decide, Decision},
    route::RouteClass,
    session::Session,
};
use tracing::debug;

/// Client-side navigation with replace semantics (no history entry).
pub trait Navigator {
    fn replace(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str),
{
    fn replace(&self, path: &str) {
        self(path);
    }
}

/// A value that is still loading or has arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Load<T> {
    Pending,
    Loaded(T),
}

impl<T> Load<T> {
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    #[must_use]
    pub const fn loaded(&self) -> Option<&T> {
        match self {
            Self::Pending => None,
            Self::Loaded(value) => Some(value),
        }
    }
}

/// What the auth signal reports once loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub is_signed_in: bool,
    pub user_id: Option<String>,
}

impl AuthSnapshot {
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            is_signed_in: true,
            user_id: Some(user_id.into()),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// One of the signals has not loaded; show the loading indicator.
    Checking,
    /// Navigation to the target was issued; keep showing the loading indicator.
    Redirecting(&'static str),
    /// Render children.
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct EffectDeps {
    auth_loaded: bool,
    org_loaded: bool,
    is_authenticated: bool,
    organization_id: Option<String>,
}

pub struct ClientGuard<N> {
    navigator: N,
    auth: Load<AuthSnapshot>,
    organization: Load<Option<String>>,
    last_deps: Option<EffectDeps>,
    state: GuardState,
}

impl<N: Navigator> ClientGuard<N> {
    /// Mount the guard with both signals pending.
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            auth: Load::Pending,
            organization: Load::Pending,
            last_deps: None,
            state: GuardState::Checking,
        }
    }

    /// Feed a new value of the auth signal.
    pub fn set_auth(&mut self, auth: Load<AuthSnapshot>) -> GuardState {
        self.auth = auth;
        self.update()
    }

    /// Feed a new value of the organization signal (`None` = no active organization).
    pub fn set_organization(&mut self, organization: Load<Option<String>>) -> GuardState {
        self.organization = organization;
        self.update()
    }

    #[must_use]
    pub const fn state(&self) -> GuardState {
        self.state
    }

    /// The joined session, available only once both signals have loaded.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        let auth = self.auth.loaded()?;
        let organization = self.organization.loaded()?;

        if !auth.is_signed_in {
            return Some(Session::anonymous());
        }

        Some(Session::signed_in(
            auth.user_id.clone().unwrap_or_default(),
            organization.clone(),
        ))
    }

    /// Render `children` when ready, `loading` otherwise.
    pub fn render<V>(&self, children: impl FnOnce() -> V, loading: impl FnOnce() -> V) -> V {
        match self.state {
            GuardState::Ready => children(),
            GuardState::Checking | GuardState::Redirecting(_) => loading(),
        }
    }

    fn deps(&self) -> EffectDeps {
        EffectDeps {
            auth_loaded: self.auth.is_loaded(),
            org_loaded: self.organization.is_loaded(),
            is_authenticated: self.auth.loaded().is_some_and(|auth| auth.is_signed_in),
            organization_id: self.organization.loaded().cloned().flatten(),
        }
    }

    fn update(&mut self) -> GuardState {
        let decision = self
            .session()
            .map(|session| decide(RouteClass::Protected, &session));

        let deps = self.deps();
        if self.last_deps.as_ref() != Some(&deps) {
            if let Some(target) = decision.and_then(Decision::target) {
                debug!(path = target, "guard redirect");
                self.navigator.replace(target);
            }
            self.last_deps = Some(deps);
        }

        self.state = match decision.map(Decision::target) {
            None => GuardState::Checking,
            Some(Some(target)) => GuardState::Redirecting(target),
            Some(None) => GuardState::Ready,
        };
        self.state
    }
}
