//! Edge gate middleware.
//!
//! Runs in front of every served path except static assets. Order matters:
//! public routes are decided before the identity provider is asked, and the
//! organization rules only apply once the session is resolved.

use crate::access::{
    classify, decide, decide_auth_page, is_auth_page, is_static_asset, Decision, RouteClass,
    Session,
};
use crate::api::identity::IdentityProvider;
use axum::{
    extract::{Request, State},
    http::{header::HOST, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_SCHEME: &str = "https";

#[derive(Clone)]
pub struct GateState {
    identity: Arc<dyn IdentityProvider>,
    redirect_signed_in: bool,
    trust_forwarded_headers: bool,
    default_scheme: String,
}

impl GateState {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            redirect_signed_in: false,
            trust_forwarded_headers: false,
            default_scheme: DEFAULT_SCHEME.to_string(),
        }
    }

    /// Send signed-in users away from the sign-in and sign-up pages.
    #[must_use]
    pub const fn with_redirect_signed_in(mut self, enabled: bool) -> Self {
        self.redirect_signed_in = enabled;
        self
    }

    /// Build redirect origins from `X-Forwarded-Host` and `X-Forwarded-Proto`.
    /// Only enable behind a proxy that overwrites both headers.
    #[must_use]
    pub const fn with_trust_forwarded_headers(mut self, enabled: bool) -> Self {
        self.trust_forwarded_headers = enabled;
        self
    }

    /// Scheme used for redirect URLs when the request itself does not name one.
    #[must_use]
    pub fn with_default_scheme(mut self, scheme: String) -> Self {
        self.default_scheme = scheme;
        self
    }

    /// Provider failures count as "not signed in".
    async fn session(&self, headers: &HeaderMap) -> Session {
        match self.identity.resolve(headers).await {
            Ok(session) => session,
            Err(err) => {
                warn!("Failed to resolve session: {err}");
                Session::anonymous()
            }
        }
    }

    async fn evaluate(&self, path: &str, headers: &HeaderMap) -> (RouteClass, Decision) {
        let route = classify(path);

        if route == RouteClass::Public {
            if self.redirect_signed_in && is_auth_page(path) {
                let session = self.session(headers).await;
                return (route, decide_auth_page(&session));
            }
            return (route, Decision::Allow);
        }

        let session = self.session(headers).await;
        debug!(
            user_id = ?session.user_id,
            org_id = ?session.organization_id,
            "session resolved"
        );
        (route, decide(route, &session))
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn enforce(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    if is_static_asset(&path) {
        return next.run(request).await;
    }

    let (route, decision) = gate.evaluate(&path, request.headers()).await;
    debug!(path = %path, route = %route, decision = %decision, "gate decision");

    match decision.target() {
        None => next.run(request).await,
        Some(target) => {
            let location = gate.redirect_location(&request, target);
            info!(path = %path, route = %route, location = %location, "redirecting");
            Redirect::temporary(&location).into_response()
        }
    }
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|value| !value.is_empty())
}

impl GateState {
    /// Origin of the incoming request. Forwarded headers count only when trusted.
    fn request_origin(&self, request: &Request) -> Option<Url> {
        let headers = request.headers();
        let forwarded = |name: &str| {
            self.trust_forwarded_headers
                .then(|| first_header_value(headers, name))
                .flatten()
        };

        let host = forwarded("x-forwarded-host")
            .or_else(|| first_header_value(headers, HOST.as_str()))
            .or_else(|| request.uri().authority().map(|authority| authority.as_str()))?;
        let scheme = forwarded("x-forwarded-proto")
            .or_else(|| request.uri().scheme_str())
            .unwrap_or(self.default_scheme.as_str());

        Url::parse(&format!("{scheme}://{host}")).ok()
    }

    /// Absolute URL for `target` on the request's origin, or `target` itself
    /// when the origin cannot be determined.
    fn redirect_location(&self, request: &Request, target: &str) -> String {
        self.request_origin(request)
            .and_then(|origin| origin.join(target).ok())
            .map_or_else(|| target.to_string(), String::from)
    }
}
