//! # Fleetgate (access control for the fleet-management app)
//!
//! `fleetgate` decides, for every request, whether a user may see a page, has
//! to sign in first, or has to finish onboarding into an organization.
//!
//! ## Layers
//!
//! The same decision table runs in two places:
//!
//! - **Edge gate** ([`api::gate`]): axum middleware in front of the served
//!   application. Classifies the path, resolves the session through the
//!   identity provider and answers with a `307` redirect when needed.
//! - **Client guard** ([`access::guard`]): render-time state machine for
//!   protected layouts. Waits for both the auth and organization signals,
//!   then navigates (replace semantics) or renders its children.
//!
//! Both call [`access::decide`], so they cannot drift apart.
//!
//! ## Routes
//!
//! - Public: `/sign-in*`, `/sign-up*`, `/api/webhooks*`. Never gated.
//! - Onboarding: `/onboarding*`. Signed-in users without an organization
//!   land here; users with one are sent home.
//! - Everything else is protected. Static assets (`/_next/static`,
//!   `/_next/image`, `/favicon.ico`, images) bypass the gate entirely.

pub mod access;
pub mod api;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
