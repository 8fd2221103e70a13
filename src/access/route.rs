//! Route classification.
//!
//! Patterns use the same shape as the frontend router matchers: a literal
//! prefix followed by `(.*)`, anchored on both ends. They are compiled once
//! into `RegexSet`s. A set that fails to compile matches nothing, which
//! leaves every path in the `Protected` class.

use regex::RegexSet;
use serde::Serialize;
use std::{fmt, sync::LazyLock};

pub const PUBLIC_PATTERNS: [&str; 3] = ["/sign-in(.*)", "/sign-up(.*)", "/api/webhooks(.*)"];

pub const ONBOARDING_PATTERNS: [&str; 1] = ["/onboarding(.*)"];

/// Requests for these never reach the classifier or the identity provider.
pub const STATIC_ASSET_PATTERNS: [&str; 4] = [
    "/_next/static(.*)",
    "/_next/image(.*)",
    r"/favicon\.ico(.*)",
    r"/(.*)\.(svg|png|jpg|jpeg|gif|webp)",
];

static PUBLIC_ROUTES: LazyLock<Option<RouteMatcher>> =
    LazyLock::new(|| RouteMatcher::new(PUBLIC_PATTERNS).ok());

static ONBOARDING_ROUTES: LazyLock<Option<RouteMatcher>> =
    LazyLock::new(|| RouteMatcher::new(ONBOARDING_PATTERNS).ok());

static STATIC_ASSETS: LazyLock<Option<RouteMatcher>> =
    LazyLock::new(|| RouteMatcher::new(STATIC_ASSET_PATTERNS).ok());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    Public,
    Onboarding,
    Protected,
}

impl RouteClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Onboarding => "onboarding",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of anchored path patterns.
#[derive(Clone, Debug)]
pub struct RouteMatcher {
    set: RegexSet,
}

impl RouteMatcher {
    /// Compile `patterns`, anchoring each one to the whole path.
    ///
    /// # Errors
    /// Returns an error if any pattern is not a valid regular expression.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let anchored = patterns
            .into_iter()
            .map(|pattern| format!("^{}$", pattern.as_ref()));
        Ok(Self {
            set: RegexSet::new(anchored)?,
        })
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path)
    }
}

fn matches(matcher: &LazyLock<Option<RouteMatcher>>, path: &str) -> bool {
    matcher.as_ref().is_some_and(|m| m.is_match(path))
}

/// Classify a request path. Pure and usable before any session exists.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if matches(&PUBLIC_ROUTES, path) {
        RouteClass::Public
    } else if matches(&ONBOARDING_ROUTES, path) {
        RouteClass::Onboarding
    } else {
        RouteClass::Protected
    }
}

/// Static files and images excluded from gating altogether.
#[must_use]
pub fn is_static_asset(path: &str) -> bool {
    matches(&STATIC_ASSETS, path)
}

/// Public pages a person signs in through, as opposed to public API endpoints.
#[must_use]
pub fn is_auth_page(path: &str) -> bool {
    classify(path) == RouteClass::Public && !path.starts_with("/api/")
}
