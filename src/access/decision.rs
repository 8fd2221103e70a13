//! The access-control decision table shared by the edge gate and the client guard.
//!
//! Rules, first match wins:
//!
//! 1. public route: allow
//! 2. not authenticated: sign in
//! 3. no organization outside onboarding: onboarding
//! 4. organization on an onboarding route: home
//! 5. allow
//!
//! Rules 3 and 4 can never both apply since one needs the organization absent
//! and the other needs it present.

use super::{route::RouteClass, session::Session};
use serde::Serialize;
use std::fmt;

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const HOME_PATH: &str = "/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectSignIn,
    RedirectOnboarding,
    RedirectHome,
}

impl Decision {
    /// Path the user is sent to, `None` for `Allow`.
    #[must_use]
    pub const fn target(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectSignIn => Some(SIGN_IN_PATH),
            Self::RedirectOnboarding => Some(ONBOARDING_PATH),
            Self::RedirectHome => Some(HOME_PATH),
        }
    }

    #[must_use]
    pub const fn is_redirect(self) -> bool {
        !matches!(self, Self::Allow)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::RedirectSignIn => "redirect_sign_in",
            Self::RedirectOnboarding => "redirect_onboarding",
            Self::RedirectHome => "redirect_home",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate the decision table.
///
/// Callers must wait for `session.is_loaded` on non-public routes; an
/// unloaded session reads as unauthenticated here.
#[must_use]
pub fn decide(route: RouteClass, session: &Session) -> Decision {
    if route == RouteClass::Public {
        return Decision::Allow;
    }

    if !session.is_authenticated {
        return Decision::RedirectSignIn;
    }

    match (session.has_organization(), route) {
        (false, RouteClass::Onboarding) => Decision::Allow,
        (false, _) => Decision::RedirectOnboarding,
        (true, RouteClass::Onboarding) => Decision::RedirectHome,
        (true, _) => Decision::Allow,
    }
}

/// Where a signed-in user landing on a sign-in or sign-up page is sent.
///
/// Used only by the opt-in edge policy; `decide` itself always allows public
/// routes.
#[must_use]
pub fn decide_auth_page(session: &Session) -> Decision {
    match (session.is_authenticated, session.has_organization()) {
        (false, _) => Decision::Allow,
        (true, true) => Decision::RedirectHome,
        (true, false) => Decision::RedirectOnboarding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::route::classify;

    fn sessions() -> Vec<Session> {
        vec![
            Session::pending(),
            Session::anonymous(),
            Session::signed_in("user_1", None),
            Session::signed_in("user_1", Some("org_1".to_string())),
        ]
    }

    #[test]
    fn public_allows_any_session() {
        for path in ["/sign-in", "/sign-up/sso", "/api/webhooks/identity"] {
            for session in sessions() {
                assert_eq!(decide(classify(path), &session), Decision::Allow, "{path}");
            }
        }
    }

    #[test]
    fn unauthenticated_goes_to_sign_in() {
        for path in ["/", "/dashboard", "/onboarding", "/master/drivers"] {
            assert_eq!(
                decide(classify(path), &Session::anonymous()),
                Decision::RedirectSignIn,
                "{path}"
            );
        }
    }

    #[test]
    fn no_organization_goes_to_onboarding() {
        let session = Session::signed_in("user_1", None);
        for path in ["/", "/dashboard", "/reports/trip-report"] {
            assert_eq!(
                decide(classify(path), &session),
                Decision::RedirectOnboarding,
                "{path}"
            );
        }
    }

    #[test]
    fn onboarded_user_leaves_onboarding() {
        let session = Session::signed_in("user_1", Some("org_1".to_string()));
        assert_eq!(
            decide(classify("/onboarding"), &session),
            Decision::RedirectHome
        );
        assert_eq!(decide(classify("/dashboard"), &session), Decision::Allow);
    }

    #[test]
    fn scenarios() {
        let cases = [
            ("/sign-in", Session::anonymous(), Decision::Allow),
            ("/dashboard", Session::anonymous(), Decision::RedirectSignIn),
            (
                "/dashboard",
                Session::signed_in("user_1", None),
                Decision::RedirectOnboarding,
            ),
            (
                "/onboarding",
                Session::signed_in("user_1", Some("org_1".to_string())),
                Decision::RedirectHome,
            ),
            ("/onboarding", Session::signed_in("user_1", None), Decision::Allow),
        ];
        for (path, session, expected) in cases {
            assert_eq!(decide(classify(path), &session), expected, "{path}");
        }
    }

    #[test]
    fn decide_is_idempotent() {
        for route in [RouteClass::Public, RouteClass::Onboarding, RouteClass::Protected] {
            for session in sessions() {
                assert_eq!(decide(route, &session), decide(route, &session));
            }
        }
    }

    #[test]
    fn onboarding_and_home_never_overlap() {
        for route in [RouteClass::Public, RouteClass::Onboarding, RouteClass::Protected] {
            for session in sessions() {
                let decision = decide(route, &session);
                if session.has_organization() {
                    assert_ne!(decision, Decision::RedirectOnboarding);
                } else {
                    assert_ne!(decision, Decision::RedirectHome);
                }
            }
        }
    }

    #[test]
    fn targets() {
        assert_eq!(Decision::Allow.target(), None);
        assert_eq!(Decision::RedirectSignIn.target(), Some("/sign-in"));
        assert_eq!(Decision::RedirectOnboarding.target(), Some("/onboarding"));
        assert_eq!(Decision::RedirectHome.target(), Some("/"));
        assert!(!Decision::Allow.is_redirect());
        assert!(Decision::RedirectHome.is_redirect());
    }

    #[test]
    fn auth_page_policy() {
        assert_eq!(decide_auth_page(&Session::anonymous()), Decision::Allow);
        assert_eq!(
            decide_auth_page(&Session::signed_in("user_1", None)),
            Decision::RedirectOnboarding
        );
        assert_eq!(
            decide_auth_page(&Session::signed_in("user_1", Some("org_1".to_string()))),
            Decision::RedirectHome
        );
    }
}
