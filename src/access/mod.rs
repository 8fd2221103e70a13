//! Access-control core: route classification, the decision table, the
//! render-time guard and member permission checks. Nothing here performs I/O.

pub mod decision;
pub mod guard;
pub mod permissions;
pub mod route;
pub mod session;

pub use decision::{decide, decide_auth_page, Decision};
pub use guard::{AuthSnapshot, ClientGuard, GuardState, Load, Navigator};
pub use permissions::{can, can_all, can_any, has_role, Member, Permissions, Requirement};
pub use route::{classify, is_auth_page, is_static_asset, RouteClass};
pub use session::Session;
