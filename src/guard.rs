use tracing::{debug, warn};

use crate::{
    models::{Role, RouteDescriptor},
    session::SessionCredentials,
};

pub const LOGIN_PATH: &str = "/login";

/// RedirectTarget
///
/// Where a denied navigation is sent instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    Login,
    Dashboard(Role),
}

impl RedirectTarget {
    /// The dashboard for a stored role. No role (or an unrecognised one) lands on
    /// the buyer dashboard.
    pub fn dashboard_for(role: Option<Role>) -> Self {
        RedirectTarget::Dashboard(role.unwrap_or(Role::User))
    }

    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Login => LOGIN_PATH,
            RedirectTarget::Dashboard(Role::Admin) => "/admin/dashboard",
            RedirectTarget::Dashboard(Role::Seller) => "/seller/dashboard",
            RedirectTarget::Dashboard(Role::User) => "/user/dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(RedirectTarget),
}

/// GuardPolicy
///
/// `seller_auto_promote` restores the lenient seller rule: any visitor holding a
/// token may enter seller routes, and their stored role is rewritten to `seller`.
/// Off, every role is matched strictly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardPolicy {
    pub seller_auto_promote: bool,
}

/// RouteGuard
///
/// Decides, for one navigation attempt, whether the target route's metadata is
/// satisfied by the visitor's credentials:
///
/// 1. Auth required and no token: redirect to login.
/// 2. A role is required and the stored role differs: redirect to the dashboard of
///    the *stored* role. Under `seller_auto_promote`, a seller route with a token
///    present is allowed and the stored role becomes `seller`.
/// 3. Otherwise allow.
///
/// Denials are redirects, never errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard {
    policy: GuardPolicy,
}

impl RouteGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub fn check(
        &self,
        route: &RouteDescriptor,
        credentials: &mut SessionCredentials,
    ) -> GuardDecision {
        if route.requires_auth() && !credentials.has_token() {
            debug!(route = %route.name, "no token, redirecting to login");
            return GuardDecision::Redirect(RedirectTarget::Login);
        }

        let Some(required) = route.required_role() else {
            return GuardDecision::Allow;
        };

        if self.policy.seller_auto_promote && required == Role::Seller && credentials.has_token() {
            if credentials.role != Some(Role::Seller) {
                warn!(
                    route = %route.name,
                    previous_role = ?credentials.role,
                    "promoting stored role to seller"
                );
                credentials.role = Some(Role::Seller);
            }
            return GuardDecision::Allow;
        }

        if credentials.role != Some(required) {
            let target = RedirectTarget::dashboard_for(credentials.role);
            debug!(
                route = %route.name,
                required = %required,
                stored = ?credentials.role,
                to = target.path(),
                "role mismatch, redirecting to dashboard"
            );
            return GuardDecision::Redirect(target);
        }

        GuardDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::RouteMeta, route_table::RouteTable};

    fn strict() -> RouteGuard {
        RouteGuard::default()
    }

    fn lenient() -> RouteGuard {
        RouteGuard::new(GuardPolicy {
            seller_auto_promote: true,
        })
    }

    fn route(table: &RouteTable, name: &str) -> RouteDescriptor {
        table.by_name(name).unwrap().clone()
    }

    #[test]
    fn missing_token_redirects_to_login_on_every_protected_route() {
        let table = RouteTable::marketplace().unwrap();
        for guard in [strict(), lenient()] {
            for route in table.routes().iter().filter(|r| r.requires_auth()) {
                let mut credentials = SessionCredentials::from_raw(None, Some("admin"));
                assert_eq!(
                    guard.check(route, &mut credentials),
                    GuardDecision::Redirect(RedirectTarget::Login),
                    "{}",
                    route.name
                );
            }
        }
    }

    #[test]
    fn public_routes_always_allowed() {
        let table = RouteTable::marketplace().unwrap();
        let sessions = [
            SessionCredentials::anonymous(),
            SessionCredentials::new("t", Role::Admin),
            SessionCredentials::from_raw(None, Some("seller")),
        ];
        for name in ["Landing", "Login", "Register"] {
            for session in &sessions {
                let mut credentials = session.clone();
                assert_eq!(strict().check(&route(&table, name), &mut credentials), GuardDecision::Allow);
                assert_eq!(&credentials, session);
            }
        }
    }

    #[test]
    fn admin_routes_redirect_to_stored_role_dashboard() {
        let table = RouteTable::marketplace().unwrap();
        let admin = route(&table, "AdminDashboard");

        let cases = [
            (Some("seller"), RedirectTarget::Dashboard(Role::Seller)),
            (Some("user"), RedirectTarget::Dashboard(Role::User)),
            (Some("moderator"), RedirectTarget::Dashboard(Role::User)),
            (None, RedirectTarget::Dashboard(Role::User)),
        ];
        for (stored, expected) in cases {
            let mut credentials = SessionCredentials::from_raw(Some("t".into()), stored);
            assert_eq!(
                strict().check(&admin, &mut credentials),
                GuardDecision::Redirect(expected),
                "{stored:?}"
            );
        }
    }

    #[test]
    fn admin_visiting_seller_items_goes_to_admin_dashboard() {
        let table = RouteTable::marketplace().unwrap();
        let mut credentials = SessionCredentials::new("t", Role::Admin);
        let decision = strict().check(&route(&table, "SellerItems"), &mut credentials);
        assert_eq!(decision, GuardDecision::Redirect(RedirectTarget::Dashboard(Role::Admin)));
        assert_eq!(RedirectTarget::Dashboard(Role::Admin).path(), "/admin/dashboard");
    }

    #[test]
    fn matching_role_is_allowed() {
        let table = RouteTable::marketplace().unwrap();
        let mut credentials = SessionCredentials::new("t", Role::User);
        assert_eq!(
            strict().check(&route(&table, "UserOrderDetails"), &mut credentials),
            GuardDecision::Allow
        );
    }

    #[test]
    fn denial_is_idempotent_without_promotion() {
        let table = RouteTable::marketplace().unwrap();
        let seller_items = route(&table, "SellerItems");
        let mut credentials = SessionCredentials::new("t", Role::User);

        let first = strict().check(&seller_items, &mut credentials);
        let second = strict().check(&seller_items, &mut credentials);
        assert_eq!(first, second);
        assert_eq!(credentials.role, Some(Role::User));
    }

    #[test]
    fn seller_promotion_allows_and_rewrites_role() {
        let table = RouteTable::marketplace().unwrap();
        let mut credentials = SessionCredentials::new("t", Role::User);

        let decision = lenient().check(&route(&table, "SellerDashboard"), &mut credentials);
        assert_eq!(decision, GuardDecision::Allow);
        assert_eq!(credentials.role, Some(Role::Seller));

        // The rewritten role is what the next navigation sees.
        let decision = lenient().check(&route(&table, "UserDashboard"), &mut credentials);
        assert_eq!(decision, GuardDecision::Redirect(RedirectTarget::Dashboard(Role::Seller)));
    }

    #[test]
    fn seller_promotion_needs_a_token() {
        let table = RouteTable::marketplace().unwrap();
        let mut credentials = SessionCredentials::from_raw(None, Some("user"));
        let decision = lenient().check(&route(&table, "SellerItems"), &mut credentials);
        assert_eq!(decision, GuardDecision::Redirect(RedirectTarget::Login));
        assert_eq!(credentials.role, Some(Role::User));
    }

    #[test]
    fn role_only_metadata_checks_role_without_token() {
        let route = RouteDescriptor::public("/reports", "Reports", "views/Reports").with_meta(
            RouteMeta {
                requires_auth: false,
                role: Some(Role::Admin),
            },
        );

        let mut admin = SessionCredentials::from_raw(None, Some("admin"));
        assert_eq!(strict().check(&route, &mut admin), GuardDecision::Allow);

        let mut anonymous = SessionCredentials::anonymous();
        assert_eq!(
            strict().check(&route, &mut anonymous),
            GuardDecision::Redirect(RedirectTarget::Dashboard(Role::User))
        );
    }
}
