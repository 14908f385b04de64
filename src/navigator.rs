use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    error::{NavigationError, RouteTableError},
    guard::{GuardDecision, GuardPolicy, RedirectTarget, RouteGuard},
    models::{Role, RouteDescriptor},
    route_table::RouteTable,
    session::SessionCredentials,
    storage::SessionStorage,
};

/// Resolution
///
/// Where a navigation attempt ends up once every redirect has been followed and
/// guarded again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub requested_path: String,
    pub route: &'a RouteDescriptor,
    pub params: BTreeMap<String, String>,
    /// Normalized path of the final route.
    pub path: String,
    pub redirects: Vec<RedirectTarget>,
    pub role_changed: bool,
}

impl Resolution<'_> {
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

/// Navigator
///
/// Owns the route table and the guard, and turns a visited path plus credentials
/// into a `Resolution`.
#[derive(Debug)]
pub struct Navigator {
    table: RouteTable,
    guard: RouteGuard,
    max_redirects: usize,
    legacy_token_key: bool,
}

impl Navigator {
    pub fn new(table: RouteTable, guard: RouteGuard, max_redirects: usize) -> Self {
        Self {
            table,
            guard,
            max_redirects,
            legacy_token_key: true,
        }
    }

    pub fn with_legacy_token_key(mut self, enabled: bool) -> Self {
        self.legacy_token_key = enabled;
        self
    }

    /// The marketplace table, guarded according to the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, RouteTableError> {
        let guard = RouteGuard::new(GuardPolicy {
            seller_auto_promote: config.seller_auto_promote,
        });
        Ok(Self::new(RouteTable::marketplace()?, guard, config.max_redirects)
            .with_legacy_token_key(config.legacy_token_key))
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Resolves `path` for the given credentials.
    ///
    /// Each redirect target is matched and guarded like a fresh visit. Revisiting a
    /// `(path, role)` state, or exceeding `max_redirects`, is a `RedirectLoop`.
    pub fn resolve(
        &self,
        path: &str,
        credentials: &mut SessionCredentials,
    ) -> Result<Resolution<'_>, NavigationError> {
        let initial_role = credentials.role;
        let mut current = self
            .table
            .match_path(path)
            .ok_or_else(|| NavigationError::NotFound(path.to_string()))?;
        let requested_route = current.route;
        let mut redirects: Vec<RedirectTarget> = Vec::new();
        let mut visited: HashSet<(String, Option<Role>)> = HashSet::new();

        let looped = |redirects: &[RedirectTarget]| NavigationError::RedirectLoop {
            path: path.to_string(),
            hops: redirects.len(),
            first_hop: redirects
                .first()
                .copied()
                .filter(|target| target.path() != requested_route.path),
        };

        loop {
            if !visited.insert((current.path.to_ascii_lowercase(), credentials.role)) {
                warn!(path, at = %current.path, hops = redirects.len(), "redirect loop");
                return Err(looped(redirects.as_slice()));
            }

            match self.guard.check(current.route, credentials) {
                GuardDecision::Allow => {
                    debug!(path, route = %current.route.name, hops = redirects.len(), "navigation allowed");
                    return Ok(Resolution {
                        requested_path: path.to_string(),
                        route: current.route,
                        params: current.params,
                        path: current.path,
                        redirects,
                        role_changed: credentials.role != initial_role,
                    });
                }
                GuardDecision::Redirect(target) => {
                    if redirects.len() >= self.max_redirects {
                        warn!(path, limit = self.max_redirects, "redirect limit reached");
                        return Err(looped(redirects.as_slice()));
                    }
                    redirects.push(target);
                    current = self
                        .table
                        .match_path(target.path())
                        .ok_or_else(|| NavigationError::NotFound(target.path().to_string()))?;
                }
            }
        }
    }

    /// Navigates with the session held in `storage`, writing the role back when
    /// the guard changed it.
    pub fn navigate(
        &self,
        path: &str,
        storage: &dyn SessionStorage,
    ) -> Result<Resolution<'_>, NavigationError> {
        let mut credentials = SessionCredentials::load(storage, self.legacy_token_key);
        let resolution = self.resolve(path, &mut credentials)?;
        if resolution.role_changed {
            credentials.persist_role(storage);
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::RouteMeta,
        session::{ACCESS_TOKEN_KEY, USER_ROLE_KEY},
        storage::MemorySessionStorage,
    };

    fn navigator(seller_auto_promote: bool) -> Navigator {
        let guard = RouteGuard::new(GuardPolicy { seller_auto_promote });
        Navigator::new(RouteTable::marketplace().unwrap(), guard, 5)
    }

    #[test]
    fn anonymous_user_dashboard_lands_on_login() {
        let navigator = navigator(false);
        let mut credentials = SessionCredentials::anonymous();
        let resolution = navigator.resolve("/user/dashboard", &mut credentials).unwrap();

        assert_eq!(resolution.route.name, "Login");
        assert_eq!(resolution.path, "/login");
        assert_eq!(resolution.redirects, vec![RedirectTarget::Login]);
    }

    #[test]
    fn admin_on_seller_items_lands_on_admin_dashboard() {
        let navigator = navigator(false);
        let mut credentials = SessionCredentials::new("t", Role::Admin);
        let resolution = navigator.resolve("/seller/items", &mut credentials).unwrap();

        assert_eq!(resolution.path, "/admin/dashboard");
        assert!(resolution.was_redirected());
        assert!(!resolution.role_changed);
    }

    #[test]
    fn redirect_chain_is_followed() {
        // Role-only metadata sends an anonymous visitor to the user dashboard,
        // which then asks for a token.
        let table = RouteTable::new(vec![
            RouteDescriptor::public("/login", "Login", "views/Login"),
            RouteDescriptor::protected("/user/dashboard", "UserDashboard", "views/U", Role::User),
            RouteDescriptor::public("/reports", "Reports", "views/R").with_meta(RouteMeta {
                requires_auth: false,
                role: Some(Role::Admin),
            }),
        ])
        .unwrap();
        let navigator = Navigator::new(table, RouteGuard::default(), 5);

        let resolution = navigator
            .resolve("/reports", &mut SessionCredentials::anonymous())
            .unwrap();
        assert_eq!(
            resolution.redirects,
            vec![RedirectTarget::Dashboard(Role::User), RedirectTarget::Login]
        );
        assert_eq!(resolution.route.name, "Login");
    }

    #[test]
    fn unrecognised_role_with_token_is_a_loop() {
        let navigator = navigator(false);
        let mut credentials = SessionCredentials::from_raw(Some("t".into()), Some("student"));
        let error = navigator.resolve("/user/orders", &mut credentials).unwrap_err();
        assert_eq!(
            error,
            NavigationError::RedirectLoop {
                path: "/user/orders".into(),
                hops: 2,
                first_hop: Some(RedirectTarget::Dashboard(Role::User)),
            }
        );
    }

    #[test]
    fn loop_on_the_dashboard_itself_has_no_way_out() {
        let navigator = navigator(false);
        let mut credentials = SessionCredentials::from_raw(Some("t".into()), None);
        let error = navigator.resolve("/user/dashboard", &mut credentials).unwrap_err();
        assert_eq!(
            error,
            NavigationError::RedirectLoop {
                path: "/user/dashboard".into(),
                hops: 1,
                first_hop: None,
            }
        );

        // From the admin dashboard the guard's own answer is still known.
        let error = navigator.resolve("/admin/dashboard", &mut credentials).unwrap_err();
        assert!(matches!(
            error,
            NavigationError::RedirectLoop {
                first_hop: Some(RedirectTarget::Dashboard(Role::User)),
                ..
            }
        ));
    }

    #[test]
    fn redirect_limit_is_enforced() {
        let guard = RouteGuard::default();
        let navigator = Navigator::new(RouteTable::marketplace().unwrap(), guard, 0);
        let error = navigator
            .resolve("/user/dashboard", &mut SessionCredentials::anonymous())
            .unwrap_err();
        assert!(matches!(error, NavigationError::RedirectLoop { hops: 0, .. }));
    }

    #[test]
    fn unknown_path_is_not_found() {
        let error = navigator(false)
            .resolve("/checkout", &mut SessionCredentials::anonymous())
            .unwrap_err();
        assert_eq!(error, NavigationError::NotFound("/checkout".into()));
    }

    #[test]
    fn params_survive_resolution() {
        let mut credentials = SessionCredentials::new("t", Role::Seller);
        let navigator = navigator(false);
        let resolution = navigator
            .resolve("/seller/items/XY-9/edit", &mut credentials)
            .unwrap();
        assert_eq!(resolution.route.name, "SellerEditItem");
        assert_eq!(resolution.params.get("id").map(String::as_str), Some("XY-9"));
    }

    #[test]
    fn promotion_is_persisted_and_seen_next_time() {
        let navigator = navigator(true);
        let storage =
            MemorySessionStorage::with_items([(ACCESS_TOKEN_KEY, "t"), (USER_ROLE_KEY, "user")]);

        let resolution = navigator.navigate("/seller/items", &storage).unwrap();
        assert_eq!(resolution.route.name, "SellerItems");
        assert!(resolution.role_changed);
        assert_eq!(storage.get_item(USER_ROLE_KEY).as_deref(), Some("seller"));

        let resolution = navigator.navigate("/user/dashboard", &storage).unwrap();
        assert_eq!(resolution.path, "/seller/dashboard");
    }

    #[test]
    fn strict_navigation_leaves_storage_untouched() {
        let navigator = navigator(false);
        let storage =
            MemorySessionStorage::with_items([(ACCESS_TOKEN_KEY, "t"), (USER_ROLE_KEY, "user")]);

        let first = navigator.navigate("/seller/items", &storage).unwrap();
        let second = navigator.navigate("/seller/items", &storage).unwrap();
        assert_eq!(first.path, "/user/dashboard");
        assert_eq!(first, second);
        assert_eq!(storage.get_item(USER_ROLE_KEY).as_deref(), Some("user"));
    }
}
