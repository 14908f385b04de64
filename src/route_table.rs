use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use matchit::Router as MatchitRouter;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::{
    error::{NavigationError, RouteTableError},
    models::{RouteDescriptor, Role},
};

/// Bytes escaped when a value fills a `:name` segment, so it stays one segment
/// and cannot start a query or fragment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// RouteMatch
///
/// A route table hit: the descriptor, the `:name` segment values taken from the
/// visited path (original case), and the normalized path that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    pub params: BTreeMap<String, String>,
    pub path: String,
}

/// RouteTable
///
/// Ordered, immutable list of route descriptors with two indexes:
/// - name -> position, for href building and lookups by name
/// - path pattern -> position, matched with `matchit`
///
/// Matching follows browser-router defaults: the query string and fragment are
/// ignored, a trailing slash is optional, and static segments are case-insensitive.
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    name_index: HashMap<String, usize>,
    path_router: MatchitRouter<usize>,
}

impl RouteTable {
    /// Builds the table, rejecting duplicate names and conflicting path patterns.
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, RouteTableError> {
        let mut name_index = HashMap::with_capacity(routes.len());
        let mut path_router = MatchitRouter::new();

        for (position, route) in routes.iter().enumerate() {
            if name_index.insert(route.name.clone(), position).is_some() {
                return Err(RouteTableError::DuplicateName(route.name.clone()));
            }
            path_router
                .insert(matchit_pattern(&route.path), position)
                .map_err(|source| RouteTableError::Conflict {
                    path: route.path.clone(),
                    source,
                })?;
        }

        Ok(Self {
            routes,
            name_index,
            path_router,
        })
    }

    /// The marketplace's buyer, seller and admin routes.
    pub fn marketplace() -> Result<Self, RouteTableError> {
        Self::new(marketplace_routes())
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.name_index.get(name).map(|&position| &self.routes[position])
    }

    /// Finds the route a visited path lands on. Empty segments never match, so
    /// `/seller/items//edit` does not bind `:id` to `""`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path)?;
        let lookup = path.to_ascii_lowercase();
        let matched = self.path_router.at(&lookup).ok()?;
        let route = &self.routes[*matched.value];

        Some(RouteMatch {
            route,
            params: extract_params(&route.path, path),
            path: path.to_string(),
        })
    }

    /// Builds a concrete path for a named route, filling each `:name` segment with
    /// its percent-encoded value.
    pub fn href(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, NavigationError> {
        let route = self
            .by_name(name)
            .ok_or_else(|| NavigationError::UnknownRouteName(name.to_string()))?;

        let segments = route
            .path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(param) => params
                    .get(param)
                    .filter(|value| !value.is_empty())
                    .map(|value| utf8_percent_encode(value, SEGMENT).to_string())
                    .ok_or_else(|| NavigationError::MissingParam {
                        route: route.name.clone(),
                        param: param.to_string(),
                    }),
                None => Ok(segment.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(segments.join("/"))
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// Strips query and fragment, then one trailing slash (the root stays `/`).
/// `None` when the remaining path has an empty segment.
fn normalize_path(path: &str) -> Option<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.contains("//") {
        return None;
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    Some(if trimmed.is_empty() { "/" } else { trimmed })
}

/// `/seller/items/:id` -> `/seller/items/{id}`, static segments lowercased.
fn matchit_pattern(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(param) => format!("{{{param}}}"),
            None => segment.to_ascii_lowercase(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

// Patterns are segment-based, so zipping segments recovers the original-case values.
// Invalid UTF-8 after decoding is replaced rather than rejected.
fn extract_params(pattern: &str, path: &str) -> BTreeMap<String, String> {
    pattern
        .split('/')
        .zip(path.split('/'))
        .filter_map(|(segment, value)| {
            segment
                .strip_prefix(':')
                .map(|param| {
                    let value = percent_decode_str(value).decode_utf8_lossy();
                    (param.to_string(), value.into_owned())
                })
        })
        .collect()
}

fn marketplace_routes() -> Vec<RouteDescriptor> {
    use RouteDescriptor as R;

    vec![
        R::public("/", "Landing", "views/Landing"),
        R::public("/login", "Login", "views/Login"),
        R::public("/register", "Register", "views/Register"),
        // Buyer
        R::protected("/user/dashboard", "UserDashboard", "views/user/dashboard/Index", Role::User),
        R::protected("/user/profile", "UserProfile", "views/user/dashboard/Profile", Role::User),
        R::protected("/user/orders", "UserOrders", "views/user/dashboard/Orders", Role::User),
        R::protected(
            "/user/orders/:id",
            "UserOrderDetails",
            "views/user/dashboard/OrderDetails",
            Role::User,
        ),
        R::protected("/user/wishlist", "UserWishlist", "views/user/dashboard/Wishlist", Role::User),
        R::protected("/user/settings", "UserSettings", "views/user/dashboard/Settings", Role::User),
        // Buyer categories
        R::protected(
            "/user/collectibles",
            "UserCollectibles",
            "views/user/dashboard/Collectibles",
            Role::User,
        ),
        R::protected("/user/antiques", "UserAntiques", "views/user/dashboard/Antiques", Role::User),
        R::protected("/user/coins", "UserCoins", "views/user/dashboard/Coins", Role::User),
        R::protected("/user/others", "UserOthers", "views/user/dashboard/Others", Role::User),
        // Admin
        R::protected("/admin/dashboard", "AdminDashboard", "views/admin/dashboard/Index", Role::Admin),
        // Seller
        R::protected("/seller/dashboard", "SellerDashboard", "views/seller/dashboard/Index", Role::Seller),
        R::protected("/seller/items", "SellerItems", "views/seller/Items", Role::Seller),
        R::protected("/seller/profile", "SellerProfile", "views/seller/Profile", Role::Seller),
        R::protected(
            "/seller/create-product",
            "SellerCreateProduct",
            "views/seller/CreateProduct",
            Role::Seller,
        ),
        R::protected("/seller/create-item", "SellerCreateItem", "views/seller/CreateItem", Role::Seller),
        R::protected("/seller/items/:id", "SellerViewItem", "views/seller/ViewItem", Role::Seller),
        R::protected("/seller/items/:id/edit", "SellerEditItem", "views/seller/EditItem", Role::Seller),
        R::protected(
            "/seller/products/:id/edit",
            "SellerEditProduct",
            "views/seller/EditProduct",
            Role::Seller,
        ),
        R::protected("/seller/orders", "SellerOrders", "views/seller/Orders", Role::Seller),
        R::protected("/seller/settings", "SellerSettings", "views/seller/Settings", Role::Seller),
    ]
}
