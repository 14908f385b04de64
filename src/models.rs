use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Route Schemas ---

/// Role
///
/// The three marketplace personas. Stored roles arrive as plain lowercase strings
/// (`"user"`, `"seller"`, `"admin"`); anything else parses to no role at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored role string is not one of the known personas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    // Exact match only: "Admin" is not "admin".
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// RouteMeta
///
/// Static access annotation on a route declaration. A route without metadata is public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RouteMeta {
    pub requires_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// RouteDescriptor
///
/// One entry of the route table: a path pattern (which may contain `:name`
/// segments), a unique display name, the view rendered for it, and its access
/// metadata. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteDescriptor {
    #[schema(example = "/seller/items/:id")]
    pub path: String,
    #[schema(example = "SellerViewItem")]
    pub name: String,
    #[schema(example = "views/seller/ViewItem")]
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<RouteMeta>,
}

impl RouteDescriptor {
    /// A route anyone may visit.
    pub fn public(path: &str, name: &str, view: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            view: view.to_string(),
            meta: None,
        }
    }

    /// A route that needs a token and the given role.
    pub fn protected(path: &str, name: &str, view: &str, role: Role) -> Self {
        Self::public(path, name, view).with_meta(RouteMeta {
            requires_auth: true,
            role: Some(role),
        })
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.meta.is_some_and(|meta| meta.requires_auth)
    }

    pub fn required_role(&self) -> Option<Role> {
        self.meta.and_then(|meta| meta.role)
    }
}

// --- Request Payloads (Input Schemas) ---

/// NavigateRequest
///
/// Input payload for `POST /api/navigate`. The credential context travels with the
/// request instead of being read from ambient storage. `role` is the raw stored
/// string, so unknown values are accepted and treated as "no role".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NavigateRequest {
    #[schema(example = "/seller/items")]
    pub path: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    #[schema(example = "admin")]
    pub role: Option<String>,
}

/// HrefRequest
///
/// Input payload for `POST /api/routes/href`: build a concrete path for a named route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HrefRequest {
    #[schema(example = "SellerEditItem")]
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HrefResponse {
    #[schema(example = "/seller/items/42/edit")]
    pub path: String,
}

/// NavigationDecision
///
/// `allow` when the requested route was entered directly, `redirect` when the
/// guard substituted another target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NavigationDecision {
    Allow,
    Redirect,
}

/// NavigateResponse
///
/// Outcome of a navigation attempt. `location` is where the client ends up after
/// every redirect has been followed and re-guarded. `role` is the credential role
/// after the attempt; `role_changed` flags the seller promotion so the caller can
/// persist it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigateResponse {
    pub decision: NavigationDecision,
    pub requested_path: String,
    pub location: String,
    pub route: RouteDescriptor,
    pub params: BTreeMap<String, String>,
    pub redirects: usize,
    pub role: Option<Role>,
    pub role_changed: bool,
    #[ts(type = "string")]
    pub evaluated_at: DateTime<Utc>,
}

/// PageResponse
///
/// Returned by the page gate when the visitor may stay on the requested page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageResponse {
    pub name: String,
    pub view: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

/// HealthResponse
///
/// Liveness answer, with the guard settings the running instance was started with.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "local")]
    pub environment: String,
    pub seller_auto_promote: bool,
    pub legacy_token_key: bool,
    pub max_redirects: usize,
}
