use axum::http::StatusCode;
use thiserror::Error;

use crate::guard::RedirectTarget;

/// RouteTableError
///
/// Raised while assembling a `RouteTable` from its declarative list. A table that
/// fails to build is a startup bug, so `main` treats these as fatal.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("route name `{0}` is declared more than once")]
    DuplicateName(String),

    #[error("route path `{path}` conflicts with an earlier route")]
    Conflict {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// NavigationError
///
/// Structural navigation failures. Guard denials are *not* errors: an
/// unauthenticated or mis-authorized visit always resolves to a redirect.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no route matches `{0}`")]
    NotFound(String),

    #[error("no route is named `{0}`")]
    UnknownRouteName(String),

    #[error("route `{route}` needs a value for `:{param}`")]
    MissingParam { route: String, param: String },

    /// `first_hop` is the guard's first redirect when it leads away from the
    /// requested route; the page gate still sends the visitor there.
    #[error("redirect loop while resolving `{path}` after {hops} hop(s)")]
    RedirectLoop {
        path: String,
        hops: usize,
        first_hop: Option<RedirectTarget>,
    },
}

impl NavigationError {
    /// Maps the failure onto the HTTP status the handlers reply with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            NavigationError::NotFound(_) | NavigationError::UnknownRouteName(_) => {
                StatusCode::NOT_FOUND
            }
            NavigationError::MissingParam { .. } => StatusCode::BAD_REQUEST,
            NavigationError::RedirectLoop { .. } => StatusCode::LOOP_DETECTED,
        }
    }
}
