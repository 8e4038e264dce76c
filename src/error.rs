use axum::http::Method;
use thiserror::Error;

/// Error
///
/// Every failure the module host can surface. Module-supplied failures are carried
/// as `anyhow::Error` sources and are never inspected here, only wrapped with the
/// phase and tree position they came from.
#[derive(Debug, Error)]
pub enum Error {
    /// A module returned an error from `bind_hooks` during the first traversal.
    #[error("module `{module}` at `/{path}` failed to bind hooks")]
    BindHooks {
        module: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A module returned an error from `mount_routes` during the serve-start traversal.
    #[error("module `{module}` at `/{path}` failed to mount routes")]
    MountRoutes {
        module: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("module registry has already been initialized")]
    AlreadyInitialized,

    #[error("module routes have already been mounted")]
    RoutesAlreadyMounted,

    /// An earlier traversal failed. The registry stays in its failed state for good.
    #[error("module registry failed earlier and cannot mount routes")]
    RegistryFailed,

    /// A host hook handler failed for a reason other than a module traversal.
    #[error("`{point}` hook failed")]
    Hook {
        point: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The same method and path were registered twice on the routing tree.
    #[error("route `{method} {path}` is registered more than once")]
    RouteConflict { method: Method, path: String },

    /// A route path the router cannot accept: bad capture syntax, or a pattern that
    /// overlaps one registered earlier (e.g. `/{id}` next to `/{name}`).
    #[error("route `{path}` is invalid: {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
