use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use axum::{
    Router,
    handler::Handler,
    http::Method,
    middleware,
    routing::{self, MethodRouter},
};

use crate::{
    auth::{require_auth, require_superuser},
    config::AppConfig,
    error::{Error, Result},
    path,
};

/// Requirement
///
/// A named authorization requirement attached to a route group. Applied as a route
/// layer on every route registered through the group or any of its sub-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any authenticated identity (401 otherwise).
    Auth,
    /// An authenticated identity with the admin role (401 / 403 otherwise).
    Superuser,
}

impl Requirement {
    pub fn name(self) -> &'static str {
        match self {
            Requirement::Auth => "auth",
            Requirement::Superuser => "superuser",
        }
    }
}

struct RouteEntry {
    method: Method,
    path: String,
    requirements: Vec<Requirement>,
    handler: MethodRouter,
}

/// RouteInfo
///
/// A read-only view of one registered route, for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub requirements: Vec<Requirement>,
}

type RouteTable = Arc<Mutex<Vec<RouteEntry>>>;

/// ApiRouter
///
/// The routing tree handed out during the serve-starting moment. Groups carve out
/// prefixes and requirements; every route lands in one shared table that is turned
/// into an axum `Router` once all modules have mounted.
#[derive(Clone, Default)]
pub struct ApiRouter {
    table: RouteTable,
}

impl fmt::Debug for ApiRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRouter")
            .field("routes", &self.routes())
            .finish()
    }
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a group rooted at `prefix` with no requirements.
    pub fn group(&self, prefix: &str) -> RouteGroup {
        RouteGroup {
            prefix: path::join("", prefix),
            requirements: Vec::new(),
            table: Arc::clone(&self.table),
        }
    }

    /// Snapshot of everything registered so far, in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| RouteInfo {
                method: entry.method.clone(),
                path: entry.path.clone(),
                requirements: entry.requirements.clone(),
            })
            .collect()
    }

    /// build
    ///
    /// Turns the table into an axum `Router`, wrapping each route in the middleware of
    /// its requirements. Routes sharing a path but differing in method are merged by axum.
    ///
    /// # Errors
    /// `Error::RouteConflict` when the same method and path were registered twice,
    /// `Error::InvalidRoute` when a path uses legacy capture syntax or overlaps another
    /// pattern the router cannot tell apart.
    pub fn build(&self, config: &AppConfig) -> Result<Router> {
        let entries = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        let mut seen = HashSet::new();
        // Distinct paths, checked against the same matcher axum uses so overlapping
        // patterns fail here instead of panicking inside `Router::route`.
        let mut matcher = matchit::Router::new();
        let mut paths = HashSet::new();
        let mut router = Router::new();
        for entry in entries.iter() {
            if !seen.insert((entry.method.clone(), entry.path.clone())) {
                return Err(Error::RouteConflict {
                    method: entry.method.clone(),
                    path: entry.path.clone(),
                });
            }
            if paths.insert(entry.path.as_str()) {
                validate_path(&entry.path)?;
                matcher
                    .insert(entry.path.as_str(), ())
                    .map_err(|e| Error::InvalidRoute {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    })?;
            }

            let mut handler = entry.handler.clone();
            // Innermost first, so the outermost group's requirement runs first.
            for requirement in entry.requirements.iter().rev() {
                handler = match requirement {
                    Requirement::Auth => handler.route_layer(middleware::from_fn_with_state(
                        config.clone(),
                        require_auth,
                    )),
                    Requirement::Superuser => handler.route_layer(
                        middleware::from_fn_with_state(config.clone(), require_superuser),
                    ),
                };
            }

            tracing::debug!(method = %entry.method, path = %entry.path, "route mounted");
            router = router.route(&entry.path, handler);
        }
        Ok(router)
    }
}

/// Rejects the pre-0.8 capture syntax (`/:id`, `/*rest`) axum refuses to route.
fn validate_path(path: &str) -> Result<()> {
    let legacy = path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
    if legacy {
        return Err(Error::InvalidRoute {
            path: path.to_string(),
            reason: "captures are written `{name}` and wildcards `{*name}`".to_string(),
        });
    }
    Ok(())
}

/// RouteGroup
///
/// A handle on the routing tree scoped to a path prefix and a set of requirements.
/// Cloning or sub-grouping never changes the receiver.
#[derive(Clone)]
pub struct RouteGroup {
    prefix: String,
    requirements: Vec<Requirement>,
    table: RouteTable,
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .field("requirements", &self.requirements)
            .finish()
    }
}

impl RouteGroup {
    /// The composed prefix of this group, without leading or trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Returns a sub-group narrowed by `segment`, inheriting every requirement.
    pub fn group(&self, segment: &str) -> RouteGroup {
        RouteGroup {
            prefix: path::join(&self.prefix, segment),
            requirements: self.requirements.clone(),
            table: Arc::clone(&self.table),
        }
    }

    /// Attaches a requirement to this group. Adding the same requirement twice is a no-op.
    pub fn bind(mut self, requirement: Requirement) -> RouteGroup {
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
        self
    }

    pub fn get<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::GET, path, routing::get(handler))
    }

    pub fn post<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::POST, path, routing::post(handler))
    }

    pub fn put<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::PUT, path, routing::put(handler))
    }

    pub fn patch<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::PATCH, path, routing::patch(handler))
    }

    pub fn delete<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::DELETE, path, routing::delete(handler))
    }

    fn add(&self, method: Method, path: &str, handler: MethodRouter) -> &Self {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RouteEntry {
                method,
                path: path::route_path(&self.prefix, path),
                requirements: self.requirements.clone(),
                handler,
            });
        self
    }
}
