use super::group::{ApiRouter, RouteGroup, Requirement};

/// RouteGroups
///
/// The three authorization tiers a module mounts onto, always narrowed to the module's
/// own prefix before it sees them.
///
/// - **Public**: no requirement.
/// - **Authenticated**: `Requirement::Auth`.
/// - **Admin**: `Requirement::Superuser`.
///
/// Tiers are fixed when the root triple is built; narrowing only ever changes the path.
#[derive(Clone, Debug)]
pub struct RouteGroups {
    public: RouteGroup,
    authenticated: RouteGroup,
    admin: RouteGroup,
}

impl RouteGroups {
    /// root
    ///
    /// Builds the root triple on `router`, all three scoped under `base`.
    pub fn root(router: &ApiRouter, base: &str) -> Self {
        Self {
            public: router.group(base),
            authenticated: router.group(base).bind(Requirement::Auth),
            admin: router.group(base).bind(Requirement::Superuser),
        }
    }

    /// with_prefix
    ///
    /// Returns a new triple with every tier narrowed by `segment`. The receiver is left
    /// untouched and an empty segment yields an identical triple.
    pub fn with_prefix(&self, segment: &str) -> Self {
        Self {
            public: self.public.group(segment),
            authenticated: self.authenticated.group(segment),
            admin: self.admin.group(segment),
        }
    }

    pub fn public(&self) -> &RouteGroup {
        &self.public
    }

    pub fn authenticated(&self) -> &RouteGroup {
        &self.authenticated
    }

    pub fn admin(&self) -> &RouteGroup {
        &self.admin
    }
}
