use std::sync::Arc;

use crate::{hooks::AppHooks, routes::RouteGroups};

/// Module
///
/// The contract every pluggable feature unit implements. A module owns one path
/// segment, subscribes to host hooks once at bootstrap and mounts its routes once when
/// the server starts.
///
/// Modules are shared as `Arc<dyn Module>` and must be `Send + Sync` so the registry can
/// hand them to the serve-starting callback.
pub trait Module: Send + Sync {
    /// path_segment
    ///
    /// This module's own segment, appended to whatever prefix the parent supplies.
    /// Must be stable across calls. An empty segment contributes nothing.
    fn path_segment(&self) -> &str;

    /// bind_hooks
    ///
    /// Subscribes handlers on the host's hook surface. Must not register routes.
    /// An error aborts bootstrap.
    fn bind_hooks(&self, hooks: &dyn AppHooks) -> anyhow::Result<()>;

    /// mount_routes
    ///
    /// Registers routes on any of the three tiers. `groups` is already narrowed to this
    /// module's full prefix. An error aborts serve-start.
    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()>;

    /// Label used in logs and errors.
    fn name(&self) -> &str {
        match self.path_segment() {
            "" => "<root>",
            segment => segment,
        }
    }

    /// Capability test for modules that own children. Leaves keep the default.
    fn as_parent(&self) -> Option<&dyn ParentModule> {
        None
    }
}

/// ParentModule
///
/// Extended capability of a module that owns an ordered list of child modules. Children
/// are visited right after their parent, in order, in both traversals, so the returned
/// slice must be the same every time it is asked for.
pub trait ParentModule: Module {
    fn children(&self) -> &[Arc<dyn Module>];
}

/// ModuleGroup
///
/// A parent module with no hooks or routes of its own, used to nest children under a
/// shared segment (e.g. an API version).
pub struct ModuleGroup {
    segment: String,
    children: Vec<Arc<dyn Module>>,
}

impl ModuleGroup {
    pub fn new(segment: impl Into<String>, children: Vec<Arc<dyn Module>>) -> Self {
        Self {
            segment: segment.into(),
            children,
        }
    }
}

impl Module for ModuleGroup {
    fn path_segment(&self) -> &str {
        &self.segment
    }

    fn bind_hooks(&self, _hooks: &dyn AppHooks) -> anyhow::Result<()> {
        Ok(())
    }

    fn mount_routes(&self, _groups: &RouteGroups) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_parent(&self) -> Option<&dyn ParentModule> {
        Some(self)
    }
}

impl ParentModule for ModuleGroup {
    fn children(&self) -> &[Arc<dyn Module>] {
        &self.children
    }
}
