use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    app::App,
    error::{Error, Result},
    module::Module,
    path,
    routes::RouteGroups,
};

/// Lifecycle
///
/// Where a registry stands in its two-phase activation. `Failed` is terminal: nothing
/// already bound or mounted is rolled back and nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    HooksBound,
    RoutesScheduled,
    RoutesMounted,
    Failed,
}

/// ModuleRegistry
///
/// Holds the top-level modules, in registration order, and walks the whole module
/// forest twice: once eagerly to bind hooks, once on the host's serve-starting moment
/// to mount routes under `api_prefix`.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
    app: Arc<App>,
    api_prefix: String,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl ModuleRegistry {
    pub fn new(app: Arc<App>, api_prefix: impl Into<String>) -> Self {
        Self {
            modules: Vec::new(),
            app,
            api_prefix: api_prefix.into(),
            lifecycle: Arc::new(Mutex::new(Lifecycle::Uninitialized)),
        }
    }

    /// register
    ///
    /// Appends a top-level module. No validation: registering the same instance twice
    /// gets it visited twice.
    pub fn register(&mut self, module: Arc<dyn Module>) {
        if self.lifecycle() != Lifecycle::Uninitialized {
            tracing::warn!(
                module = module.name(),
                "module registered after init, it will not be visited"
            );
        }
        self.modules.push(module);
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// init
    ///
    /// Phase 1 runs now: every module binds its hooks in pre-order and the first failure
    /// is returned. Phase 2 is scheduled as a single serve-starting handler that mounts
    /// every module's routes when the host starts serving.
    ///
    /// # Errors
    /// `Error::AlreadyInitialized` on a second call, `Error::BindHooks` when a module fails.
    pub fn init(&mut self) -> Result<()> {
        if self.lifecycle() != Lifecycle::Uninitialized {
            return Err(Error::AlreadyInitialized);
        }

        if let Err(err) = self.bind_hooks() {
            self.set_lifecycle(Lifecycle::Failed);
            tracing::error!(error = %err, "hook binding aborted");
            return Err(err);
        }
        self.set_lifecycle(Lifecycle::HooksBound);

        let modules = self.modules.clone();
        let api_prefix = self.api_prefix.clone();
        let lifecycle = Arc::clone(&self.lifecycle);

        self.app.on_serve().bind_func(move |event| {
            let mut state = lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                Lifecycle::RoutesScheduled => {}
                Lifecycle::Failed => return Err(Error::RegistryFailed.into()),
                _ => return Err(Error::RoutesAlreadyMounted.into()),
            }

            let root = RouteGroups::root(&event.router, &api_prefix);
            match mount_routes(&modules, &root) {
                Ok(visited) => {
                    *state = Lifecycle::RoutesMounted;
                    tracing::info!(modules = visited, prefix = %api_prefix, "module routes mounted");
                    Ok(())
                }
                Err(err) => {
                    *state = Lifecycle::Failed;
                    tracing::error!(error = %err, "route mounting aborted");
                    Err(err.into())
                }
            }
        });
        self.set_lifecycle(Lifecycle::RoutesScheduled);

        Ok(())
    }

    fn bind_hooks(&self) -> Result<()> {
        let mut visited = 0;
        for module in &self.modules {
            let scope = path::join(&self.api_prefix, module.path_segment());
            walk(
                module.as_ref(),
                scope,
                &|parent: &String, child| path::join(parent, child.path_segment()),
                &mut |module, path| {
                    tracing::debug!(module = module.name(), path = %path, "binding hooks");
                    visited += 1;
                    module
                        .bind_hooks(self.app.as_ref())
                        .map_err(|source| Error::BindHooks {
                            module: module.name().to_string(),
                            path: path.clone(),
                            source,
                        })
                },
            )?;
        }
        tracing::info!(modules = visited, "module hooks bound");
        Ok(())
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Mounts every module under `root` in pre-order, returning how many were visited.
fn mount_routes(modules: &[Arc<dyn Module>], root: &RouteGroups) -> Result<usize> {
    let mut visited = 0;
    for module in modules {
        let groups = root.with_prefix(module.path_segment());
        walk(
            module.as_ref(),
            groups,
            &|parent: &RouteGroups, child| parent.with_prefix(child.path_segment()),
            &mut |module, groups| {
                let path = groups.public().prefix();
                tracing::debug!(module = module.name(), path = %path, "mounting routes");
                visited += 1;
                module
                    .mount_routes(groups)
                    .map_err(|source| Error::MountRoutes {
                        module: module.name().to_string(),
                        path: path.to_string(),
                        source,
                    })
            },
        )?;
    }
    Ok(visited)
}

/// walk
///
/// Pre-order traversal of one module subtree. `scope` is what `module` itself is
/// visited with; each child is visited with `narrow(scope, child)`. Children are asked
/// for once per call and the first visitor error stops the walk.
fn walk<C, N, V>(module: &dyn Module, scope: C, narrow: &N, visit: &mut V) -> Result<()>
where
    N: Fn(&C, &dyn Module) -> C,
    V: FnMut(&dyn Module, &C) -> Result<()>,
{
    visit(module, &scope)?;

    if let Some(parent) = module.as_parent() {
        for child in parent.children() {
            let child_scope = narrow(&scope, child.as_ref());
            walk(child.as_ref(), child_scope, narrow, visit)?;
        }
    }
    Ok(())
}
