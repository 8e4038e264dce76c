use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use crate::{
    config::AppConfig,
    error::{Error, Result},
    hooks::{AppHooks, Hook, HookEvent, HookPoint},
    routes::ApiRouter,
};

/// ServeEvent
///
/// Payload of the serve-starting moment. Handlers mount onto `router`; the host turns it
/// into the HTTP service once every handler has returned.
#[derive(Debug)]
pub struct ServeEvent {
    pub router: ApiRouter,
    pub config: AppConfig,
}

/// App
///
/// The host application: owns the hook bus, fires the lifecycle moments and serves the
/// routing tree. Module code only ever sees it through `AppHooks`.
pub struct App {
    config: AppConfig,
    hooks: Vec<Hook<HookEvent>>,
    on_serve: Hook<ServeEvent>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            hooks: HookPoint::ALL.iter().map(|_| Hook::new()).collect(),
            on_serve: Hook::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The serve-starting moment. Not part of the module hook surface.
    pub fn on_serve(&self) -> &Hook<ServeEvent> {
        &self.on_serve
    }

    /// dispatch
    ///
    /// Fires `point` with the given origin tags and payload. Tagged points only reach
    /// handlers whose subscription tags intersect `tags`.
    pub fn dispatch(
        &self,
        point: HookPoint,
        tags: &[&str],
        payload: serde_json::Value,
    ) -> Result<HookEvent> {
        let mut event = HookEvent::new(point, tags, payload);
        let hook = self.hook(point);

        tracing::trace!(%point, handlers = hook.len(), "dispatching hook");
        let outcome = if point.is_tagged() {
            hook.trigger_tagged(&mut event)
        } else {
            hook.trigger(&mut event)
        };

        outcome.map_err(|source| Error::Hook {
            point: point.as_str(),
            source,
        })?;
        Ok(event)
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.dispatch(
            HookPoint::Bootstrap,
            &[],
            json!({ "env": format!("{:?}", self.config.env) }),
        )?;
        tracing::info!("application bootstrapped");
        Ok(())
    }

    pub fn terminate(&self) -> Result<()> {
        self.dispatch(HookPoint::Terminate, &[], serde_json::Value::Null)?;
        tracing::info!("application terminated");
        Ok(())
    }

    /// start
    ///
    /// Fires the serve-starting moment on a fresh routing tree and builds the HTTP
    /// service from whatever the handlers mounted.
    ///
    /// # Errors
    /// A crate `Error` raised inside a serve handler (e.g. a module failing to mount) is
    /// returned as is; any other handler failure becomes `Error::Hook`.
    pub fn start(&self) -> Result<Router> {
        // 1. Fresh routing tree for this serve cycle.
        let mut event = ServeEvent {
            router: ApiRouter::new(),
            config: self.config.clone(),
        };
        // Liveness probe, outside every module prefix.
        event.router.group("").get("/health", || async { "ok" });

        // 2. Serve-starting moment: the registry mounts every module here.
        self.on_serve
            .trigger(&mut event)
            .map_err(|source| match source.downcast::<Error>() {
                Ok(err) => err,
                Err(source) => Error::Hook {
                    point: "serve",
                    source,
                },
            })?;

        // 3. Table to axum router, then the observability stack on top.
        let api = event.router.build(&self.config)?;
        tracing::info!(routes = event.router.routes().len(), "routing tree built");

        Ok(crate::create_router(api))
    }

    /// serve
    ///
    /// Starts the routing tree and serves it on `listener` until ctrl-c, then fires
    /// the terminate moment.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.start()?;

        tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.terminate()
    }
}

impl AppHooks for App {
    fn hook(&self, point: HookPoint) -> &Hook<HookEvent> {
        &self.hooks[point.index()]
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
