use std::sync::Arc;

use axum::{Extension, Json};
use module_host::{
    App, AppConfig, AppHooks, Env, Module, ModuleGroup, ModuleRegistry, RouteGroups,
    auth::AuthUser,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// StatusModule
///
/// Public liveness details plus an admin-only view of the running configuration.
struct StatusModule;

impl Module for StatusModule {
    fn path_segment(&self) -> &str {
        "status"
    }

    fn bind_hooks(&self, hooks: &dyn AppHooks) -> anyhow::Result<()> {
        hooks.on_bootstrap().bind_func(|event| {
            tracing::info!(payload = %event.payload, "status module saw bootstrap");
            Ok(())
        });
        Ok(())
    }

    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()> {
        groups
            .public()
            .get("/", || async { Json(json!({ "status": "ok" })) });
        groups.admin().get("/config", || async {
            Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
        });
        Ok(())
    }
}

/// ProfileModule
///
/// Authenticated "who am I" endpoint, and a log line whenever a user record is created.
struct ProfileModule;

impl Module for ProfileModule {
    fn path_segment(&self) -> &str {
        "profile"
    }

    fn bind_hooks(&self, hooks: &dyn AppHooks) -> anyhow::Result<()> {
        hooks.on_record_create(&["users"]).bind_func(|event| {
            tracing::info!(payload = %event.payload, "user record created");
            Ok(())
        });
        Ok(())
    }

    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()> {
        groups.authenticated().get("/", me);
        Ok(())
    }
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({ "id": user.id, "role": user.role }))
}

/// main
///
/// Loads configuration, sets up logging, registers the module tree and serves it.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "module_host=debug,tower_http=info,axum=trace".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let bind_addr = config.bind_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let app = Arc::new(App::new(config));

    let mut registry = ModuleRegistry::new(Arc::clone(&app), api_prefix);
    let v1: Vec<Arc<dyn Module>> = vec![Arc::new(StatusModule), Arc::new(ProfileModule)];
    registry.register(Arc::new(ModuleGroup::new("v1", v1)));
    registry.init()?;

    app.bootstrap()?;

    let listener = TcpListener::bind(&bind_addr).await?;
    app.serve(listener).await?;

    Ok(())
}
