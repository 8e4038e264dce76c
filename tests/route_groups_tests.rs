use std::sync::Arc;

use axum::http::Method;
use module_host::{
    ApiRouter, App, AppConfig, AppHooks, Error, Lifecycle, Module, ModuleRegistry, Requirement,
    RouteGroups, path,
};

// --- Path Composition ---

#[test]
fn test_join_drops_empty_pieces_and_slashes() {
    assert_eq!(path::join("", ""), "");
    assert_eq!(path::join("api", ""), "api");
    assert_eq!(path::join("", "v1"), "v1");
    assert_eq!(path::join("/api/", "/v1/"), "api/v1");
    assert_eq!(path::join("api//v1", "users/"), "api/v1/users");
}

#[test]
fn test_join_is_associative() {
    let segments = ["api", "", "v1", "users/{id}", "/"];
    for a in segments {
        for b in segments {
            for c in segments {
                assert_eq!(
                    path::join(&path::join(a, b), c),
                    path::join(a, &path::join(b, c)),
                    "join({a:?}, {b:?}, {c:?})"
                );
            }
        }
    }
}

#[test]
fn test_route_path_is_absolute() {
    assert_eq!(path::route_path("", ""), "/");
    assert_eq!(path::route_path("", "/"), "/");
    assert_eq!(path::route_path("api/v1", "/"), "/api/v1");
    assert_eq!(path::route_path("api/v1", "/items/{id}"), "/api/v1/items/{id}");
}

// --- Route Group Triple ---

fn root() -> RouteGroups {
    RouteGroups::root(&ApiRouter::new(), "api")
}

fn prefixes(groups: &RouteGroups) -> [String; 3] {
    [
        groups.public().prefix().to_string(),
        groups.authenticated().prefix().to_string(),
        groups.admin().prefix().to_string(),
    ]
}

#[test]
fn test_root_triple_carries_fixed_tiers() {
    let groups = root();

    assert!(groups.public().requirements().is_empty());
    assert_eq!(groups.authenticated().requirements(), [Requirement::Auth]);
    assert_eq!(groups.admin().requirements(), [Requirement::Superuser]);
    assert_eq!(prefixes(&groups), ["api", "api", "api"]);
}

#[test]
fn test_narrowing_twice_equals_narrowing_by_composition() {
    let groups = root();

    let stepwise = groups.with_prefix("a").with_prefix("b");
    let composed = groups.with_prefix("a/b");

    assert_eq!(prefixes(&stepwise), prefixes(&composed));
    assert_eq!(prefixes(&stepwise), ["api/a/b", "api/a/b", "api/a/b"]);
}

#[test]
fn test_narrowing_does_not_mutate_the_receiver() {
    let groups = root();

    let first = groups.with_prefix("first");
    let second = groups.with_prefix("second");

    assert_eq!(prefixes(&groups), ["api", "api", "api"]);
    assert_eq!(first.public().prefix(), "api/first");
    assert_eq!(second.public().prefix(), "api/second");
}

#[test]
fn test_empty_segment_is_a_no_op() {
    let groups = root().with_prefix("v1");

    assert_eq!(prefixes(&groups.with_prefix("")), prefixes(&groups));
}

#[test]
fn test_tiers_survive_any_number_of_narrowings() {
    let mut groups = root();
    for segment in ["a", "", "b/c", "d"] {
        groups = groups.with_prefix(segment);
    }

    assert!(groups.public().requirements().is_empty());
    assert_eq!(groups.authenticated().requirements(), [Requirement::Auth]);
    assert_eq!(groups.admin().requirements(), [Requirement::Superuser]);
}

// --- Routing Capability ---

#[test]
fn test_routes_record_full_path_and_requirements() {
    let router = ApiRouter::new();
    let groups = RouteGroups::root(&router, "api").with_prefix("v1");

    groups.public().get("/items", || async { "items" });
    groups.authenticated().post("/items", || async { "created" });
    groups.admin().delete("/items/{id}", || async { "deleted" });

    let routes = router.routes();
    assert_eq!(routes.len(), 3);
    assert_eq!(routes[0].method, Method::GET);
    assert_eq!(routes[0].path, "/api/v1/items");
    assert!(routes[0].requirements.is_empty());
    assert_eq!(routes[1].method, Method::POST);
    assert_eq!(routes[1].requirements, [Requirement::Auth]);
    assert_eq!(routes[2].path, "/api/v1/items/{id}");
    assert_eq!(routes[2].requirements, [Requirement::Superuser]);
}

#[test]
fn test_bind_is_inherited_and_idempotent() {
    let router = ApiRouter::new();
    let group = router
        .group("api")
        .bind(Requirement::Auth)
        .bind(Requirement::Auth);

    let nested = group.group("deep").bind(Requirement::Superuser);

    assert_eq!(group.requirements(), [Requirement::Auth]);
    assert_eq!(
        nested.requirements(),
        [Requirement::Auth, Requirement::Superuser]
    );
    assert_eq!(nested.prefix(), "api/deep");
}

#[test]
fn test_same_path_different_methods_builds() {
    let router = ApiRouter::new();
    let group = router.group("api");
    group.get("/things", || async { "list" });
    group.post("/things", || async { "create" });

    assert!(router.build(&AppConfig::default()).is_ok());
}

#[test]
fn test_duplicate_method_and_path_is_a_conflict() {
    let router = ApiRouter::new();
    router.group("api").get("/things", || async { "one" });
    router.group("api/").get("things", || async { "two" });

    match router.build(&AppConfig::default()) {
        Err(Error::RouteConflict { method, path }) => {
            assert_eq!(method, Method::GET);
            assert_eq!(path, "/api/things");
        }
        other => panic!("expected a route conflict, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_overlapping_captures_are_rejected() {
    let router = ApiRouter::new();
    let group = router.group("api/x");
    group.get("/{id}", || async { "by id" });
    group.get("/{name}", || async { "by name" });

    match router.build(&AppConfig::default()) {
        Err(Error::InvalidRoute { path, .. }) => assert_eq!(path, "/api/x/{name}"),
        other => panic!("expected an invalid route, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_legacy_capture_syntax_is_rejected() {
    for legacy in ["/:id", "/files/*rest"] {
        let router = ApiRouter::new();
        router.group("api").get(legacy, || async { "legacy" });

        let err = router.build(&AppConfig::default()).map(|_| ()).unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { .. }), "{legacy}: {err:?}");
    }
}

#[test]
fn test_one_capture_path_serves_several_methods() {
    let router = ApiRouter::new();
    let group = router.group("api/items");
    group.get("/{id}", || async { "show" });
    group.delete("/{id}", || async { "gone" });
    group.get("/{id}/tags/{*rest}", || async { "tags" });

    assert!(router.build(&AppConfig::default()).is_ok());
}

/// Mounts a public `GET /` under its own segment.
struct Index(&'static str);

impl Module for Index {
    fn path_segment(&self) -> &str {
        self.0
    }

    fn bind_hooks(&self, _hooks: &dyn AppHooks) -> anyhow::Result<()> {
        Ok(())
    }

    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()> {
        groups.public().get("/", || async { "index" });
        Ok(())
    }
}

#[test]
fn test_sibling_collision_is_reported_by_the_router_not_the_registry() {
    let app = Arc::new(App::new(AppConfig::default()));
    let mut registry = ModuleRegistry::new(Arc::clone(&app), "api");
    registry.register(Arc::new(Index("x")));
    registry.register(Arc::new(Index("x")));
    registry.init().unwrap();

    let err = app.start().unwrap_err();

    assert!(matches!(err, Error::RouteConflict { .. }));
    // Both modules mounted successfully; only the build step objected.
    assert_eq!(registry.lifecycle(), Lifecycle::RoutesMounted);
}

/// Mounts a public `GET` on an arbitrary pattern under its own segment.
struct Lookup {
    segment: &'static str,
    pattern: &'static str,
}

impl Module for Lookup {
    fn path_segment(&self) -> &str {
        self.segment
    }

    fn bind_hooks(&self, _hooks: &dyn AppHooks) -> anyhow::Result<()> {
        Ok(())
    }

    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()> {
        groups.public().get(self.pattern, || async { "found" });
        Ok(())
    }
}

#[test]
fn test_sibling_capture_overlap_fails_start_without_panicking() {
    let app = Arc::new(App::new(AppConfig::default()));
    let mut registry = ModuleRegistry::new(Arc::clone(&app), "api");
    registry.register(Arc::new(Lookup {
        segment: "x",
        pattern: "/{id}",
    }));
    registry.register(Arc::new(Lookup {
        segment: "x",
        pattern: "/{name}",
    }));
    registry.init().unwrap();

    match app.start() {
        Err(Error::InvalidRoute { path, reason }) => {
            assert_eq!(path, "/api/x/{name}");
            assert!(reason.contains("/api/x/{id}"), "{reason}");
        }
        other => panic!("expected an invalid route, got {:?}", other.map(|_| ())),
    }
}
