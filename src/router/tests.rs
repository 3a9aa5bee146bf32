use super::{MatchResult, Router, ShadowedRoute};
use crate::context::{handler, Context, HandlersChain};
use crate::error::RouterError;
use http::Method;
use std::sync::Arc;

/// A one-handler chain that records `name` under the `route` key.
fn chain(name: &'static str) -> HandlersChain {
    Arc::from(vec![handler(move |c: &mut Context| c.keys().set("route", name))])
}

/// Run the matched chain and report which route it belonged to.
fn route_name(m: &MatchResult) -> Option<String> {
    let handlers = m.handlers.clone()?;
    let mut ctx = Context::new(Method::GET, "", m.params.clone(), None, handlers);
    ctx.next();
    ctx.keys().string("route")
}

fn router(routes: &[(&str, &'static str)]) -> Router {
    let mut r = Router::new();
    for (pattern, name) in routes {
        r.register(Method::GET, pattern, chain(name)).unwrap();
    }
    r
}

fn get(r: &Router, path: &str) -> MatchResult {
    r.match_route(&Method::GET, path, true)
}

#[test]
fn test_root_path() {
    let r = router(&[("/", "root")]);
    let m = get(&r, "/");
    assert_eq!(route_name(&m).as_deref(), Some("root"));
    assert!(m.params.is_empty());
    assert!(!m.tsr);
}

#[test]
fn test_static_routes_have_no_params() {
    let paths = ["/", "/health", "/api/v1/users", "/api/v1/users/me", "/assets/app.js"];
    let routes: Vec<(&str, &'static str)> = paths.iter().map(|p| (*p, *p)).collect();
    let r = router(&routes);
    for path in paths {
        let m = get(&r, path);
        assert_eq!(route_name(&m).as_deref(), Some(path), "path {path}");
        assert!(m.params.is_empty());
        assert_eq!(m.full_path.as_deref(), Some(path));
    }
}

#[test]
fn test_word_param_captures_token() {
    let r = router(&[("/items/{id}", "item"), ("/a/{b}/c", "nested")]);

    for token in ["123", "abc", "foo_bar", "X9"] {
        let m = get(&r, &format!("/items/{token}"));
        assert_eq!(route_name(&m).as_deref(), Some("item"));
        assert_eq!(m.param("id"), Some(token));
    }

    let m = get(&r, "/a/1/c");
    assert_eq!(route_name(&m).as_deref(), Some("nested"));
    assert_eq!(m.param("b"), Some("1"));
    assert_eq!(m.full_path.as_deref(), Some("/a/{b}/c"));
}

#[test]
fn test_int_param_rejects_non_numeric() {
    let r = router(&[("/orders/{id:int}", "order")]);
    assert_eq!(get(&r, "/orders/42").param("id"), Some("42"));
    assert!(!get(&r, "/orders/abc").is_match());
    assert!(!get(&r, "/orders/4x2").is_match());
    assert!(!get(&r, "/orders/").is_match());
}

#[test]
fn test_typed_param_falls_through_to_static_sibling() {
    let r = router(&[("/users/{id:int}", "H1"), ("/users/profile", "H2")]);

    let m = get(&r, "/users/42");
    assert_eq!(route_name(&m).as_deref(), Some("H1"));
    assert_eq!(m.params.len(), 1);
    assert_eq!(m.param("id"), Some("42"));

    let m = get(&r, "/users/profile");
    assert_eq!(route_name(&m).as_deref(), Some("H2"));
    assert!(m.params.is_empty());

    assert!(!get(&r, "/users/settings").is_match());
}

#[test]
fn test_trailing_slash_redirect_both_directions() {
    let r = router(&[("/a/b", "no-slash"), ("/x/y/", "slash")]);

    let m = get(&r, "/a/b/");
    assert!(m.tsr);
    assert!(m.handlers.is_none());

    let m = get(&r, "/x/y");
    assert!(m.tsr);
    assert!(m.handlers.is_none());

    assert_eq!(route_name(&get(&r, "/a/b")).as_deref(), Some("no-slash"));
    assert_eq!(route_name(&get(&r, "/x/y/")).as_deref(), Some("slash"));

    let miss = get(&r, "/nothing/");
    assert!(!miss.tsr && !miss.is_match());
}

#[test]
fn test_trailing_slash_redirect_with_params() {
    let r = router(&[("/users/{id:int}", "user")]);
    assert!(get(&r, "/users/7/").tsr);
    assert!(!get(&r, "/users/abc/").tsr);
}

#[test]
fn test_catch_all_wins_over_trailing_slash_redirect() {
    let r = router(&[("/a/b", "exact"), ("/a/*rest", "rest")]);
    let m = get(&r, "/a/b/");
    assert_eq!(route_name(&m).as_deref(), Some("rest"));
    assert_eq!(m.param("rest"), Some("b"));
    assert!(!m.tsr);

    // tree-resolvable routes still answer with the redirect hint
    let r = router(&[("/a/b", "exact"), ("/a/{x}", "param")]);
    let m = get(&r, "/a/b/");
    assert!(m.tsr);
    assert!(m.handlers.is_none());
}

#[test]
fn test_params_accept_ascii_only_in_tree_and_fallback() {
    // tree-resolvable and fallback-only variants of the same token shapes
    let r = router(&[
        ("/users/{id:int}", "user"),
        ("/items/{id}", "item"),
        ("/orders/{id:int}.json", "order"),
        ("/tags/{tag}.json", "tag"),
    ]);
    assert_eq!(get(&r, "/users/42").param("id"), Some("42"));
    assert_eq!(get(&r, "/orders/42.json").param("id"), Some("42"));

    for path in [
        "/users/\u{664}\u{662}",
        "/users/\u{ff14}\u{ff12}",
        "/orders/\u{664}\u{662}.json",
        "/items/x\u{b2}",
        "/items/caf\u{e9}",
        "/tags/x\u{b2}.json",
    ] {
        assert!(!get(&r, path).is_match(), "{path} should not match");
    }

    r.finalize();
    assert!(!get(&r, "/users/\u{664}\u{662}").is_match());
}

#[test]
fn test_catch_all_is_greedy() {
    let r = router(&[("/static/*filepath", "static"), ("/cmd/{tool}/*action", "cmd")]);

    let m = get(&r, "/static/a/b/c.js");
    assert_eq!(route_name(&m).as_deref(), Some("static"));
    assert_eq!(m.param("filepath"), Some("a/b/c.js"));

    let m = get(&r, "/cmd/git/commit/amend");
    assert_eq!(m.param("tool"), Some("git"));
    assert_eq!(m.param("action"), Some("commit/amend"));
}

#[test]
fn test_fallback_strips_trailing_slash_except_for_files() {
    let r = router(&[("/static/*filepath", "static")]);
    assert_eq!(get(&r, "/static/docs/").param("filepath"), Some("docs"));
    // last segment looks like a file name, the slash is kept
    assert_eq!(get(&r, "/static/app.js/").param("filepath"), Some("app.js/"));
}

#[test]
fn test_double_slashes_are_collapsed() {
    let r = router(&[("/api/users/{id}", "user"), ("/files/*rest", "files")]);
    assert_eq!(get(&r, "//api///users//9").param("id"), Some("9"));
    assert_eq!(get(&r, "/files//a//b").param("rest"), Some("a/b"));
}

#[test]
fn test_matching_is_case_insensitive_and_values_keep_case() {
    let r = router(&[("/Users/{name}", "user"), ("/docs/*path", "docs")]);

    let m = get(&r, "/USERS/Alice");
    assert_eq!(route_name(&m).as_deref(), Some("user"));
    assert_eq!(m.param("name"), Some("Alice"));
    assert_eq!(m.full_path.as_deref(), Some("/Users/{name}"));

    assert_eq!(get(&r, "/DOCS/Read.ME").param("path"), Some("Read.ME"));
}

#[test]
fn test_unescape_applies_to_fallback_captures() {
    let r = router(&[("/files/*path", "files")]);
    let decoded = r.match_route(&Method::GET, "/files/my%20notes.txt", true);
    assert_eq!(decoded.param("path"), Some("my notes.txt"));
    let raw = r.match_route(&Method::GET, "/files/my%20notes.txt", false);
    assert_eq!(raw.param("path"), Some("my%20notes.txt"));
}

#[test]
fn test_mixed_segments_use_fallback() {
    let r = router(&[("/reports/{year:int}-{month:int}.csv", "report")]);
    let m = get(&r, "/reports/2024-05.csv");
    assert_eq!(m.param("year"), Some("2024"));
    assert_eq!(m.param("month"), Some("05"));
    assert!(!get(&r, "/reports/2024-may.csv").is_match());
}

#[test]
fn test_fallback_tries_routes_in_registration_order() {
    let r = router(&[("/img/*rest", "catch-all"), ("/img/{name}.png", "png")]);
    let m = get(&r, "/img/logo.png");
    assert_eq!(route_name(&m).as_deref(), Some("catch-all"));
    assert_eq!(m.param("rest"), Some("logo.png"));

    let r = router(&[("/img/{name}.png", "png"), ("/img/*rest", "catch-all")]);
    let m = get(&r, "/img/logo.png");
    assert_eq!(route_name(&m).as_deref(), Some("png"));
    assert_eq!(m.param("name"), Some("logo"));
}

#[test]
fn test_shadowed_route_is_reported() {
    let r = router(&[("/img/*rest", "catch-all"), ("/img/{name}.png", "png")]);
    assert_eq!(
        r.shadowed_routes(),
        &[ShadowedRoute {
            method: Method::GET,
            pattern: "/img/{name}.png".to_string(),
            shadowed_by: "/img/*rest".to_string(),
        }]
    );

    // tree-resolvable routes are matched before the fallback and are never shadowed
    let r = router(&[("/img/*rest", "catch-all"), ("/img/{name}", "name")]);
    assert!(r.shadowed_routes().is_empty());
    assert_eq!(route_name(&get(&r, "/img/logo")).as_deref(), Some("name"));
}

#[test]
fn test_flatten_is_idempotent() {
    let r = router(&[
        ("/users/{id:int}", "a"),
        ("/users/profile", "b"),
        ("/static/*filepath", "c"),
        ("/v/{x}.json", "d"),
    ]);
    let first = r.route_table(&Method::GET).unwrap();
    r.finalize();
    let second = r.route_table(&Method::GET).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let rebuilt = r.clone();
    rebuilt.finalize();
    let third = rebuilt.route_table(&Method::GET).unwrap();
    let describe = |t: &super::RouteTable| -> Vec<(String, String)> {
        t.iter()
            .map(|e| (e.full_path().to_string(), e.regex().as_str().to_string()))
            .collect()
    };
    assert_eq!(describe(&first), describe(&third));
    assert_eq!(first.len(), 4);
}

#[test]
fn test_registration_invalidates_table() {
    let mut r = router(&[("/a/*rest", "a")]);
    assert_eq!(r.route_table(&Method::GET).unwrap().len(), 1);
    r.register(Method::GET, "/b/*rest", chain("b")).unwrap();
    assert_eq!(r.route_table(&Method::GET).unwrap().len(), 2);
    assert_eq!(route_name(&get(&r, "/b/x")).as_deref(), Some("b"));
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut r = router(&[("/users/{id}", "first")]);
    let err = r
        .register(Method::GET, "/USERS/{id}", chain("second"))
        .unwrap_err();
    assert_eq!(
        err,
        RouterError::RouteConflict {
            method: Method::GET,
            pattern: "/USERS/{id}".to_string(),
        }
    );
    // the tree is untouched
    assert_eq!(route_name(&get(&r, "/users/1")).as_deref(), Some("first"));
    assert_eq!(r.routes().len(), 1);

    // same pattern under another method is fine
    r.register(Method::POST, "/users/{id}", chain("post")).unwrap();
}

#[test]
fn test_param_name_variants_first_registered_wins() {
    let mut r = router(&[("/users/{id}", "first")]);
    r.register(Method::GET, "/users/{name}", chain("second"))
        .unwrap();
    let m = get(&r, "/users/bob");
    assert_eq!(route_name(&m).as_deref(), Some("first"));
    assert_eq!(m.param("id"), Some("bob"));
}

#[test]
fn test_malformed_and_unsupported_registrations() {
    let mut r = Router::new();
    assert!(matches!(
        r.register(Method::GET, "/users/{id", chain("x")),
        Err(RouterError::MalformedPattern { .. })
    ));
    assert!(matches!(
        r.register(Method::GET, "/files/*rest/more", chain("x")),
        Err(RouterError::MalformedPattern { .. })
    ));
    assert_eq!(
        r.register(Method::CONNECT, "/", chain("x")),
        Err(RouterError::UnsupportedMethod(Method::CONNECT))
    );
    assert!(r.routes().is_empty());
}

#[test]
fn test_duplicate_param_names_last_wins() {
    let r = router(&[("/pair/{v}/{v}", "pair")]);
    let m = get(&r, "/pair/first/second");
    assert_eq!(m.params.len(), 2);
    assert_eq!(m.param("v"), Some("second"));
}

#[test]
fn test_methods_are_independent() {
    let mut r = Router::new();
    r.register(Method::GET, "/items", chain("list")).unwrap();
    r.register(Method::POST, "/items", chain("create")).unwrap();

    assert_eq!(route_name(&get(&r, "/items")).as_deref(), Some("list"));
    let m = r.match_route(&Method::POST, "/items", true);
    assert_eq!(route_name(&m).as_deref(), Some("create"));
    assert!(!r.match_route(&Method::DELETE, "/items", true).is_match());
    assert_eq!(r.allowed_methods("/items"), vec![Method::GET, Method::POST]);
}

#[test]
fn test_routes_and_dump() {
    let r = router(&[("/users", "a"), ("/users/{id:int}", "b"), ("/static/*f", "c")]);
    let routes: Vec<String> = r.routes().iter().map(|(_, p)| p.to_string()).collect();
    assert_eq!(routes, vec!["/users", "/users/{id:int}", "/static/*f"]);

    let dump = r.dump_routes();
    assert_eq!(dump[0], "[GET] routes=3");
    assert!(dump.iter().any(|l| l.contains("{id:int}")));
}

#[test]
fn test_unknown_method_tree_is_no_match() {
    let r = router(&[("/", "root")]);
    let m = r.match_route(&Method::PUT, "/", true);
    assert!(!m.is_match());
    assert!(!m.tsr);
}
