//! Handler chain behaviour through the dispatcher: global middleware ordering,
//! onion-model resumption and short-circuiting with `abort`.

use http::Method;
use muxtree::context::{handler, ChainState};
use muxtree::dispatcher::{Dispatch, Dispatcher};
use muxtree::RouterConfig;
use std::time::{Duration, Instant};

mod common;
use common::{entries, named, new_log, recording, wrapping};

fn handled(dispatch: Dispatch) -> muxtree::Context {
    match dispatch {
        Dispatch::Handled(ctx) => ctx,
        _ => panic!("expected a handled request"),
    }
}

#[test]
fn test_global_middleware_runs_before_route_handlers() {
    let log = new_log();
    let mut dispatcher = Dispatcher::new(RouterConfig::default());
    dispatcher.use_middleware(wrapping(&log, "logger"));
    dispatcher.use_middleware(wrapping(&log, "recovery"));
    dispatcher
        .get(
            "/pets/{id:int}",
            vec![recording(&log, "route-mw"), recording(&log, "get_pet")],
        )
        .unwrap();

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/pets/1"));
    assert_eq!(ctx.handler_count(), 4);
    assert_eq!(ctx.state(), ChainState::Completed);
    assert_eq!(
        entries(&log),
        vec![
            "logger:before",
            "recovery:before",
            "route-mw",
            "get_pet",
            "recovery:after",
            "logger:after",
        ]
    );
}

#[test]
fn test_middleware_added_later_does_not_affect_existing_routes() {
    let log = new_log();
    let mut dispatcher = Dispatcher::new(RouterConfig::default());
    dispatcher.get("/early", vec![recording(&log, "early")]).unwrap();
    dispatcher.use_middleware(recording(&log, "mw"));
    dispatcher.get("/late", vec![recording(&log, "late")]).unwrap();

    dispatcher.dispatch(&Method::GET, "/early");
    dispatcher.dispatch(&Method::GET, "/late");
    assert_eq!(entries(&log), vec!["early", "mw", "late"]);
}

#[test]
fn test_auth_middleware_aborts_chain() {
    let log = new_log();
    let mut dispatcher = Dispatcher::new(RouterConfig::default());
    let audit = recording(&log, "audit");
    dispatcher.use_middleware(handler(move |c| {
        audit(c);
        if c.param("token") != "secret" {
            c.abort_with_status(401);
        }
    }));
    dispatcher
        .get("/vault/{token}", vec![recording(&log, "open_vault")])
        .unwrap();

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/vault/guess"));
    assert!(ctx.is_aborted());
    assert_eq!(ctx.status(), Some(401));
    assert_eq!(entries(&log), vec!["audit"]);

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/vault/secret"));
    assert!(!ctx.is_aborted());
    assert_eq!(entries(&log), vec!["audit", "audit", "open_vault"]);
}

#[test]
fn test_abort_after_next_runs_each_handler_once() {
    let log = new_log();
    let dispatcher = Dispatcher::new(RouterConfig::default());
    let l = log.clone();
    let m1 = handler(move |c| {
        l.lock().unwrap().push("m1".to_string());
        c.next();
        c.abort();
    });
    dispatcher
        .get("/chain", vec![m1, recording(&log, "m2"), recording(&log, "m3")])
        .unwrap();

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/chain"));
    assert_eq!(entries(&log), vec!["m1", "m2", "m3"]);
    assert!(ctx.is_aborted());
}

#[test]
fn test_timing_middleware_sees_downstream_keys() {
    let mut dispatcher = Dispatcher::new(RouterConfig::default());
    dispatcher.use_middleware(handler(|c| {
        let started = Instant::now();
        c.next();
        c.keys().set("elapsed", started.elapsed());
        let saw = c.keys().string("handler").unwrap_or_default();
        c.keys().set("saw_handler", saw);
    }));
    dispatcher.get("/slow", vec![named("slow")]).unwrap();

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/slow"));
    assert!(ctx.keys().duration("elapsed").is_some_and(|d| d < Duration::from_secs(5)));
    assert_eq!(ctx.keys().string("saw_handler").as_deref(), Some("slow"));
}

#[test]
fn test_middleware_errors_are_collected() {
    let mut dispatcher = Dispatcher::new(RouterConfig::default());
    dispatcher.use_middleware(handler(|c| {
        c.next();
        let count = c.errors().len() as i64;
        c.keys().set("error_count", count);
    }));
    dispatcher
        .get(
            "/fails",
            vec![handler(|c| {
                c.error(anyhow::anyhow!("database unavailable"));
                c.set_status(503);
            })],
        )
        .unwrap();

    let ctx = handled(dispatcher.dispatch(&Method::GET, "/fails"));
    assert_eq!(ctx.status(), Some(503));
    assert_eq!(ctx.keys().int("error_count"), Some(1));
    assert_eq!(ctx.errors()[0].to_string(), "database unavailable");
}
