#![allow(dead_code)]

use muxtree::context::{handler, Context, HandlerFunc, HandlersChain};
use std::sync::{Arc, Mutex};

/// Shared record of which handlers ran, in order.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Endpoint that stores its name under the `handler` key.
pub fn named(name: &'static str) -> HandlerFunc {
    handler(move |c: &mut Context| c.keys().set("handler", name))
}

pub fn chain_of(name: &'static str) -> HandlersChain {
    Arc::from(vec![named(name)])
}

/// Handler that appends `name` to `log`.
pub fn recording(log: &Log, name: &'static str) -> HandlerFunc {
    let log = Arc::clone(log);
    handler(move |_| log.lock().unwrap().push(name.to_string()))
}

/// Middleware that logs `name:before`, runs the rest of the chain, then logs `name:after`.
pub fn wrapping(log: &Log, name: &'static str) -> HandlerFunc {
    let log = Arc::clone(log);
    handler(move |c| {
        log.lock().unwrap().push(format!("{}:before", name));
        c.next();
        log.lock().unwrap().push(format!("{}:after", name));
    })
}
