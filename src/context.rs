//! # Context Module
//!
//! [`Context`] carries one request through its handler chain. Handlers are plain
//! closures over `&mut Context`; middleware calls [`Context::next`] to run the rest of
//! the chain and resumes afterwards (onion model), or calls [`Context::abort`] to stop
//! it.
//!
//! ```rust
//! use muxtree::context::{handler, Context};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let chain = Arc::from(vec![
//!     handler(|c: &mut Context| {
//!         c.keys().set("before", true);
//!         c.next();
//!         c.keys().set("after", true);
//!     }),
//!     handler(|c: &mut Context| c.set_status(204)),
//! ]);
//!
//! let mut ctx = Context::new(Method::GET, "/ping", Default::default(), None, chain);
//! ctx.next();
//! assert_eq!(ctx.status(), Some(204));
//! assert_eq!(ctx.keys().bool("after"), Some(true));
//! ```

use http::Method;
use std::sync::Arc;

use crate::error::RouterError;
use crate::ids::RequestId;
use crate::keys::Keys;
use crate::router::Params;

/// A handler or middleware.
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Ordered handlers bound to one route: middleware first, the endpoint last.
pub type HandlersChain = Arc<[HandlerFunc]>;

/// Wrap a closure as a [`HandlerFunc`].
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Execution state of a handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// `next()` has not been called yet
    Pending,
    /// Handlers are executing
    Running,
    /// A handler called `abort()`; nothing else will run
    Aborted,
    /// Every handler was started
    Completed,
}

/// Per-request state shared by the handlers of one chain.
pub struct Context {
    request_id: RequestId,
    method: Method,
    path: String,
    full_path: Option<Arc<str>>,
    params: Params,
    handlers: HandlersChain,
    /// Index of the next handler to start
    cursor: usize,
    state: ChainState,
    status: Option<u16>,
    keys: Keys,
    errors: Vec<anyhow::Error>,
}

impl Context {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        params: Params,
        full_path: Option<Arc<str>>,
        handlers: HandlersChain,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            full_path,
            params,
            handlers,
            cursor: 0,
            state: ChainState::Pending,
            status: None,
            keys: Keys::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Run the pending handlers.
    ///
    /// Called by the dispatcher to start the chain and by middleware to run the
    /// remaining handlers before continuing its own work. Every handler runs at
    /// most once; an aborted chain runs nothing further.
    pub fn next(&mut self) {
        if matches!(self.state, ChainState::Pending) {
            self.state = ChainState::Running;
        }
        while self.state == ChainState::Running {
            let Some(current) = self.handlers.get(self.cursor).map(Arc::clone) else {
                self.state = ChainState::Completed;
                break;
            };
            self.cursor += 1;
            current(self);
        }
    }

    /// Stop the chain. Handlers that have not started will not run.
    pub fn abort(&mut self) {
        self.state = ChainState::Aborted;
    }

    /// Abort and record a response status.
    pub fn abort_with_status(&mut self, status: u16) {
        self.status = Some(status);
        self.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.state == ChainState::Aborted
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path as received.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pattern of the matched route, e.g. `/users/{id}`; `None` for unmatched requests.
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Path parameter by name; an absent parameter reads as `""`.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).unwrap_or_default()
    }

    /// Path parameter parsed as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidParam`] when the parameter is absent or not a number.
    pub fn param_int(&self, key: &str) -> Result<i64, RouterError> {
        let value = self.param(key);
        value.parse().map_err(|_| RouterError::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Path parameter parsed as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidParam`] when the parameter is absent or not a number.
    pub fn param_uint(&self, key: &str) -> Result<u64, RouterError> {
        let value = self.param(key);
        value.parse().map_err(|_| RouterError::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    /// Attach an error for later middleware (e.g. an error logger) to inspect.
    pub fn error(&mut self, err: impl Into<anyhow::Error>) {
        self.errors.push(err.into());
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording(log: &Log, name: &'static str) -> HandlerFunc {
        let log = Arc::clone(log);
        handler(move |_| log.lock().unwrap().push(name))
    }

    fn run(chain: Vec<HandlerFunc>) -> Context {
        let mut ctx = Context::new(Method::GET, "/", Params::new(), None, Arc::from(chain));
        ctx.next();
        ctx
    }

    #[test]
    fn test_chain_runs_in_order() {
        let log: Log = Default::default();
        let ctx = run(vec![recording(&log, "a"), recording(&log, "b")]);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(ctx.state(), ChainState::Completed);
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_onion_model() {
        let log: Log = Default::default();
        let l = Arc::clone(&log);
        let outer = handler(move |c| {
            l.lock().unwrap().push("outer:before");
            c.next();
            l.lock().unwrap().push("outer:after");
        });
        run(vec![outer, recording(&log, "inner")]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:before", "inner", "outer:after"]
        );
    }

    #[test]
    fn test_abort_without_next_stops_chain() {
        let log: Log = Default::default();
        let l = Arc::clone(&log);
        let m1 = handler(move |c| {
            l.lock().unwrap().push("m1");
            c.abort();
        });
        let ctx = run(vec![m1, recording(&log, "m2"), recording(&log, "m3")]);
        assert_eq!(*log.lock().unwrap(), vec!["m1"]);
        assert!(ctx.is_aborted());
    }

    #[test]
    fn test_abort_after_next_runs_each_handler_once() {
        let log: Log = Default::default();
        let l = Arc::clone(&log);
        let m1 = handler(move |c| {
            l.lock().unwrap().push("m1");
            c.next();
            c.abort();
        });
        let mut ctx = run(vec![m1, recording(&log, "m2"), recording(&log, "m3")]);
        assert_eq!(*log.lock().unwrap(), vec!["m1", "m2", "m3"]);
        assert!(ctx.is_aborted());

        // a stray next() on a finished chain runs nothing
        ctx.next();
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_abort_in_middle_skips_rest() {
        let log: Log = Default::default();
        let l = Arc::clone(&log);
        let m2 = handler(move |c| {
            l.lock().unwrap().push("m2");
            c.abort_with_status(401);
        });
        let ctx = run(vec![recording(&log, "m1"), m2, recording(&log, "m3")]);
        assert_eq!(*log.lock().unwrap(), vec!["m1", "m2"]);
        assert_eq!(ctx.status(), Some(401));
    }

    #[test]
    fn test_param_accessors() {
        let mut params = Params::new();
        params.push("id".into(), "42".to_string());
        params.push("name".into(), "bob".to_string());
        let ctx = Context::new(Method::GET, "/u/42/bob", params, None, Arc::from(Vec::new()));

        assert_eq!(ctx.param("id"), "42");
        assert_eq!(ctx.param("missing"), "");
        assert_eq!(ctx.param_int("id").unwrap(), 42);
        assert_eq!(ctx.param_uint("id").unwrap(), 42);
        assert!(matches!(
            ctx.param_int("name"),
            Err(RouterError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_errors_are_collected() {
        let chain = vec![
            handler(|c| c.error(anyhow::anyhow!("first"))),
            handler(|c| c.error(std::io::Error::other("second"))),
        ];
        let ctx = run(chain);
        let messages: Vec<String> = ctx.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
