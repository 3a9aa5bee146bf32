//! Dispatcher core module - per-request entry point.

use http::Method;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info_span, warn};

use crate::context::{Context, HandlerFunc, HandlersChain};
use crate::error::RouterError;
use crate::ids::RequestId;
use crate::router::{collapse_slashes, toggle_trailing_slash, Params, Router, SharedRouter};
use crate::runtime_config::RouterConfig;

/// Outcome of dispatching one request.
pub enum Dispatch {
    /// A route matched and its chain ran (completed, aborted, or panicked with status 500)
    Handled(Context),
    /// The path matches only with its trailing slash toggled
    Redirect {
        /// Path to redirect to
        location: String,
        /// 301 for GET, 307 for other methods so the body is preserved
        status: u16,
    },
    /// Another method has a route for this path; the no-method chain ran
    MethodNotAllowed {
        /// Methods that would have matched, for the `Allow` header
        allow: Vec<Method>,
        context: Context,
    },
    /// Nothing matched; the no-route chain ran
    NotFound(Context),
}

impl Dispatch {
    /// Response status implied by the outcome.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Dispatch::Handled(ctx) => ctx.status().unwrap_or(200),
            Dispatch::Redirect { status, .. } => *status,
            Dispatch::MethodNotAllowed { context, .. } => context.status().unwrap_or(405),
            Dispatch::NotFound(ctx) => ctx.status().unwrap_or(404),
        }
    }

    /// The context that ran, if any chain ran.
    #[must_use]
    pub fn context(&self) -> Option<&Context> {
        match self {
            Dispatch::Handled(ctx) | Dispatch::NotFound(ctx) => Some(ctx),
            Dispatch::MethodNotAllowed { context, .. } => Some(context),
            Dispatch::Redirect { .. } => None,
        }
    }
}

/// Entry point that turns `(method, path)` into an executed handler chain.
///
/// Global middleware added with [`Dispatcher::use_middleware`] is prepended to the
/// chain of every route registered afterwards, and to the no-route and no-method
/// chains.
pub struct Dispatcher {
    router: SharedRouter,
    config: RouterConfig,
    middleware: Vec<HandlerFunc>,
    no_route: Vec<HandlerFunc>,
    no_method: Vec<HandlerFunc>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self::with_router(Router::new(), config)
    }

    /// Dispatch over routes that were registered on a [`Router`] beforehand.
    #[must_use]
    pub fn with_router(router: Router, config: RouterConfig) -> Self {
        Self {
            router: SharedRouter::new(router, config.precompile),
            config,
            middleware: Vec::new(),
            no_route: Vec::new(),
            no_method: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Current routing snapshot.
    #[must_use]
    pub fn router(&self) -> Arc<Router> {
        self.router.load()
    }

    /// Add engine-wide middleware.
    pub fn use_middleware(&mut self, middleware: HandlerFunc) {
        self.middleware.push(middleware);
    }

    /// Handlers run when no route matches (after global middleware).
    pub fn no_route(&mut self, handlers: Vec<HandlerFunc>) {
        self.no_route = handlers;
    }

    /// Handlers run when only another method matches (after global middleware).
    pub fn no_method(&mut self, handlers: Vec<HandlerFunc>) {
        self.no_method = handlers;
    }

    fn combine(&self, handlers: &[HandlerFunc]) -> HandlersChain {
        self.middleware
            .iter()
            .chain(handlers)
            .map(Arc::clone)
            .collect::<Vec<_>>()
            .into()
    }

    /// Register a route; global middleware runs before `handlers`.
    ///
    /// # Errors
    ///
    /// Same as [`Router::register`].
    pub fn register(
        &self,
        method: Method,
        pattern: &str,
        handlers: Vec<HandlerFunc>,
    ) -> Result<(), RouterError> {
        self.router.register(method, pattern, self.combine(&handlers))
    }

    pub fn get(&self, pattern: &str, handlers: Vec<HandlerFunc>) -> Result<(), RouterError> {
        self.register(Method::GET, pattern, handlers)
    }

    pub fn post(&self, pattern: &str, handlers: Vec<HandlerFunc>) -> Result<(), RouterError> {
        self.register(Method::POST, pattern, handlers)
    }

    /// Dispatch a request with a freshly generated request id.
    pub fn dispatch(&self, method: &Method, path: &str) -> Dispatch {
        self.dispatch_with_id(method, path, RequestId::new())
    }

    /// Dispatch a request, keeping an upstream request id.
    pub fn dispatch_with_id(&self, method: &Method, path: &str, request_id: RequestId) -> Dispatch {
        let span = info_span!("dispatch", request_id = %request_id, method = %method, path = %path);
        let _entered = span.enter();
        let started = Instant::now();

        let router = self.router.load();
        let matched = router.match_route(method, path, self.config.unescape_path_values);

        if let Some(handlers) = matched.handlers {
            let ctx = Context::new(
                method.clone(),
                path,
                matched.params,
                matched.full_path,
                handlers,
            )
            .with_request_id(request_id);
            let ctx = run_chain(ctx);
            debug!(
                status = ctx.status().unwrap_or(200),
                aborted = ctx.is_aborted(),
                latency_us = started.elapsed().as_micros(),
                "Request dispatched"
            );
            return Dispatch::Handled(ctx);
        }

        if matched.tsr && self.config.redirect_trailing_slash && method != Method::CONNECT {
            let location = toggle_trailing_slash(&collapse_slashes(path)).into_owned();
            let status = if method == Method::GET { 301 } else { 307 };
            debug!(location = %location, status, "Redirecting to toggled trailing slash");
            return Dispatch::Redirect { location, status };
        }

        if self.config.handle_method_not_allowed {
            let allow: Vec<Method> = router
                .allowed_methods(path)
                .into_iter()
                .filter(|m| m != method)
                .collect();
            if !allow.is_empty() {
                let mut ctx = self.fallback_context(method, path, &self.no_method, request_id);
                ctx.set_status(405);
                let context = run_chain(ctx);
                warn!(allow = ?allow, "Method not allowed");
                return Dispatch::MethodNotAllowed { allow, context };
            }
        }

        let mut ctx = self.fallback_context(method, path, &self.no_route, request_id);
        ctx.set_status(404);
        debug!("No route found");
        Dispatch::NotFound(run_chain(ctx))
    }

    fn fallback_context(
        &self,
        method: &Method,
        path: &str,
        handlers: &[HandlerFunc],
        request_id: RequestId,
    ) -> Context {
        Context::new(method.clone(), path, Params::new(), None, self.combine(handlers))
            .with_request_id(request_id)
    }
}

/// Run a chain, turning a handler panic into an aborted context with status 500.
fn run_chain(mut ctx: Context) -> Context {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.next()));
    if let Err(panic) = outcome {
        let panic_message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(
            request_id = %ctx.request_id(),
            route = ctx.full_path().unwrap_or_default(),
            panic_message = %panic_message,
            "Handler panicked"
        );
        ctx.error(anyhow::anyhow!("handler panicked: {}", panic_message));
        ctx.abort_with_status(500);
    }
    ctx
}
