//! # Dispatcher Module
//!
//! The dispatcher is the per-request entry point. It asks the router for a match,
//! builds a [`Context`](crate::context::Context) and runs the matched handler chain.
//!
//! ## Request Flow
//!
//! 1. The router resolves `(method, path)` to a handler chain and path parameters
//! 2. A context is created with a new (or upstream) request id
//! 3. The chain runs; middleware may call `next()` or `abort()`
//! 4. The outcome is returned as a [`Dispatch`]
//!
//! ## Error Handling
//!
//! - No match returns [`Dispatch::NotFound`] after running the no-route chain
//! - A match with only the trailing slash toggled returns [`Dispatch::Redirect`]
//!   when `redirect_trailing_slash` is enabled
//! - A match under another method returns [`Dispatch::MethodNotAllowed`] when
//!   `handle_method_not_allowed` is enabled
//! - Handler panics are caught, logged, and reported as status 500
//!
//! ```rust
//! use http::Method;
//! use muxtree::context::handler;
//! use muxtree::dispatcher::{Dispatch, Dispatcher};
//! use muxtree::RouterConfig;
//!
//! let dispatcher = Dispatcher::new(RouterConfig::default());
//! dispatcher
//!     .get("/users/{id:int}", vec![handler(|c| {
//!         let id = c.param_int("id").unwrap_or_default();
//!         c.keys().set("user_id", id);
//!     })])
//!     .unwrap();
//!
//! match dispatcher.dispatch(&Method::GET, "/users/7") {
//!     Dispatch::Handled(ctx) => assert_eq!(ctx.keys().int("user_id"), Some(7)),
//!     _ => unreachable!(),
//! }
//! ```

mod core;

pub use core::{Dispatch, Dispatcher};
