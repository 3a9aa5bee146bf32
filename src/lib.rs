//! # muxtree
//!
//! **muxtree** is an HTTP request router: it maps a method and a request path to an
//! ordered chain of handlers plus the path parameters captured on the way.
//!
//! ## Overview
//!
//! Routes are patterns such as `/users/{id:int}` or `/static/*filepath`. Each
//! method keeps two matchers over the same routes:
//!
//! - a **radix tree** that resolves static fragments and whole-segment parameters
//!   without allocating, and
//! - a **regex table** flattened from the tree, used for everything the tree cannot
//!   express (catch-alls, parameters mixed with literal text) and tried in
//!   registration order.
//!
//! A path that misses only because of its trailing slash is reported with the `tsr`
//! flag so callers can redirect.
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, the radix tree, the regex fallback and
//!   [`SharedRouter`] for registering routes while serving
//! - **[`context`]** - The per-request [`Context`] and its Next/Abort chain
//! - **[`keys`]** - Typed per-request key/value store
//! - **[`dispatcher`]** - Runs a request end to end: match, redirect, 404/405, panics
//! - **[`runtime_config`]** - [`RouterConfig`] from the environment or YAML
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - The `muxtree` binary: dump a route file or dispatch sample paths
//!
//! ### Request Handling Flow
//!
//! ```text
//! (method, path)
//!   -> collapse '//'
//!   -> radix tree walk ----------------------- hit  -> handlers + params
//!   -> same walk with the trailing slash toggled -> hit  -> tsr = true
//!   -> strip trailing '/', regex table in order  -> hit  -> handlers + params
//!   -> miss
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use muxtree::context::handler;
//! use muxtree::Router;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! router
//!     .register(Method::GET, "/users/{id:int}", Arc::from(vec![handler(|_| {})]))
//!     .unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/42", true);
//! assert!(m.is_match());
//! assert_eq!(m.param("id"), Some("42"));
//!
//! let m = router.match_route(&Method::GET, "/users/42/", true);
//! assert!(m.tsr);
//! ```

pub mod cli;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod keys;
pub mod logging;
pub mod router;
pub mod runtime_config;

pub use context::{handler, ChainState, Context, HandlerFunc, HandlersChain};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::RouterError;
pub use ids::RequestId;
pub use keys::{KeyValue, Keys};
pub use router::{MatchResult, Params, Pattern, Router, SharedRouter};
pub use runtime_config::RouterConfig;
