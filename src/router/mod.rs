//! # Router Module
//!
//! The router module provides path matching and route resolution for muxtree.
//! It combines a radix tree with a regex-based fallback matcher.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Validating and compiling route patterns at registration time
//! - Matching incoming request paths to registered handler chains
//! - Extracting path parameters from matched routes
//! - Recommending trailing-slash redirects
//!
//! ## Architecture
//!
//! The router uses a two-phase lookup:
//!
//! 1. **Radix walk**: static fragments and whole-segment `{name}` / `{name:int}`
//!    parameters are resolved in O(k) by a per-method radix tree.
//!
//! 2. **Regex fallback**: routes the tree cannot express (catch-alls such as
//!    `*filepath`, segments like `{name}.json`) are matched by testing compiled
//!    regexes in registration order. The first match wins; register specific
//!    routes before broader ones. Routes proven unreachable are reported with a
//!    warning at registration.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use muxtree::context::handler;
//! use muxtree::router::Router;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! router
//!     .register(Method::GET, "/users/{id:int}", Arc::from(vec![handler(|_| {})]))
//!     .unwrap();
//! router
//!     .register(Method::GET, "/static/*filepath", Arc::from(vec![handler(|_| {})]))
//!     .unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/42", false);
//! assert_eq!(m.param("id"), Some("42"));
//!
//! let m = router.match_route(&Method::GET, "/static/css/site.css", false);
//! assert_eq!(m.param("filepath"), Some("css/site.css"));
//! ```

mod core;
mod params;
pub mod pattern;
mod radix;
mod shared;
mod table;
#[cfg(test)]
mod tests;

pub use core::{
    collapse_slashes, strip_trailing_slash, toggle_trailing_slash, MatchResult, Router,
    ShadowedRoute, SUPPORTED_METHODS,
};
pub use params::{Param, ParamVec, Params, MAX_INLINE_PARAMS};
pub use pattern::Pattern;
pub use radix::NodeKind;
pub use shared::SharedRouter;
pub use table::{RouteEntry, RouteTable};
