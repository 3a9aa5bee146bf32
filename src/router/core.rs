//! Router core module - hot path for request routing.

use http::Method;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::params::Params;
use super::pattern::Pattern;
use super::radix::{ParamValues, RadixNode};
use super::table::{RouteEntry, RouteTable};
use crate::context::HandlersChain;
use crate::error::RouterError;

/// Methods accepted by [`Router::register`], in the order `Allow` lists them.
pub const SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::HEAD,
    Method::TRACE,
];

/// Outcome of a single lookup.
///
/// No handlers means "no match"; `tsr` then tells the dispatcher that the same
/// path with the trailing slash added or removed would have matched.
#[derive(Clone, Default)]
pub struct MatchResult {
    /// Handler chain of the matched route
    pub handlers: Option<HandlersChain>,
    /// Path parameters in pattern order
    pub params: Params,
    /// Pattern of the matched route as registered (e.g. `/users/{id:int}`)
    pub full_path: Option<Arc<str>>,
    /// Trailing-slash redirect recommendation
    pub tsr: bool,
}

impl MatchResult {
    fn matched(entry: &RouteEntry, params: Params) -> Self {
        Self {
            handlers: Some(Arc::clone(entry.handlers())),
            params,
            full_path: Some(Arc::clone(entry.full_path())),
            tsr: false,
        }
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        self.handlers.is_some()
    }

    /// Path parameter by name (last write wins).
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("handlers", &self.handlers.as_ref().map(|h| h.len()))
            .field("params", &self.params)
            .field("full_path", &self.full_path)
            .field("tsr", &self.tsr)
            .finish()
    }
}

/// A route that can never be reached through the fallback because an earlier
/// route matches every path it could match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedRoute {
    pub method: Method,
    pub pattern: String,
    pub shadowed_by: String,
}

/// Radix tree plus the lazily published fallback table for one HTTP method.
#[derive(Clone, Default)]
struct MethodTree {
    root: RadixNode,
    /// Lower-cased patterns, for conflict detection before touching the tree
    patterns: HashSet<String>,
    /// Registered entries in registration order
    entries: Vec<Arc<RouteEntry>>,
    /// Flattened fallback table; reset by every registration
    table: OnceCell<Arc<RouteTable>>,
}

impl MethodTree {
    fn lookup<'p>(&self, path: &'p str) -> Option<(&Arc<RouteEntry>, ParamValues<'p>)> {
        let lowered = path.to_ascii_lowercase();
        let mut values = ParamValues::new();
        let entry = self.root.lookup(&lowered, path, &mut values)?;
        Some((entry, values))
    }

    /// Whether the same path with its trailing slash toggled resolves in the tree.
    fn trailing_slash_redirect(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let toggled = toggle_trailing_slash(path);
        let found = self.lookup(&toggled).is_some();
        found
    }

    /// The fallback table, built on first use.
    ///
    /// `OnceCell::get_or_init` publishes the table with release/acquire ordering, so
    /// concurrent first requests either build it or wait for the winner and never
    /// observe a partially built list.
    fn table(&self) -> &Arc<RouteTable> {
        self.table
            .get_or_init(|| Arc::new(RouteTable::flatten(&self.root)))
    }
}

/// Router that matches request paths to handler chains.
///
/// Lookups first walk a per-method radix tree (static fragments and whole-segment
/// `{name}` / `{name:int}` parameters). When the walk fails, the router tries every
/// compiled route of that method in registration order and returns the first match.
///
/// # Performance
///
/// - Tree walk: O(k) where k is the path length
/// - Fallback: O(n) regex tests where n is the number of routes for the method
///
/// Registration takes `&mut self`; lookups take `&self` and are safe from any number
/// of threads. Use [`SharedRouter`](super::SharedRouter) to register routes while
/// serving.
#[derive(Clone, Default)]
pub struct Router {
    trees: HashMap<Method, MethodTree>,
    next_seq: usize,
    shadowed: Vec<ShadowedRoute>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handlers` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::UnsupportedMethod`] for methods outside [`SUPPORTED_METHODS`]
    /// - [`RouterError::MalformedPattern`] if the pattern does not parse or compile
    /// - [`RouterError::RouteConflict`] if the pattern (case-insensitively) is already
    ///   registered for this method
    ///
    /// A failed registration leaves the router unchanged.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: HandlersChain,
    ) -> Result<(), RouterError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RouterError::UnsupportedMethod(method));
        }

        let entry = Arc::new(RouteEntry::new(
            Pattern::parse(pattern)?,
            handlers,
            self.next_seq,
        )?);
        let key = pattern.to_ascii_lowercase();
        let tree = self.trees.entry(method.clone()).or_default();
        if tree.patterns.contains(&key) {
            return Err(RouterError::RouteConflict {
                method,
                pattern: pattern.to_string(),
            });
        }

        let dups = entry.pattern().duplicate_param_names();
        if !dups.is_empty() {
            warn!(
                method = %method,
                pattern = %pattern,
                duplicates = ?dups,
                "Duplicate parameter names; lookups by name return the last capture"
            );
        }

        if !entry.pattern().is_tree_resolvable() {
            if let Some(earlier) = tree
                .entries
                .iter()
                .find(|e| e.pattern().covers(entry.pattern()))
            {
                warn!(
                    method = %method,
                    pattern = %pattern,
                    shadowed_by = %earlier.full_path(),
                    "Route is unreachable: an earlier route matches every path it can match"
                );
                self.shadowed.push(ShadowedRoute {
                    method: method.clone(),
                    pattern: pattern.to_string(),
                    shadowed_by: earlier.full_path().to_string(),
                });
            }
        }

        if tree
            .root
            .insert(&entry.pattern().pieces(), Arc::clone(&entry))
            .is_err()
        {
            return Err(RouterError::RouteConflict {
                method,
                pattern: pattern.to_string(),
            });
        }

        tree.patterns.insert(key);
        tree.entries.push(entry);
        tree.table = OnceCell::new();
        self.next_seq += 1;

        debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(())
    }

    /// Build every fallback table now instead of on the first unmatched request.
    pub fn finalize(&self) {
        self.build_tables();
        for (method, tree) in &self.trees {
            let table = tree.table();
            info!(
                method = %method,
                routes_count = table.len(),
                routing_algorithm = "radix_tree+regex_fallback",
                "Routing table loaded"
            );
        }
    }

    /// Build any fallback table that is not built yet, without logging.
    pub(crate) fn build_tables(&self) {
        for tree in self.trees.values() {
            tree.table();
        }
    }

    /// Match a request path.
    ///
    /// 1. Collapse repeated `/` and walk the radix tree (case-insensitive).
    /// 2. Strip one trailing `/` (unless the path is `/` or the last segment
    ///    contains a `.`).
    /// 3. If the path with its trailing slash toggled would match in the tree, try
    ///    only the compiled routes the tree cannot resolve (catch-alls, mixed
    ///    segments). With no hit, return no handlers and `tsr = true`.
    /// 4. Otherwise try every compiled route in registration order.
    ///
    /// With `unescape`, values captured by the fallback are percent-decoded.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str, unescape: bool) -> MatchResult {
        debug!(method = %method, path = %path, "Route match attempt");

        let Some(tree) = self.trees.get(method) else {
            return MatchResult::default();
        };

        let match_start = Instant::now();
        let path = collapse_slashes(path);

        if let Some((entry, values)) = tree.lookup(&path) {
            let params = entry.params_from(values);
            log_match(method, &path, entry, match_start.elapsed(), "radix_tree");
            return MatchResult::matched(entry, params);
        }

        let stripped = strip_trailing_slash(&path);
        let table = tree.table();

        if tree.trailing_slash_redirect(&path) {
            if let Some((entry, params)) = table.find_tree_unresolvable(stripped, unescape) {
                log_match(method, &path, entry, match_start.elapsed(), "regex_fallback");
                return MatchResult::matched(entry, params);
            }
            debug!(method = %method, path = %path, "Trailing slash redirect recommended");
            return MatchResult {
                tsr: true,
                ..MatchResult::default()
            };
        }

        if let Some((entry, params)) = table.find(stripped, unescape) {
            log_match(method, &path, entry, match_start.elapsed(), "regex_fallback");
            return MatchResult::matched(entry, params);
        }

        debug!(
            method = %method,
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        MatchResult::default()
    }

    /// Methods that have a route for `path`, used to answer 405 with an `Allow` list.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        SUPPORTED_METHODS
            .iter()
            .filter(|m| self.match_route(m, path, false).is_match())
            .cloned()
            .collect()
    }

    /// The flattened fallback table for `method`, building it if needed.
    #[must_use]
    pub fn route_table(&self, method: &Method) -> Option<Arc<RouteTable>> {
        self.trees.get(method).map(|t| Arc::clone(t.table()))
    }

    /// Whether the fallback table for `method` has been built.
    #[cfg(test)]
    pub(crate) fn fallback_built(&self, method: &Method) -> bool {
        self.trees
            .get(method)
            .is_some_and(|t| t.table.get().is_some())
    }

    /// All registered `(method, pattern)` pairs, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, Arc<str>)> {
        let mut all: Vec<(usize, Method, Arc<str>)> = self
            .trees
            .iter()
            .flat_map(|(method, tree)| {
                tree.entries
                    .iter()
                    .map(move |e| (e.seq(), method.clone(), Arc::clone(e.full_path())))
            })
            .collect();
        all.sort_by_key(|(seq, _, _)| *seq);
        all.into_iter().map(|(_, m, p)| (m, p)).collect()
    }

    /// Routes found unreachable at registration time.
    #[must_use]
    pub fn shadowed_routes(&self) -> &[ShadowedRoute] {
        &self.shadowed
    }

    /// Describe every method tree, one node per line.
    #[must_use]
    pub fn dump_routes(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for method in SUPPORTED_METHODS.iter() {
            if let Some(tree) = self.trees.get(method) {
                lines.push(format!("[{}] routes={}", method, tree.entries.len()));
                tree.root.render(1, &mut lines);
            }
        }
        lines
    }
}

fn log_match(method: &Method, path: &str, entry: &RouteEntry, elapsed: Duration, algorithm: &str) {
    if elapsed > Duration::from_millis(1) {
        warn!(
            method = %method,
            path = %path,
            route_pattern = %entry.full_path(),
            duration_us = elapsed.as_micros(),
            algorithm,
            "Slow route matching detected"
        );
    } else {
        debug!(
            method = %method,
            path = %path,
            route_pattern = %entry.full_path(),
            duration_us = elapsed.as_micros(),
            algorithm,
            "Route matched"
        );
    }
}

/// Collapse runs of `/` into one; an empty path becomes `/`.
pub fn collapse_slashes(path: &str) -> Cow<'_, str> {
    if path.is_empty() {
        return Cow::Borrowed("/");
    }
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Strip a single trailing `/` unless the path is `/` or its last segment looks
/// like a file name (contains a `.`).
pub fn strip_trailing_slash(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    let Some(trimmed) = path.strip_suffix('/') else {
        return path;
    };
    let last_segment = trimmed.rsplit('/').next().unwrap_or_default();
    if last_segment.contains('.') {
        path
    } else {
        trimmed
    }
}

/// The same path with a trailing `/` added or removed.
pub fn toggle_trailing_slash(path: &str) -> Cow<'_, str> {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => Cow::Borrowed(trimmed),
        Some(_) => Cow::Borrowed(path),
        None => Cow::Owned(format!("{}/", path)),
    }
}
