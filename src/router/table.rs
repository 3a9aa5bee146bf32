//! Compiled route entries and the flattened fallback table.
//!
//! Every registered route is compiled once, at registration time, into a
//! [`RouteEntry`]. When the radix walk cannot resolve a path, the router falls
//! back to a [`RouteTable`]: the entries of one method tree flattened into a
//! list and tried in registration order. The first regex that matches wins, so
//! more specific routes must be registered before broader ones when they overlap.

use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::params::Params;
use super::pattern::Pattern;
use super::radix::RadixNode;
use crate::context::HandlersChain;
use crate::error::RouterError;

/// A registered route with its compiled matcher.
pub struct RouteEntry {
    pattern: Pattern,
    full_path: Arc<str>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    handlers: HandlersChain,
    /// Registration sequence number within the router
    seq: usize,
}

impl RouteEntry {
    /// Compile `pattern` and bind it to `handlers`.
    ///
    /// # Errors
    ///
    /// Propagates [`RouterError::MalformedPattern`] from regex compilation.
    pub fn new(pattern: Pattern, handlers: HandlersChain, seq: usize) -> Result<Self, RouterError> {
        let (regex, param_names) = pattern.compile()?;
        Ok(Self {
            full_path: Arc::from(pattern.as_str()),
            pattern,
            regex,
            param_names,
            handlers,
            seq,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The pattern as registered, e.g. `/users/{id:int}`.
    pub fn full_path(&self) -> &Arc<str> {
        &self.full_path
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    pub fn handlers(&self) -> &HandlersChain {
        &self.handlers
    }

    pub fn seq(&self) -> usize {
        self.seq
    }

    /// Pair captured values with this route's parameter names.
    pub(crate) fn params_from<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> Params {
        let mut params = Params::new();
        for (name, value) in self.param_names.iter().zip(values) {
            params.push(Arc::clone(name), value.to_string());
        }
        params
    }

    /// Match the whole path against the compiled regex and extract parameters.
    ///
    /// With `unescape`, every captured value is percent-decoded; a value that does
    /// not decode to UTF-8 is kept as captured.
    pub fn captures(&self, path: &str, unescape: bool) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::new();
        for (i, name) in self.param_names.iter().enumerate() {
            let raw = caps.get(i + 1).map_or("", |m| m.as_str());
            let value = if unescape {
                urlencoding::decode(raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.to_string())
            } else {
                raw.to_string()
            };
            params.push(Arc::clone(name), value);
        }
        Some(params)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("full_path", &self.full_path)
            .field("regex", &self.regex.as_str())
            .field("param_names", &self.param_names)
            .field("handlers", &self.handlers.len())
            .field("seq", &self.seq)
            .finish()
    }
}

/// Flattened, immutable list of compiled routes for one method.
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    /// Walk the tree once and order its routes by registration sequence.
    pub(crate) fn flatten(root: &RadixNode) -> Self {
        let mut entries = Vec::new();
        root.collect(&mut entries);
        entries.sort_by_key(|e| e.seq());
        debug!(routes_count = entries.len(), "Fallback route table flattened");
        Self { entries }
    }

    /// First entry, in registration order, whose regex matches `path`.
    pub fn find(&self, path: &str, unescape: bool) -> Option<(&Arc<RouteEntry>, Params)> {
        self.find_where(path, unescape, |_| true)
    }

    /// Like [`RouteTable::find`], but only over routes the radix walk cannot resolve.
    pub fn find_tree_unresolvable(
        &self,
        path: &str,
        unescape: bool,
    ) -> Option<(&Arc<RouteEntry>, Params)> {
        self.find_where(path, unescape, |entry| !entry.pattern().is_tree_resolvable())
    }

    fn find_where(
        &self,
        path: &str,
        unescape: bool,
        keep: impl Fn(&RouteEntry) -> bool,
    ) -> Option<(&Arc<RouteEntry>, Params)> {
        self.entries
            .iter()
            .filter(|entry| keep(entry))
            .find_map(|entry| entry.captures(path, unescape).map(|params| (entry, params)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.iter()
    }
}
