//! Radix tree implementation for exact route lookups
//!
//! This module provides a radix tree (also called compact prefix tree) that resolves
//! static routes and whole-segment parameters in O(k) where k is the path length.
//!
//! ## Implementation Details
//!
//! Patterns are decomposed into pieces by [`Pattern::pieces`](super::pattern::Pattern):
//! - Static text (e.g. `/api/v1/users/`) is stored on [`NodeKind::Static`] nodes. Shared
//!   prefixes are split so that no two static siblings start with the same character.
//! - Whole-segment tokens (`{id}`, `{id:int}`, `*filepath`, `{name}.json`) become
//!   [`NodeKind::Param`] / [`NodeKind::CatchAll`] nodes keyed by their lower-cased token text.
//! - Routes are stored on the node where their pattern ends.
//!
//! The walk only descends into `{name}` and `{name:int}` nodes. Catch-alls and segments
//! mixing literals with tokens are left to the compiled regex fallback in
//! [`RouteTable`](super::table::RouteTable).
//!
//! ## Example
//!
//! ```text
//! /users            -> [root] "/user" -> "s" (route)
//! /users/{id}       ->                       -> "/" -> {id} (route)
//! /user-agents      ->               -> "-agents" (route)
//! ```

use smallvec::SmallVec;
use std::mem;
use std::sync::Arc;

use super::params::MAX_INLINE_PARAMS;
use super::pattern::{Piece, WildShape};
use super::table::RouteEntry;

/// Values captured by the walk, borrowed from the request path.
pub(crate) type ParamValues<'p> = SmallVec<[&'p str; MAX_INLINE_PARAMS]>;

/// Kind of a radix tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Static,
    Param,
    CatchAll,
}

/// Node in the radix tree.
#[derive(Clone)]
pub(crate) struct RadixNode {
    /// Lower-cased path fragment (static text, or the raw token for wildcard nodes)
    fragment: String,
    kind: NodeKind,
    /// How the walk treats this node; `None` for root and static nodes
    shape: Option<WildShape>,
    /// Static children, distinct leading characters
    children: Vec<RadixNode>,
    /// Wildcard children in insertion order
    wild_children: Vec<RadixNode>,
    /// Route registered exactly at this node
    route: Option<Arc<RouteEntry>>,
}

impl Default for RadixNode {
    fn default() -> Self {
        Self::root()
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(len) {
        len -= 1;
    }
    len
}

impl RadixNode {
    pub(crate) fn root() -> Self {
        Self::with_kind(String::new(), NodeKind::Root, None)
    }

    fn with_kind(fragment: String, kind: NodeKind, shape: Option<WildShape>) -> Self {
        Self {
            fragment,
            kind,
            shape,
            children: Vec::new(),
            wild_children: Vec::new(),
            route: None,
        }
    }

    fn wild(token: &str, shape: WildShape) -> Self {
        let kind = match shape {
            WildShape::CatchAll => NodeKind::CatchAll,
            WildShape::Param(_) | WildShape::Mixed => NodeKind::Param,
        };
        Self::with_kind(token.to_string(), kind, Some(shape))
    }

    /// Insert a route below this node.
    ///
    /// Returns the already registered entry if a route ends at the same node. Nodes are
    /// only created or split along a path that diverges from existing routes, so a
    /// conflicting insert leaves the tree structurally unchanged.
    pub(crate) fn insert(
        &mut self,
        pieces: &[Piece],
        entry: Arc<RouteEntry>,
    ) -> Result<(), Arc<RouteEntry>> {
        let Some((first, rest)) = pieces.split_first() else {
            if let Some(existing) = &self.route {
                return Err(Arc::clone(existing));
            }
            self.route = Some(entry);
            return Ok(());
        };

        match first {
            Piece::Static(text) => self.insert_static(text, rest, entry),
            Piece::Wild { token, shape } => {
                if let Some(child) = self.wild_children.iter_mut().find(|c| c.fragment == *token) {
                    return child.insert(rest, entry);
                }
                let mut child = RadixNode::wild(token, *shape);
                child.insert(rest, entry)?;
                self.wild_children.push(child);
                Ok(())
            }
        }
    }

    fn insert_static(
        &mut self,
        text: &str,
        rest: &[Piece],
        entry: Arc<RouteEntry>,
    ) -> Result<(), Arc<RouteEntry>> {
        let Some(lead) = text.chars().next() else {
            return self.insert(rest, entry);
        };

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|c| c.fragment.starts_with(lead))
        {
            let common = common_prefix_len(&child.fragment, text);
            if common < child.fragment.len() {
                child.split_at(common);
            }
            return child.insert_static(&text[common..], rest, entry);
        }

        let mut child = RadixNode::with_kind(text.to_string(), NodeKind::Static, None);
        child.insert(rest, entry)?;
        self.children.push(child);
        Ok(())
    }

    /// Split a static node so that it keeps `fragment[..at]` and a single child holds the rest.
    fn split_at(&mut self, at: usize) {
        let tail = RadixNode {
            fragment: self.fragment[at..].to_string(),
            kind: NodeKind::Static,
            shape: None,
            children: mem::take(&mut self.children),
            wild_children: mem::take(&mut self.wild_children),
            route: self.route.take(),
        };
        self.fragment.truncate(at);
        self.children = vec![tail];
    }

    /// Walk the tree for `path`.
    ///
    /// `path` must be the ASCII-lower-cased form of `raw`; both are sliced in
    /// lock-step so captured values keep the caller's casing.
    pub(crate) fn lookup<'p>(
        &self,
        path: &str,
        raw: &'p str,
        values: &mut ParamValues<'p>,
    ) -> Option<&Arc<RouteEntry>> {
        if path.is_empty() {
            return self.route.as_ref();
        }

        // static children have distinct leading characters, so at most one applies
        if let Some(child) = self
            .children
            .iter()
            .find(|c| path.starts_with(c.fragment.as_str()))
        {
            let n = child.fragment.len();
            if let Some(found) = child.lookup(&path[n..], &raw[n..], values) {
                return Some(found);
            }
        }

        let end = path.find('/').unwrap_or(path.len());
        for wild in &self.wild_children {
            let Some(WildShape::Param(kind)) = wild.shape else {
                continue;
            };
            if !kind.accepts(&path[..end]) {
                continue;
            }
            values.push(&raw[..end]);
            if let Some(found) = wild.lookup(&path[end..], &raw[end..], values) {
                return Some(found);
            }
            // backtrack
            values.pop();
        }

        None
    }

    /// Collect every route in pre-order (node, static children, wildcard children).
    pub(crate) fn collect(&self, out: &mut Vec<Arc<RouteEntry>>) {
        if let Some(route) = &self.route {
            out.push(Arc::clone(route));
        }
        for child in self.children.iter().chain(&self.wild_children) {
            child.collect(out);
        }
    }

    /// Indented description of the tree, one node per line.
    pub(crate) fn render(&self, depth: usize, out: &mut Vec<String>) {
        let label = match self.kind {
            NodeKind::Root => "root",
            NodeKind::Static => "static",
            NodeKind::Param => "param",
            NodeKind::CatchAll => "catch-all",
        };
        let route = self
            .route
            .as_ref()
            .map(|r| format!(" -> {}", r.full_path()))
            .unwrap_or_default();
        out.push(format!(
            "{}{:?} [{}]{}",
            "  ".repeat(depth),
            self.fragment,
            label,
            route
        ));
        for child in self.children.iter().chain(&self.wild_children) {
            child.render(depth + 1, out);
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }
}
