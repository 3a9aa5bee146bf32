use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 parameters (e.g. `/users/{id}/posts/{post_id}`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// One captured path parameter.
///
/// The key is shared with the compiled route (`Arc<str>`), the value is
/// per-request data cut from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: Arc<str>,
    pub value: String,
}

/// Stack-allocated parameter storage for the lookup hot path.
pub type ParamVec = SmallVec<[Param; MAX_INLINE_PARAMS]>;

/// Ordered parameters produced by a single match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(ParamVec);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Arc<str>, value: String) {
        self.0.push(Param { key, value });
    }

    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics: if a pattern repeats a name
    /// (e.g. `/org/{id}/user/{id}`), the last capture is returned.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|p| p.key.as_ref() == name)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    /// Convert to a `HashMap` (allocates; later duplicates overwrite earlier ones).
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|p| (p.key.to_string(), p.value.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
