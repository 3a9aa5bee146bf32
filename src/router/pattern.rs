//! Route pattern parsing and compilation.
//!
//! A pattern is a `/`-separated list of segments. Each segment is literal text,
//! literal text mixed with parameter tokens, or a single catch-all token:
//!
//! | Token | Matches | Regex |
//! |---|---|---|
//! | `literal` | the literal text (ASCII case-insensitive) | escaped text |
//! | `{name}` | one or more ASCII word characters (`[0-9A-Za-z_]`) | `((?-u:\w)+)` |
//! | `{name:int}` | one or more ASCII digits | `([0-9]+)` |
//! | `*filepath`, `*action`, `*name` | the rest of the path, slashes included | `(.*)` |
//!
//! Character classes and case folding are ASCII-only, the same rules the radix
//! walk applies. Non-ASCII literal characters match exactly.
//!
//! Patterns are validated here so that a bad pattern fails at registration time
//! instead of silently compiling into a regex that never matches.

use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::error::RouterError;

/// Shape of a single-segment parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `{name}`: one or more ASCII word characters
    Word,
    /// `{name:int}`: one or more ASCII digits
    Int,
}

impl ParamKind {
    /// Whether a concrete path segment satisfies this parameter kind.
    ///
    /// Same character classes as the ASCII `\w+` / `\d+` of the compiled fallback.
    pub(crate) fn accepts(self, segment: &str) -> bool {
        if segment.is_empty() {
            return false;
        }
        match self {
            ParamKind::Word => segment.chars().all(is_word_char),
            ParamKind::Int => segment.bytes().all(|b| b.is_ascii_digit()),
        }
    }

    fn regex(self) -> &'static str {
        match self {
            ParamKind::Word => r"((?-u:\w)+)",
            ParamKind::Int => r"([0-9]+)",
        }
    }
}

/// One lexical piece of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param { name: Arc<str>, kind: ParamKind },
    CatchAll { name: Arc<str> },
}

/// Tree-facing decomposition of a pattern.
///
/// Static text runs across segment boundaries (`/users/`), wildcards always cover a
/// whole segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece {
    Static(String),
    Wild { token: String, shape: WildShape },
}

/// How the radix walk treats a wildcard node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WildShape {
    Param(ParamKind),
    CatchAll,
    /// Literal text mixed with tokens inside one segment; only the regex can match it.
    Mixed,
}

/// A parsed and validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Vec<Token>>,
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_word_char)
}

impl Pattern {
    /// Parse a pattern such as `/users/{id:int}/files/*filepath`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MalformedPattern`] when the pattern does not start
    /// with `/`, contains an empty inner segment, an unterminated or stray brace,
    /// an invalid parameter name or type, or a catch-all that is not the whole
    /// final segment.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(RouterError::malformed(raw, "pattern must start with '/'"));
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            // a trailing empty segment is a registered trailing slash
            if part.is_empty() && i != last {
                return Err(RouterError::malformed(raw, "empty path segment ('//')"));
            }
            let tokens = parse_segment(raw, part)?;
            let has_catch_all = tokens.iter().any(|t| matches!(t, Token::CatchAll { .. }));
            if has_catch_all && i != last {
                return Err(RouterError::malformed(
                    raw,
                    "catch-all must be the final segment",
                ));
            }
            segments.push(tokens);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parameter names in the order their captures appear.
    pub fn param_names(&self) -> Vec<Arc<str>> {
        self.segments
            .iter()
            .flatten()
            .filter_map(|t| match t {
                Token::Param { name, .. } | Token::CatchAll { name } => Some(Arc::clone(name)),
                Token::Literal(_) => None,
            })
            .collect()
    }

    /// Names that appear more than once; lookups by name return the last capture.
    pub fn duplicate_param_names(&self) -> Vec<Arc<str>> {
        let names = self.param_names();
        let mut dups: Vec<Arc<str>> = Vec::new();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) && !dups.contains(name) {
                dups.push(Arc::clone(name));
            }
        }
        dups
    }

    /// Anchored regex source for this pattern.
    ///
    /// Inner empty segments are rejected by [`Pattern::parse`], so joining the
    /// segments never produces `//`.
    pub fn regex_source(&self) -> String {
        let mut source = String::with_capacity(self.raw.len() + 32);
        source.push('^');
        for segment in &self.segments {
            source.push('/');
            for token in segment {
                match token {
                    Token::Literal(text) => push_literal(&mut source, text),
                    Token::Param { kind, .. } => source.push_str(kind.regex()),
                    Token::CatchAll { .. } => source.push_str("(.*)"),
                }
            }
        }
        source.push('$');
        source
    }

    /// Compile into a case-insensitive regex plus ordered capture names.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MalformedPattern`] if the regex engine rejects the
    /// generated source (e.g. it exceeds the compiled size limit).
    pub fn compile(&self) -> Result<(Regex, Vec<Arc<str>>), RouterError> {
        let regex = RegexBuilder::new(&self.regex_source())
            .case_insensitive(true)
            .build()
            .map_err(|e| RouterError::malformed(&self.raw, e.to_string()))?;
        Ok((regex, self.param_names()))
    }

    /// True if the radix walk alone can resolve this pattern: every segment is
    /// literal text or exactly one `{name}` / `{name:int}` token.
    pub fn is_tree_resolvable(&self) -> bool {
        self.segments.iter().all(|segment| {
            segment.iter().all(|t| matches!(t, Token::Literal(_)))
                || matches!(segment.as_slice(), [Token::Param { .. }])
        })
    }

    /// Decompose the lower-cased pattern into radix tree pieces.
    pub(crate) fn pieces(&self) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut buf = String::new();

        for (segment, raw) in self.segments.iter().zip(self.raw_segments()) {
            buf.push('/');
            let shape = match segment.as_slice() {
                tokens if tokens.iter().all(|t| matches!(t, Token::Literal(_))) => {
                    buf.push_str(&raw.to_ascii_lowercase());
                    continue;
                }
                [Token::Param { kind, .. }] => WildShape::Param(*kind),
                [Token::CatchAll { .. }] => WildShape::CatchAll,
                _ => WildShape::Mixed,
            };
            pieces.push(Piece::Static(std::mem::take(&mut buf)));
            pieces.push(Piece::Wild {
                token: raw.to_ascii_lowercase(),
                shape,
            });
        }

        if !buf.is_empty() {
            pieces.push(Piece::Static(buf));
        }
        pieces
    }

    fn raw_segments(&self) -> impl Iterator<Item = &str> {
        self.raw[1..].split('/')
    }

    /// Whether every path this pattern can match is also matched by `self`.
    ///
    /// Conservative: segments mixing literals and tokens are never considered
    /// covered, so a `false` only means coverage could not be proven.
    pub fn covers(&self, other: &Pattern) -> bool {
        for (i, mine) in self.segments.iter().enumerate() {
            if matches!(mine.as_slice(), [Token::CatchAll { .. }]) {
                return other.segments.len() > i;
            }
            let Some(theirs) = other.segments.get(i) else {
                return false;
            };
            if !segment_covers(mine, theirs) {
                return false;
            }
        }
        self.segments.len() == other.segments.len()
    }
}

/// Escape `text`, folding case for ASCII runs only.
fn push_literal(source: &mut String, text: &str) {
    let mut rest = text;
    while !rest.is_empty() {
        let ascii = rest.find(|c: char| !c.is_ascii()).unwrap_or(rest.len());
        if ascii > 0 {
            source.push_str("(?-u:");
            source.push_str(&regex::escape(&rest[..ascii]));
            source.push(')');
            rest = &rest[ascii..];
        }
        let other = rest.find(|c: char| c.is_ascii()).unwrap_or(rest.len());
        if other > 0 {
            source.push_str("(?-i:");
            source.push_str(&regex::escape(&rest[..other]));
            source.push(')');
            rest = &rest[other..];
        }
    }
}

fn segment_covers(mine: &[Token], theirs: &[Token]) -> bool {
    let literal = |tokens: &[Token]| -> Option<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat())
    };

    match (mine, theirs) {
        ([Token::Param { kind: ParamKind::Word, .. }], [Token::Param { .. }]) => true,
        ([Token::Param { kind: ParamKind::Int, .. }], [Token::Param { kind, .. }]) => {
            *kind == ParamKind::Int
        }
        ([Token::Param { kind, .. }], other) => {
            literal(other).is_some_and(|text| kind.accepts(&text))
        }
        _ => match (literal(mine), literal(theirs)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
            _ => false,
        },
    }
}

fn parse_segment(raw: &str, segment: &str) -> Result<Vec<Token>, RouterError> {
    if let Some(name) = segment.strip_prefix('*') {
        if !is_word(name) {
            return Err(RouterError::malformed(
                raw,
                format!("invalid catch-all '{}': expected '*name'", segment),
            ));
        }
        return Ok(vec![Token::CatchAll { name: name.into() }]);
    }

    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = segment;

    while let Some(c) = rest.chars().next() {
        match c {
            '{' => {
                let Some(end) = rest.find('}') else {
                    return Err(RouterError::malformed(raw, "unterminated '{'"));
                };
                let inner = &rest[1..end];
                if inner.contains('{') {
                    return Err(RouterError::malformed(raw, "nested '{' in parameter"));
                }
                let (name, kind) = match inner.split_once(':') {
                    None => (inner, ParamKind::Word),
                    Some((name, "int")) => (name, ParamKind::Int),
                    Some((_, ty)) => {
                        return Err(RouterError::malformed(
                            raw,
                            format!("unknown parameter type '{}'", ty),
                        ));
                    }
                };
                if !is_word(name) {
                    return Err(RouterError::malformed(
                        raw,
                        format!("invalid parameter name '{}'", name),
                    ));
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Param {
                    name: name.into(),
                    kind,
                });
                rest = &rest[end + 1..];
            }
            '}' => return Err(RouterError::malformed(raw, "unmatched '}'")),
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !literal.is_empty() || tokens.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}
