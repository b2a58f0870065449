use crate::location::{Span, Spanning};
use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Write};
use std::hash::{Hash, Hasher};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;
use winnow::combinator::{alt, cut_err, delimited, opt, separated, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::token::{take_till, take_while};
use winnow::{ModalResult, Parser};

/// Name of the reserved root under which correlation variables live.
pub const CORRELATION_ROOT: &str = "csets";
pub const GLOBAL_PREFIX: &str = "global";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Name {
    Literal(ArcStr),
    /// Computed at runtime, kept as the source text of the expression.
    Dynamic(ArcStr),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Index {
    Literal(u32),
    Dynamic(ArcStr),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: Name,
    pub index: Index,
}

impl Segment {
    pub fn named(name: impl Into<ArcStr>) -> Self {
        Self {
            name: Name::Literal(name.into()),
            index: Index::Literal(0),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(
            (&self.name, &self.index),
            (Name::Literal(_), Index::Literal(_))
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PathKind {
    Data,
    Correlation,
}

/// Identity of a path in a `PathSet`: global paths and session-local paths
/// with the same segments are different locations.
pub type PathKey = (bool, Arc<[Segment]>);

/// A location inside the tree-shaped variable store.
///
/// Equality and hashing look at the segments and the global flag: the span
/// is carried for diagnostics and `kind` is derived from the first segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "PathRepr", into = "PathRepr")]
pub struct VariablePath {
    span: Span,
    segments: Arc<[Segment]>,
    kind: PathKind,
    global: bool,
}

impl VariablePath {
    pub fn new(span: Span, segments: impl Into<Arc<[Segment]>>, global: bool) -> Self {
        let segments = segments.into();
        let kind = match segments.first() {
            Some(Segment {
                name: Name::Literal(name),
                ..
            }) if !global && name == CORRELATION_ROOT => PathKind::Correlation,
            _ => PathKind::Data,
        };
        Self {
            span,
            segments,
            kind,
            global,
        }
    }

    /// The correlation path `csets.<target>` for a correlation variable.
    pub fn correlation(span: Span, target: &VariablePath) -> Self {
        let segments: Vec<Segment> = std::iter::once(Segment::named(CORRELATION_ROOT))
            .chain(target.segments.iter().cloned())
            .collect();
        Self::new(span, segments, false)
    }

    pub fn parse(span: Span, text: &str) -> Result<Self, PathParseError> {
        let mut path: Self = text.parse()?;
        path.span = span;
        Ok(path)
    }

    pub fn with_span(&self, span: Span) -> Self {
        Self {
            span,
            ..self.clone()
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn key(&self) -> PathKey {
        (self.is_global(), self.segments.clone())
    }

    pub fn is_correlation(&self) -> bool {
        self.kind == PathKind::Correlation
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn is_static(&self) -> bool {
        self.segments.iter().all(Segment::is_static)
    }
}

impl PartialEq for VariablePath {
    fn eq(&self, other: &Self) -> bool {
        self.global == other.global && self.segments == other.segments
    }
}

impl Eq for VariablePath {}

impl Hash for VariablePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.global.hash(state);
        self.segments.hash(state)
    }
}

impl Spanning for VariablePath {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            write!(f, "{}.", GLOBAL_PREFIX)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            match &segment.name {
                Name::Literal(name) => write!(f, "{}", name)?,
                Name::Dynamic(expr) => write!(f, "({})", expr)?,
            }
            match &segment.index {
                Index::Literal(0) => {}
                Index::Literal(index) => write!(f, "[{}]", index)?,
                Index::Dynamic(expr) => write!(f, "[{}]", expr)?,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathParseError {
    pub text: String,
    /// Byte offset of the first character that could not be parsed.
    pub offset: usize,
    pub reason: String,
}

impl Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid variable path `{}` at offset {}: {}",
            self.text, self.offset, self.reason
        )
    }
}

impl std::error::Error for PathParseError {}

impl FromStr for VariablePath {
    type Err = PathParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (global, segments) = variable_path.parse(text).map_err(|error| {
            let reason = error.inner().to_string();
            PathParseError {
                text: text.to_owned(),
                offset: error.offset(),
                reason: if reason.is_empty() {
                    "unexpected input".to_owned()
                } else {
                    reason
                },
            }
        })?;
        Ok(VariablePath::new(Span::None, segments, global))
    }
}

/// `global.` prefix followed by `.`-separated segments.
fn variable_path(input: &mut &str) -> ModalResult<(bool, Vec<Segment>)> {
    let global = opt(terminated(GLOBAL_PREFIX, '.')).parse_next(input)?.is_some();
    let segments: Vec<Segment> = separated(1.., segment, '.').parse_next(input)?;
    Ok((global, segments))
}

/// `name`, `(expr)`, either one optionally followed by `[index]`.
fn segment(input: &mut &str) -> ModalResult<Segment> {
    let name = alt((
        delimited('(', cut_err(take_till(1.., ')')), cut_err(')'))
            .map(|expr: &str| Name::Dynamic(expr.trim().into())),
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_')
            .map(|name: &str| Name::Literal(name.into())),
    ))
    .context(StrContext::Label("segment"))
    .parse_next(input)?;

    let index = opt(delimited(
        '[',
        cut_err(take_till(1.., ']').try_map(index_value)).context(StrContext::Label("index")),
        cut_err(']').context(StrContext::Expected(StrContextValue::CharLiteral(']'))),
    ))
    .parse_next(input)?;

    Ok(Segment {
        name,
        index: index.unwrap_or(Index::Literal(0)),
    })
}

fn index_value(text: &str) -> Result<Index, ParseIntError> {
    let text = text.trim();
    if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().map(Index::Literal)
    } else {
        Ok(Index::Dynamic(text.into()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Text(String),
    Spanned {
        path: String,
        #[serde(default)]
        span: Span,
    },
}

impl TryFrom<PathRepr> for VariablePath {
    type Error = PathParseError;

    fn try_from(repr: PathRepr) -> Result<Self, Self::Error> {
        match repr {
            PathRepr::Text(text) => text.parse(),
            PathRepr::Spanned { path, span } => VariablePath::parse(span, &path),
        }
    }
}

impl From<VariablePath> for PathRepr {
    fn from(path: VariablePath) -> Self {
        match path.span {
            Span::None => PathRepr::Text(path.to_string()),
            ref span => PathRepr::Spanned {
                path: path.to_string(),
                span: span.clone(),
            },
        }
    }
}

/// A provided correlation path, annotated with whether its value comes from a
/// session-unique generator.
#[derive(Clone, Debug)]
pub struct ProvidedPath {
    pub path: VariablePath,
    pub fresh: bool,
}

pub trait AsPath {
    fn as_path(&self) -> &VariablePath;
}

impl AsPath for VariablePath {
    fn as_path(&self) -> &VariablePath {
        self
    }
}

impl AsPath for ProvidedPath {
    fn as_path(&self) -> &VariablePath {
        &self.path
    }
}

/// Set of paths keyed by their segments.
///
/// Lookups return the stored element, so annotations attached when a path was
/// inserted (freshness, the span of the first definition) survive.
#[derive(Clone, Debug)]
pub struct PathSet<T> {
    entries: IndexMap<PathKey, T>,
}

impl<T> Default for PathSet<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T: AsPath> PathSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item`, returning the element it replaced.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let key = item.as_path().key();
        self.entries.insert(key, item)
    }

    pub fn remove(&mut self, path: &VariablePath) -> Option<T> {
        self.entries.shift_remove(&path.key())
    }

    pub fn contains(&self, path: &VariablePath) -> bool {
        self.entries.contains_key(&path.key())
    }

    pub fn find_equivalent(&self, path: &VariablePath) -> Option<&T> {
        self.entries.get(&path.key())
    }

    pub fn find_equivalent_mut(&mut self, path: &VariablePath) -> Option<&mut T> {
        self.entries.get_mut(&path.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &VariablePath> {
        self.entries.values().map(AsPath::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|_, item| keep(item))
    }

    /// Adds every element of `other` not already present.
    pub fn union(&mut self, other: &PathSet<T>)
    where
        T: Clone,
    {
        for item in other.iter() {
            if !self.contains(item.as_path()) {
                self.insert(item.clone());
            }
        }
    }
}

impl<T> IntoIterator for PathSet<T> {
    type Item = T;
    type IntoIter = indexmap::map::IntoValues<PathKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<T: AsPath> FromIterator<T> for PathSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}
