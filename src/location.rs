use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    // 0-based
    pub offset: u32,
    // 0-based
    pub row: u32,
    // 0-based
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Span {
    #[default]
    None,
    At {
        #[serde(default)]
        start: Point,
        #[serde(default)]
        end: Point,
        file: FileName,
    },
}

pub trait Spanning {
    fn span(&self) -> Span;
}

impl Span {
    pub fn at_line(file: impl Into<FileName>, line: u32) -> Self {
        let point = Point {
            offset: 0,
            row: line.saturating_sub(1),
            column: 0,
        };
        Self::At {
            start: point,
            end: point,
            file: file.into(),
        }
    }

    pub fn points(&self) -> Option<(Point, Point)> {
        match self {
            Self::None => None,
            Self::At { start, end, .. } => Some((*start, *end)),
        }
    }

    pub fn file(&self) -> Option<FileName> {
        match self {
            Self::None => None,
            Self::At { file, .. } => Some(file.clone()),
        }
    }

    pub fn start(&self) -> Option<Point> {
        self.points().map(|(s, _)| s)
    }

    /// 1-based line of the start of the span.
    pub fn line(&self) -> Option<u32> {
        self.start().map(|point| point.row + 1)
    }

    pub fn or(self, other: &Span) -> Self {
        match self {
            Self::None => other.clone(),
            span => span,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "<unknown>"),
            Self::At { start, file, .. } => write!(f, "{}:{}", file, start.row + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileName(pub ArcStr);

impl FileName {
    pub const UNKNOWN: Self = FileName(arcstr::literal!("<unknown>"));
}

impl Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileName {
    fn from(path: &str) -> Self {
        FileName(path.into())
    }
}

impl From<String> for FileName {
    fn from(path: String) -> Self {
        FileName(path.into())
    }
}

impl From<&Path> for FileName {
    fn from(path: &Path) -> Self {
        (&*path.to_string_lossy()).into()
    }
}

impl From<PathBuf> for FileName {
    fn from(path: PathBuf) -> Self {
        path.as_path().into()
    }
}

impl From<&FileName> for FileName {
    fn from(file: &FileName) -> Self {
        file.clone()
    }
}
