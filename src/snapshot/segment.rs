use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use derive_more::Display;
use snafu::{Snafu, ensure};

/// Policy used to compare path segments. A tree uses one policy for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CaseSensitivity {
    #[display("case-sensitive")]
    Sensitive,
    #[display("case-insensitive")]
    Insensitive,
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        if cfg!(any(target_os = "macos", target_os = "windows")) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }
}

impl CaseSensitivity {
    /// Orders two segments. Used for both lookup and child ordering.
    pub fn compare(self, left: &str, right: &str) -> Ordering {
        match self {
            CaseSensitivity::Sensitive => left.cmp(right),
            CaseSensitivity::Insensitive => left
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(right.chars().flat_map(char::to_lowercase)),
        }
    }

    pub fn equals(self, left: &str, right: &str) -> bool {
        self.compare(left, right) == Ordering::Equal
    }
}

/// A non-empty path relative to the root of a snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    /// Splits `path` on `/` (and `\` on Windows), dropping empty and `.` segments.
    pub fn parse(path: &str) -> Result<Self, PathParseError> {
        ensure!(
            !Path::new(path).has_root(),
            AbsolutePathSnafu {
                path: path.to_string()
            }
        );

        let segments = path
            .split(is_separator)
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(str::to_string)
            .collect::<Vec<_>>();

        ensure!(
            !segments.iter().any(|segment| segment == ".."),
            ParentTraversalSnafu {
                path: path.to_string()
            }
        );
        ensure!(!segments.is_empty(), EmptyPathSnafu);

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

impl FromStr for RelativePath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[String]> for RelativePath {
    fn as_ref(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum PathParseError {
    #[snafu(display("Path is empty"))]
    EmptyPath,
    #[snafu(display("Path '{}' is absolute, expected a path relative to the root", path))]
    AbsolutePath { path: String },
    #[snafu(display("Path '{}' leaves the root through '..'", path))]
    ParentTraversal { path: String },
}
