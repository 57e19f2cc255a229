use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One step of the location of an issue inside the validated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    Required,
    TooSmall,
    TooBig,
    InvalidString,
    InvalidDate,
    InvalidLiteral,
    InvalidEnumValue,
    InvalidUnion,
    UnrecognizedKeys,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub path: Vec<PathSegment>,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn new(path: &[PathSegment], code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            code,
            message: message.into(),
        }
    }

    /// Dotted rendering of the path, `""` for the root.
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// The structured failure produced by `Schema::parse`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    /// First issue whose path starts at the given top-level field.
    pub fn issue_for_field(&self, field: &str) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|issue| matches!(issue.path.first(), Some(PathSegment::Key(key)) if key == field))
    }

    /// Messages grouped by dotted path.
    pub fn flatten(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            grouped
                .entry(issue.dotted_path())
                .or_default()
                .push(issue.message.clone());
        }
        grouped
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            let path = issue.dotted_path();
            if path.is_empty() {
                write!(f, "{}{}", sep, issue.message)?;
            } else {
                write!(f, "{}{}: {}", sep, path, issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Handed to `super_refine` callbacks so they can report any number of issues.
#[derive(Debug)]
pub struct RefinementContext {
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

impl RefinementContext {
    pub(crate) fn new(path: &[PathSegment]) -> Self {
        Self {
            path: path.to_vec(),
            issues: Vec::new(),
        }
    }

    pub fn add_issue(&mut self, message: impl Into<String>) {
        self.issues
            .push(Issue::new(&self.path, IssueCode::Custom, message));
    }

    /// Reports an issue one level below the refined value, e.g. on a sibling field.
    pub fn add_issue_at(&mut self, segment: impl Into<PathSegment>, message: impl Into<String>) {
        let mut path = self.path.clone();
        path.push(segment.into());
        self.issues.push(Issue::new(&path, IssueCode::Custom, message));
    }

    pub(crate) fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_paths() {
        let err = ValidationError::new(vec![
            Issue::new(&["user".into(), 0.into()], IssueCode::Required, "Required"),
            Issue::new(&[], IssueCode::Custom, "bad"),
        ]);
        assert_eq!(err.to_string(), "validation failed: user.0: Required; bad");
    }

    #[test]
    fn flatten_groups_by_path() {
        let err = ValidationError::new(vec![
            Issue::new(&["a".into()], IssueCode::TooSmall, "short"),
            Issue::new(&["a".into()], IssueCode::InvalidString, "pattern"),
        ]);
        let flat = err.flatten();
        assert_eq!(flat["a"], vec!["short".to_string(), "pattern".to_string()]);
        assert!(err.issue_for_field("a").is_some());
        assert!(err.issue_for_field("b").is_none());
    }
}
