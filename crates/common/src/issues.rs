//! Structured issue collection
//!
//! Skip policies record what they skipped here so the caller can surface
//! a complete report after the pipeline finishes.

use std::fmt;

/// What kind of condition was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    UnknownProperty,
    UnknownTrait,
    UnknownShape,
    InvalidRoot,
    ShapeCodegenFailed,
    ServiceParseFailed,
    ServiceCodegenFailed,
    ServiceProcessFailed,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::UnknownProperty => "unknown property",
            IssueKind::UnknownTrait => "unknown trait",
            IssueKind::UnknownShape => "unknown shape",
            IssueKind::InvalidRoot => "invalid root",
            IssueKind::ShapeCodegenFailed => "shape codegen failed",
            IssueKind::ServiceParseFailed => "service parse failed",
            IssueKind::ServiceCodegenFailed => "service codegen failed",
            IssueKind::ServiceProcessFailed => "service process failed",
        };
        f.write_str(s)
    }
}

/// One recorded skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    /// Where it happened, e.g. a shape or file name.
    pub context: String,
    /// The offending item, e.g. a property or trait name.
    pub item: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind, self.context, self.item)
    }
}

/// Accumulates issues across a pipeline run.
#[derive(Debug, Default)]
pub struct IssuesBag {
    entries: Vec<Issue>,
}

impl IssuesBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: IssueKind, context: impl Into<String>, item: impl Into<String>) {
        self.entries.push(Issue {
            kind,
            context: context.into(),
            item: item.into(),
        });
    }

    pub fn entries(&self) -> &[Issue] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut bag = IssuesBag::new();
        bag.push(IssueKind::UnknownTrait, "com.example#Foo", "ns#trait");
        bag.push(IssueKind::UnknownProperty, "shapes", "extra");
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.entries()[0].kind, IssueKind::UnknownTrait);
        assert_eq!(
            bag.entries()[0].to_string(),
            "unknown trait in com.example#Foo: ns#trait"
        );
    }
}
