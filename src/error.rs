//! Error types for rule parsing and filtering

use std::path::PathBuf;
use thiserror::Error;

/// Malformed rule-file syntax
#[derive(Debug, Error)]
#[error("rule grammar error in {}:{line}: {kind}", path.display())]
pub struct GrammarError {
    /// Rule file the error was found in
    pub path: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// What exactly is malformed
    pub kind: GrammarErrorKind,
}

impl GrammarError {
    pub fn new(path: &std::path::Path, line: usize, kind: GrammarErrorKind) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            kind,
        }
    }
}

/// The specific grammar violation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarErrorKind {
    #[error("keyword missing")]
    MissingKeyword,

    #[error("'{0}' is not a valid keyword")]
    UnknownKeyword(String),

    #[error("keyword has no content")]
    MissingContent,

    #[error("block name missing")]
    MissingName,

    #[error("rename target after '->' missing or illegal")]
    BadRename,

    #[error("block must end with ':'")]
    MissingColon,

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("indentation matches no open block width")]
    InconsistentIndent,

    #[error("indented rule with no open block")]
    OrphanedIndent,

    #[error("line continuation '\\' at end of file")]
    UnterminatedContinuation,
}

/// Error raised while loading or executing rule files
///
/// Every variant is fatal to the filtering session: the `Filter` is consumed
/// by the failing call and a fresh session must be started from a new tree.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// A rule names a module, type, or member that no reachable cache contains
    #[error("'{name}' does not exist ({}:{line})", path.display())]
    Reference {
        name: String,
        path: PathBuf,
        line: usize,
    },

    /// A keyword reached a scope that has no handler for it
    /// (e.g. `module` nested inside a `type` block)
    #[error("keyword '{keyword}' not supported in this block ({}:{line})", path.display())]
    UnsupportedKeyword {
        keyword: String,
        path: PathBuf,
        line: usize,
    },

    /// Rule file could not be read
    #[error("cannot read rule file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FilterError {
    pub(crate) fn reference(name: &str, origin: &crate::rule::Origin) -> Self {
        FilterError::Reference {
            name: name.to_string(),
            path: origin.path.clone(),
            line: origin.line,
        }
    }

    pub(crate) fn unsupported(keyword: crate::rule::Keyword, origin: &crate::rule::Origin) -> Self {
        FilterError::UnsupportedKeyword {
            keyword: keyword.to_string(),
            path: origin.path.clone(),
            line: origin.line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_grammar_error_display() {
        let err = GrammarError::new(
            Path::new("rules.txt"),
            7,
            GrammarErrorKind::UnknownKeyword("export".to_string()),
        );
        assert_eq!(
            format!("{}", err),
            "rule grammar error in rules.txt:7: 'export' is not a valid keyword"
        );
    }

    #[test]
    fn test_reference_error_display() {
        let err = FilterError::Reference {
            name: "routineX".to_string(),
            path: PathBuf::from("rules.txt"),
            line: 3,
        };
        assert_eq!(format!("{}", err), "'routineX' does not exist (rules.txt:3)");
    }

    #[test]
    fn test_grammar_error_converts() {
        let err: FilterError =
            GrammarError::new(Path::new("r"), 1, GrammarErrorKind::MissingColon).into();
        assert!(matches!(err, FilterError::Grammar(_)));
    }
}
