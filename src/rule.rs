//! Rule types for the pruning rule language
//!
//! A rule file parses into a forest of [`Rule`] values: leaf
//! [`AtomicRule`]s (`public`/`private` plus a target list) and
//! [`CompoundRule`]s (`top:`, `module NAME:`, `type NAME:`) whose bodies hold
//! the nested rules. Every rule remembers where it came from via [`Origin`],
//! used only for diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Keywords recognized at the start of a rule line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Top,
    Module,
    Type,
    Public,
    Private,
}

impl Keyword {
    /// Recognize the first word of a rule line
    pub fn from_word(word: &str) -> Option<Keyword> {
        match word {
            "top" => Some(Keyword::Top),
            "module" => Some(Keyword::Module),
            "type" => Some(Keyword::Type),
            "public" => Some(Keyword::Public),
            "private" => Some(Keyword::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyword::Top => write!(f, "top"),
            Keyword::Module => write!(f, "module"),
            Keyword::Type => write!(f, "type"),
            Keyword::Public => write!(f, "public"),
            Keyword::Private => write!(f, "private"),
        }
    }
}

/// Whether an atomic rule adds to or removes from the kept sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Public,
    Private,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Public => write!(f, "public"),
            Selection::Private => write!(f, "private"),
        }
    }
}

/// Bulk category selector (`*`, `m.*`, `prog.*`, `e.*`, `p.*`, `i.*`, `t.*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wildcard {
    /// Every category
    All,
    Modules,
    Programs,
    Elements,
    Procedures,
    Interfaces,
    Types,
}

impl Wildcard {
    /// Recognize a wildcard category token
    pub fn from_token(token: &str) -> Option<Wildcard> {
        match token {
            "*" => Some(Wildcard::All),
            "m.*" => Some(Wildcard::Modules),
            "prog.*" => Some(Wildcard::Programs),
            "e.*" => Some(Wildcard::Elements),
            "p.*" => Some(Wildcard::Procedures),
            "i.*" => Some(Wildcard::Interfaces),
            "t.*" => Some(Wildcard::Types),
            _ => None,
        }
    }

    /// The rule-file spelling of this wildcard
    pub fn token(&self) -> &'static str {
        match self {
            Wildcard::All => "*",
            Wildcard::Modules => "m.*",
            Wildcard::Programs => "prog.*",
            Wildcard::Elements => "e.*",
            Wildcard::Procedures => "p.*",
            Wildcard::Interfaces => "i.*",
            Wildcard::Types => "t.*",
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One target of an atomic rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Wildcard(Wildcard),
    Name(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Wildcard(w) => write!(f, "{}", w),
            Target::Name(n) => write!(f, "{}", n),
        }
    }
}

/// Where a rule came from (diagnostics only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Rule file path
    pub path: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Indentation depth computed by the lexer
    pub depth: usize,
}

impl Origin {
    pub fn new(path: &std::path::Path, line: usize, depth: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            depth,
        }
    }
}

/// The three block shapes a compound rule can open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// `top:` — the file's enclosing root block, no name
    Top,
    /// `module NAME [-> NEW]:`
    Module {
        name: String,
        new_name: Option<String>,
    },
    /// `type NAME [-> NEW]:`
    Type {
        name: String,
        new_name: Option<String>,
    },
}

impl BlockKind {
    /// Keyword this block was opened with
    pub fn keyword(&self) -> Keyword {
        match self {
            BlockKind::Top => Keyword::Top,
            BlockKind::Module { .. } => Keyword::Module,
            BlockKind::Type { .. } => Keyword::Type,
        }
    }
}

/// A leaf selection rule: `public a, b, p.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicRule {
    pub origin: Origin,
    pub selection: Selection,
    pub targets: Vec<Target>,
}

/// A rule that selects a named container and opens a nested block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundRule {
    pub origin: Origin,
    pub kind: BlockKind,
    pub body: Vec<Rule>,
}

/// A parsed rule, either shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Atomic(AtomicRule),
    Compound(CompoundRule),
}

impl Rule {
    pub fn origin(&self) -> &Origin {
        match self {
            Rule::Atomic(rule) => &rule.origin,
            Rule::Compound(rule) => &rule.origin,
        }
    }
}

impl fmt::Display for AtomicRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<String> = self.targets.iter().map(|t| t.to_string()).collect();
        write!(
            f,
            "{:indent$}{} {}",
            "",
            self.selection,
            targets.join(", "),
            indent = self.origin.depth * 2
        )
    }
}

impl fmt::Display for CompoundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.origin.depth * 2;
        match &self.kind {
            BlockKind::Top => write!(f, "{:indent$}top:", "", indent = indent)?,
            BlockKind::Module { name, new_name } | BlockKind::Type { name, new_name } => {
                write!(f, "{:indent$}{} {}", "", self.kind.keyword(), name, indent = indent)?;
                if let Some(new_name) = new_name {
                    write!(f, " -> {}", new_name)?;
                }
                write!(f, ":")?;
            }
        }
        for sub in &self.body {
            write!(f, "\n{}", sub)?;
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Atomic(rule) => write!(f, "{}", rule),
            Rule::Compound(rule) => write!(f, "{}", rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_keyword_recognition() {
        assert_eq!(Keyword::from_word("top"), Some(Keyword::Top));
        assert_eq!(Keyword::from_word("public"), Some(Keyword::Public));
        assert_eq!(Keyword::from_word("export"), None);
        assert_eq!(Keyword::from_word("Top"), None);
    }

    #[test]
    fn test_wildcard_tokens() {
        for token in ["*", "m.*", "prog.*", "e.*", "p.*", "i.*", "t.*"] {
            let wildcard = Wildcard::from_token(token).unwrap();
            assert_eq!(wildcard.token(), token);
        }
        assert_eq!(Wildcard::from_token("x.*"), None);
        assert_eq!(Wildcard::from_token("m.x"), None);
    }

    #[test]
    fn test_rule_rendering() {
        let origin = |line, depth| Origin::new(Path::new("rules.txt"), line, depth);
        let rule = Rule::Compound(CompoundRule {
            origin: origin(1, 0),
            kind: BlockKind::Module {
                name: "moda".to_string(),
                new_name: Some("modb".to_string()),
            },
            body: vec![
                Rule::Atomic(AtomicRule {
                    origin: origin(2, 1),
                    selection: Selection::Private,
                    targets: vec![Target::Wildcard(Wildcard::All)],
                }),
                Rule::Atomic(AtomicRule {
                    origin: origin(3, 1),
                    selection: Selection::Public,
                    targets: vec![
                        Target::Name("routine1".to_string()),
                        Target::Wildcard(Wildcard::Interfaces),
                    ],
                }),
            ],
        });

        assert_eq!(
            rule.to_string(),
            "module moda -> modb:\n  private *\n  public routine1, i.*"
        );
    }
}
