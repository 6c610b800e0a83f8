//! fortfilter - Visibility filtering for Fortran symbol trees
//!
//! A declarative pruning pass that sits between a Fortran parser and a
//! wrapper/code generator. Rule files select which modules, types, and
//! members of a parsed symbol tree survive into generation, and can rename
//! the containers they keep.
//!
//! # Architecture
//!
//! ```text
//! rule files -> parser -> Rule forest -> Filter -> pruned Root
//! ```
//!
//! The [`Filter`] wraps a [`Root`](symbol::Root) tree in per-container
//! scopes, executes every rule file in order (later rules override earlier
//! ones), and finally commits the kept selections back into the tree.
//!
//! # Rule files
//!
//! Indentation-structured text with `#` comments and `\` continuations:
//!
//! ```text
//! # expose one module, trimmed down
//! top:
//!   private *
//!   public mesh_utils
//!
//! module mesh_utils -> mesh:
//!   private *
//!   public build_mesh, refine_mesh, t.*
//! ```
//!
//! Atomic rules take plain names or category wildcards (`*`, `m.*`,
//! `prog.*`, `e.*`, `p.*`, `i.*`, `t.*`); `module`/`type` blocks descend
//! into the named container and optionally rename it with `->`.
//!
//! # Example
//!
//! ```no_run
//! use fortfilter::{Filter, symbol::Root};
//!
//! # fn demo(tree: Root) -> Result<(), fortfilter::FilterError> {
//! let pruned = Filter::new(tree)
//!     .add_file("wrap.rules")?
//!     .prune();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod parser;
pub mod rule;
pub mod scope;
pub mod symbol;

// Re-export main types
pub use error::{FilterError, GrammarError, GrammarErrorKind};
pub use filter::{prune, Filter};
pub use parser::parse_rules;
pub use rule::{AtomicRule, BlockKind, CompoundRule, Keyword, Rule, Selection, Target, Wildcard};
pub use scope::{Category, SelectionPolicy};
pub use symbol::{
    DerivedType, Element, Interface, Module, Named, Procedure, ProcedureKind, Program, Root,
};
