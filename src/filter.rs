//! Filtering session coordinator
//!
//! A [`Filter`] owns the selection state for one pruning pass: it wraps the
//! symbol tree in scopes, builds a flat cross-scope index of every
//! addressable name, then executes rule files in the order they are added.
//! Rules run strictly sequentially and a later rule always overrides the
//! effect of an earlier one on the same name.
//!
//! `add_file`/`add_source` consume the session and hand it back on success,
//! so a failed call leaves nothing to retry: the partially executed session
//! is gone and the underlying tree was never mutated (only `prune()` commits
//! the kept sets into the tree).

use crate::error::FilterError;
use crate::parser::parse_rules;
use crate::rule::{BlockKind, CompoundRule, Keyword, Origin, Rule, Selection, Target, Wildcard};
use crate::scope::{Category, RootScope, SelectionPolicy};
use crate::symbol::{Named, Root};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Where an addressable name lives and what it is
#[derive(Debug, Clone)]
struct MemberAddr {
    owner: OwnerPath,
    category: Category,
}

/// Path from the root to the scope owning a member
#[derive(Debug, Clone)]
enum OwnerPath {
    Root,
    Module(String),
    Type { module: String, name: String },
}

/// One visibility-selection session over a symbol tree
#[derive(Debug)]
pub struct Filter {
    root: RootScope,
    /// Derived-type name -> owning module name
    type_owners: HashMap<String, String>,
    /// Flat cross-scope index; later insertions win on name collisions
    members: HashMap<String, MemberAddr>,
}

impl Filter {
    /// Start a session with the default `IncludeAll` policy
    pub fn new(tree: Root) -> Self {
        Self::with_policy(tree, SelectionPolicy::default())
    }

    /// Start a session with an explicit default selection policy
    pub fn with_policy(tree: Root, policy: SelectionPolicy) -> Self {
        let root = RootScope::new(tree, policy);
        let mut members = HashMap::new();
        let mut type_owners = HashMap::new();

        for (module_name, module) in root.modules.iter() {
            for name in module.procedures.names() {
                members.insert(
                    name.clone(),
                    MemberAddr {
                        owner: OwnerPath::Module(module_name.clone()),
                        category: Category::Procedure,
                    },
                );
            }
            for name in module.interfaces.names() {
                members.insert(
                    name.clone(),
                    MemberAddr {
                        owner: OwnerPath::Module(module_name.clone()),
                        category: Category::Interface,
                    },
                );
            }
            for (type_name, ty) in module.types.iter() {
                type_owners.insert(type_name.clone(), module_name.clone());
                for name in ty.procedures.names() {
                    members.insert(
                        name.clone(),
                        MemberAddr {
                            owner: OwnerPath::Type {
                                module: module_name.clone(),
                                name: type_name.clone(),
                            },
                            category: Category::Procedure,
                        },
                    );
                }
                for name in ty.interfaces.names() {
                    members.insert(
                        name.clone(),
                        MemberAddr {
                            owner: OwnerPath::Type {
                                module: module_name.clone(),
                                name: type_name.clone(),
                            },
                            category: Category::Interface,
                        },
                    );
                }
            }
        }

        for name in root.programs.names() {
            members.insert(
                name.clone(),
                MemberAddr {
                    owner: OwnerPath::Root,
                    category: Category::Program,
                },
            );
        }
        for name in root.procedures.names() {
            members.insert(
                name.clone(),
                MemberAddr {
                    owner: OwnerPath::Root,
                    category: Category::Procedure,
                },
            );
        }
        // modules and types themselves are addressable too, and shadow any
        // member of the same name
        for name in root.modules.names() {
            members.insert(
                name.clone(),
                MemberAddr {
                    owner: OwnerPath::Root,
                    category: Category::Module,
                },
            );
        }
        for (type_name, module_name) in &type_owners {
            members.insert(
                type_name.clone(),
                MemberAddr {
                    owner: OwnerPath::Module(module_name.clone()),
                    category: Category::Type,
                },
            );
        }

        log::debug!(
            "filter session opened: {} modules, {} types, {} addressable names",
            root.modules.len(),
            type_owners.len(),
            members.len()
        );

        Self {
            root,
            type_owners,
            members,
        }
    }

    /// Parse one rule file and execute its rules immediately, in file order
    pub fn add_file<P: AsRef<Path>>(self, path: P) -> Result<Self, FilterError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FilterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_source(&text, path)
    }

    /// Parse rule text and execute it immediately; `path` labels diagnostics
    pub fn add_source(mut self, text: &str, path: &Path) -> Result<Self, FilterError> {
        let rules = parse_rules(text, path)?;
        log::debug!(
            "executing {} top-level rules from {}",
            rules.len(),
            path.display()
        );
        for rule in &rules {
            self.execute_rule(rule)?;
        }
        Ok(self)
    }

    /// Commit the kept sets into the symbol tree and return it
    pub fn prune(self) -> Root {
        log::debug!(
            "pruning: keeping {}/{} modules, {}/{} programs, {}/{} procedures at root",
            self.root.modules.kept_len(),
            self.root.modules.len(),
            self.root.programs.kept_len(),
            self.root.programs.len(),
            self.root.procedures.kept_len(),
            self.root.procedures.len()
        );
        self.root.prune()
    }

    /// Execute one top-level rule in the root context
    fn execute_rule(&mut self, rule: &Rule) -> Result<(), FilterError> {
        match rule {
            // `top:` exists purely to give a file one enclosing block
            Rule::Compound(block) if block.kind == BlockKind::Top => {
                for sub in &block.body {
                    self.execute_root_rule(sub)?;
                }
                Ok(())
            }
            other => self.execute_root_rule(other),
        }
    }

    fn execute_root_rule(&mut self, rule: &Rule) -> Result<(), FilterError> {
        match rule {
            Rule::Atomic(atomic) => {
                for target in &atomic.targets {
                    match target {
                        Target::Wildcard(wildcard) => self.bulk(atomic.selection, *wildcard),
                        Target::Name(name) => {
                            self.select_member(atomic.selection, name, &atomic.origin)?
                        }
                    }
                }
                Ok(())
            }
            Rule::Compound(block) => match &block.kind {
                BlockKind::Top => Err(FilterError::unsupported(Keyword::Top, &block.origin)),
                BlockKind::Module { name, new_name } => {
                    self.apply_module_block(name, new_name.as_deref(), block)
                }
                BlockKind::Type { name, new_name } => {
                    self.apply_type_block(name, new_name.as_deref(), block)
                }
            },
        }
    }

    /// `module NAME [-> NEW]:` — keep the module at the root and run the
    /// block body against the module's own scope
    fn apply_module_block(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        block: &CompoundRule,
    ) -> Result<(), FilterError> {
        match self.root.modules.get_mut(name) {
            Some(scope) => {
                if let Some(new_name) = new_name {
                    scope.rename(new_name);
                }
                for sub in &block.body {
                    scope.execute_rule(sub)?;
                }
            }
            None => return Err(FilterError::reference(name, &block.origin)),
        }
        self.root.modules.keep(name);
        Ok(())
    }

    /// `type NAME [-> NEW]:` — keep the type in its owning module and run
    /// the block body against the type's own scope
    fn apply_type_block(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        block: &CompoundRule,
    ) -> Result<(), FilterError> {
        let module_name = match self.type_owners.get(name) {
            Some(module_name) => module_name.clone(),
            None => return Err(FilterError::reference(name, &block.origin)),
        };
        let module = match self.root.modules.get_mut(&module_name) {
            Some(module) => module,
            None => return Err(FilterError::reference(name, &block.origin)),
        };
        match module.types.get_mut(name) {
            Some(scope) => {
                if let Some(new_name) = new_name {
                    scope.rename(new_name);
                }
                for sub in &block.body {
                    scope.execute_rule(sub)?;
                }
            }
            None => return Err(FilterError::reference(name, &block.origin)),
        }
        module.types.keep(name);
        Ok(())
    }

    /// Root-issued bulk selection: the root scope and transitively every
    /// module and type scope
    fn bulk(&mut self, selection: Selection, wildcard: Wildcard) {
        self.root.bulk(selection, wildcard);
        if matches!(
            wildcard,
            Wildcard::All
                | Wildcard::Elements
                | Wildcard::Procedures
                | Wildcard::Interfaces
                | Wildcard::Types
        ) {
            for module in self.root.modules.values_mut() {
                module.bulk_deep(selection, wildcard);
            }
        }
    }

    /// Resolve a plain identifier through the flat cross-scope index
    fn select_member(
        &mut self,
        selection: Selection,
        name: &str,
        origin: &Origin,
    ) -> Result<(), FilterError> {
        let addr = match self.members.get(name) {
            Some(addr) => addr.clone(),
            None => return Err(FilterError::reference(name, origin)),
        };

        let found = match addr.owner {
            OwnerPath::Root => match addr.category {
                Category::Module => self.root.modules.select(selection, name),
                Category::Program => self.root.programs.select(selection, name),
                Category::Procedure => self.root.procedures.select(selection, name),
                _ => false,
            },
            OwnerPath::Module(module_name) => match self.root.modules.get_mut(&module_name) {
                Some(module) => match addr.category {
                    Category::Type => module.types.select(selection, name),
                    Category::Procedure => module.procedures.select(selection, name),
                    Category::Interface => module.interfaces.select(selection, name),
                    Category::Element => module.elements.select(selection, name),
                    _ => false,
                },
                None => false,
            },
            OwnerPath::Type {
                module: module_name,
                name: type_name,
            } => {
                let ty = self
                    .root
                    .modules
                    .get_mut(&module_name)
                    .and_then(|module| module.types.get_mut(&type_name));
                match ty {
                    Some(ty) => match addr.category {
                        Category::Procedure => ty.procedures.select(selection, name),
                        Category::Interface => ty.interfaces.select(selection, name),
                        Category::Element => ty.elements.select(selection, name),
                        _ => false,
                    },
                    None => false,
                }
            }
        };

        if found {
            Ok(())
        } else {
            Err(FilterError::reference(name, origin))
        }
    }
}

/// Run one complete pruning pass: apply every rule file in order, then commit
pub fn prune<P: AsRef<Path>>(tree: Root, files: &[P]) -> Result<Root, FilterError> {
    let mut filter = Filter::new(tree);
    for file in files {
        filter = filter.add_file(file)?;
    }
    Ok(filter.prune())
}
