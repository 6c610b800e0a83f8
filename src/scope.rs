//! Per-scope selection registries
//!
//! Each scope wraps one container symbol node and keeps, per child category,
//! a `cache` of everything available at that scope and a `kept` selection
//! mutated by rule execution. `kept` is always a subset of `cache`; both are
//! insertion-ordered, and `prune()` commits the kept children back into the
//! underlying node in kept order.

use crate::error::FilterError;
use crate::rule::{BlockKind, Rule, Selection, Target, Wildcard};
use crate::symbol::{DerivedType, Element, Interface, Module, Named, Procedure, Program, Root};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default kept-set state applied once after a scope's caches are built,
/// before any rule executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Every cached child starts kept; rules carve the tree down
    #[default]
    IncludeAll,
    /// Nothing starts kept; rules build the tree up
    ExcludeAll,
}

/// Child category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Module,
    Program,
    Element,
    Procedure,
    Interface,
    Type,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Module => write!(f, "module"),
            Category::Program => write!(f, "program"),
            Category::Element => write!(f, "element"),
            Category::Procedure => write!(f, "procedure"),
            Category::Interface => write!(f, "interface"),
            Category::Type => write!(f, "type"),
        }
    }
}

/// One category's cache and kept set, keyed by `orig_name`
#[derive(Debug, Clone, Default)]
pub struct Registry<T> {
    cache: IndexMap<String, T>,
    kept: IndexSet<String>,
}

impl<T: Named> Registry<T> {
    /// Build the cache from upstream order; duplicate names overwrite, the
    /// first occurrence keeps its position. The kept set starts empty.
    pub fn new(items: Vec<T>) -> Self {
        let mut cache = IndexMap::with_capacity(items.len());
        for item in items {
            cache.insert(item.orig_name().to_string(), item);
        }
        Self {
            cache,
            kept: IndexSet::new(),
        }
    }

    pub fn apply_policy(&mut self, policy: SelectionPolicy) {
        match policy {
            SelectionPolicy::IncludeAll => self.keep_all(),
            SelectionPolicy::ExcludeAll => {}
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn is_kept(&self, name: &str) -> bool {
        self.kept.contains(name)
    }

    /// Mark a cached child kept; re-keeping keeps its original position.
    /// Returns false for names not in the cache.
    pub fn keep(&mut self, name: &str) -> bool {
        if !self.cache.contains_key(name) {
            return false;
        }
        self.kept.insert(name.to_string());
        true
    }

    /// Remove a name from the kept set (a no-op if it was not kept)
    pub fn discard(&mut self, name: &str) {
        self.kept.shift_remove(name);
    }

    pub fn keep_all(&mut self) {
        // collect to satisfy the borrow checker; caches are small
        let names: Vec<String> = self.cache.keys().cloned().collect();
        for name in names {
            self.kept.insert(name);
        }
    }

    pub fn drop_all(&mut self) {
        self.kept.clear();
    }

    /// Keep or discard one cached name; false if the cache lacks it
    pub fn select(&mut self, selection: Selection, name: &str) -> bool {
        if !self.cache.contains_key(name) {
            return false;
        }
        match selection {
            Selection::Public => {
                self.kept.insert(name.to_string());
            }
            Selection::Private => {
                self.kept.shift_remove(name);
            }
        }
        true
    }

    pub fn select_all(&mut self, selection: Selection) {
        match selection {
            Selection::Public => self.keep_all(),
            Selection::Private => self.drop_all(),
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.cache.get_mut(name)
    }

    /// Cached entries in cache order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.cache.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.cache.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.cache.keys()
    }

    pub fn kept_names(&self) -> impl Iterator<Item = &String> {
        self.kept.iter()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn kept_len(&self) -> usize {
        self.kept.len()
    }

    /// `kept ⊆ cache` — holds after every operation
    pub fn is_consistent(&self) -> bool {
        self.kept.iter().all(|name| self.cache.contains_key(name))
    }

    /// Consume the registry, returning the kept children in kept order
    pub fn into_kept(self) -> Vec<T> {
        let mut cache = self.cache;
        self.kept
            .iter()
            .filter_map(|name| cache.swap_remove(name))
            .collect()
    }
}

/// Selection state for the tree root: modules, programs, top-level procedures
#[derive(Debug)]
pub struct RootScope {
    node: Root,
    pub(crate) modules: Registry<ModuleScope>,
    pub(crate) programs: Registry<Program>,
    pub(crate) procedures: Registry<Procedure>,
}

impl RootScope {
    pub fn new(mut node: Root, policy: SelectionPolicy) -> Self {
        let modules = Registry::new(
            node.modules
                .drain(..)
                .map(|module| ModuleScope::new(module, policy))
                .collect(),
        );
        let programs = Registry::new(node.programs.drain(..).collect());
        let procedures = Registry::new(node.procedures.drain(..).collect());

        let mut scope = Self {
            node,
            modules,
            programs,
            procedures,
        };
        scope.apply_policy(policy);
        scope
    }

    fn apply_policy(&mut self, policy: SelectionPolicy) {
        self.modules.apply_policy(policy);
        self.programs.apply_policy(policy);
        self.procedures.apply_policy(policy);
    }

    /// Bulk selection over the root's own registries only; module and type
    /// internals are handled by the session's root-issued dispatch
    pub(crate) fn bulk(&mut self, selection: Selection, wildcard: Wildcard) {
        match wildcard {
            Wildcard::All => {
                self.modules.select_all(selection);
                self.programs.select_all(selection);
                self.procedures.select_all(selection);
            }
            Wildcard::Modules => self.modules.select_all(selection),
            Wildcard::Programs => self.programs.select_all(selection),
            Wildcard::Procedures => self.procedures.select_all(selection),
            Wildcard::Elements | Wildcard::Interfaces | Wildcard::Types => {}
        }
    }

    /// Commit the kept sets into the root node, nested scopes first
    pub fn prune(self) -> Root {
        let mut node = self.node;
        node.modules = self
            .modules
            .into_kept()
            .into_iter()
            .map(ModuleScope::prune)
            .collect();
        node.programs = self.programs.into_kept();
        node.procedures = self.procedures.into_kept();
        node
    }
}

/// Selection state for one module: types, elements, interfaces, procedures
#[derive(Debug)]
pub struct ModuleScope {
    node: Module,
    pub(crate) types: Registry<TypeScope>,
    pub(crate) elements: Registry<Element>,
    pub(crate) interfaces: Registry<Interface>,
    pub(crate) procedures: Registry<Procedure>,
}

impl ModuleScope {
    pub fn new(mut node: Module, policy: SelectionPolicy) -> Self {
        let types = Registry::new(
            node.types
                .drain(..)
                .map(|ty| TypeScope::new(ty, policy))
                .collect(),
        );
        let elements = Registry::new(node.elements.drain(..).collect());
        let interfaces = Registry::new(node.interfaces.drain(..).collect());
        let procedures = Registry::new(node.procedures.drain(..).collect());

        let mut scope = Self {
            node,
            types,
            elements,
            interfaces,
            procedures,
        };
        scope.apply_policy(policy);
        scope
    }

    fn apply_policy(&mut self, policy: SelectionPolicy) {
        self.types.apply_policy(policy);
        self.elements.apply_policy(policy);
        self.interfaces.apply_policy(policy);
        self.procedures.apply_policy(policy);
    }

    /// Execute one rule inside this module's block
    pub(crate) fn execute_rule(&mut self, rule: &Rule) -> Result<(), FilterError> {
        match rule {
            Rule::Atomic(atomic) => {
                for target in &atomic.targets {
                    match target {
                        Target::Wildcard(wildcard) => self.bulk(atomic.selection, *wildcard),
                        Target::Name(name) => {
                            self.select_name(atomic.selection, name, &atomic.origin)?
                        }
                    }
                }
                Ok(())
            }
            Rule::Compound(block) => match &block.kind {
                BlockKind::Type { name, new_name } => {
                    match self.types.get_mut(name) {
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
                    self.types.keep(name);
                    Ok(())
                }
                kind => Err(FilterError::unsupported(kind.keyword(), &block.origin)),
            },
        }
    }

    /// Bulk selection over this module's own registries
    pub(crate) fn bulk(&mut self, selection: Selection, wildcard: Wildcard) {
        match wildcard {
            Wildcard::All => {
                self.types.select_all(selection);
                self.elements.select_all(selection);
                self.interfaces.select_all(selection);
                self.procedures.select_all(selection);
            }
            Wildcard::Types => self.types.select_all(selection),
            Wildcard::Elements => self.elements.select_all(selection),
            Wildcard::Interfaces => self.interfaces.select_all(selection),
            Wildcard::Procedures => self.procedures.select_all(selection),
            // categories this scope does not carry
            Wildcard::Modules | Wildcard::Programs => {}
        }
    }

    /// Root-issued bulk selection: this module and every type it owns
    pub(crate) fn bulk_deep(&mut self, selection: Selection, wildcard: Wildcard) {
        self.bulk(selection, wildcard);
        for ty in self.types.values_mut() {
            ty.bulk(selection, wildcard);
        }
    }

    fn select_name(
        &mut self,
        selection: Selection,
        name: &str,
        origin: &crate::rule::Origin,
    ) -> Result<(), FilterError> {
        let found = self.procedures.select(selection, name)
            || self.interfaces.select(selection, name)
            || self.elements.select(selection, name)
            || self.types.select(selection, name);
        if found {
            Ok(())
        } else {
            Err(FilterError::reference(name, origin))
        }
    }

    pub fn prune(self) -> Module {
        let mut node = self.node;
        node.types = self
            .types
            .into_kept()
            .into_iter()
            .map(TypeScope::prune)
            .collect();
        node.elements = self.elements.into_kept();
        node.interfaces = self.interfaces.into_kept();
        node.procedures = self.procedures.into_kept();
        node
    }
}

impl Named for ModuleScope {
    fn orig_name(&self) -> &str {
        &self.node.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.node.rename(new_name);
    }
}

/// Selection state for one derived type: elements, interfaces, procedures
#[derive(Debug)]
pub struct TypeScope {
    node: DerivedType,
    pub(crate) elements: Registry<Element>,
    pub(crate) interfaces: Registry<Interface>,
    pub(crate) procedures: Registry<Procedure>,
}

impl TypeScope {
    pub fn new(mut node: DerivedType, policy: SelectionPolicy) -> Self {
        let elements = Registry::new(node.elements.drain(..).collect());
        let interfaces = Registry::new(node.interfaces.drain(..).collect());
        let procedures = Registry::new(node.procedures.drain(..).collect());

        let mut scope = Self {
            node,
            elements,
            interfaces,
            procedures,
        };
        scope.apply_policy(policy);
        scope
    }

    fn apply_policy(&mut self, policy: SelectionPolicy) {
        self.elements.apply_policy(policy);
        self.interfaces.apply_policy(policy);
        self.procedures.apply_policy(policy);
    }

    /// Execute one rule inside this type's block
    pub(crate) fn execute_rule(&mut self, rule: &Rule) -> Result<(), FilterError> {
        match rule {
            Rule::Atomic(atomic) => {
                for target in &atomic.targets {
                    match target {
                        Target::Wildcard(wildcard) => self.bulk(atomic.selection, *wildcard),
                        Target::Name(name) => {
                            self.select_name(atomic.selection, name, &atomic.origin)?
                        }
                    }
                }
                Ok(())
            }
            Rule::Compound(block) => {
                Err(FilterError::unsupported(block.kind.keyword(), &block.origin))
            }
        }
    }

    pub(crate) fn bulk(&mut self, selection: Selection, wildcard: Wildcard) {
        match wildcard {
            Wildcard::All => {
                self.elements.select_all(selection);
                self.interfaces.select_all(selection);
                self.procedures.select_all(selection);
            }
            Wildcard::Elements => self.elements.select_all(selection),
            Wildcard::Interfaces => self.interfaces.select_all(selection),
            Wildcard::Procedures => self.procedures.select_all(selection),
            Wildcard::Modules | Wildcard::Programs | Wildcard::Types => {}
        }
    }

    fn select_name(
        &mut self,
        selection: Selection,
        name: &str,
        origin: &crate::rule::Origin,
    ) -> Result<(), FilterError> {
        let found = self.procedures.select(selection, name)
            || self.interfaces.select(selection, name)
            || self.elements.select(selection, name);
        if found {
            Ok(())
        } else {
            Err(FilterError::reference(name, origin))
        }
    }

    pub fn prune(self) -> DerivedType {
        let mut node = self.node;
        node.elements = self.elements.into_kept();
        node.interfaces = self.interfaces.into_kept();
        node.procedures = self.procedures.into_kept();
        node
    }
}

impl Named for TypeScope {
    fn orig_name(&self) -> &str {
        &self.node.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.node.rename(new_name);
    }
}
