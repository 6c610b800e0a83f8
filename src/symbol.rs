//! Fortran symbol-tree data model
//!
//! This is the boundary with the upstream parser: it hands the filter a
//! [`Root`] whose ordered child collections describe everything that was
//! extracted from the source files. Every node carries a stable `orig_name`
//! (the identity key used by all rule lookups) and a separate mutable `name`
//! (the display name used by downstream code generators, changed by rename
//! rules). The filter mutates these collections in place; downstream
//! generators receive the same tree and are not aware a filtering pass
//! occurred.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything addressable by a rule: keyed by `orig_name`, renamable via `name`
pub trait Named {
    /// Immutable identity key
    fn orig_name(&self) -> &str;

    /// Replace the display name (identity key is untouched)
    fn rename(&mut self, new_name: &str);
}

/// Procedure flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Subroutine,
    Function,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureKind::Subroutine => write!(f, "subroutine"),
            ProcedureKind::Function => write!(f, "function"),
        }
    }
}

/// Root of the symbol tree (one per parse session)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub name: String,

    #[serde(default)]
    pub modules: Vec<Module>,

    #[serde(default)]
    pub programs: Vec<Program>,

    /// Top-level procedures living outside any module
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl Root {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_program(mut self, program: Program) -> Self {
        self.programs.push(program);
        self
    }

    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Look up a module by its identity key
    pub fn module(&self, orig_name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.orig_name == orig_name)
    }
}

/// A Fortran module and its owned members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub orig_name: String,

    #[serde(default)]
    pub types: Vec<DerivedType>,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(default)]
    pub interfaces: Vec<Interface>,

    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, ty: DerivedType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }
}

impl Named for Module {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

/// A derived type; its procedures are the type's methods
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedType {
    pub name: String,
    pub orig_name: String,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(default)]
    pub interfaces: Vec<Interface>,

    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl DerivedType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }
}

impl Named for DerivedType {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

/// A main program unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub orig_name: String,
}

impl Program {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
        }
    }
}

impl Named for Program {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

/// A subroutine or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub orig_name: String,
    pub kind: ProcedureKind,
}

impl Procedure {
    pub fn subroutine(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
            kind: ProcedureKind::Subroutine,
        }
    }

    pub fn function(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
            kind: ProcedureKind::Function,
        }
    }
}

impl Named for Procedure {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

/// A generic interface block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub orig_name: String,
}

impl Interface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
        }
    }
}

impl Named for Interface {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

/// A data element (module variable or type component)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub orig_name: String,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orig_name: name.to_string(),
        }
    }
}

impl Named for Element {
    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tree_builder() {
        let root = Root::new("demo")
            .with_module(
                Module::new("moda")
                    .with_procedure(Procedure::subroutine("routine1"))
                    .with_type(DerivedType::new("t1").with_element(Element::new("x"))),
            )
            .with_program(Program::new("main"));

        assert_eq!(root.modules.len(), 1);
        assert_eq!(root.programs.len(), 1);
        assert_eq!(root.module("moda").unwrap().procedures[0].name, "routine1");
        assert!(root.module("missing").is_none());
    }

    #[test]
    fn test_rename_keeps_identity() {
        let mut module = Module::new("moda");
        module.rename("modb");
        assert_eq!(module.name, "modb");
        assert_eq!(module.orig_name(), "moda");
    }

    #[test]
    fn test_serde_round_trip() {
        let root = Root::new("demo").with_module(
            Module::new("moda")
                .with_procedure(Procedure::function("f1"))
                .with_element(Element::new("count")),
        );

        let json = serde_json::to_string(&root).unwrap();
        let back: Root = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }

    #[test]
    fn test_procedure_kind_serde_names() {
        let json = serde_json::to_string(&ProcedureKind::Subroutine).unwrap();
        assert_eq!(json, "\"subroutine\"");
        assert_eq!(format!("{}", ProcedureKind::Function), "function");
    }
}
