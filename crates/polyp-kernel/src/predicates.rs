//! Extracted predicate table: module → ordered predicate sources.
//!
//! Encounter order of modules is preserved; sub-module fallback in the
//! check-map concatenates in this order.

use crate::module::{ModuleId, SourceFragment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateTable {
    order: Vec<ModuleId>,
    entries: BTreeMap<ModuleId, Vec<SourceFragment>>,
}

impl PredicateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the predicates of `module`. A repeated module keeps its first
    /// position and takes the new predicates, like a repeated key in an
    /// object literal.
    pub fn insert(&mut self, module: ModuleId, predicates: Vec<SourceFragment>) {
        if !self.entries.contains_key(&module) {
            self.order.push(module.clone());
        }
        self.entries.insert(module, predicates);
    }

    pub fn get(&self, module: &ModuleId) -> Option<&[SourceFragment]> {
        self.entries.get(module).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, module: &ModuleId) -> Option<&mut Vec<SourceFragment>> {
        self.entries.get_mut(module)
    }

    pub fn contains(&self, module: &ModuleId) -> bool {
        self.entries.contains_key(module)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Modules in encounter order.
    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    /// `(module, predicates)` pairs in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &[SourceFragment])> {
        self.order.iter().filter_map(|module| {
            self.entries
                .get(module)
                .map(|predicates| (module, predicates.as_slice()))
        })
    }
}

impl FromIterator<(ModuleId, Vec<SourceFragment>)> for PredicateTable {
    fn from_iter<I: IntoIterator<Item = (ModuleId, Vec<SourceFragment>)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (module, predicates) in iter {
            table.insert(module, predicates);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_insert_keeps_first_position_and_last_value() {
        let mut table = PredicateTable::new();
        table.insert(ModuleId::new("b"), vec![SourceFragment::new("1")]);
        table.insert(ModuleId::new("a"), vec![SourceFragment::new("2")]);
        table.insert(ModuleId::new("b"), vec![SourceFragment::new("3")]);

        let modules: Vec<&str> = table.modules().iter().map(ModuleId::as_str).collect();
        assert_eq!(modules, vec!["b", "a"]);
        assert_eq!(
            table.get(&ModuleId::new("b")),
            Some(&[SourceFragment::new("3")][..])
        );
    }
}
