//! Active-Property Registry - which properties of a blueprint are reactive.
//!
//! Declared once per blueprint at registration time, in three disjoint
//! categories:
//! - **data**: instance-local state, writable from inside the instance
//! - **prop**: supplied by the parent, read-only inside the instance
//! - **getter**: read from the global state store at a fixed path
//!
//! The per-blueprint [`PropertyTable`] is computed at declaration, so building
//! an instance only looks names up instead of re-deriving accessors.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Category of a reactive property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Data,
    Prop,
    Getter,
}

/// Accessor description of one reactive property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub category: Category,
    /// Store path for getters.
    pub path: Option<String>,
}

/// Declaration of a blueprint's reactive properties, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveProperties {
    pub data: Vec<String>,
    pub prop: Vec<String>,
    /// `(property, store path)` pairs.
    pub getter: Vec<(String, String)>,
}

impl ActiveProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, name: impl Into<String>) -> Self {
        self.data.push(name.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>) -> Self {
        self.prop.push(name.into());
        self
    }

    pub fn getter(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.getter.push((name.into(), path.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.prop.is_empty() && self.getter.is_empty()
    }
}

/// Resolved lookup table of a blueprint.
#[derive(Debug, Default)]
pub struct PropertyTable {
    accessors: BTreeMap<String, Accessor>,
    /// Names in declaration order: data, prop, getter.
    order: Vec<String>,
    prop_count: usize,
}

impl PropertyTable {
    /// Build the table. Names declared in more than one category keep their
    /// first category and are returned as conflicts.
    pub fn compile(props: &ActiveProperties) -> (Self, Vec<String>) {
        let mut table = PropertyTable::default();
        let mut conflicts = Vec::new();
        let entries = props
            .data
            .iter()
            .map(|n| (n.clone(), Accessor { category: Category::Data, path: None }))
            .chain(
                props
                    .prop
                    .iter()
                    .map(|n| (n.clone(), Accessor { category: Category::Prop, path: None })),
            )
            .chain(props.getter.iter().map(|(n, p)| {
                (
                    n.clone(),
                    Accessor {
                        category: Category::Getter,
                        path: Some(p.clone()),
                    },
                )
            }));
        for (name, accessor) in entries {
            if table.accessors.contains_key(&name) {
                conflicts.push(name);
                continue;
            }
            if accessor.category == Category::Prop {
                table.prop_count += 1;
            }
            table.order.push(name.clone());
            table.accessors.insert(name, accessor);
        }
        (table, conflicts)
    }

    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    pub fn category(&self, name: &str) -> Option<Category> {
        self.accessors.get(name).map(|a| a.category)
    }

    /// `(name, accessor)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Accessor)> {
        self.order
            .iter()
            .filter_map(|n| self.accessors.get(n).map(|a| (n.as_str(), a)))
    }

    pub fn prop_count(&self) -> usize {
        self.prop_count
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct ActivePropertyRegistry {
    tables: RefCell<HashMap<String, Rc<PropertyTable>>>,
}

impl ActivePropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the reactive properties of `blueprint`. Returns names that were
    /// declared in more than one category.
    pub fn declare(&self, blueprint: &str, props: &ActiveProperties) -> Vec<String> {
        let (table, conflicts) = PropertyTable::compile(props);
        self.tables
            .borrow_mut()
            .insert(blueprint.to_string(), Rc::new(table));
        conflicts
    }

    /// Table of `blueprint`; blueprints without declarations get an empty table.
    pub fn table(&self, blueprint: &str) -> Rc<PropertyTable> {
        self.tables
            .borrow()
            .get(blueprint)
            .cloned()
            .unwrap_or_default()
    }

    pub fn remove(&self, blueprint: &str) {
        self.tables.borrow_mut().remove(blueprint);
    }

    /// Compare the number of attributes a node supplies with the declared prop set.
    /// Returns `Some((supplied, declared))` on mismatch.
    pub fn check_prop_count(&self, blueprint: &str, supplied: usize) -> Option<(usize, usize)> {
        let declared = self.table(blueprint).prop_count();
        (supplied != declared).then_some((supplied, declared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_orders_and_categorizes() {
        let props = ActiveProperties::new()
            .data("count")
            .prop("label")
            .getter("score", "game.score");
        let (table, conflicts) = PropertyTable::compile(&props);
        assert!(conflicts.is_empty());
        assert_eq!(table.category("count"), Some(Category::Data));
        assert_eq!(table.category("label"), Some(Category::Prop));
        assert_eq!(table.get("score").and_then(|a| a.path.clone()).as_deref(), Some("game.score"));
        let names: Vec<_> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["count", "label", "score"]);
        assert_eq!(table.prop_count(), 1);
    }

    #[test]
    fn test_categories_are_disjoint() {
        let props = ActiveProperties::new().data("x").prop("x");
        let (table, conflicts) = PropertyTable::compile(&props);
        assert_eq!(conflicts, vec!["x".to_string()]);
        assert_eq!(table.category("x"), Some(Category::Data));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_prop_count_check() {
        let registry = ActivePropertyRegistry::new();
        registry.declare("Label", &ActiveProperties::new().prop("text").prop("color"));
        assert_eq!(registry.check_prop_count("Label", 2), None);
        assert_eq!(registry.check_prop_count("Label", 1), Some((1, 2)));
        assert_eq!(registry.check_prop_count("Unknown", 0), None);
    }
}
