//! View-Model Engine - per-instance reactive property storage.
//!
//! Each reactive property of each live instance has exactly one [`Entry`]:
//! its current value plus an ordered list of dependency callbacks.
//!
//! # Propagation
//!
//! Writes are synchronous and push-based. A write that changes the stored
//! value (by deep equality) invokes every dependency in registration order
//! before returning; a write of an equal value invokes none. Callbacks may
//! write other properties, which recurse depth-first on the call stack.
//!
//! # Categories
//!
//! | category | internal write | external write (directive, parent) | read |
//! |----------|----------------|------------------------------------|------|
//! | data     | stored + propagated | stored + propagated | stored value |
//! | prop     | rejected | stored + propagated | stored value |
//! | getter   | rejected | rejected | store at path, every read |

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::active::{Category, PropertyTable};
use crate::app::Application;
use crate::error::Violation;
use crate::store::Store;
use crate::types::{ObjectId, Value};

/// Dependency callback: receives the application and the new value.
pub type Dependency = Rc<dyn Fn(&Application, &Value)>;

/// Values of a component's data/prop properties, keyed by name.
pub type PropertyBag = BTreeMap<String, Value>;

/// Who is writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// The owning instance itself.
    Internal,
    /// A directive or the parent supplying a prop.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Changed,
    Unchanged,
}

pub struct Entry {
    pub category: Category,
    value: Value,
    path: Option<String>,
    dependencies: Vec<Dependency>,
}

impl Entry {
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }
}

pub struct ViewModels {
    tables: RefCell<HashMap<ObjectId, HashMap<String, Entry>>>,
    depth: Cell<usize>,
    max_depth: Cell<usize>,
}

impl Default for ViewModels {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ViewModels {
    pub fn new(max_depth: usize) -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
            depth: Cell::new(0),
            max_depth: Cell::new(max_depth),
        }
    }

    pub fn set_max_depth(&self, max_depth: usize) {
        self.max_depth.set(max_depth);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create entries for every declared property of an instance.
    ///
    /// Data and prop entries are seeded by `seed(name)`; getter entries cache
    /// the store value they currently read.
    pub fn init(&self, id: ObjectId, table: &PropertyTable, store: &Store, seed: impl Fn(&str) -> Value) {
        let mut entries = HashMap::with_capacity(table.len());
        for (name, accessor) in table.iter() {
            let value = match accessor.category {
                Category::Getter => accessor
                    .path
                    .as_deref()
                    .map(|p| store.get_at_path(p))
                    .unwrap_or_default(),
                Category::Data | Category::Prop => seed(name),
            };
            entries.insert(
                name.to_string(),
                Entry {
                    category: accessor.category,
                    value,
                    path: accessor.path.clone(),
                    dependencies: Vec::new(),
                },
            );
        }
        self.tables.borrow_mut().insert(id, entries);
    }

    /// Drop every entry of an instance, dependencies included.
    pub fn destroy(&self, id: ObjectId) -> bool {
        // Dependencies may own captured state; drop them outside the borrow.
        let removed = self.tables.borrow_mut().remove(&id);
        removed.is_some()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn has_instance(&self, id: ObjectId) -> bool {
        self.tables.borrow().contains_key(&id)
    }

    pub fn category(&self, id: ObjectId, property: &str) -> Option<Category> {
        self.tables
            .borrow()
            .get(&id)
            .and_then(|t| t.get(property))
            .map(|e| e.category)
    }

    pub fn dependency_count(&self, id: ObjectId, property: &str) -> usize {
        self.tables
            .borrow()
            .get(&id)
            .and_then(|t| t.get(property))
            .map(Entry::dependency_count)
            .unwrap_or(0)
    }

    /// Current value; getters read the store on every call.
    pub fn read(&self, store: &Store, id: ObjectId, property: &str) -> Option<Value> {
        let path = {
            let tables = self.tables.borrow();
            let entry = tables.get(&id)?.get(property)?;
            match entry.category {
                Category::Getter => entry.path.clone(),
                Category::Data | Category::Prop => return Some(entry.value.clone()),
            }
        };
        Some(path.map(|p| store.get_at_path(&p)).unwrap_or_default())
    }

    /// Data and prop values of an instance.
    pub fn snapshot(&self, id: ObjectId) -> Option<PropertyBag> {
        let tables = self.tables.borrow();
        let table = tables.get(&id)?;
        Some(
            table
                .iter()
                .filter(|(_, e)| e.category != Category::Getter)
                .map(|(n, e)| (n.clone(), e.value.clone()))
                .collect(),
        )
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a dependency to a property. Returns false when the property is
    /// not reactive on that instance.
    pub fn add_dependency(&self, id: ObjectId, property: &str, dependency: Dependency) -> bool {
        let mut tables = self.tables.borrow_mut();
        match tables.get_mut(&id).and_then(|t| t.get_mut(property)) {
            Some(entry) => {
                entry.dependencies.push(dependency);
                true
            }
            None => false,
        }
    }

    /// Store a value without category checks or propagation.
    ///
    /// Used while an instance is being constructed, before anything depends on it.
    pub fn seed(&self, id: ObjectId, property: &str, value: Value) -> bool {
        let mut tables = self.tables.borrow_mut();
        match tables.get_mut(&id).and_then(|t| t.get_mut(property)) {
            Some(entry) if entry.category != Category::Getter => {
                entry.value = value;
                true
            }
            _ => false,
        }
    }

    /// Write a property and propagate the change.
    pub fn write(
        &self,
        app: &Application,
        id: ObjectId,
        property: &str,
        value: Value,
        origin: WriteOrigin,
    ) -> Result<WriteOutcome, Violation> {
        if self.depth.get() >= self.max_depth.get() {
            return Err(Violation::DispatchTooDeep(self.max_depth.get()));
        }
        let dependencies = {
            let mut tables = self.tables.borrow_mut();
            let table = tables.get_mut(&id).ok_or(Violation::UnknownInstance(id))?;
            let entry = table
                .get_mut(property)
                .ok_or_else(|| Violation::UnknownProperty {
                    id,
                    property: property.to_string(),
                })?;
            match (entry.category, origin) {
                (Category::Getter, _) => {
                    return Err(Violation::ReadOnlyGetter {
                        id,
                        property: property.to_string(),
                    });
                }
                (Category::Prop, WriteOrigin::Internal) => {
                    return Err(Violation::ReadOnlyProp {
                        id,
                        property: property.to_string(),
                    });
                }
                _ => {}
            }
            if entry.value == value {
                return Ok(WriteOutcome::Unchanged);
            }
            entry.value = value.clone();
            entry.dependencies.clone()
        };
        self.dispatch(app, &dependencies, &value);
        Ok(WriteOutcome::Changed)
    }

    /// Re-read every getter from the store and fire the dependencies of those
    /// whose value changed. Returns the number of getters that changed.
    pub fn refresh_getters(&self, app: &Application, store: &Store) -> usize {
        let mut changed: Vec<(Vec<Dependency>, Value)> = Vec::new();
        {
            let mut tables = self.tables.borrow_mut();
            let mut ids: Vec<ObjectId> = tables.keys().copied().collect();
            ids.sort();
            for id in ids {
                let Some(table) = tables.get_mut(&id) else { continue };
                let mut names: Vec<&String> = table
                    .iter()
                    .filter(|(_, e)| e.category == Category::Getter)
                    .map(|(n, _)| n)
                    .collect();
                names.sort();
                let names: Vec<String> = names.into_iter().cloned().collect();
                for name in names {
                    let Some(entry) = table.get_mut(&name) else { continue };
                    let current = entry
                        .path
                        .as_deref()
                        .map(|p| store.get_at_path(p))
                        .unwrap_or_default();
                    if current != entry.value {
                        entry.value = current.clone();
                        changed.push((entry.dependencies.clone(), current));
                    }
                }
            }
        }
        let count = changed.len();
        for (dependencies, value) in changed {
            self.dispatch(app, &dependencies, &value);
        }
        count
    }

    fn dispatch(&self, app: &Application, dependencies: &[Dependency], value: &Value) {
        self.depth.set(self.depth.get() + 1);
        for dependency in dependencies {
            dependency(app, value);
        }
        self.depth.set(self.depth.get() - 1);
    }
}
