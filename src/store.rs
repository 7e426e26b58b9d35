//! Global state store - reducer-style application state.
//!
//! State is a [`Value::Map`] whose top-level keys are slices. Each slice has a
//! reducer; a dispatched [`Action`] runs every reducer against its own slice
//! (combined-reducers semantics).
//!
//! Getter-category properties read the store through [`Store::get_at_path`]
//! and never write to it.
//!
//! The state lives in a spark-signals [`Signal`], so hosts can observe it:
//!
//! ```ignore
//! let state = app.store().state_signal();
//! spark_signals::effect(move || {
//!     let _ = state.get(); // re-runs after every dispatch that changes state
//! });
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::types::Value;

/// Action handed to reducers.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: String,
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// Slice reducer: `(current slice, action) -> next slice`.
pub type Reducer = Rc<dyn Fn(&Value, &Action) -> Value>;

pub struct Store {
    state: Signal<Value>,
    reducers: RefCell<Vec<(String, Reducer)>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: signal(Value::Map(BTreeMap::new())),
            reducers: RefCell::new(Vec::new()),
        }
    }

    /// Add a slice with its initial value and reducer.
    ///
    /// Re-adding an existing slice replaces its reducer and resets its value.
    pub fn add_slice(
        &self,
        key: impl Into<String>,
        initial: impl Into<Value>,
        reducer: impl Fn(&Value, &Action) -> Value + 'static,
    ) {
        let key = key.into();
        {
            let mut reducers = self.reducers.borrow_mut();
            reducers.retain(|(k, _)| *k != key);
            reducers.push((key.clone(), Rc::new(reducer)));
        }
        let mut state = self.root_map();
        state.insert(key, initial.into());
        self.state.set(Value::Map(state));
    }

    /// Replace the whole state tree (used to hydrate from JSON).
    pub fn replace_state(&self, state: impl Into<Value>) {
        self.state.set(state.into());
    }

    /// Run every slice reducer. Returns true when the state changed.
    pub fn dispatch(&self, action: &Action) -> bool {
        let reducers: Vec<(String, Reducer)> = self.reducers.borrow().clone();
        let before = self.state.get();
        let mut next = self.root_map();
        for (key, reducer) in &reducers {
            let slice = next.get(key).cloned().unwrap_or_default();
            next.insert(key.clone(), reducer(&slice, action));
        }
        let next = Value::Map(next);
        if next == before {
            return false;
        }
        self.state.set(next);
        true
    }

    pub fn state(&self) -> Value {
        self.state.get()
    }

    /// Deep-read the state at a dotted path.
    pub fn get_at_path(&self, path: &str) -> Value {
        self.state.get().at_path(path)
    }

    /// Reactive handle on the state tree.
    pub fn state_signal(&self) -> Signal<Value> {
        self.state.clone()
    }

    fn root_map(&self) -> BTreeMap<String, Value> {
        match self.state.get() {
            Value::Map(map) => map,
            _ => BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_store() -> Store {
        let store = Store::new();
        store.add_slice("game", serde_json::json!({ "score": 0 }), |slice, action| {
            match action.kind.as_str() {
                "score/add" => {
                    let score = slice.at_path("score").as_int().unwrap_or(0);
                    let add = action.payload.as_int().unwrap_or(0);
                    Value::from(serde_json::json!({ "score": score + add }))
                }
                _ => slice.clone(),
            }
        });
        store
    }

    #[test]
    fn test_dispatch_runs_slice_reducer() {
        let store = counter_store();
        assert_eq!(store.get_at_path("game.score"), Value::Int(0));

        assert!(store.dispatch(&Action::new("score/add", 5)));
        assert_eq!(store.get_at_path("game.score"), Value::Int(5));
    }

    #[test]
    fn test_unknown_action_leaves_state() {
        let store = counter_store();
        assert!(!store.dispatch(&Action::new("noop", Value::Null)));
        assert_eq!(store.get_at_path("game.score"), Value::Int(0));
    }

    #[test]
    fn test_missing_path_is_undefined() {
        let store = counter_store();
        assert_eq!(store.get_at_path("menu.open"), Value::Undefined);
    }

    #[test]
    fn test_state_signal_sees_dispatch() {
        let store = counter_store();
        let state = store.state_signal();
        store.dispatch(&Action::new("score/add", 2));
        assert_eq!(state.get().at_path("game.score"), Value::Int(2));
    }
}
