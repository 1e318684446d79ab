//! Selector algebra: narrowing a value by index, key set, or rule set.
//!
//! Selectors are small immutable values themselves: they hold plain values,
//! never back-pointers to the qualified values that own them. Each renders
//! back to its canonical source syntax.

use std::{fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    display,
    error::{RunError, RunResult},
    value::Value,
};

/// An operation narrowing a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Selector {
    /// `[index]` — numeric index selection.
    Indexed(IndexedSelector),
    /// `(key1 key2)` — keyed selection, folded left to right.
    Keyed(KeyedSelector),
    /// `{rule1 arg1; rule2 arg2}` — rule-based selection.
    Generic(GenericSelector),
    /// Host-supplied selector.
    #[serde(skip)]
    Custom(Rc<dyn CustomSelector>),
}

impl Selector {
    /// Applies this selector to a target value.
    ///
    /// # Errors
    /// Propagates the target's capability errors.
    pub fn apply(&self, target: &Value) -> RunResult<Value> {
        match self {
            Self::Indexed(selector) => selector.apply(target),
            Self::Keyed(selector) => selector.apply(target),
            Self::Generic(selector) => selector.apply(target),
            Self::Custom(selector) => selector.apply(target),
        }
    }
}

/// Host-supplied selector implementing the apply contract.
pub trait CustomSelector: fmt::Debug {
    /// Applies the selector to a target value.
    fn apply(&self, target: &Value) -> RunResult<Value>;

    /// Canonical source rendering, used when displaying qualified values.
    fn render(&self) -> String;
}

/// Numeric index selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSelector {
    pub index: Value,
}

impl IndexedSelector {
    /// # Errors
    /// Fails with "invalid index" when the index is nil.
    pub fn new(index: Value) -> RunResult<Self> {
        if matches!(index, Value::Nil) {
            return Err(RunError::invalid_index());
        }
        Ok(Self { index })
    }

    /// # Errors
    /// Propagates the target's `select_index` error.
    pub fn apply(&self, target: &Value) -> RunResult<Value> {
        target.select_index(&self.index)
    }
}

/// Keyed selection over a non-empty key sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedSelector {
    pub keys: Vec<Value>,
}

impl KeyedSelector {
    /// # Errors
    /// Fails with "empty selector" on an empty key sequence.
    pub fn new(keys: Vec<Value>) -> RunResult<Self> {
        if keys.is_empty() {
            return Err(RunError::empty_selector());
        }
        Ok(Self { keys })
    }

    /// Folds `select_key` over the keys, left to right.
    ///
    /// # Errors
    /// Propagates the first `select_key` error.
    pub fn apply(&self, target: &Value) -> RunResult<Value> {
        let mut current = target.clone();
        for key in &self.keys {
            current = current.select_key(key)?;
        }
        Ok(current)
    }
}

/// Rule-based selection over a non-empty rule sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericSelector {
    pub rules: Vec<Value>,
}

impl GenericSelector {
    /// # Errors
    /// Fails with "empty selector" on an empty rule sequence.
    pub fn new(rules: Vec<Value>) -> RunResult<Self> {
        if rules.is_empty() {
            return Err(RunError::empty_selector());
        }
        Ok(Self { rules })
    }

    /// # Errors
    /// Propagates the target's `select_rules` error.
    pub fn apply(&self, target: &Value) -> RunResult<Value> {
        target.select_rules(&self.rules)
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Indexed(a), Self::Indexed(b)) => a == b,
            (Self::Keyed(a), Self::Keyed(b)) => a == b,
            (Self::Generic(a), Self::Generic(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display::display_selector(self, f)
    }
}
