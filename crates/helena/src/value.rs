//! Runtime values and their structural capabilities.
//!
//! Values are immutable after construction and cheap to clone: compound
//! variants hold reference-counted payloads. Every value exposes the same
//! four capabilities — string coercion, indexed selection, keyed selection,
//! and rule-based selection — each of which either produces a new value or a
//! typed error.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    display,
    error::{RunError, RunResult},
    selector::{GenericSelector, IndexedSelector, KeyedSelector, Selector},
    syntax::Script,
};

/// Insertion-ordered string-keyed mapping.
///
/// Iteration order is part of the observable behavior (key listings and
/// equality checks in command layers depend on it), so the storage preserves
/// insertion order rather than hash order.
pub type Dictionary = IndexMap<String, Value, ahash::RandomState>;

/// Primary runtime value type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Rc<str>),
    /// Ordered sequence of values.
    List(Rc<Vec<Value>>),
    /// Insertion-ordered mapping from string keys to values.
    Dictionary(Rc<Dictionary>),
    /// Ordered sequence of values; the unit of argument passing and
    /// expansion, distinct from lists.
    Tuple(Rc<Vec<Value>>),
    /// A parsed script plus its original source text, if any.
    Script(Rc<ScriptValue>),
    /// A deferred access path: a source value and the selectors to apply.
    Qualified(Rc<QualifiedValue>),
    /// Opaque host-supplied value; capabilities are delegated to its hooks.
    #[serde(skip)]
    Custom(Rc<dyn CustomValue>),
}

/// Payload of a script value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptValue {
    pub script: Rc<Script>,
    pub source: Option<Rc<str>>,
}

/// Payload of a qualified value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedValue {
    pub source: Value,
    pub selectors: Vec<Selector>,
}

impl QualifiedValue {
    /// Returns a new qualified value with one more selector appended.
    /// Adjacent keyed selectors merge by concatenating their key lists.
    #[must_use]
    pub fn with_selector(&self, selector: Selector) -> Value {
        let mut selectors = self.selectors.clone();
        match (selectors.last_mut(), &selector) {
            (Some(Selector::Keyed(last)), Selector::Keyed(new)) => {
                last.keys.extend(new.keys.iter().cloned());
            }
            _ => selectors.push(selector),
        }
        Value::Qualified(Rc::new(Self {
            source: self.source.clone(),
            selectors,
        }))
    }
}

/// Host-supplied opaque value.
///
/// Implementations opt into capabilities by overriding the hooks; the
/// defaults report the same typed errors as built-in values without that
/// capability.
pub trait CustomValue: fmt::Debug {
    /// Type tag used in diagnostics.
    fn type_name(&self) -> &str;

    fn as_string(&self) -> RunResult<Rc<str>> {
        Err(RunError::no_string_representation())
    }

    fn select_index(&self, _index: &Value) -> RunResult<Value> {
        Err(RunError::not_index_selectable())
    }

    fn select_key(&self, _key: &Value) -> RunResult<Value> {
        Err(RunError::not_key_selectable())
    }

    fn select_rules(&self, _rules: &[Value]) -> RunResult<Value> {
        Err(RunError::not_selectable())
    }
}

impl Value {
    /// Builds a tuple value.
    #[must_use]
    pub fn tuple(values: Vec<Value>) -> Self {
        Self::Tuple(Rc::new(values))
    }

    /// Builds a list value.
    #[must_use]
    pub fn list(values: Vec<Value>) -> Self {
        Self::List(Rc::new(values))
    }

    /// Builds a dictionary value.
    #[must_use]
    pub fn dictionary(entries: Dictionary) -> Self {
        Self::Dictionary(Rc::new(entries))
    }

    /// Builds a script value.
    #[must_use]
    pub fn script(script: Rc<Script>, source: Option<Rc<str>>) -> Self {
        Self::Script(Rc::new(ScriptValue { script, source }))
    }

    /// Builds a qualified value with an empty selector sequence.
    #[must_use]
    pub fn qualified(source: Value) -> Self {
        Self::Qualified(Rc::new(QualifiedValue {
            source,
            selectors: Vec::new(),
        }))
    }

    /// Wraps a host value.
    #[must_use]
    pub fn custom(value: Rc<dyn CustomValue>) -> Self {
        Self::Custom(value)
    }

    /// The type tag of this value.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
            Self::Tuple(_) => "tuple",
            Self::Script(_) => "script",
            Self::Qualified(_) => "qualified",
            Self::Custom(custom) => custom.type_name(),
        }
    }

    /// Canonical string representation.
    ///
    /// # Errors
    /// Fails for nil, lists, dictionaries, tuples, qualified values, and
    /// scripts with no retained source.
    pub fn as_string(&self) -> RunResult<Rc<str>> {
        match self {
            Self::Nil => Err(RunError::nil_no_string_representation()),
            Self::Boolean(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
            Self::Integer(i) => Ok(Rc::from(i.to_string().as_str())),
            Self::Real(r) => Ok(Rc::from(real_to_string(*r).as_str())),
            Self::String(s) => Ok(s.clone()),
            Self::Script(script) => script.source.clone().ok_or_else(RunError::no_string_representation),
            Self::Custom(custom) => custom.as_string(),
            _ => Err(RunError::no_string_representation()),
        }
    }

    /// Coerces this value to an integer, for indexing.
    ///
    /// # Errors
    /// Fails with "invalid integer" for non-numeric values, fractional
    /// reals, and unparseable strings.
    pub fn as_integer(&self) -> RunResult<i64> {
        match self {
            Self::Integer(i) => Ok(*i),
            #[expect(clippy::cast_possible_truncation, reason = "fractional reals are rejected first")]
            Self::Real(r) if r.fract() == 0.0 && r.is_finite() => Ok(*r as i64),
            Self::String(s) => s.parse().map_err(|_| RunError::invalid_integer()),
            _ => Err(RunError::invalid_integer()),
        }
    }

    /// Numeric index selection.
    ///
    /// # Errors
    /// Fails with "value is not index-selectable" when unsupported, with
    /// "index out of range" for out-of-range indexes, and with "invalid
    /// integer" when the index does not coerce.
    pub fn select_index(&self, index: &Value) -> RunResult<Value> {
        match self {
            Self::String(s) => {
                let i = checked_index(index)?;
                s.chars()
                    .nth(i)
                    .map(|c| Self::String(Rc::from(c.to_string().as_str())))
                    .ok_or_else(RunError::index_out_of_range)
            }
            Self::List(items) => {
                let i = checked_index(index)?;
                items.get(i).cloned().ok_or_else(RunError::index_out_of_range)
            }
            // Element-wise: nested tuples recurse, preserving shape
            Self::Tuple(items) => items
                .iter()
                .map(|item| item.select_index(index))
                .collect::<RunResult<Vec<_>>>()
                .map(Self::tuple),
            Self::Qualified(qualified) => {
                let selector = Selector::Indexed(IndexedSelector::new(index.clone())?);
                Ok(qualified.with_selector(selector))
            }
            Self::Custom(custom) => custom.select_index(index),
            _ => Err(RunError::not_index_selectable()),
        }
    }

    /// Keyed selection.
    ///
    /// # Errors
    /// Fails with "value is not key-selectable" when unsupported and with
    /// "unknown key" for missing keys.
    pub fn select_key(&self, key: &Value) -> RunResult<Value> {
        match self {
            Self::Dictionary(entries) => {
                let name = key.as_string()?;
                entries.get(&*name).cloned().ok_or_else(RunError::unknown_key)
            }
            Self::Tuple(items) => items
                .iter()
                .map(|item| item.select_key(key))
                .collect::<RunResult<Vec<_>>>()
                .map(Self::tuple),
            Self::Qualified(qualified) => {
                let selector = Selector::Keyed(KeyedSelector::new(vec![key.clone()])?);
                Ok(qualified.with_selector(selector))
            }
            Self::Custom(custom) => custom.select_key(key),
            _ => Err(RunError::not_key_selectable()),
        }
    }

    /// Rule-based selection.
    ///
    /// # Errors
    /// Fails with "value is not selectable" when unsupported.
    pub fn select_rules(&self, rules: &[Value]) -> RunResult<Value> {
        match self {
            Self::Qualified(qualified) => {
                let selector = Selector::Generic(GenericSelector::new(rules.to_vec())?);
                Ok(qualified.with_selector(selector))
            }
            Self::Custom(custom) => custom.select_rules(rules),
            _ => Err(RunError::not_selectable()),
        }
    }
}

/// Coerces an index value to a non-negative offset.
fn checked_index(index: &Value) -> RunResult<usize> {
    let i = index.as_integer()?;
    usize::try_from(i).map_err(|_| RunError::index_out_of_range())
}

/// Shortest round-tripping representation of a real, with lowercase
/// `inf`/`-inf`/`nan` for the non-finite values.
fn real_to_string(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    buffer.format(value).to_owned()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Dictionary(a), Self::Dictionary(b)) => a == b,
            (Self::Script(a), Self::Script(b)) => a == b,
            (Self::Qualified(a), Self::Qualified(b)) => a == b,
            // Host values compare by identity
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Canonical source rendering; values with no displayable form render
    /// as a block-comment placeholder.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display::display_value(self, f)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Rc::from(v.as_str()))
    }
}
