//! External collaborator interfaces and map-backed implementations.
//!
//! The executor and the tree-walking evaluator talk to the outside world
//! through exactly three seams: variable resolution, command resolution, and
//! selector resolution. Hosts inject implementations at construction; the
//! core holds no globals.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    error::{RunError, RunResult},
    selector::{GenericSelector, Selector},
    value::Value,
};

/// Resolves variable names to values.
pub trait VariableResolver {
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Resolves command names to commands.
pub trait CommandResolver {
    fn resolve(&self, name: &str) -> Option<Rc<dyn Command>>;
}

/// Resolves rule sequences to selectors, e.g. to map well-known rules onto
/// custom selector implementations.
pub trait SelectorResolver {
    /// # Errors
    /// May reject a rule sequence with a typed error.
    fn resolve(&self, rules: &[Value]) -> RunResult<Selector>;
}

/// Outcome of one command invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Completed with a value, stored in the last-result register.
    Ok(Value),
    /// Typed failure; aborts execution.
    Error(RunError),
    /// Host control-flow code with its payload; aborts core execution and
    /// surfaces to the caller unchanged.
    Code(crate::error::ControlCode, Value),
}

/// A command invoked by sentence evaluation.
///
/// The argument tuple includes the command name as its first element.
pub trait Command {
    fn evaluate(&self, args: &[Value]) -> CommandResult;
}

impl<F> Command for F
where
    F: Fn(&[Value]) -> CommandResult,
{
    fn evaluate(&self, args: &[Value]) -> CommandResult {
        self(args)
    }
}

/// Map-backed variable resolver.
#[derive(Debug, Default, Clone)]
pub struct VariableMap {
    entries: AHashMap<String, Value>,
}

impl VariableMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(name.into(), value);
        self
    }
}

impl VariableResolver for VariableMap {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }
}

/// Map-backed command resolver.
#[derive(Default, Clone)]
pub struct CommandMap {
    entries: AHashMap<String, Rc<dyn Command>>,
}

impl CommandMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, command: Rc<dyn Command>) -> &mut Self {
        self.entries.insert(name.into(), command);
        self
    }

    /// Registers a closure as a command.
    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        command: impl Fn(&[Value]) -> CommandResult + 'static,
    ) -> &mut Self {
        self.register(name, Rc::new(command))
    }
}

impl CommandResolver for CommandMap {
    fn resolve(&self, name: &str) -> Option<Rc<dyn Command>> {
        self.entries.get(name).cloned()
    }
}

/// Resolves a value as a variable reference. Tuples resolve element-wise,
/// recursively; anything else is coerced to a name and looked up.
pub(crate) fn resolve_value(variables: &dyn VariableResolver, value: &Value) -> RunResult<Value> {
    if let Value::Tuple(items) = value {
        return items
            .iter()
            .map(|item| resolve_value(variables, item))
            .collect::<RunResult<Vec<_>>>()
            .map(Value::tuple);
    }
    let name = value.as_string()?;
    variables
        .resolve(&name)
        .ok_or_else(|| RunError::unresolved_variable(&name))
}

/// Builds the selector for a rule tuple, consulting the host resolver when
/// one was supplied.
pub(crate) fn resolve_selector(selectors: Option<&dyn SelectorResolver>, rules: &[Value]) -> RunResult<Selector> {
    match selectors {
        Some(resolver) => resolver.resolve(rules),
        None => Ok(Selector::Generic(GenericSelector::new(rules.to_vec())?)),
    }
}
