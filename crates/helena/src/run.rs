//! Public interface for running Helena code.

use serde::{Deserialize, Serialize};

use crate::{
    compiler::{Compiler, Program},
    error::{ExecResult, RunResult},
    executor::Executor,
    parser::{ParserOptions, parse_with_options},
    resolvers::{CommandResolver, SelectorResolver, VariableResolver},
    syntax::Script,
    value::Value,
};

/// Parses and compiles a source string once; executes it any number of times
/// against caller-supplied resolvers.
///
/// # Example
/// ```
/// use helena::{CommandMap, CommandResult, Runner, Value, VariableMap};
///
/// let mut variables = VariableMap::new();
/// variables.set("name", Value::from("world"));
/// let mut commands = CommandMap::new();
/// commands.register_fn("echo", |args| CommandResult::Ok(args[1].clone()));
///
/// let runner = Runner::new("echo $name").unwrap();
/// let value = runner.run(&variables, &commands).unwrap();
/// assert_eq!(value, Value::from("world"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    source: String,
    script: Script,
    program: Program,
}

impl Runner {
    /// Parses and compiles the given source.
    ///
    /// # Errors
    /// Returns the parse or word-classification error.
    pub fn new(source: impl Into<String>) -> RunResult<Self> {
        Self::with_options(source, &ParserOptions::default())
    }

    /// Parses and compiles with explicit parser options.
    ///
    /// # Errors
    /// See [`Runner::new`].
    pub fn with_options(source: impl Into<String>, options: &ParserOptions) -> RunResult<Self> {
        let source = source.into();
        let script = parse_with_options(&source, options)?;
        let program = Compiler::new().compile_script(&script)?;
        Ok(Self {
            source,
            script,
            program,
        })
    }

    /// The source that was parsed to create this runner.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree.
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// The compiled operation sequence.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Executes the compiled program.
    ///
    /// # Errors
    /// Propagates execution errors and host control-flow codes.
    pub fn run(&self, variables: &dyn VariableResolver, commands: &dyn CommandResolver) -> ExecResult<Value> {
        self.run_with(variables, commands, None)
    }

    /// Executes the compiled program with a selector resolver.
    ///
    /// # Errors
    /// See [`Runner::run`].
    pub fn run_with(
        &self,
        variables: &dyn VariableResolver,
        commands: &dyn CommandResolver,
        selectors: Option<&dyn SelectorResolver>,
    ) -> ExecResult<Value> {
        Executor::new(variables, commands, selectors).execute(&self.program)
    }

    /// Evaluates the syntax tree directly, skipping the compiled program.
    /// Produces the same results as [`Runner::run`] on every input.
    ///
    /// # Errors
    /// See [`Runner::run`].
    pub fn evaluate(
        &self,
        variables: &dyn VariableResolver,
        commands: &dyn CommandResolver,
        selectors: Option<&dyn SelectorResolver>,
    ) -> ExecResult<Value> {
        crate::evaluator::Evaluator::new(variables, commands, selectors).evaluate_script(&self.script)
    }

    /// Serializes the runner to a binary format.
    ///
    /// The serialized data can be stored and later restored with `load()`,
    /// caching the parse and compile work across processes.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a runner from binary format.
    ///
    /// # Errors
    /// Returns an error if deserialization fails.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
