//! Stack executor for compiled programs.
//!
//! A deterministic machine: a LIFO stack of value frames plus a last-result
//! register. Operations only touch the top frame and the register. State
//! lives for a single `execute` call; the resolvers injected at construction
//! are the only seams to the outside world.

use smallvec::SmallVec;

use crate::{
    compiler::{Operation, Program},
    error::{ExecResult, Interrupt, RunError, RunResult},
    resolvers::{CommandResolver, CommandResult, SelectorResolver, VariableResolver, resolve_selector, resolve_value},
    selector::{IndexedSelector, KeyedSelector},
    tracer::Tracer,
    value::Value,
};

/// A value-accumulator frame. Argument lists are short, so a few elements
/// stay inline.
type Frame = SmallVec<[Value; 4]>;

/// Executes programs against a set of resolvers.
pub struct Executor<'a> {
    variables: &'a dyn VariableResolver,
    commands: &'a dyn CommandResolver,
    selectors: Option<&'a dyn SelectorResolver>,
    tracer: Option<&'a mut dyn Tracer>,
}

impl<'a> Executor<'a> {
    pub fn new(
        variables: &'a dyn VariableResolver,
        commands: &'a dyn CommandResolver,
        selectors: Option<&'a dyn SelectorResolver>,
    ) -> Self {
        Self {
            variables,
            commands,
            selectors,
            tracer: None,
        }
    }

    /// Attaches a tracer for subsequent runs.
    #[must_use]
    pub fn with_tracer(mut self, tracer: &'a mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Runs a program to completion.
    ///
    /// On normal termination the result is the last sentence result, or the
    /// value left on the top frame for programs compiled from single words.
    ///
    /// # Errors
    /// The first typed error aborts execution; host control-flow codes from
    /// commands are propagated unchanged.
    pub fn execute(&mut self, program: &Program) -> ExecResult<Value> {
        let mut state = State::new();
        let result = self.run(program, &mut state);
        if let Some(tracer) = self.tracer.as_deref_mut() {
            tracer.finished(&result);
        }
        result
    }

    fn run(&mut self, program: &Program, state: &mut State) -> ExecResult<Value> {
        for (index, op) in program.ops().iter().enumerate() {
            if let Some(tracer) = self.tracer.as_deref_mut() {
                tracer.operation(index, op, state.frames.len());
            }
            self.step(state, op)?;
        }
        Ok(state.take_result())
    }

    fn step(&mut self, state: &mut State, op: &Operation) -> ExecResult<()> {
        match op {
            Operation::PushValue(value) => state.push(value.clone()),
            Operation::OpenFrame => state.frames.push(Frame::new()),
            Operation::CloseFrame => {
                let frame = state.frames.pop().expect("CloseFrame without matching OpenFrame");
                state.push(Value::tuple(frame.into_vec()));
            }
            Operation::ResolveValue => {
                let value = state.pop();
                state.push(resolve_value(self.variables, &value)?);
            }
            Operation::ExpandValue => {
                if matches!(state.frame().last(), Some(Value::Tuple(_))) {
                    let Value::Tuple(items) = state.pop() else { unreachable!() };
                    state.frame().extend(items.iter().cloned());
                }
            }
            Operation::SetSource => {
                let source = state.pop();
                state.push(Value::qualified(source));
            }
            Operation::SelectIndex => {
                let index = state.pop();
                let target = state.pop();
                let selector = IndexedSelector::new(index)?;
                state.push(selector.apply(&target)?);
            }
            Operation::SelectKeys => {
                let keys = state.pop_tuple();
                let target = state.pop();
                let selector = KeyedSelector::new(keys)?;
                state.push(selector.apply(&target)?);
            }
            Operation::SelectRules => {
                let rules = state.pop_tuple();
                let target = state.pop();
                let selector = resolve_selector(self.selectors, &rules)?;
                state.push(selector.apply(&target)?);
            }
            Operation::EvaluateSentence => {
                let args = state.pop_tuple();
                if !args.is_empty() {
                    state.result = evaluate_sentence(self.commands, &args)?;
                }
            }
            Operation::SubstituteResult => state.push(state.result.clone()),
            Operation::JoinStrings => {
                let parts = state.pop_tuple();
                let mut joined = String::new();
                for part in &parts {
                    joined.push_str(&part.as_string()?);
                }
                state.push(Value::from(joined));
            }
        }
        Ok(())
    }
}

/// Resolves and invokes the command named by the first argument.
pub(crate) fn evaluate_sentence(commands: &dyn CommandResolver, args: &[Value]) -> ExecResult<Value> {
    let name = first_arg_name(args)?;
    let command = commands
        .resolve(&name)
        .ok_or_else(|| RunError::unresolved_command(&name))?;
    match command.evaluate(args) {
        CommandResult::Ok(value) => Ok(value),
        CommandResult::Error(error) => Err(Interrupt::Error(error)),
        CommandResult::Code(code, value) => Err(Interrupt::Code(code, value)),
    }
}

fn first_arg_name(args: &[Value]) -> RunResult<std::rc::Rc<str>> {
    args.first().expect("sentence arguments are non-empty").as_string()
}

/// Per-run machine state.
struct State {
    frames: Vec<Frame>,
    result: Value,
}

impl State {
    fn new() -> Self {
        Self {
            frames: vec![Frame::new()],
            result: Value::Nil,
        }
    }

    fn frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack underflow")
    }

    fn push(&mut self, value: Value) {
        self.frame().push(value);
    }

    fn pop(&mut self) -> Value {
        self.frame().pop().expect("value stack underflow")
    }

    fn pop_tuple(&mut self) -> Vec<Value> {
        match self.pop() {
            Value::Tuple(items) => items.as_ref().clone(),
            _ => unreachable!("expected a tuple on the frame"),
        }
    }

    /// Final value of a run: a value left on the top frame wins, otherwise
    /// the last sentence result.
    fn take_result(&mut self) -> Value {
        if let Some(value) = self.frame().pop() {
            value
        } else {
            std::mem::replace(&mut self.result, Value::Nil)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::Compiler,
        parser::parse,
        resolvers::{CommandMap, VariableMap},
        tracer::RecordingTracer,
    };

    fn run(source: &str, variables: &VariableMap, commands: &CommandMap) -> ExecResult<Value> {
        let program = Compiler::new().compile_script(&parse(source).unwrap()).unwrap();
        Executor::new(variables, commands, None).execute(&program)
    }

    #[test]
    fn empty_scripts_leave_the_register_nil() {
        let result = run("", &VariableMap::new(), &CommandMap::new()).unwrap();
        assert_eq!(result, Value::Nil);
    }

    #[test]
    fn unresolved_command_reports_its_name() {
        let err = run("missing", &VariableMap::new(), &CommandMap::new()).unwrap_err();
        let Interrupt::Error(error) = err else { panic!("expected error") };
        assert_eq!(error.message(), "cannot resolve command missing");
    }

    #[test]
    fn unresolved_variable_reports_its_name() {
        let mut commands = CommandMap::new();
        commands.register_fn("cmd", |args| CommandResult::Ok(args[1].clone()));
        let err = run("cmd $nope", &VariableMap::new(), &commands).unwrap_err();
        let Interrupt::Error(error) = err else { panic!("expected error") };
        assert_eq!(error.message(), "cannot resolve variable nope");
    }

    #[test]
    fn commands_receive_their_own_name() {
        let mut commands = CommandMap::new();
        commands.register_fn("echo", |args| CommandResult::Ok(Value::tuple(args.to_vec())));
        let result = run("echo a b", &VariableMap::new(), &commands).unwrap();
        assert_eq!(
            result,
            Value::tuple(vec![Value::from("echo"), Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn control_codes_propagate_unchanged() {
        use crate::error::ControlCode;
        let mut commands = CommandMap::new();
        commands.register_fn("break", |_| CommandResult::Code(ControlCode(3), Value::from("payload")));
        let err = run("break", &VariableMap::new(), &commands).unwrap_err();
        assert_eq!(err, Interrupt::Code(ControlCode(3), Value::from("payload")));
    }

    #[test]
    fn later_sentences_overwrite_the_register() {
        let mut commands = CommandMap::new();
        commands.register_fn("value", |args| CommandResult::Ok(args[1].clone()));
        let result = run("value a\nvalue b", &VariableMap::new(), &commands).unwrap();
        assert_eq!(result, Value::from("b"));
    }

    #[test]
    fn tracers_observe_operations() {
        let variables = VariableMap::new();
        let mut commands = CommandMap::new();
        commands.register_fn("cmd", |_| CommandResult::Ok(Value::Nil));
        let program = Compiler::new().compile_script(&parse("cmd").unwrap()).unwrap();
        let mut tracer = RecordingTracer::default();
        Executor::new(&variables, &commands, None)
            .with_tracer(&mut tracer)
            .execute(&program)
            .unwrap();
        let names: Vec<&str> = tracer.entries.iter().map(|e| e.operation).collect();
        assert_eq!(names, ["OpenFrame", "PushValue", "CloseFrame", "EvaluateSentence"]);
    }
}
