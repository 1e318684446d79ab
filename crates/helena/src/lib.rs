#![doc = include_str!("../../../README.md")]

mod checker;
mod compiler;
mod display;
mod error;
mod evaluator;
mod executor;
mod parser;
mod resolvers;
mod run;
mod selector;
mod syntax;
mod tokenizer;
mod tracer;
mod value;

pub use crate::{
    checker::{WordKind, check_word, is_selector},
    compiler::{Compiler, Operation, Program},
    display::{UNDISPLAYABLE, display_word},
    error::{ControlCode, ErrorKind, ExecResult, Interrupt, RunError, RunResult},
    evaluator::Evaluator,
    executor::Executor,
    parser::{ParserOptions, parse, parse_with_options},
    resolvers::{
        Command, CommandMap, CommandResolver, CommandResult, SelectorResolver, VariableMap, VariableResolver,
    },
    run::Runner,
    selector::{CustomSelector, GenericSelector, IndexedSelector, KeyedSelector, Selector},
    syntax::{Morpheme, Script, Sentence, Word},
    tokenizer::{SourcePosition, Token, TokenKind, Tokenizer, tokenize},
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEntry, Tracer},
    value::{CustomValue, Dictionary, QualifiedValue, ScriptValue, Value},
};
