//! Lowering from the syntax tree to a linear operation list.
//!
//! Each sentence compiles to a frame that collects its argument values and a
//! final `EvaluateSentence`; words compile according to their category. The
//! operation list is a plain in-memory sequence; `PushValue` embeds its
//! value directly.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    checker::{WordKind, check_word, substitution_group_len},
    error::RunResult,
    syntax::{Morpheme, Script, Word},
    value::Value,
};

/// One stack-machine operation.
#[derive(Debug, Clone, PartialEq, IntoStaticStr, Serialize, Deserialize)]
pub enum Operation {
    /// Push a literal value onto the current frame.
    PushValue(Value),
    /// Start a value-accumulator frame.
    OpenFrame,
    /// End the innermost frame; its values become a tuple pushed onto the
    /// enclosing frame.
    CloseFrame,
    /// Pop a value; resolve it as a variable name (tuples resolve
    /// element-wise) and push the result.
    ResolveValue,
    /// If the top of the frame is a tuple, splice its elements in place.
    ExpandValue,
    /// Pop a value and push a qualified value wrapping it with no selectors.
    SetSource,
    /// Pop an index, pop a target, apply an indexed selector, push the
    /// result.
    SelectIndex,
    /// Pop a key tuple, pop a target, apply a keyed selector, push the
    /// result.
    SelectKeys,
    /// Pop a rule tuple, pop a target, resolve and apply a selector, push
    /// the result.
    SelectRules,
    /// Pop an argument tuple; unless empty, invoke the command it names and
    /// store the result in the last-result register.
    EvaluateSentence,
    /// Push the value in the last-result register.
    SubstituteResult,
    /// Pop a tuple, coerce each element to a string, push the
    /// concatenation.
    JoinStrings,
}

/// A compiled operation sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    ops: Vec<Operation>,
}

impl Program {
    #[must_use]
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Emits operations during compilation, tracking frame balance so a finished
/// program upholds the open/close pairing invariant.
#[derive(Debug, Default)]
struct ProgramBuilder {
    ops: Vec<Operation>,
    open_frames: usize,
}

impl ProgramBuilder {
    fn emit(&mut self, op: Operation) {
        match op {
            Operation::OpenFrame => self.open_frames += 1,
            Operation::CloseFrame => {
                debug_assert!(self.open_frames > 0, "CloseFrame without matching OpenFrame");
                self.open_frames -= 1;
            }
            _ => {}
        }
        self.ops.push(op);
    }

    fn build(self) -> Program {
        debug_assert_eq!(self.open_frames, 0, "unbalanced frames in compiled program");
        Program { ops: self.ops }
    }
}

/// Compiles scripts, sentences, and words into programs.
#[derive(Debug, Default)]
pub struct Compiler;

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compiles a full script.
    ///
    /// # Errors
    /// Fails when a word fits no category.
    pub fn compile_script(&self, script: &Script) -> RunResult<Program> {
        let mut builder = ProgramBuilder::default();
        self.script_into(&mut builder, script)?;
        Ok(builder.build())
    }

    /// Compiles a single word into a program leaving its value on the frame.
    ///
    /// # Errors
    /// Fails when the word fits no category.
    pub fn compile_word(&self, word: &Word) -> RunResult<Program> {
        let mut builder = ProgramBuilder::default();
        self.word_into(&mut builder, word)?;
        Ok(builder.build())
    }

    fn script_into(&self, b: &mut ProgramBuilder, script: &Script) -> RunResult<()> {
        for sentence in &script.sentences {
            // Sentences holding only comment words produce no code at all
            let mut kinds = Vec::with_capacity(sentence.words.len());
            for word in &sentence.words {
                kinds.push(check_word(word)?);
            }
            if kinds.iter().all(|kind| *kind == WordKind::Ignored) {
                continue;
            }
            b.emit(Operation::OpenFrame);
            for word in &sentence.words {
                self.word_into(b, word)?;
            }
            b.emit(Operation::CloseFrame);
            b.emit(Operation::EvaluateSentence);
        }
        Ok(())
    }

    fn word_into(&self, b: &mut ProgramBuilder, word: &Word) -> RunResult<()> {
        match check_word(word)? {
            WordKind::Ignored => Ok(()),
            WordKind::Root => self.root_into(b, &word.morphemes[0]),
            WordKind::Substitution => {
                self.substitution_into(b, &word.morphemes)?;
                Ok(())
            }
            WordKind::Qualified => self.qualified_into(b, &word.morphemes),
            WordKind::Compound => {
                b.emit(Operation::OpenFrame);
                self.stems_into(b, &word.morphemes)?;
                b.emit(Operation::CloseFrame);
                b.emit(Operation::JoinStrings);
                Ok(())
            }
        }
    }

    fn root_into(&self, b: &mut ProgramBuilder, morpheme: &Morpheme) -> RunResult<()> {
        match morpheme {
            Morpheme::Literal(text) | Morpheme::HereString(text) | Morpheme::TaggedString(text) => {
                b.emit(Operation::PushValue(Value::from(text.as_str())));
                Ok(())
            }
            Morpheme::Block { script, source } => {
                b.emit(Operation::PushValue(Value::script(script.clone(), Some(source.clone()))));
                Ok(())
            }
            Morpheme::Tuple(script) => self.tuple_into(b, script),
            Morpheme::Expression(script) => {
                self.script_into(b, script)?;
                b.emit(Operation::SubstituteResult);
                Ok(())
            }
            Morpheme::String(stems) => {
                b.emit(Operation::OpenFrame);
                self.stems_into(b, stems)?;
                b.emit(Operation::CloseFrame);
                b.emit(Operation::JoinStrings);
                Ok(())
            }
            Morpheme::LineComment(_) | Morpheme::BlockComment(_) | Morpheme::SubstituteNext { .. } => {
                unreachable!("not a root morpheme")
            }
        }
    }

    /// Compiles a nested script as one flat argument frame: every word of
    /// every sentence lands in the same tuple.
    fn tuple_into(&self, b: &mut ProgramBuilder, script: &Script) -> RunResult<()> {
        b.emit(Operation::OpenFrame);
        self.args_into(b, script)?;
        b.emit(Operation::CloseFrame);
        Ok(())
    }

    fn args_into(&self, b: &mut ProgramBuilder, script: &Script) -> RunResult<()> {
        for sentence in &script.sentences {
            for word in &sentence.words {
                self.word_into(b, word)?;
            }
        }
        Ok(())
    }

    /// Compiles a substitution group starting at `morphemes[0]`; returns the
    /// number of morphemes consumed.
    fn substitution_into(&self, b: &mut ProgramBuilder, morphemes: &[Morpheme]) -> RunResult<usize> {
        let len = substitution_group_len(morphemes)?;
        let Morpheme::SubstituteNext { levels, expansion } = &morphemes[0] else {
            unreachable!("substitution group starts with a marker")
        };
        match &morphemes[1] {
            Morpheme::Literal(name) => {
                b.emit(Operation::PushValue(Value::from(name.as_str())));
                b.emit(Operation::ResolveValue);
            }
            // A block source names the variable by its verbatim text
            Morpheme::Block { source, .. } => {
                b.emit(Operation::PushValue(Value::String(source.clone())));
                b.emit(Operation::ResolveValue);
            }
            Morpheme::Tuple(script) => {
                self.tuple_into(b, script)?;
                b.emit(Operation::ResolveValue);
            }
            Morpheme::Expression(script) => {
                self.script_into(b, script)?;
                b.emit(Operation::SubstituteResult);
            }
            _ => unreachable!("not a substitution source"),
        }
        for selector in &morphemes[2..len] {
            self.selector_into(b, selector)?;
        }
        for _ in 1..*levels {
            b.emit(Operation::ResolveValue);
        }
        if *expansion {
            b.emit(Operation::ExpandValue);
        }
        Ok(len)
    }

    fn qualified_into(&self, b: &mut ProgramBuilder, morphemes: &[Morpheme]) -> RunResult<()> {
        match &morphemes[0] {
            Morpheme::Literal(name) => b.emit(Operation::PushValue(Value::from(name.as_str()))),
            Morpheme::Block { source, .. } => b.emit(Operation::PushValue(Value::String(source.clone()))),
            Morpheme::Tuple(script) => self.tuple_into(b, script)?,
            _ => unreachable!("not a qualified source"),
        }
        b.emit(Operation::SetSource);
        for selector in &morphemes[1..] {
            self.selector_into(b, selector)?;
        }
        Ok(())
    }

    /// Compiles one trailing selector morpheme. Subscripts are evaluated at
    /// execution time, so each gets its own frame or sentence sequence.
    fn selector_into(&self, b: &mut ProgramBuilder, morpheme: &Morpheme) -> RunResult<()> {
        match morpheme {
            // `(...)` keyed: the words become the key tuple
            Morpheme::Tuple(script) => {
                self.tuple_into(b, script)?;
                b.emit(Operation::SelectKeys);
            }
            // `[...]` indexed: the expression result becomes the index
            Morpheme::Expression(script) => {
                self.script_into(b, script)?;
                b.emit(Operation::SubstituteResult);
                b.emit(Operation::SelectIndex);
            }
            // `{...}` generic: one rule tuple per sentence
            Morpheme::Block { script, .. } => {
                b.emit(Operation::OpenFrame);
                for sentence in &script.sentences {
                    b.emit(Operation::OpenFrame);
                    for word in &sentence.words {
                        self.word_into(b, word)?;
                    }
                    b.emit(Operation::CloseFrame);
                }
                b.emit(Operation::CloseFrame);
                b.emit(Operation::SelectRules);
            }
            _ => unreachable!("not a selector morpheme"),
        }
        Ok(())
    }

    /// Compiles compound-word or string stems into the surrounding frame.
    fn stems_into(&self, b: &mut ProgramBuilder, stems: &[Morpheme]) -> RunResult<()> {
        let mut i = 0;
        while i < stems.len() {
            match &stems[i] {
                Morpheme::SubstituteNext { .. } => {
                    i += self.substitution_into(b, &stems[i..])?;
                }
                morpheme => {
                    self.root_into(b, morpheme)?;
                    i += 1;
                }
            }
        }
        Ok(())
    }
}
