//! Tree-walking evaluation, the non-compiling twin of the executor.
//!
//! Walks the syntax tree directly and must produce the same results and the
//! same errors as compiling then executing. The last-result register is
//! shared across nested scripts exactly as in the stack machine: an empty
//! expression substitutes whatever the previous sentence produced.

use crate::{
    checker::{WordKind, check_word, substitution_group_len},
    error::ExecResult,
    executor::evaluate_sentence,
    resolvers::{CommandResolver, SelectorResolver, VariableResolver, resolve_selector, resolve_value},
    selector::{IndexedSelector, KeyedSelector},
    syntax::{Morpheme, Script, Word},
    value::Value,
};

/// Evaluates syntax trees against a set of resolvers.
pub struct Evaluator<'a> {
    variables: &'a dyn VariableResolver,
    commands: &'a dyn CommandResolver,
    selectors: Option<&'a dyn SelectorResolver>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        variables: &'a dyn VariableResolver,
        commands: &'a dyn CommandResolver,
        selectors: Option<&'a dyn SelectorResolver>,
    ) -> Self {
        Self {
            variables,
            commands,
            selectors,
        }
    }

    /// Evaluates a script and returns its last sentence result.
    ///
    /// # Errors
    /// The first typed error aborts evaluation; host control-flow codes are
    /// propagated unchanged.
    pub fn evaluate_script(&self, script: &Script) -> ExecResult<Value> {
        let mut register = Value::Nil;
        self.run_script(script, &mut register)?;
        Ok(register)
    }

    /// Evaluates a single word to its value, mirroring the executor's
    /// behavior on programs compiled from single words.
    ///
    /// # Errors
    /// See [`Evaluator::evaluate_script`].
    pub fn evaluate_word(&self, word: &Word) -> ExecResult<Value> {
        let mut register = Value::Nil;
        let mut out = Vec::new();
        self.word_into(word, &mut out, &mut register)?;
        Ok(out.pop().unwrap_or(register))
    }

    fn run_script(&self, script: &Script, register: &mut Value) -> ExecResult<()> {
        for sentence in &script.sentences {
            let mut args = Vec::with_capacity(sentence.words.len());
            for word in &sentence.words {
                self.word_into(word, &mut args, register)?;
            }
            if !args.is_empty() {
                *register = evaluate_sentence(self.commands, &args)?;
            }
        }
        Ok(())
    }

    /// Evaluates one word into an argument list, splicing expansions.
    fn word_into(&self, word: &Word, out: &mut Vec<Value>, register: &mut Value) -> ExecResult<()> {
        match check_word(word)? {
            WordKind::Ignored => {}
            WordKind::Root => {
                let value = self.root_value(&word.morphemes[0], register)?;
                out.push(value);
            }
            WordKind::Substitution => {
                let (value, expansion, _) = self.substitution_value(&word.morphemes, register)?;
                push_maybe_expanded(out, value, expansion);
            }
            WordKind::Qualified => {
                let value = self.qualified_value(&word.morphemes, register)?;
                out.push(value);
            }
            WordKind::Compound => {
                let value = self.compound_value(&word.morphemes, register)?;
                out.push(value);
            }
        }
        Ok(())
    }

    fn root_value(&self, morpheme: &Morpheme, register: &mut Value) -> ExecResult<Value> {
        match morpheme {
            Morpheme::Literal(text) | Morpheme::HereString(text) | Morpheme::TaggedString(text) => {
                Ok(Value::from(text.as_str()))
            }
            Morpheme::Block { script, source } => Ok(Value::script(script.clone(), Some(source.clone()))),
            Morpheme::Tuple(script) => Ok(Value::tuple(self.args_value(script, register)?)),
            Morpheme::Expression(script) => {
                self.run_script(script, register)?;
                Ok(register.clone())
            }
            Morpheme::String(stems) => self.compound_value(stems, register),
            Morpheme::LineComment(_) | Morpheme::BlockComment(_) | Morpheme::SubstituteNext { .. } => {
                unreachable!("not a root morpheme")
            }
        }
    }

    /// Evaluates a nested script as one flat argument list.
    fn args_value(&self, script: &Script, register: &mut Value) -> ExecResult<Vec<Value>> {
        let mut out = Vec::new();
        for sentence in &script.sentences {
            for word in &sentence.words {
                self.word_into(word, &mut out, register)?;
            }
        }
        Ok(out)
    }

    /// Evaluates a substitution group starting at `morphemes[0]`. Returns
    /// the value, the expansion flag, and the number of morphemes consumed.
    fn substitution_value(
        &self,
        morphemes: &[Morpheme],
        register: &mut Value,
    ) -> ExecResult<(Value, bool, usize)> {
        let len = substitution_group_len(morphemes)?;
        let Morpheme::SubstituteNext { levels, expansion } = &morphemes[0] else {
            unreachable!("substitution group starts with a marker")
        };
        let mut value = match &morphemes[1] {
            Morpheme::Literal(name) => resolve_value(self.variables, &Value::from(name.as_str()))?,
            Morpheme::Block { source, .. } => resolve_value(self.variables, &Value::String(source.clone()))?,
            Morpheme::Tuple(script) => {
                let names = Value::tuple(self.args_value(script, register)?);
                resolve_value(self.variables, &names)?
            }
            Morpheme::Expression(script) => {
                self.run_script(script, register)?;
                register.clone()
            }
            _ => unreachable!("not a substitution source"),
        };
        for selector in &morphemes[2..len] {
            value = self.apply_selector_morpheme(value, selector, register)?;
        }
        for _ in 1..*levels {
            value = resolve_value(self.variables, &value)?;
        }
        Ok((value, *expansion, len))
    }

    fn qualified_value(&self, morphemes: &[Morpheme], register: &mut Value) -> ExecResult<Value> {
        let source = match &morphemes[0] {
            Morpheme::Literal(name) => Value::from(name.as_str()),
            Morpheme::Block { source, .. } => Value::String(source.clone()),
            Morpheme::Tuple(script) => Value::tuple(self.args_value(script, register)?),
            _ => unreachable!("not a qualified source"),
        };
        let mut value = Value::qualified(source);
        for selector in &morphemes[1..] {
            value = self.apply_selector_morpheme(value, selector, register)?;
        }
        Ok(value)
    }

    /// Applies one trailing selector morpheme, evaluating its subscripts.
    fn apply_selector_morpheme(
        &self,
        target: Value,
        morpheme: &Morpheme,
        register: &mut Value,
    ) -> ExecResult<Value> {
        match morpheme {
            Morpheme::Tuple(script) => {
                let keys = self.args_value(script, register)?;
                Ok(KeyedSelector::new(keys)?.apply(&target)?)
            }
            Morpheme::Expression(script) => {
                self.run_script(script, register)?;
                let index = register.clone();
                Ok(IndexedSelector::new(index)?.apply(&target)?)
            }
            Morpheme::Block { script, .. } => {
                let mut rules = Vec::with_capacity(script.sentences.len());
                for sentence in &script.sentences {
                    let mut words = Vec::with_capacity(sentence.words.len());
                    for word in &sentence.words {
                        self.word_into(word, &mut words, register)?;
                    }
                    rules.push(Value::tuple(words));
                }
                let selector = resolve_selector(self.selectors, &rules)?;
                Ok(selector.apply(&target)?)
            }
            _ => unreachable!("not a selector morpheme"),
        }
    }

    /// Joins compound-word or string stems into a single string value.
    fn compound_value(&self, stems: &[Morpheme], register: &mut Value) -> ExecResult<Value> {
        let mut parts = Vec::new();
        let mut i = 0;
        while i < stems.len() {
            match &stems[i] {
                Morpheme::SubstituteNext { .. } => {
                    let (value, expansion, len) = self.substitution_value(&stems[i..], register)?;
                    push_maybe_expanded(&mut parts, value, expansion);
                    i += len;
                }
                morpheme => {
                    let value = self.root_value(morpheme, register)?;
                    parts.push(value);
                    i += 1;
                }
            }
        }
        let mut joined = String::new();
        for part in &parts {
            joined.push_str(&part.as_string()?);
        }
        Ok(Value::from(joined))
    }
}

/// Splices expanded tuples into the surrounding list; everything else is a
/// single element.
fn push_maybe_expanded(out: &mut Vec<Value>, value: Value, expansion: bool) {
    match value {
        Value::Tuple(items) if expansion => out.extend(items.iter().cloned()),
        value => out.push(value),
    }
}
