//! Rendering selectors and values back to source, and reparsing them.

use helena::{
    CommandMap, CommandResult, Compiler, Evaluator, Executor, GenericSelector, IndexedSelector, KeyedSelector,
    Selector, Value, VariableMap, display_word, parse,
};
use pretty_assertions::assert_eq;

fn eval_word(source: &str, variables: &VariableMap, commands: &CommandMap) -> Value {
    let script = parse(source).expect("parse failure");
    let word = &script.sentences[0].words[0];
    let program = Compiler::new().compile_word(word).expect("compile failure");
    let compiled = Executor::new(variables, commands, None)
        .execute(&program)
        .expect("execution failure");
    let walked = Evaluator::new(variables, commands, None)
        .evaluate_word(word)
        .expect("evaluation failure");
    assert_eq!(compiled, walked);
    compiled
}

/// Renders a selector, glues it onto a source name, reparses, and returns
/// the selectors of the resulting qualified value.
fn reparse_selector(selector: &Selector, commands: &CommandMap) -> Vec<Selector> {
    let source = format!("name{selector}");
    let value = eval_word(&source, &VariableMap::new(), commands);
    let Value::Qualified(qualified) = value else {
        panic!("expected a qualified value from {source:?}");
    };
    qualified.selectors.clone()
}

#[test]
fn keyed_selectors_roundtrip() {
    let keyed = Selector::Keyed(KeyedSelector::new(vec![Value::from("k1"), Value::from("key two")]).unwrap());
    assert_eq!(keyed.to_string(), "(k1 \"key two\")");
    let reparsed = reparse_selector(&keyed, &CommandMap::new());
    assert_eq!(reparsed, vec![keyed]);
}

#[test]
fn generic_selectors_roundtrip() {
    let generic = Selector::Generic(
        GenericSelector::new(vec![
            Value::tuple(vec![Value::from("rule1"), Value::from("arg1")]),
            Value::tuple(vec![Value::from("rule2")]),
        ])
        .unwrap(),
    );
    assert_eq!(generic.to_string(), "{rule1 arg1; rule2}");
    let reparsed = reparse_selector(&generic, &CommandMap::new());
    assert_eq!(reparsed, vec![generic]);
}

#[test]
fn indexed_selectors_roundtrip_modulo_subscript_evaluation() {
    // The rendered subscript is an expression, so reparsing evaluates it as
    // a sentence; a command standing in for the literal closes the loop.
    let indexed = Selector::Indexed(IndexedSelector::new(Value::from(3i64)).unwrap());
    assert_eq!(indexed.to_string(), "[3]");
    let mut commands = CommandMap::new();
    commands.register_fn("3", |_| CommandResult::Ok(Value::from(3i64)));
    let reparsed = reparse_selector(&indexed, &commands);
    assert_eq!(reparsed, vec![indexed]);
}

#[test]
fn quoted_keys_with_escapes_roundtrip() {
    let nasty = "a\"b$c{d}e f\n";
    let keyed = Selector::Keyed(KeyedSelector::new(vec![Value::from(nasty)]).unwrap());
    let reparsed = reparse_selector(&keyed, &CommandMap::new());
    assert_eq!(reparsed, vec![keyed]);
}

#[test]
fn rendered_words_reparse_to_the_same_string() {
    for text in ["plain", "two words", "", "tab\there", "dollar$sign", "q\"uote", "fin]"] {
        let rendered = display_word(text);
        let value = eval_word(&rendered, &VariableMap::new(), &CommandMap::new());
        assert_eq!(value, Value::from(text), "roundtrip failed for {text:?}");
    }
}

#[test]
fn qualified_values_render_their_whole_path() {
    let variables = VariableMap::new();
    let commands = CommandMap::new();
    let value = eval_word("name(k1 k2)", &variables, &commands);
    assert_eq!(value.to_string(), "name(k1 k2)");
}
