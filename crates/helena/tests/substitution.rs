//! Substitution, expansion, and qualified-value properties.

use helena::{
    CommandMap, CommandResult, Compiler, Evaluator, Executor, Runner, Selector, Value, VariableMap, parse,
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
    assert_eq!(compiled, walked, "execution paths disagree on {source:?}");
    compiled
}

#[test]
fn each_dollar_adds_one_dereference_level() {
    for k in 1..=5 {
        let mut variables = VariableMap::new();
        for i in 1..k {
            variables.set(format!("var{i}"), Value::from(format!("var{}", i + 1)));
        }
        variables.set(format!("var{k}"), Value::from("value"));

        let source = format!("{}var1", "$".repeat(k));
        let result = eval_word(&source, &variables, &CommandMap::new());
        assert_eq!(result, Value::from("value"), "failed at {k} levels");
    }
}

#[test]
fn expansion_splices_into_tuples() {
    let mut variables = VariableMap::new();
    variables.set("var", Value::tuple(vec![Value::from("a"), Value::from("b")]));

    let result = eval_word("(prefix $*var suffix)", &variables, &CommandMap::new());
    assert_eq!(
        result,
        Value::tuple(vec![
            Value::from("prefix"),
            Value::from("a"),
            Value::from("b"),
            Value::from("suffix"),
        ])
    );
}

#[test]
fn expansion_of_a_non_tuple_inserts_it_unchanged() {
    let mut variables = VariableMap::new();
    variables.set("var", Value::from("single"));
    let result = eval_word("(a $*var b)", &variables, &CommandMap::new());
    assert_eq!(
        result,
        Value::tuple(vec![Value::from("a"), Value::from("single"), Value::from("b")])
    );
}

#[test]
fn tuple_sources_resolve_element_wise() {
    let mut variables = VariableMap::new();
    variables.set("a", Value::from("1"));
    variables.set("b", Value::from("2"));
    let result = eval_word("$(a b)", &variables, &CommandMap::new());
    assert_eq!(result, Value::tuple(vec![Value::from("1"), Value::from("2")]));
}

#[test]
fn block_sources_allow_names_with_spaces() {
    let mut variables = VariableMap::new();
    variables.set("two words", Value::from("bound"));
    let result = eval_word("${two words}", &variables, &CommandMap::new());
    assert_eq!(result, Value::from("bound"));
}

#[test]
fn selectors_apply_before_extra_dereferences() {
    // $$var(key): resolve var, select key, then resolve the selected name
    let mut variables = VariableMap::new();
    let mut entries = helena::Dictionary::default();
    entries.insert("key".to_owned(), Value::from("target"));
    variables.set("var", Value::dictionary(entries));
    variables.set("target", Value::from("deep"));

    let result = eval_word("$$var(key)", &variables, &CommandMap::new());
    assert_eq!(result, Value::from("deep"));
}

#[test]
fn substitution_with_list_index_selector() {
    let mut variables = VariableMap::new();
    variables.set("list", Value::list(vec![Value::from("zero"), Value::from("one")]));
    let mut commands = CommandMap::new();
    commands.register_fn("idx", |_| CommandResult::Ok(Value::from(1i64)));

    let result = eval_word("$list[idx]", &variables, &commands);
    assert_eq!(result, Value::from("one"));
}

#[test]
fn qualified_identity_preserves_selector_order() {
    let variables = VariableMap::new();
    let mut commands = CommandMap::new();
    commands.register_fn("idx", |_| CommandResult::Ok(Value::from("index1")));

    let result = eval_word("name(k1 k2)[idx]{g1 g2}", &variables, &commands);
    let Value::Qualified(qualified) = &result else {
        panic!("expected qualified value");
    };
    assert_eq!(qualified.source, Value::from("name"));
    let kinds: Vec<&str> = qualified
        .selectors
        .iter()
        .map(|s| match s {
            Selector::Keyed(_) => "keyed",
            Selector::Indexed(_) => "indexed",
            Selector::Generic(_) => "generic",
            Selector::Custom(_) => "custom",
        })
        .collect();
    assert_eq!(kinds, ["keyed", "indexed", "generic"]);
}

#[test]
fn keys_applied_one_at_a_time_merge_into_one_keyed_selector() {
    let q = Value::qualified(Value::from("name"));
    let keys = ["k1", "k2", "k3", "k4"];
    let mut current = q;
    for key in keys {
        current = current.select_key(&Value::from(key)).unwrap();
    }
    let Value::Qualified(qualified) = &current else {
        panic!("expected qualified value");
    };
    assert_eq!(qualified.selectors.len(), 1);
    let Selector::Keyed(keyed) = &qualified.selectors[0] else {
        panic!("expected keyed selector");
    };
    assert_eq!(
        keyed.keys,
        keys.iter().map(|k| Value::from(*k)).collect::<Vec<_>>()
    );
}

#[test]
fn literal_words_round_trip_through_evaluation() {
    for literal in ["simple", "with-dash", "a1b2", "\u{e9}t\u{e9}"] {
        let result = eval_word(literal, &VariableMap::new(), &CommandMap::new());
        assert_eq!(result, Value::from(literal));
    }
}

#[test]
fn tuple_words_preserve_arity_and_order() {
    let result = eval_word("(w1 w2 w3 w4)", &VariableMap::new(), &CommandMap::new());
    assert_eq!(
        result,
        Value::tuple(vec![
            Value::from("w1"),
            Value::from("w2"),
            Value::from("w3"),
            Value::from("w4"),
        ])
    );
}

#[test]
fn appending_comments_does_not_change_execution() {
    let mut commands = CommandMap::new();
    commands.register_fn("value", |args| CommandResult::Ok(args[1].clone()));
    let variables = VariableMap::new();

    let plain = Runner::new("value a").unwrap();
    let commented = Runner::new("value a # trailing\n# full line\n#{ block }#").unwrap();
    assert_eq!(plain.program(), commented.program());
    assert_eq!(
        plain.run(&variables, &commands).unwrap(),
        commented.run(&variables, &commands).unwrap()
    );
}
