//! End-to-end scenarios exercised through both execution paths.

use helena::{
    CommandMap, CommandResult, Compiler, Dictionary, Evaluator, Executor, Runner, Selector, Value, VariableMap, parse,
};
use pretty_assertions::assert_eq;

/// Evaluates a single word through the compiled path and the tree-walking
/// path, asserting both agree.
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

/// Runs a full script through both paths, asserting both agree.
fn eval_script(source: &str, variables: &VariableMap, commands: &CommandMap) -> Value {
    let runner = Runner::new(source).expect("parse failure");
    let compiled = runner.run(variables, commands).expect("execution failure");
    let walked = runner.evaluate(variables, commands, None).expect("evaluation failure");
    assert_eq!(compiled, walked, "execution paths disagree on {source:?}");
    compiled
}

fn strings(values: &[&str]) -> Value {
    Value::tuple(values.iter().map(|s| Value::from(*s)).collect())
}

#[test]
fn tuple_with_nested_substitutions() {
    let mut variables = VariableMap::new();
    variables.set("var1", Value::from("a"));
    let mut entries = Dictionary::default();
    entries.insert("key".to_owned(), Value::from("tuple"));
    variables.set("var2", Value::dictionary(entries));

    let mut commands = CommandMap::new();
    commands.register_fn("cmd", |_| CommandResult::Ok(Value::from("is")));

    let result = eval_word(r#"( this [cmd] $var1 "complex" ${var2}(key) )"#, &variables, &commands);
    assert_eq!(result, strings(&["this", "is", "a", "complex", "tuple"]));
}

#[test]
fn string_with_substitutions_and_selectors() {
    let mut variables = VariableMap::new();
    variables.set("var1", Value::from("is"));
    variables.set("variable 2", Value::from("a"));
    variables.set("var3", Value::list(vec![Value::from("foo"), Value::from("ut")]));
    variables.set("var4", Value::from("ions"));

    let mut commands = CommandMap::new();
    commands.register_fn("cmd1", |_| CommandResult::Ok(Value::from("string")));
    commands.register_fn("cmd2", |_| CommandResult::Ok(Value::from("it")));
    commands.register_fn("cmd3", |_| CommandResult::Ok(Value::from(1i64)));

    let result = eval_word(
        r#""this $var1 ${variable 2} [cmd1] with subst[cmd2]${var3}[cmd3]$var4""#,
        &variables,
        &commands,
    );
    assert_eq!(result, Value::from("this is a string with substitutions"));
}

#[test]
fn qualified_word_builds_the_full_access_path() {
    let mut variables = VariableMap::new();
    variables.set("var1", Value::from("key2"));
    variables.set("var2", Value::from("rule1"));
    variables.set("var3", Value::from("cmd3"));

    let mut commands = CommandMap::new();
    commands.register_fn("cmd1", |_| CommandResult::Ok(Value::from("rule2")));
    commands.register_fn("cmd2", |_| CommandResult::Ok(Value::from("index1")));
    commands.register_fn("cmd3", |_| CommandResult::Ok(Value::from("key3")));

    let result = eval_word(
        "varname(key1 $var1){$var2; [cmd1]}[cmd2]([$var3])(key4)",
        &variables,
        &commands,
    );

    let Value::Qualified(qualified) = &result else {
        panic!("expected a qualified value, got {result:?}");
    };
    assert_eq!(qualified.source, Value::from("varname"));
    assert_eq!(qualified.selectors.len(), 4);

    let Selector::Keyed(keyed) = &qualified.selectors[0] else {
        panic!("expected keyed selector first");
    };
    assert_eq!(keyed.keys, vec![Value::from("key1"), Value::from("key2")]);

    let Selector::Generic(generic) = &qualified.selectors[1] else {
        panic!("expected generic selector second");
    };
    assert_eq!(
        generic.rules,
        vec![strings(&["rule1"]), strings(&["rule2"])]
    );

    let Selector::Indexed(indexed) = &qualified.selectors[2] else {
        panic!("expected indexed selector third");
    };
    assert_eq!(indexed.index, Value::from("index1"));

    let Selector::Keyed(keyed) = &qualified.selectors[3] else {
        panic!("expected keyed selector last");
    };
    assert_eq!(keyed.keys, vec![Value::from("key3"), Value::from("key4")]);
}

#[test]
fn here_string_is_verbatim() {
    let variables = VariableMap::new();
    let commands = CommandMap::new();
    let result = eval_word(
        "\"\"\"this is a \"'\\ $ \\nhere-string\"\"\"",
        &variables,
        &commands,
    );
    assert_eq!(result, Value::from("this is a \"'\\ $ \\nhere-string"));
}

#[test]
fn expansion_splices_command_arguments() {
    let mut variables = VariableMap::new();
    variables.set("var", Value::tuple(vec![Value::from("v1"), Value::from("v2")]));

    let mut commands = CommandMap::new();
    commands.register_fn("cmd", |args| CommandResult::Ok(Value::tuple(args.to_vec())));

    let result = eval_script("cmd $*var arg", &variables, &commands);
    assert_eq!(result, strings(&["cmd", "v1", "v2", "arg"]));
}

#[test]
fn comment_only_scripts_evaluate_to_nil() {
    let variables = VariableMap::new();
    let commands = CommandMap::new();
    let runner = Runner::new("# comment only\n## another").unwrap();
    assert!(runner.program().is_empty());
    let result = eval_script("# comment only\n## another", &variables, &commands);
    assert_eq!(result, Value::Nil);
}

#[test]
fn tagged_string_word_evaluates_to_its_content() {
    let variables = VariableMap::new();
    let commands = CommandMap::new();
    let result = eval_word("\"\"END\nline one\nline two\nEND", &variables, &commands);
    assert_eq!(result, Value::from("line one\nline two\n"));
}

#[test]
fn expression_word_substitutes_the_last_sentence_result() {
    let variables = VariableMap::new();
    let mut commands = CommandMap::new();
    commands.register_fn("first", |_| CommandResult::Ok(Value::from("one")));
    commands.register_fn("second", |_| CommandResult::Ok(Value::from("two")));
    let result = eval_word("[first; second]", &variables, &commands);
    assert_eq!(result, Value::from("two"));
}

#[test]
fn block_word_evaluates_to_a_script_value() {
    let variables = VariableMap::new();
    let commands = CommandMap::new();
    let result = eval_word("{a $b c}", &variables, &commands);
    assert_eq!(&*result.as_string().unwrap(), "a $b c");
    let Value::Script(script) = &result else {
        panic!("expected a script value");
    };
    assert_eq!(script.script.sentences.len(), 1);
}
