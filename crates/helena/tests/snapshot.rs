//! Serialization of parsed and compiled programs.

use helena::{CommandMap, CommandResult, Runner, Value, VariableMap};
use pretty_assertions::assert_eq;

#[test]
fn runners_roundtrip_through_postcard() {
    let runner = Runner::new("cmd $var \"a $b\" {block} (t1 t2) # note").unwrap();
    let bytes = runner.dump().unwrap();
    let restored = Runner::load(&bytes).unwrap();

    assert_eq!(restored.source(), runner.source());
    assert_eq!(restored.script(), runner.script());
    assert_eq!(restored.program(), runner.program());
}

#[test]
fn restored_runners_execute_identically() {
    let mut variables = VariableMap::new();
    variables.set("var", Value::from("x"));
    let mut commands = CommandMap::new();
    commands.register_fn("join", |args| {
        let mut joined = String::new();
        for arg in &args[1..] {
            joined.push_str(&arg.as_string().unwrap());
        }
        CommandResult::Ok(Value::from(joined))
    });

    let runner = Runner::new("join $var y z").unwrap();
    let restored = Runner::load(&runner.dump().unwrap()).unwrap();

    assert_eq!(
        runner.run(&variables, &commands).unwrap(),
        restored.run(&variables, &commands).unwrap()
    );
}

#[test]
fn corrupt_snapshots_are_rejected() {
    assert!(Runner::load(&[0xff, 0x00, 0x13, 0x37]).is_err());
}
