use pretty_assertions::assert_eq;
use strata_schema::delta::{Command, CommandContext, ObjectCommand, RebaseObject};
use strata_schema::inherit;
use strata_schema::object::{Object, Value};
use strata_schema::{Name, ObjectKind, Schema};

fn name(n: &str) -> Name {
    Name::new("test", n)
}

fn base_schema() -> Schema {
    Schema::new()
        .insert(Object::new(ObjectKind::Module, Name::for_module("test")))
        .unwrap()
}

fn with_type(schema: Schema, n: &str, bases: &[&str]) -> Schema {
    let mut obj = Object::new(ObjectKind::ObjectType, name(n));
    if !bases.is_empty() {
        obj.set(
            "bases",
            Value::NameList(bases.iter().map(|b| name(b)).collect()),
        )
        .unwrap();
    }
    let schema = schema.insert(obj).unwrap();
    inherit::finalize(schema, &name(n), false).unwrap()
}

#[test]
fn diamond_linearizes_with_local_precedence() {
    let schema = base_schema();
    let schema = with_type(schema, "A", &[]);
    let schema = with_type(schema, "B", &["A"]);
    let schema = with_type(schema, "C", &["A"]);
    let schema = with_type(schema, "D", &["B", "C"]);

    let mro = schema.get(&name("D")).unwrap().mro().to_vec();
    assert_eq!(mro, vec![name("D"), name("B"), name("C"), name("A")]);
}

#[test]
fn object_is_first_and_ancestors_appear_once() {
    let schema = base_schema();
    let schema = with_type(schema, "A", &[]);
    let schema = with_type(schema, "B", &["A"]);
    let schema = with_type(schema, "C", &["B", "A"]);

    let mro = schema.get(&name("C")).unwrap().mro().to_vec();
    assert_eq!(mro, vec![name("C"), name("B"), name("A")]);
}

#[test]
fn inconsistent_order_is_rejected() {
    let schema = base_schema();
    let schema = with_type(schema, "A", &[]);
    let schema = with_type(schema, "B", &[]);
    let schema = with_type(schema, "X", &["A", "B"]);
    let schema = with_type(schema, "Y", &["B", "A"]);

    let mut obj = Object::new(ObjectKind::ObjectType, name("Z"));
    obj.set(
        "bases",
        Value::NameList(vec![name("X"), name("Y")]),
    )
    .unwrap();
    let schema = schema.insert(obj).unwrap();

    let err = inherit::finalize(schema, &name("Z"), false).unwrap_err();
    assert!(err.is_definition_error());
    assert!(err.to_string().contains("consistent ancestor order"));
}

#[test]
fn cyclic_ancestry_is_rejected() {
    let schema = base_schema();
    let schema = with_type(schema, "A", &[]);
    let schema = with_type(schema, "B", &["A"]);

    // Rebasing A onto its own subtype would make A its own ancestor.
    let rebase = Command::Alter(
        ObjectCommand::new(ObjectKind::ObjectType, name("A")).with(Command::Rebase(
            RebaseObject {
                object: ObjectKind::ObjectType,
                classname: name("A"),
                added: vec![name("B")],
                dropped: Vec::new(),
                span: None,
            },
        )),
    );
    let err = rebase
        .apply(schema, &mut CommandContext::new())
        .unwrap_err();
    assert!(err.is_definition_error());
    assert!(err.to_string().contains("ancestor of itself"));
}

#[test]
fn final_bases_are_rejected() {
    let schema = base_schema();
    let mut obj = Object::new(ObjectKind::ObjectType, name("Sealed"));
    obj.set("is_final", Value::Bool(true)).unwrap();
    let schema = schema.insert(obj).unwrap();
    let schema = inherit::finalize(schema, &name("Sealed"), false).unwrap();

    let mut child = Object::new(ObjectKind::ObjectType, name("Child"));
    child
        .set("bases", Value::NameList(vec![name("Sealed")]))
        .unwrap();
    let schema = schema.insert(child).unwrap();

    let err = inherit::finalize(schema, &name("Child"), false).unwrap_err();
    assert!(err.is_definition_error());
    assert!(err.to_string().contains("final"));
}
