use pretty_assertions::assert_eq;
use strata_schema::ddl::{AstValue, DdlNode, ObjectRef};
use strata_schema::delta::{
    AlterField, Command, CommandContext, ObjectCommand, RenameObject,
};
use strata_schema::object::Value;
use strata_schema::{Name, ObjectKind, Schema};

fn name(n: &str) -> Name {
    Name::new("test", n)
}

fn apply(schema: Schema, node: DdlNode, ctx: &mut CommandContext) -> Schema {
    let cmd = Command::from_ast(&node, ctx).unwrap();
    cmd.apply(schema, ctx).unwrap()
}

fn herd_schema(ctx: &mut CommandContext) -> Schema {
    let schema = Schema::new();
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::Module, ObjectRef::unqualified("test")),
        ctx,
    );
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::ScalarType, ObjectRef::unqualified("str")),
        ctx,
    );
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("Animal")).with(
            DdlNode::create(ObjectKind::Property, ObjectRef::unqualified("name")).with(
                DdlNode::set_field(
                    "target",
                    AstValue::Ref(ObjectRef::qualified("test", "str")),
                ),
            ),
        ),
        ctx,
    );
    apply(
        schema,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("Dog"))
            .extends(ObjectRef::unqualified("Animal")),
        ctx,
    )
}

fn rename_animal() -> Command {
    Command::Alter(
        ObjectCommand::new(ObjectKind::ObjectType, name("Animal")).with(Command::Rename(
            RenameObject {
                object: ObjectKind::ObjectType,
                classname: name("Animal"),
                new_name: name("Beast"),
                span: None,
            },
        )),
    )
}

#[test]
fn rename_rewrites_references_and_specialized_members() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = herd_schema(&mut ctx);

    let schema = rename_animal().apply(schema, &mut ctx).unwrap();

    assert!(!schema.contains(&name("Animal")));
    let beast = schema.get(&name("Beast")).unwrap();

    // The owner's declared member was re-derived under the new name.
    assert!(!schema.contains(&name("name@@test|Animal")));
    assert_eq!(
        beast.dict_field("own_pointers").unwrap().get("name"),
        Some(&name("name@@test|Beast"))
    );
    let member = schema.get(&name("name@@test|Beast")).unwrap();
    assert_eq!(member.name_field("source"), Some(&name("Beast")));

    // The subtype follows the new base name, and its materialized copy
    // re-bases onto the renamed member.
    let dog = schema.get(&name("Dog")).unwrap();
    assert_eq!(dog.bases(), &[name("Beast")]);
    let copy = schema.get(&name("name@@test|Dog")).unwrap();
    assert_eq!(copy.bases(), &[name("name@@test|Beast")]);
}

#[test]
fn later_commands_in_a_group_see_the_rename() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = herd_schema(&mut ctx);

    // The second command still addresses the object by its old name.
    let retitle = Command::Alter(
        ObjectCommand::new(ObjectKind::ObjectType, name("Animal")).with(Command::SetField(
            AlterField::set("title", Value::Str("Beasts".into())),
        )),
    );
    let group = Command::Group(vec![rename_animal(), retitle]);

    let schema = group.apply(schema, &mut ctx).unwrap();
    assert_eq!(
        schema.get(&name("Beast")).unwrap().get("title"),
        Some(&Value::Str("Beasts".into()))
    );
}

#[test]
fn rename_collisions_are_rejected() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = herd_schema(&mut ctx);

    let collide = Command::Alter(
        ObjectCommand::new(ObjectKind::ObjectType, name("Animal")).with(Command::Rename(
            RenameObject {
                object: ObjectKind::ObjectType,
                classname: name("Animal"),
                new_name: name("Dog"),
                span: None,
            },
        )),
    );
    let err = collide.apply(schema, &mut ctx).unwrap_err();
    assert!(err.is_definition_error());
    assert!(err.to_string().contains("already defined"));
}
