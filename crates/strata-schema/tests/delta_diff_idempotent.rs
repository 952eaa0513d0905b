use pretty_assertions::assert_eq;
use strata_schema::ddl::{AstValue, DdlNode, ObjectRef};
use strata_schema::delta::{delta_schemas, Command, CommandContext};
use strata_schema::{Name, ObjectKind, Schema};

fn apply(schema: Schema, node: DdlNode, ctx: &mut CommandContext) -> Schema {
    let cmd = Command::from_ast(&node, ctx).unwrap();
    cmd.apply(schema, ctx).unwrap()
}

fn foundation(ctx: &mut CommandContext) -> Schema {
    let schema = Schema::new();
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::Module, ObjectRef::unqualified("test")),
        ctx,
    );
    apply(
        schema,
        DdlNode::create(ObjectKind::ScalarType, ObjectRef::unqualified("str")),
        ctx,
    )
}

fn animal(required: bool) -> DdlNode {
    let mut property = DdlNode::create(ObjectKind::Property, ObjectRef::unqualified("name"))
        .with(DdlNode::set_field(
            "target",
            AstValue::Ref(ObjectRef::qualified("test", "str")),
        ));
    if required {
        property = property.with(DdlNode::set_field("required", AstValue::Bool(true)));
    }
    DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("Animal")).with(property)
}

#[test]
fn diffing_a_schema_against_itself_is_empty() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = foundation(&mut ctx);
    let schema = apply(schema, animal(true), &mut ctx);

    let delta = delta_schemas(&schema, &schema).unwrap();
    assert_eq!(delta, Command::Group(Vec::new()));
    assert!(delta.to_ast().is_empty());
}

#[test]
fn applying_a_delta_leaves_no_residual_diff() {
    let mut old_ctx = CommandContext::new().with_default_module("test");
    let old = foundation(&mut old_ctx);
    let old = apply(old, animal(false), &mut old_ctx);

    let mut new_ctx = CommandContext::new().with_default_module("test");
    let new = foundation(&mut new_ctx);
    let new = apply(new, animal(true), &mut new_ctx);
    let new = apply(
        new,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("Dog"))
            .extends(ObjectRef::unqualified("Animal")),
        &mut new_ctx,
    );

    let delta = delta_schemas(&old, &new).unwrap();
    let migrated = delta.apply(old, &mut CommandContext::new()).unwrap();

    // The subtype exists and its materialized pointer copy picked up the
    // altered base declaration.
    assert!(migrated.contains(&Name::new("test", "Dog")));
    let copy = migrated
        .get(&Name::new("test", "name@@test|Dog"))
        .unwrap();
    assert!(copy.bool_field("required"));

    let residual = delta_schemas(&migrated, &new).unwrap();
    assert_eq!(residual, Command::Group(Vec::new()));
}

#[test]
fn residual_diff_is_empty_after_a_pure_create() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let new = foundation(&mut ctx);
    let new = apply(new, animal(true), &mut ctx);

    let old = Schema::new();
    let delta = delta_schemas(&old, &new).unwrap();
    let migrated = delta.apply(old, &mut CommandContext::new()).unwrap();

    let residual = delta_schemas(&migrated, &new).unwrap();
    assert_eq!(residual, Command::Group(Vec::new()));
}
