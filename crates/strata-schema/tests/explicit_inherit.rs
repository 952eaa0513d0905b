use pretty_assertions::assert_eq;
use strata_schema::ddl::{AstValue, DdlNode, ObjectRef};
use strata_schema::delta::{Command, CommandContext};
use strata_schema::{Name, ObjectKind, Schema};

fn apply(schema: Schema, node: DdlNode, ctx: &mut CommandContext) -> Schema {
    let cmd = Command::from_ast(&node, ctx).unwrap();
    cmd.apply(schema, ctx).unwrap()
}

fn parent_with_constraint(ctx: &mut CommandContext, delegated: bool) -> Schema {
    let schema = Schema::new();
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::Module, ObjectRef::unqualified("test")),
        ctx,
    );
    let mut constraint =
        DdlNode::create(ObjectKind::Constraint, ObjectRef::unqualified("check")).with(
            DdlNode::set_field("expr", AstValue::Expr("len(__subject__) > 0".into())),
        );
    if delegated {
        constraint = constraint.with(DdlNode::set_field("delegated", AstValue::Bool(true)));
    }
    apply(
        schema,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("P")).with(constraint),
        ctx,
    )
}

fn child_with_constraint(inherited_marker: bool) -> DdlNode {
    let mut constraint =
        DdlNode::create(ObjectKind::Constraint, ObjectRef::unqualified("check")).with(
            DdlNode::set_field("expr", AstValue::Expr("len(__subject__) < 9".into())),
        );
    if inherited_marker {
        constraint = constraint.with(DdlNode::set_field(
            "declared_inherited",
            AstValue::Bool(true),
        ));
    }
    DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("C"))
        .extends(ObjectRef::unqualified("P"))
        .with(constraint)
}

#[test]
fn declarative_shadowing_requires_the_inherited_marker() {
    let mut ctx = CommandContext::declarative().with_default_module("test");
    let schema = parent_with_constraint(&mut ctx, false);

    let cmd = Command::from_ast(&child_with_constraint(false), &ctx).unwrap();
    let err = cmd.apply(schema, &mut ctx).unwrap_err();
    assert!(err.is_definition_error());
    assert!(err.to_string().contains("'inherited' keyword"));
}

#[test]
fn marked_shadowing_conjoins_the_constraint_exprs() {
    let mut ctx = CommandContext::declarative().with_default_module("test");
    let schema = parent_with_constraint(&mut ctx, false);
    let schema = apply(schema, child_with_constraint(true), &mut ctx);

    let child_member = schema
        .get(&Name::new("test", "check@@test|C"))
        .unwrap();
    assert_eq!(
        child_member.bases(),
        &[Name::new("test", "check@@test|P")]
    );
    assert_eq!(
        child_member.expr_field("expr").unwrap().as_str(),
        "(len(__subject__) > 0) and (len(__subject__) < 9)"
    );
}

#[test]
fn imperative_shadowing_needs_no_marker() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = parent_with_constraint(&mut ctx, false);
    let schema = apply(schema, child_with_constraint(false), &mut ctx);

    let child = schema.get(&Name::new("test", "C")).unwrap();
    assert_eq!(
        child.dict_field("constraints").unwrap().get("check"),
        Some(&Name::new("test", "check@@test|C"))
    );
}

#[test]
fn plain_constraints_are_carried_through_by_reference() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = parent_with_constraint(&mut ctx, false);
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("C"))
            .extends(ObjectRef::unqualified("P")),
        &mut ctx,
    );

    let child = schema.get(&Name::new("test", "C")).unwrap();
    // No derivation: the child's dictionary references the parent's member.
    assert_eq!(
        child.dict_field("constraints").unwrap().get("check"),
        Some(&Name::new("test", "check@@test|P"))
    );
    assert!(!schema.contains(&Name::new("test", "check@@test|C")));
}

#[test]
fn delegated_constraints_concretize_per_subject() {
    let mut ctx = CommandContext::new().with_default_module("test");
    let schema = parent_with_constraint(&mut ctx, true);
    let schema = apply(
        schema,
        DdlNode::create(ObjectKind::ObjectType, ObjectRef::unqualified("C"))
            .extends(ObjectRef::unqualified("P")),
        &mut ctx,
    );

    let child = schema.get(&Name::new("test", "C")).unwrap();
    let member_name = child
        .dict_field("constraints")
        .unwrap()
        .get("check")
        .unwrap()
        .clone();
    assert_eq!(member_name, Name::new("test", "check@@test|C"));

    let member = schema.get(&member_name).unwrap();
    assert!(member.is_derived());
    assert_eq!(member.name_field("subject"), Some(&Name::new("test", "C")));
    // The delegation marker itself does not travel to the concrete copy.
    assert!(!member.bool_field("delegated"));
}
