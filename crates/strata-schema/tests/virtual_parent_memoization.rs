use pretty_assertions::assert_eq;
use strata_schema::inherit;
use strata_schema::object::Object;
use strata_schema::{Name, ObjectKind, Schema};

fn name(n: &str) -> Name {
    Name::new("test", n)
}

fn schema_with_types(names: &[&str], kind: ObjectKind) -> Schema {
    let mut schema = Schema::new()
        .insert(Object::new(ObjectKind::Module, Name::for_module("test")))
        .unwrap();
    for n in names {
        schema = schema.insert(Object::new(kind, name(n))).unwrap();
        schema = inherit::finalize(schema, &name(n), false).unwrap();
    }
    schema
}

#[test]
fn single_target_passes_through() {
    let schema = schema_with_types(&["A"], ObjectKind::ObjectType);
    let before = schema.len();
    let (schema, target) = inherit::ensure_virtual_parent(schema, &[name("A")]).unwrap();
    assert_eq!(target, name("A"));
    assert_eq!(schema.len(), before);
}

#[test]
fn multi_target_synthesizes_an_abstract_parent() {
    let schema = schema_with_types(&["A", "B"], ObjectKind::ObjectType);
    let (schema, parent) =
        inherit::ensure_virtual_parent(schema, &[name("A"), name("B")]).unwrap();

    let obj = schema.get(&parent).unwrap();
    assert!(obj.is_abstract());
    assert!(obj.is_virtual());
    assert_eq!(
        obj.names_field("_virtual_children"),
        &[name("A"), name("B")]
    );
}

#[test]
fn same_target_set_is_memoized_regardless_of_order() {
    let schema = schema_with_types(&["A", "B"], ObjectKind::ObjectType);
    let (schema, first) =
        inherit::ensure_virtual_parent(schema, &[name("A"), name("B")]).unwrap();
    let size = schema.len();

    let (schema, second) =
        inherit::ensure_virtual_parent(schema, &[name("B"), name("A")]).unwrap();
    assert_eq!(first, second);
    assert_eq!(schema.len(), size);
}

#[test]
fn virtual_members_flatten_into_new_sets() {
    let schema = schema_with_types(&["A", "B", "C"], ObjectKind::ObjectType);
    let (schema, ab) = inherit::ensure_virtual_parent(schema, &[name("A"), name("B")]).unwrap();
    let (schema, abc) = inherit::ensure_virtual_parent(schema, &[ab, name("C")]).unwrap();

    let obj = schema.get(&abc).unwrap();
    assert_eq!(
        obj.names_field("_virtual_children"),
        &[name("A"), name("B"), name("C")]
    );
}

#[test]
fn flattening_to_one_member_passes_through() {
    let schema = schema_with_types(&["A", "B"], ObjectKind::ObjectType);
    let (schema, ab) = inherit::ensure_virtual_parent(schema, &[name("A"), name("B")]).unwrap();
    // A is already a member of the virtual set it is combined with.
    let (_, target) = inherit::ensure_virtual_parent(schema.clone(), &[ab.clone(), name("A")])
        .unwrap();
    assert_eq!(target, ab);

    let (_, same) = inherit::ensure_virtual_parent(schema, &[name("A"), name("A")]).unwrap();
    assert_eq!(same, name("A"));
}

#[test]
fn mixing_scalars_and_objects_is_rejected() {
    let mut schema = schema_with_types(&["A"], ObjectKind::ObjectType);
    schema = schema
        .insert(Object::new(ObjectKind::ScalarType, name("s")))
        .unwrap();

    let err = inherit::ensure_virtual_parent(schema, &[name("A"), name("s")]).unwrap_err();
    assert!(err.is_definition_error());
}

#[test]
fn multiple_scalars_are_rejected() {
    let schema = schema_with_types(&["s1", "s2"], ObjectKind::ScalarType);
    let err = inherit::ensure_virtual_parent(schema, &[name("s1"), name("s2")]).unwrap_err();
    assert!(err.is_definition_error());
}
