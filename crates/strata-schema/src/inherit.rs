use crate::name::Name;
use crate::object::hash::Fnv64;
use crate::object::{Object, ObjectKind, Value};
use crate::refdict;
use crate::schema::Schema;
use crate::{Error, Result};
use indexmap::IndexSet;
use tracing::debug;

/// Computes the linearized ancestor list for `name` by C3 merge over the
/// object itself and each direct base's own MRO.
///
/// Guarantees: the object is first, every ancestor appears exactly once,
/// and the order is consistent with each base's own MRO and with base
/// declaration order. An inconsistent graph fails rather than silently
/// picking an order.
pub fn compute_mro(schema: &Schema, name: &Name) -> Result<Vec<Name>> {
    let mut path = Vec::new();
    compute_mro_guarded(schema, name, &mut path)
}

fn compute_mro_guarded(
    schema: &Schema,
    name: &Name,
    path: &mut Vec<Name>,
) -> Result<Vec<Name>> {
    if path.contains(name) {
        return Err(Error::definition(format!(
            "circular inheritance: '{name}' is an ancestor of itself"
        )));
    }

    let obj = schema.get(name)?;
    path.push(name.clone());
    let mut mros: Vec<Vec<Name>> = vec![vec![name.clone()]];
    for base in obj.bases() {
        mros.push(compute_mro_guarded(schema, base, path)?);
    }
    path.pop();
    merge_mro(name, mros)
}

fn merge_mro(name: &Name, mut mros: Vec<Vec<Name>>) -> Result<Vec<Name>> {
    let mut result = Vec::new();

    loop {
        mros.retain(|mro| !mro.is_empty());
        if mros.is_empty() {
            return Ok(result);
        }

        // A candidate head is valid if it appears in no other list's tail.
        let candidate = mros
            .iter()
            .map(|mro| &mro[0])
            .find(|candidate| !mros.iter().any(|mro| mro[1..].contains(candidate)))
            .cloned();

        match candidate {
            Some(candidate) => {
                for mro in &mut mros {
                    if mro[0] == candidate {
                        mro.remove(0);
                    }
                }
                result.push(candidate);
            }
            None => {
                return Err(Error::definition(format!(
                    "could not find consistent ancestor order for '{name}'"
                )));
            }
        }
    }
}

/// Finalizes an object after creation or a base-list change: checks the
/// base list, re-acquires ancestor inheritance, refreshes the cached
/// MRO, and re-merges every reference dictionary.
pub fn finalize(schema: Schema, name: &Name, declarative: bool) -> Result<Schema> {
    let obj = schema.get(name)?.clone();
    if !obj.kind.is_inheriting() {
        return Ok(schema);
    }

    for base_name in obj.bases() {
        let base = schema.get(base_name)?;
        if base.is_final() {
            return Err(Error::definition(format!(
                "cannot inherit from final {} '{}'",
                base.kind.display(),
                base_name
            )));
        }
    }

    acquire_ancestor_inheritance(schema, name, declarative)
}

/// Rebuilds the inheritance overlay of `name` from its direct bases and
/// re-merges its reference dictionaries.
pub fn acquire_ancestor_inheritance(
    mut schema: Schema,
    name: &Name,
    declarative: bool,
) -> Result<Schema> {
    let current = schema.get(name)?.clone();
    let mut obj = (*current).clone();

    obj.clear_computed();
    for base_name in current.bases() {
        let base = schema.get(base_name)?.clone();
        obj.merge_from(&base)?;
    }

    let mro = compute_mro(&schema, name)?;
    debug_assert_eq!(mro.first(), Some(name));
    obj.set_computed("mro", Value::NameList(mro));

    schema = schema.update(obj)?;
    refdict::merge_refdicts(schema, name, declarative)
}

/// Re-acquires ancestor inheritance for every descendant of `name`,
/// parents before children. Required after a rebase or after altering
/// an inheritable field.
pub fn update_descendants(mut schema: Schema, name: &Name, declarative: bool) -> Result<Schema> {
    for child in schema.descendants(name) {
        schema = acquire_ancestor_inheritance(schema, &child, declarative)?;
    }
    Ok(schema)
}

/// Walks derivation chains up to the nearest non-derived ancestor.
pub fn generic_ancestor(schema: &Schema, name: &Name) -> Result<Name> {
    let mut current = name.clone();
    loop {
        let obj = schema.get(&current)?;
        if !obj.is_derived() {
            return Ok(current);
        }
        match obj.bases().first() {
            Some(base) => current = base.clone(),
            None => return Ok(current),
        }
    }
}

/// Resolves a multi-target declaration to a single type, synthesizing an
/// anonymous abstract common ancestor when needed.
///
/// The virtual parent is memoized under a name derived from the sorted
/// child set, so repeated declarations of the same target set reuse one
/// object.
pub fn ensure_virtual_parent(mut schema: Schema, targets: &[Name]) -> Result<(Schema, Name)> {
    match targets {
        [] => {
            return Err(Error::internal(
                "virtual parent requested for an empty target list".to_string(),
            ))
        }
        [single] => return Ok((schema, single.clone())),
        _ => {}
    }

    // Virtual members of virtual targets flatten into the new set.
    let mut members: IndexSet<Name> = IndexSet::new();
    for target in targets {
        let obj = schema.get(target)?;
        if obj.is_virtual() {
            members.extend(obj.names_field("_virtual_children").iter().cloned());
        } else {
            members.insert(target.clone());
        }
    }
    let mut members: Vec<Name> = members.into_iter().collect();
    members.sort();

    if members.len() == 1 {
        return Ok((schema, members.remove(0)));
    }

    let mut seen_scalars = false;
    let mut seen_objects = false;
    for member in &members {
        match schema.get(member)?.kind {
            ObjectKind::ScalarType => seen_scalars = true,
            ObjectKind::ObjectType => seen_objects = true,
            other => {
                return Err(Error::definition(format!(
                    "{} '{}' cannot be used in a target list",
                    other.display(),
                    member
                )))
            }
        }
    }
    if seen_scalars && seen_objects {
        return Err(Error::definition(
            "cannot mix scalar and object types in a target list".to_string(),
        ));
    }
    if seen_scalars {
        return Err(Error::definition(
            "cannot use multiple scalar types in a target list".to_string(),
        ));
    }

    let mut hasher = Fnv64::new();
    for member in &members {
        hasher.write_str(&member.to_string());
    }
    let name = Name::new(
        members[0].module.clone(),
        format!("Virtual_{:016x}", hasher.finish()),
    );

    if schema.contains(&name) {
        return Ok((schema, name));
    }

    let mut parent = Object::new(ObjectKind::ObjectType, name.clone());
    parent.set("is_abstract", Value::Bool(true))?;
    parent.set("is_virtual", Value::Bool(true))?;
    parent.set("_virtual_children", Value::NameList(members.clone()))?;
    schema = schema.insert(parent)?;
    schema = finalize(schema, &name, false)?;

    debug!(name = %name, members = members.len(), "synthesized virtual parent");
    Ok((schema, name))
}
