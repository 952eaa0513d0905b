//! Inheritance-aware merge of parent-owned child collections.
//!
//! Every referencing object declares its reference dictionaries in its
//! static [`RefDictSpec`] table. The merge below rebuilds the full
//! ("all") dictionary of each refdict from the local dictionary and the
//! direct bases' full dictionaries, materializing derived members where
//! pure reference carry-through is not enough.

use crate::inherit;
use crate::name::Name;
use crate::object::{Object, ObjectKind, RefDictSpec, Value};
use crate::schema::Schema;
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use tracing::trace;

/// Re-merges every reference dictionary of `owner`. Runs on every
/// finalize: creation, rebase, and descendant propagation.
pub fn merge_refdicts(mut schema: Schema, owner: &Name, declarative: bool) -> Result<Schema> {
    let class = schema.get(owner)?.class();
    for rd in class.refdicts {
        schema = merge_refdict(schema, owner, rd, declarative)?;
    }
    Ok(schema)
}

fn merge_refdict(
    mut schema: Schema,
    owner: &Name,
    rd: &'static RefDictSpec,
    declarative: bool,
) -> Result<Schema> {
    let owner_obj = schema.get(owner)?.clone();
    let local: IndexMap<String, Name> = owner_obj
        .dict_field(rd.local_attr)
        .cloned()
        .unwrap_or_default();

    // Members inherited per key, gathered from the direct bases' full
    // dictionaries.
    let mut inherited: IndexMap<String, Vec<Name>> = IndexMap::new();
    for base_name in owner_obj.bases() {
        let base = schema.get(base_name)?;
        if let Some(dict) = base.dict_field(rd.attr) {
            for (key, member) in dict {
                inherited
                    .entry(key.clone())
                    .or_default()
                    .push(member.clone());
            }
        }
    }

    let mut keys: Vec<String> = local.keys().cloned().collect();
    for key in inherited.keys() {
        if !local.contains_key(key) {
            keys.push(key.clone());
        }
    }

    let mut all: IndexMap<String, Name> = IndexMap::new();

    for key in keys {
        // Dedup members re-inherited through multiple paths by their
        // ultimate non-derived ancestor.
        let mut members: Vec<Name> = Vec::new();
        let mut ancestry: IndexSet<Name> = IndexSet::new();
        for member in inherited.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
            let ancestor = inherit::generic_ancestor(&schema, member)?;
            if ancestry.insert(ancestor) {
                members.push(member.clone());
            }
        }

        match (local.get(&key).cloned(), members.as_slice()) {
            (Some(local_member), []) => {
                if schema.get(&local_member)?.declared_inherited() {
                    return Err(Error::definition(format!(
                        "'{key}' is declared as inherited, but no ancestor of '{owner}' \
                         defines it"
                    )));
                }
                all.insert(key, local_member);
            }
            (Some(local_member), inherited_members) => {
                if rd.requires_explicit_inherit
                    && declarative
                    && !schema.get(&local_member)?.declared_inherited()
                {
                    return Err(Error::definition(format!(
                        "'{key}' conflicts with an inherited member of '{owner}'; \
                         it must be declared using the 'inherited' keyword"
                    )));
                }

                // The local declaration specializes the inherited ones:
                // they become its bases and it re-acquires inheritance
                // from them.
                let mut obj = (**schema.get(&local_member)?).clone();
                let mut bases: Vec<Name> = obj.bases().to_vec();
                for member in inherited_members {
                    if !bases.contains(member) {
                        bases.push(member.clone());
                    }
                }
                obj.set("bases", Value::NameList(bases))?;
                schema = schema.update(obj)?;
                schema = inherit::acquire_ancestor_inheritance(schema, &local_member, declarative)?;
                all.insert(key, local_member);
            }
            (None, [single]) => {
                // Pure inheritance: carry the reference through unless
                // the member must be concretized per-subject.
                if needs_derivation(&schema, single)? {
                    let (updated, derived) = derive_member(schema, single, owner, &[], rd)?;
                    schema = updated;
                    all.insert(key, derived);
                } else {
                    all.insert(key, single.clone());
                }
            }
            (None, [first, rest @ ..]) => {
                // Multiple-inheritance convergence: derive one child from
                // the first inherited member with the rest as extra bases.
                let (updated, derived) = derive_member(schema, first, owner, rest, rd)?;
                schema = updated;
                all.insert(key, derived);
            }
            (None, []) => {}
        }
    }

    // Refetch: the owner may have been replaced while members were
    // finalized.
    let mut latest = (**schema.get(owner)?).clone();
    latest.set(rd.attr, Value::ObjectDict(all))?;
    latest.set(rd.local_attr, Value::ObjectDict(local))?;
    schema.update(latest)
}

/// Whether pure inheritance of `member` still requires a materialized
/// per-subject copy.
///
/// Pointers always re-materialize (their back reference must name the
/// inheriting source); delegated constraints concretize per subject, as
/// do members carrying delegated sub-constraints.
fn needs_derivation(schema: &Schema, member: &Name) -> Result<bool> {
    let obj = schema.get(member)?;
    if obj.kind.is_pointer() {
        return Ok(true);
    }
    if obj.kind == ObjectKind::Constraint && obj.bool_field("delegated") {
        return Ok(true);
    }
    if let Some(constraints) = obj.dict_field("constraints") {
        for sub in constraints.values() {
            if schema.get(sub)?.bool_field("delegated") {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn derive_member(
    mut schema: Schema,
    base_member: &Name,
    owner: &Name,
    extra_bases: &[Name],
    rd: &'static RefDictSpec,
) -> Result<(Schema, Name)> {
    let base_obj = schema.get(base_member)?.clone();
    let owner_qual = owner.to_string();
    let name = Name::specialized(owner.module.clone(), base_member, &[&owner_qual]);

    let mut bases = vec![base_member.clone()];
    bases.extend(extra_bases.iter().cloned());

    if schema.contains(&name) {
        // Already materialized by an earlier merge; refresh its bases
        // and re-acquire.
        let mut obj = (**schema.get(&name)?).clone();
        obj.set("bases", Value::NameList(bases))?;
        schema = schema.update(obj)?;
        schema = inherit::acquire_ancestor_inheritance(schema, &name, false)?;
        return Ok((schema, name));
    }

    let mut obj = Object::new(base_obj.kind, name.clone());
    obj.set("bases", Value::NameList(bases))?;
    obj.set(rd.backref, Value::Name(owner.clone()))?;
    obj.set("is_derived", Value::Bool(true))?;
    obj.set("declared_inherited", Value::Bool(true))?;
    schema = schema.insert(obj)?;
    schema = inherit::finalize(schema, &name, false)?;

    trace!(member = %name, owner = %owner, "materialized inherited member");
    Ok((schema, name))
}
