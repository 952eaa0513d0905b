//! Schema diffing: computes a command tree that migrates one schema
//! revision into another.
//!
//! For each object kind the old and new populations are matched by
//! greedy bipartite similarity: content-identical objects pair off by
//! persistent hash first, the remainder by whole-object compare score.
//! A pair above the match threshold becomes an alter (with a rename when
//! the names differ); everything left unmatched becomes a create or a
//! delete, ordered so that dependencies are satisfied.

use super::{AlterField, Command, FieldSource, ObjectCommand, RebaseObject, RenameObject};
use crate::name::Name;
use crate::object::{Object, ObjectKind};
use crate::schema::Schema;
use crate::topo::DepGraph;
use crate::Result;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Pairs scoring at or below this are treated as unrelated objects.
const MATCH_THRESHOLD: f64 = 0.6;

/// Computes the full delta between two schema revisions as one group,
/// kind by kind in dependency order.
pub fn delta_schemas(old: &Schema, new: &Schema) -> Result<Command> {
    let mut ops = Vec::new();
    for kind in ObjectKind::DEPENDENCY_ORDER {
        ops.extend(delta_objects(old, new, kind)?);
    }
    Ok(Command::Group(ops))
}

/// Diffs the objects of a single kind: creates and alters first, then
/// deletes.
pub fn delta_objects(old: &Schema, new: &Schema, kind: ObjectKind) -> Result<Vec<Command>> {
    // Materialized derivations are engine-owned; they reappear when the
    // delta is applied.
    let olds: Vec<Arc<Object>> = old
        .objects_of_kind(kind)
        .filter(|obj| !obj.is_derived())
        .cloned()
        .collect();
    let news: Vec<Arc<Object>> = new
        .objects_of_kind(kind)
        .filter(|obj| !obj.is_derived())
        .cloned()
        .collect();

    let mut old_used = vec![false; olds.len()];
    let mut new_used = vec![false; news.len()];

    // Content-identical objects cannot have changed; pair them off by
    // persistent hash before running any comparison.
    let new_hashes: Vec<u64> = news.iter().map(|obj| obj.persistent_hash()).collect();
    for (i, old_obj) in olds.iter().enumerate() {
        let hash = old_obj.persistent_hash();
        if let Some(j) = new_hashes
            .iter()
            .enumerate()
            .position(|(j, new_hash)| !new_used[j] && *new_hash == hash)
        {
            old_used[i] = true;
            new_used[j] = true;
        }
    }

    // Full comparison matrix over the remainder, most similar first;
    // ties break on the new name, then the old name, so the outcome
    // does not depend on container order.
    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (j, new_obj) in news.iter().enumerate() {
        if new_used[j] {
            continue;
        }
        for (i, old_obj) in olds.iter().enumerate() {
            if old_used[i] {
                continue;
            }
            pairs.push((new_obj.compare(old_obj), j, i));
        }
    }
    pairs.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| news[a.1].name().cmp(news[b.1].name()))
            .then_with(|| olds[a.2].name().cmp(olds[b.2].name()))
    });

    let mut altered: Vec<(usize, usize)> = Vec::new();
    for (score, j, i) in pairs {
        if new_used[j] || old_used[i] {
            continue;
        }
        if score == 1.0 {
            // Identical modulo non-compared state; nothing to emit.
            old_used[i] = true;
            new_used[j] = true;
        } else if score > MATCH_THRESHOLD {
            debug!(
                old = %olds[i].name(),
                new = %news[j].name(),
                score,
                "matched changed objects"
            );
            old_used[i] = true;
            new_used[j] = true;
            altered.push((i, j));
        }
        // At or below the threshold both sides stay unmatched and fall
        // through to create/delete.
    }

    let mut ops = Vec::new();

    // Creates, dependencies first within the created set.
    let mut graph = DepGraph::new();
    for (j, new_obj) in news.iter().enumerate() {
        if new_used[j] {
            continue;
        }
        let deps: Vec<Name> = new_obj.bases().to_vec();
        graph.add(new_obj.name().clone(), j, deps);
    }
    for j in graph.sort()? {
        ops.push(create_delta(&news[j]));
    }

    // Alters, keyed and ordered by the old names; base references in
    // the new revision are translated back through the rename pairing.
    let mut old_for_new: IndexMap<&Name, &Name> = IndexMap::new();
    for &(i, j) in &altered {
        old_for_new.insert(news[j].name(), olds[i].name());
    }
    let mut graph = DepGraph::new();
    for &(i, j) in &altered {
        let mut deps: Vec<Name> = olds[i].bases().to_vec();
        for base in news[j].bases() {
            let translated = old_for_new
                .get(base)
                .map(|old_name| (*old_name).clone())
                .unwrap_or_else(|| base.clone());
            if !deps.contains(&translated) {
                deps.push(translated);
            }
        }
        graph.add(olds[i].name().clone(), (i, j), deps);
    }
    for (i, j) in graph.sort()? {
        ops.push(alter_delta(&olds[i], &news[j]));
    }

    // Deletes, children before the bases they depend on.
    let mut graph = DepGraph::new();
    for (i, old_obj) in olds.iter().enumerate() {
        if old_used[i] {
            continue;
        }
        graph.add(old_obj.name().clone(), i, old_obj.bases().to_vec());
    }
    let mut deletes = graph.sort()?;
    deletes.reverse();
    for i in deletes {
        ops.push(Command::Delete(ObjectCommand::new(
            kind,
            olds[i].name().clone(),
        )));
    }

    Ok(ops)
}

/// A create carrying every explicitly declared, non-ephemeral field of
/// the new object.
fn create_delta(obj: &Object) -> Command {
    let mut cmd = ObjectCommand::new(obj.kind, obj.name().clone());
    for (field, value) in obj.explicit_fields() {
        if field == "name" {
            continue;
        }
        let ephemeral = obj
            .class()
            .field(field)
            .map(|spec| spec.ephemeral)
            .unwrap_or(true);
        if ephemeral {
            continue;
        }
        cmd = cmd.with(Command::SetField(AlterField::set(field, value.clone())));
    }
    Command::Create(cmd)
}

/// An alter between two matched revisions of one object: a nested
/// rename when the names differ, a rebase when the declared base lists
/// differ, and a field change for every other explicit difference.
fn alter_delta(old: &Object, new: &Object) -> Command {
    let mut cmd = ObjectCommand::new(old.kind, old.name().clone());

    if old.name() != new.name() {
        cmd = cmd.with(Command::Rename(RenameObject {
            object: old.kind,
            classname: old.name().clone(),
            new_name: new.name().clone(),
            span: None,
        }));
    }

    let old_bases = explicit_bases(old);
    let new_bases = explicit_bases(new);
    if old_bases != new_bases {
        let dropped: Vec<Name> = old_bases
            .iter()
            .filter(|base| !new_bases.contains(base))
            .cloned()
            .collect();
        let added: Vec<Name> = new_bases
            .iter()
            .filter(|base| !old_bases.contains(base))
            .cloned()
            .collect();
        cmd = cmd.with(Command::Rebase(RebaseObject {
            object: old.kind,
            classname: old.name().clone(),
            added,
            dropped,
            span: None,
        }));
    }

    for spec in old.class().fields {
        if spec.ephemeral || spec.name == "name" || spec.name == "bases" {
            continue;
        }
        let old_value = old.get_explicit(spec.name);
        let new_value = new.get_explicit(spec.name);
        if old_value != new_value {
            cmd = cmd.with(Command::SetField(AlterField {
                field: spec.name.to_string(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
                source: FieldSource::Explicit,
                span: None,
            }));
        }
    }

    Command::Alter(cmd)
}

fn explicit_bases(obj: &Object) -> Vec<Name> {
    obj.get_explicit("bases")
        .and_then(crate::object::Value::as_name_list)
        .cloned()
        .unwrap_or_default()
}
