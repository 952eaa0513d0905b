pub mod class;
pub mod field;
pub(crate) mod hash;
pub mod value;

pub use class::{ObjectClass, ObjectKind, RefDictSpec};
pub use field::{FieldSpec, MergeStrategy};
pub use value::{Expr, Value};

use crate::name::Name;
use crate::object::hash::Fnv64;
use crate::{Error, Result};
use indexmap::IndexMap;
use uuid::Uuid;

/// A schema object: a stable identity plus a typed record of field
/// values, described by the static [`ObjectClass`] table for its kind.
///
/// Field values live in two layers. Explicit values were set directly
/// (by DDL or by the engine materializing a derived object); computed
/// values are the inheritance overlay produced by ancestor acquisition
/// and are rebuilt from scratch every time inheritance is re-acquired.
/// Reads see the overlay first, so inherited values win where a merge
/// strategy strengthens an explicit one.
#[derive(Debug, Clone)]
pub struct Object {
    /// Stable identity; survives renames.
    pub id: Uuid,
    pub kind: ObjectKind,
    fields: IndexMap<&'static str, Value>,
    computed: IndexMap<&'static str, Value>,
}

impl Object {
    pub fn new(kind: ObjectKind, name: Name) -> Self {
        Self::with_id(kind, name, Uuid::new_v4())
    }

    pub fn with_id(kind: ObjectKind, name: Name, id: Uuid) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("name", Value::Name(name));
        Self {
            id,
            kind,
            fields,
            computed: IndexMap::new(),
        }
    }

    pub fn class(&self) -> &'static ObjectClass {
        self.kind.class()
    }

    pub fn name(&self) -> &Name {
        self.fields
            .get("name")
            .and_then(Value::as_name)
            .expect("object has no name")
    }

    pub fn shortname(&self) -> Name {
        self.name().shortname()
    }

    pub(crate) fn set_name(&mut self, name: Name) {
        self.fields.insert("name", Value::Name(name));
    }

    /// Effective value of a field: the inheritance overlay shadows the
    /// explicit value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.computed.get(field).or_else(|| self.fields.get(field))
    }

    /// Directly declared value, ignoring inheritance.
    pub fn get_explicit(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets an explicit field value. Unknown fields are rejected; they
    /// indicate a malformed command tree.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let spec = self.class().field(field).ok_or_else(|| {
            Error::internal(format!(
                "{} has no field '{field}'",
                self.kind.display()
            ))
        })?;
        self.fields.insert(spec.name, value);
        self.computed.shift_remove(spec.name);
        Ok(())
    }

    pub fn unset(&mut self, field: &str) {
        self.fields.shift_remove(field);
        self.computed.shift_remove(field);
    }

    pub(crate) fn set_computed(&mut self, field: &'static str, value: Value) {
        self.computed.insert(field, value);
    }

    /// Drops the inheritance overlay so it can be rebuilt.
    pub(crate) fn clear_computed(&mut self) {
        self.computed.clear();
    }

    /// Explicitly declared (field, value) pairs in declaration order.
    pub fn explicit_fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn bool_field(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn name_field(&self, field: &str) -> Option<&Name> {
        self.get(field).and_then(Value::as_name)
    }

    pub fn names_field(&self, field: &str) -> &[Name] {
        self.get(field)
            .and_then(Value::as_name_list)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn expr_field(&self, field: &str) -> Option<&Expr> {
        self.get(field).and_then(Value::as_expr)
    }

    pub fn dict_field(&self, field: &str) -> Option<&IndexMap<String, Name>> {
        self.get(field).and_then(Value::as_dict)
    }

    pub fn bases(&self) -> &[Name] {
        self.names_field("bases")
    }

    pub fn mro(&self) -> &[Name] {
        self.names_field("mro")
    }

    pub fn is_abstract(&self) -> bool {
        self.bool_field("is_abstract")
    }

    pub fn is_final(&self) -> bool {
        self.bool_field("is_final")
    }

    pub fn is_derived(&self) -> bool {
        self.bool_field("is_derived")
    }

    pub fn is_virtual(&self) -> bool {
        self.bool_field("is_virtual")
    }

    pub fn declared_inherited(&self) -> bool {
        self.bool_field("declared_inherited")
    }

    /// Whole-object similarity in `[0, 1]`: the product, over all fields
    /// carrying a compare coefficient, of per-field similarity. Not a
    /// boolean equality; the diff algorithm matches on this score.
    pub fn compare(&self, other: &Object) -> f64 {
        if self.kind != other.kind {
            return 0.0;
        }

        let mut similarity = 1.0;
        for spec in self.class().fields {
            let Some(compcoef) = spec.compcoef else {
                continue;
            };
            similarity *= Value::compare_values(self.get(spec.name), other.get(spec.name), compcoef);
        }
        similarity
    }

    /// Merges inheritable fields from a direct base into the computed
    /// overlay, honoring each field's merge strategy.
    pub fn merge_from(&mut self, base: &Object) -> Result<()> {
        if self.kind != base.kind {
            return Err(Error::definition(format!(
                "cannot merge {} '{}' into {} '{}'",
                base.kind.display(),
                base.name(),
                self.kind.display(),
                self.name(),
            )));
        }

        for spec in self.class().fields {
            if !spec.inheritable {
                continue;
            }
            let Some(theirs) = base.get(spec.name).cloned() else {
                continue;
            };

            match spec.merge {
                MergeStrategy::Inherit => {
                    if self.get(spec.name).is_none() {
                        self.set_computed(spec.name, theirs);
                    }
                }
                MergeStrategy::OrBool => {
                    let ours = self.bool_field(spec.name);
                    let merged = ours || theirs.as_bool().unwrap_or(false);
                    self.set_computed(spec.name, Value::Bool(merged));
                }
                MergeStrategy::AndBool => {
                    let ours = self.get(spec.name).and_then(Value::as_bool).unwrap_or(true);
                    let merged = ours && theirs.as_bool().unwrap_or(true);
                    self.set_computed(spec.name, Value::Bool(merged));
                }
                MergeStrategy::UnionList => {
                    let mut merged: Vec<Name> = self.names_field(spec.name).to_vec();
                    for name in theirs.as_name_list().into_iter().flatten() {
                        if !merged.contains(name) {
                            merged.push(name.clone());
                        }
                    }
                    self.set_computed(spec.name, Value::NameList(merged));
                }
                MergeStrategy::AndExpr => {
                    let theirs = theirs.as_expr().cloned().ok_or_else(|| {
                        Error::internal(format!(
                            "field '{}' of '{}' is not an expression",
                            spec.name,
                            base.name(),
                        ))
                    })?;
                    let merged = match self.get(spec.name).and_then(Value::as_expr) {
                        Some(ours) => Expr::and(&theirs, ours),
                        None => theirs,
                    };
                    self.set_computed(spec.name, Value::Expr(merged));
                }
            }
        }

        Ok(())
    }

    /// Content-derived hash, stable across process runs and across
    /// independently loaded snapshots of "the same" object. Object-valued
    /// fields contribute names, never identities, and the id field is
    /// deliberately excluded.
    pub fn persistent_hash(&self) -> u64 {
        let mut hasher = Fnv64::new();
        hasher.write_str(self.kind.display());

        let mut entries: Vec<(&'static str, &Value)> = self
            .class()
            .fields
            .iter()
            .filter(|spec| spec.hashable)
            .filter_map(|spec| self.get(spec.name).map(|value| (spec.name, value)))
            .collect();
        entries.sort_by_key(|(name, _)| *name);

        for (name, value) in entries {
            hasher.write_str(name);
            value.persistent_hash_into(&mut hasher);
        }
        hasher.finish()
    }

    /// Rewrites every reference to `old` into `new` in both value
    /// layers. Used by rename to rebuild name-keyed caches.
    pub(crate) fn replace_name_refs(&mut self, old: &Name, new: &Name) {
        for layer in [&mut self.fields, &mut self.computed] {
            for value in layer.values_mut() {
                match value {
                    Value::Name(name) => {
                        if name == old {
                            *name = new.clone();
                        }
                    }
                    Value::NameList(names) => {
                        for name in names {
                            if name == old {
                                *name = new.clone();
                            }
                        }
                    }
                    Value::NameSet(names) => {
                        if names.contains(old) {
                            *names = names
                                .iter()
                                .map(|name| if name == old { new.clone() } else { name.clone() })
                                .collect();
                        }
                    }
                    Value::ObjectDict(dict) => {
                        for name in dict.values_mut() {
                            if name == old {
                                *name = new.clone();
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
