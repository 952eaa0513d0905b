use crate::name::Name;
use crate::object::{Object, ObjectKind};
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;

/// The root container holding all live schema objects, indexed by name
/// and by kind.
///
/// A schema is a value: every mutating operation consumes the schema and
/// returns the updated one, so callers can keep the previous revision
/// around for diffing or discard a partially built one on error. There
/// is no interior mutability and no locking; one logical migration is in
/// flight at a time.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    objects: IndexMap<Name, Arc<Object>>,
    by_kind: HashMap<ObjectKind, IndexSet<Name>>,
    generation: u64,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonically increasing revision counter; bumped by every
    /// mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Inserts a new object. The object's module must already exist and
    /// the name must be free.
    pub fn insert(mut self, obj: Object) -> Result<Self> {
        let name = obj.name().clone();

        if obj.kind != ObjectKind::Module && !self.has_module(&name.module) {
            return Err(Error::name(format!(
                "unknown module '{}'",
                name.module
            )));
        }
        if self.objects.contains_key(&name) {
            return Err(Error::definition(format!(
                "{} '{}' is already defined",
                obj.kind.display(),
                name
            )));
        }

        self.by_kind.entry(obj.kind).or_default().insert(name.clone());
        self.objects.insert(name, Arc::new(obj));
        self.generation += 1;
        Ok(self)
    }

    /// Replaces an existing object under the same name.
    pub fn update(mut self, obj: Object) -> Result<Self> {
        let name = obj.name().clone();
        if !self.objects.contains_key(&name) {
            return Err(Error::internal(format!(
                "update of unknown object '{name}'"
            )));
        }
        self.objects.insert(name, Arc::new(obj));
        self.generation += 1;
        Ok(self)
    }

    pub fn delete(mut self, name: &Name) -> Result<Self> {
        let obj = self
            .objects
            .shift_remove(name)
            .ok_or_else(|| Error::name(format!("cannot delete unknown object '{name}'")))?;
        if let Some(names) = self.by_kind.get_mut(&obj.kind) {
            names.shift_remove(name);
        }
        self.generation += 1;
        Ok(self)
    }

    /// Moves an object to a new name, keeping its id. Callers are
    /// responsible for rewriting references held by other objects.
    pub fn rename(mut self, old: &Name, new: Name) -> Result<Self> {
        if self.objects.contains_key(&new) {
            return Err(Error::definition(format!(
                "cannot rename '{old}': '{new}' is already defined"
            )));
        }
        let mut obj = (*self
            .objects
            .shift_remove(old)
            .ok_or_else(|| Error::name(format!("cannot rename unknown object '{old}'")))?)
        .clone();

        if let Some(names) = self.by_kind.get_mut(&obj.kind) {
            names.shift_remove(old);
        }
        obj.set_name(new.clone());
        self.by_kind.entry(obj.kind).or_default().insert(new.clone());
        self.objects.insert(new, Arc::new(obj));
        self.generation += 1;
        Ok(self)
    }

    pub fn get(&self, name: &Name) -> Result<&Arc<Object>> {
        self.objects.get(name).ok_or_else(|| {
            let mut msg = format!("schema object '{name}' does not exist");
            if let Some(suggestion) = self.suggest(name) {
                msg.push_str(&format!(", did you mean '{suggestion}'?"));
            }
            Error::name(msg)
        })
    }

    pub fn get_opt(&self, name: &Name) -> Option<&Arc<Object>> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.objects.contains_key(name)
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.objects.contains_key(&Name::for_module(module))
    }

    pub fn objects(&self) -> impl Iterator<Item = &Arc<Object>> {
        self.objects.values()
    }

    pub fn objects_of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &Arc<Object>> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|names| names.iter())
            .filter_map(|name| self.objects.get(name))
    }

    /// Names of objects that list `name` as a direct base.
    pub fn children(&self, name: &Name) -> Vec<Name> {
        self.objects
            .values()
            .filter(|obj| obj.kind.is_inheriting() && obj.bases().contains(name))
            .map(|obj| obj.name().clone())
            .collect()
    }

    /// All transitive children, ordered parents before children.
    pub fn descendants(&self, name: &Name) -> Vec<Name> {
        let mut seen: IndexSet<Name> = IndexSet::new();
        let mut queue: Vec<Name> = self.children(name);

        while let Some(next) = queue.pop() {
            if seen.insert(next.clone()) {
                queue.extend(self.children(&next));
            }
        }

        // The walk can reach a diamond's bottom before one of its sides;
        // order by inheritance depth via the stored MRO length.
        let mut ordered: Vec<Name> = seen.into_iter().collect();
        ordered.sort_by_key(|n| {
            self.objects
                .get(n)
                .map(|obj| obj.mro().len())
                .unwrap_or(usize::MAX)
        });
        ordered
    }

    /// Closest existing name by edit distance, searched among objects of
    /// the same module and the `std` module.
    fn suggest(&self, name: &Name) -> Option<Name> {
        let mut best: Option<(usize, &Name)> = None;

        for candidate in self.objects.keys() {
            if candidate.module != name.module && candidate.module != "std" {
                continue;
            }
            if candidate.is_specialized() {
                continue;
            }
            let distance = levenshtein(&candidate.name, &name.name);
            if distance > 2 {
                continue;
            }
            if best.map(|(d, _)| distance < d).unwrap_or(true) {
                best = Some((distance, candidate));
            }
        }

        best.map(|(_, candidate)| candidate.clone())
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Value;

    fn schema_with_module() -> Schema {
        let schema = Schema::new();
        schema
            .insert(Object::new(ObjectKind::Module, Name::for_module("test")))
            .unwrap()
    }

    #[test]
    fn insert_requires_module() {
        let schema = Schema::new();
        let err = schema
            .insert(Object::new(
                ObjectKind::ScalarType,
                Name::new("nowhere", "t"),
            ))
            .unwrap_err();
        assert!(err.is_name_error());
    }

    #[test]
    fn duplicate_names_rejected() {
        let schema = schema_with_module();
        let schema = schema
            .insert(Object::new(ObjectKind::ScalarType, Name::new("test", "t")))
            .unwrap();
        assert!(schema
            .insert(Object::new(ObjectKind::ScalarType, Name::new("test", "t")))
            .is_err());
    }

    #[test]
    fn rename_keeps_id() {
        let schema = schema_with_module();
        let obj = Object::new(ObjectKind::ScalarType, Name::new("test", "old"));
        let id = obj.id;
        let schema = schema.insert(obj).unwrap();

        let schema = schema
            .rename(&Name::new("test", "old"), Name::new("test", "new"))
            .unwrap();
        assert!(schema.get_opt(&Name::new("test", "old")).is_none());
        assert_eq!(schema.get(&Name::new("test", "new")).unwrap().id, id);
    }

    #[test]
    fn missing_object_suggests_close_name() {
        let schema = schema_with_module();
        let schema = schema
            .insert(Object::new(ObjectKind::ScalarType, Name::new("test", "title")))
            .unwrap();

        let err = schema.get(&Name::new("test", "titel")).unwrap_err();
        assert!(err.to_string().contains("did you mean 'test::title'?"));
    }

    #[test]
    fn children_by_bases() {
        let schema = schema_with_module();
        let schema = schema
            .insert(Object::new(ObjectKind::ObjectType, Name::new("test", "A")))
            .unwrap();
        let mut b = Object::new(ObjectKind::ObjectType, Name::new("test", "B"));
        b.set("bases", Value::NameList(vec![Name::new("test", "A")]))
            .unwrap();
        let schema = schema.insert(b).unwrap();

        assert_eq!(
            schema.children(&Name::new("test", "A")),
            vec![Name::new("test", "B")]
        );
    }
}
