use crate::name::Name;
use crate::object::hash::Fnv64;
use indexmap::{IndexMap, IndexSet};

/// An opaque expression in the query language.
///
/// The core never evaluates expressions; it stores them, compares them for
/// textual equality, and conjoins them when merging constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr(pub String);

impl Expr {
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Conjunction of two expressions, used for cumulative constraint
    /// inheritance.
    pub fn and(first: &Expr, second: &Expr) -> Expr {
        Expr(format!("({}) and ({})", first.0, second.0))
    }
}

/// A schema-object field value.
///
/// Object-valued fields are reduced to names, never to live references,
/// so that values compare and hash identically across independently
/// loaded schema snapshots.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Str(String),
    Name(Name),
    NameList(Vec<Name>),
    NameSet(IndexSet<Name>),
    Expr(Expr),
    /// A reference dictionary: member key to member name.
    ObjectDict(IndexMap<String, Name>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Value::Name(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_name_list(&self) -> Option<&Vec<Name>> {
        match self {
            Value::NameList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_name_set(&self) -> Option<&IndexSet<Name>> {
        match self {
            Value::NameSet(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Value::Expr(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Name>> {
        match self {
            Value::ObjectDict(v) => Some(v),
            _ => None,
        }
    }

    /// Per-field similarity used by whole-object comparison: exact match
    /// scores 1.0, any difference scores the field's coefficient.
    pub fn compare_values(ours: Option<&Value>, theirs: Option<&Value>, compcoef: f64) -> f64 {
        match (ours, theirs) {
            (None, None) => 1.0,
            (Some(a), Some(b)) if a == b => 1.0,
            _ => compcoef,
        }
    }

    /// Feeds a canonical, order-independent encoding of the value into a
    /// persistent hash.
    pub(crate) fn persistent_hash_into(&self, hasher: &mut Fnv64) {
        match self {
            Value::Bool(v) => {
                hasher.write_u8(1);
                hasher.write_u8(*v as u8);
            }
            Value::Str(v) => {
                hasher.write_u8(2);
                hasher.write_str(v);
            }
            Value::Name(v) => {
                hasher.write_u8(3);
                hasher.write_str(&v.to_string());
            }
            Value::NameList(v) => {
                hasher.write_u8(4);
                for name in v {
                    hasher.write_str(&name.to_string());
                }
            }
            Value::NameSet(v) => {
                hasher.write_u8(7);
                let mut entries: Vec<String> = v.iter().map(Name::to_string).collect();
                entries.sort();
                for name in entries {
                    hasher.write_str(&name);
                }
            }
            Value::Expr(v) => {
                hasher.write_u8(5);
                hasher.write_str(&v.0);
            }
            Value::ObjectDict(v) => {
                hasher.write_u8(6);
                let mut entries: Vec<(&String, &Name)> = v.iter().collect();
                entries.sort();
                for (key, name) in entries {
                    hasher.write_str(key);
                    hasher.write_str(&name.to_string());
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Name> for Value {
    fn from(v: Name) -> Self {
        Value::Name(v)
    }
}

impl From<Vec<Name>> for Value {
    fn from(v: Vec<Name>) -> Self {
        Value::NameList(v)
    }
}

impl From<Expr> for Value {
    fn from(v: Expr) -> Self {
        Value::Expr(v)
    }
}
