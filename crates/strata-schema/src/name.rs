use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between the module part and the object part.
pub const MODULE_SEP: &str = "::";

/// Separator introducing the specialization suffix of a derived name.
const SPEC_SEP: &str = "@@";

/// Separator between individual specialization qualifiers.
const QUAL_SEP: char = '@';

/// A qualified schema-object name: `module::name`.
///
/// Names of derived objects carry a specialization suffix on the object
/// part (`shortname@@qual1@qual2`) that maps the derived object back to
/// its generic ancestor. Two names are equal iff their canonical string
/// forms are equal.
///
/// Module objects themselves are the one exception to qualification: they
/// are stored under a name with an empty module part, and their canonical
/// form is the bare module string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Name {
    pub module: String,
    pub name: String,
}

impl Name {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// The name a module object is stored under.
    pub fn for_module(module: impl Into<String>) -> Self {
        Self {
            module: String::new(),
            name: module.into(),
        }
    }

    /// Parses a canonical `module::name` string.
    pub fn parse(src: &str) -> Result<Self> {
        match src.split_once(MODULE_SEP) {
            Some((module, name)) if !module.is_empty() && !name.is_empty() => {
                Ok(Self::new(module, name))
            }
            _ => Err(Error::name(format!(
                "name '{src}' is not a fully qualified name"
            ))),
        }
    }

    /// Builds the derived name for `base` specialized by `quals`, placed
    /// in `module`.
    ///
    /// Qualifiers are joined with a reserved separator sequence that is
    /// not permitted in ordinary identifiers, so distinct qualifier
    /// vectors never collide.
    pub fn specialized(module: impl Into<String>, base: &Name, quals: &[&str]) -> Self {
        debug_assert!(!quals.is_empty());
        let mangled: Vec<String> = quals.iter().map(|q| mangle(q)).collect();
        Self {
            module: module.into(),
            name: format!(
                "{}{}{}",
                base.shortname().name,
                SPEC_SEP,
                mangled.join(&QUAL_SEP.to_string())
            ),
        }
    }

    /// Strips the specialization suffix, if any.
    pub fn shortname(&self) -> Name {
        match self.name.split_once(SPEC_SEP) {
            Some((short, _)) => Name::new(self.module.clone(), short),
            None => self.clone(),
        }
    }

    pub fn is_specialized(&self) -> bool {
        self.name.contains(SPEC_SEP)
    }

    pub fn is_module(&self) -> bool {
        self.module.is_empty()
    }
}

fn mangle(qual: &str) -> String {
    qual.replace(MODULE_SEP, "|")
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}{}{}", self.module, MODULE_SEP, self.name)
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self> {
        Self::parse(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_qualified() {
        let name = Name::parse("std::str").unwrap();
        assert_eq!(name.module, "std");
        assert_eq!(name.name, "str");
        assert_eq!(name.to_string(), "std::str");
    }

    #[test]
    fn parse_rejects_unqualified() {
        assert!(Name::parse("str").is_err());
        assert!(Name::parse("::str").is_err());
        assert!(Name::parse("std::").is_err());
    }

    #[test]
    fn specialization_round_trip() {
        let base = Name::parse("std::exclusive").unwrap();
        let derived = Name::specialized("default", &base, &["default::User"]);
        assert_eq!(derived.name, "exclusive@@default|User");
        assert!(derived.is_specialized());
        assert_eq!(derived.shortname(), Name::new("default", "exclusive"));
    }

    #[test]
    fn specialization_is_injective() {
        let base = Name::parse("std::exclusive").unwrap();
        let a = Name::specialized("m", &base, &["m::A", "m::B"]);
        let b = Name::specialized("m", &base, &["m::A::m::B"]);
        assert_ne!(a, b);
    }

    #[test]
    fn module_names() {
        let m = Name::for_module("default");
        assert!(m.is_module());
        assert_eq!(m.to_string(), "default");
    }
}
