use super::field::{FieldSpec, MergeStrategy};

/// Tag identifying which kind of schema object a value or command
/// targets. Commands dispatch on this tag instead of a per-kind class
/// hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectKind {
    Module,
    ScalarType,
    ObjectType,
    Link,
    Property,
    Constraint,
    Index,
}

impl ObjectKind {
    /// Kinds in dependency order for whole-schema diffing: referenced
    /// kinds come before the kinds that reference them.
    pub const DEPENDENCY_ORDER: [ObjectKind; 7] = [
        ObjectKind::Module,
        ObjectKind::ScalarType,
        ObjectKind::ObjectType,
        ObjectKind::Link,
        ObjectKind::Property,
        ObjectKind::Constraint,
        ObjectKind::Index,
    ];

    pub fn class(self) -> &'static ObjectClass {
        match self {
            ObjectKind::Module => &MODULE,
            ObjectKind::ScalarType => &SCALAR_TYPE,
            ObjectKind::ObjectType => &OBJECT_TYPE,
            ObjectKind::Link => &LINK,
            ObjectKind::Property => &PROPERTY,
            ObjectKind::Constraint => &CONSTRAINT,
            ObjectKind::Index => &INDEX,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            ObjectKind::Module => "module",
            ObjectKind::ScalarType => "scalar type",
            ObjectKind::ObjectType => "object type",
            ObjectKind::Link => "link",
            ObjectKind::Property => "property",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Index => "index",
        }
    }

    pub fn is_inheriting(self) -> bool {
        !matches!(self, ObjectKind::Module)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, ObjectKind::Link | ObjectKind::Property)
    }

    /// The field on objects of this kind that names the owning object,
    /// when the kind can be a reference-dictionary member.
    pub fn backref_field(self) -> Option<&'static str> {
        match self {
            ObjectKind::Link | ObjectKind::Property => Some("source"),
            ObjectKind::Constraint | ObjectKind::Index => Some("subject"),
            _ => None,
        }
    }
}

/// Declares a parent-owned collection of child schema objects.
///
/// `attr` holds the full, inheritance-merged dictionary; `local_attr`
/// only the directly declared members. Every `local_attr` entry also
/// appears in `attr`.
#[derive(Debug)]
pub struct RefDictSpec {
    pub attr: &'static str,
    pub local_attr: &'static str,
    /// Field on the member pointing back at the owner.
    pub backref: &'static str,
    pub ref_kinds: &'static [ObjectKind],
    /// Whether shadowing an inherited member demands the explicit
    /// `inherited` marker in declarative contexts.
    pub requires_explicit_inherit: bool,
}

/// Static descriptor of a schema-object class: its field-metadata table
/// and its reference dictionaries.
#[derive(Debug)]
pub struct ObjectClass {
    pub kind: ObjectKind,
    pub fields: &'static [FieldSpec],
    pub refdicts: &'static [RefDictSpec],
}

impl ObjectClass {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The refdict that members of `kind` belong to, if any.
    pub fn refdict_for(&self, kind: ObjectKind) -> Option<&'static RefDictSpec> {
        self.refdicts
            .iter()
            .find(|rd| rd.ref_kinds.contains(&kind))
    }
}

// Compare coefficients follow the reference model: names weigh 0.670 so
// that a rename still scores as a near-match, most other fields 0.909,
// pointer targets 0.833, base lists 0.714.

const NAME: FieldSpec = FieldSpec::new("name", 0.670).not_inheritable();
const TITLE: FieldSpec = FieldSpec::new("title", 0.909).not_inheritable();
const DESCRIPTION: FieldSpec = FieldSpec::new("description", 0.909).not_inheritable();

const BASES: FieldSpec = FieldSpec::new("bases", 0.714).not_inheritable();
const MRO: FieldSpec = FieldSpec::new("mro", 0.0).not_inheritable().ephemeral();
const IS_ABSTRACT: FieldSpec = FieldSpec::new("is_abstract", 0.909).not_inheritable();
const IS_FINAL: FieldSpec = FieldSpec::new("is_final", 0.909).not_inheritable();
const IS_DERIVED: FieldSpec = FieldSpec::new("is_derived", 0.0)
    .not_inheritable()
    .ephemeral();
const IS_VIRTUAL: FieldSpec = FieldSpec::new("is_virtual", 0.0)
    .not_inheritable()
    .ephemeral();
const DECLARED_INHERITED: FieldSpec = FieldSpec::new("declared_inherited", 0.0)
    .not_inheritable()
    .no_coef();

const SOURCE: FieldSpec = FieldSpec::new("source", 0.0).not_inheritable().no_coef();
const SUBJECT: FieldSpec = FieldSpec::new("subject", 0.0).not_inheritable().no_coef();
const TARGET: FieldSpec = FieldSpec::new("target", 0.833);
const REQUIRED: FieldSpec = FieldSpec::new("required", 0.909).merge(MergeStrategy::OrBool);
const READONLY: FieldSpec = FieldSpec::new("readonly", 0.909).merge(MergeStrategy::OrBool);
const DEFAULT: FieldSpec = FieldSpec::new("default", 0.909);
const EXPR: FieldSpec = FieldSpec::new("expr", 0.909).merge(MergeStrategy::AndExpr);
const DELEGATED: FieldSpec = FieldSpec::new("delegated", 0.909).not_inheritable();
const VIRTUAL_CHILDREN: FieldSpec = FieldSpec::new("_virtual_children", 0.0)
    .not_inheritable()
    .ephemeral();

// Reference-dictionary storage. Engine-maintained: the dictionaries are
// rebuilt by the refdict merge and never surface in DDL; membership
// changes show up in the diff through the members themselves.
const POINTERS: FieldSpec = FieldSpec::new("pointers", 0.0)
    .not_inheritable()
    .ephemeral();
const OWN_POINTERS: FieldSpec = FieldSpec::new("own_pointers", 0.0)
    .not_inheritable()
    .ephemeral();
const CONSTRAINTS: FieldSpec = FieldSpec::new("constraints", 0.0)
    .not_inheritable()
    .ephemeral();
const OWN_CONSTRAINTS: FieldSpec = FieldSpec::new("own_constraints", 0.0)
    .not_inheritable()
    .ephemeral();
const INDEXES: FieldSpec = FieldSpec::new("indexes", 0.0)
    .not_inheritable()
    .ephemeral();
const OWN_INDEXES: FieldSpec = FieldSpec::new("own_indexes", 0.0)
    .not_inheritable()
    .ephemeral();

static MODULE: ObjectClass = ObjectClass {
    kind: ObjectKind::Module,
    fields: &[NAME, TITLE, DESCRIPTION],
    refdicts: &[],
};

static SCALAR_TYPE: ObjectClass = ObjectClass {
    kind: ObjectKind::ScalarType,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        DEFAULT,
    ],
    refdicts: &[],
};

static OBJECT_TYPE: ObjectClass = ObjectClass {
    kind: ObjectKind::ObjectType,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        VIRTUAL_CHILDREN,
        POINTERS,
        OWN_POINTERS,
        CONSTRAINTS,
        OWN_CONSTRAINTS,
        INDEXES,
        OWN_INDEXES,
    ],
    refdicts: &[
        RefDictSpec {
            attr: "pointers",
            local_attr: "own_pointers",
            backref: "source",
            ref_kinds: &[ObjectKind::Link, ObjectKind::Property],
            requires_explicit_inherit: false,
        },
        RefDictSpec {
            attr: "constraints",
            local_attr: "own_constraints",
            backref: "subject",
            ref_kinds: &[ObjectKind::Constraint],
            requires_explicit_inherit: true,
        },
        RefDictSpec {
            attr: "indexes",
            local_attr: "own_indexes",
            backref: "subject",
            ref_kinds: &[ObjectKind::Index],
            requires_explicit_inherit: false,
        },
    ],
};

static LINK: ObjectClass = ObjectClass {
    kind: ObjectKind::Link,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        DECLARED_INHERITED,
        SOURCE,
        TARGET,
        REQUIRED,
        READONLY,
        DEFAULT,
        POINTERS,
        OWN_POINTERS,
        CONSTRAINTS,
        OWN_CONSTRAINTS,
    ],
    refdicts: &[
        RefDictSpec {
            attr: "pointers",
            local_attr: "own_pointers",
            backref: "source",
            ref_kinds: &[ObjectKind::Property],
            requires_explicit_inherit: false,
        },
        RefDictSpec {
            attr: "constraints",
            local_attr: "own_constraints",
            backref: "subject",
            ref_kinds: &[ObjectKind::Constraint],
            requires_explicit_inherit: true,
        },
    ],
};

static PROPERTY: ObjectClass = ObjectClass {
    kind: ObjectKind::Property,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        DECLARED_INHERITED,
        SOURCE,
        TARGET,
        REQUIRED,
        READONLY,
        DEFAULT,
        CONSTRAINTS,
        OWN_CONSTRAINTS,
    ],
    refdicts: &[RefDictSpec {
        attr: "constraints",
        local_attr: "own_constraints",
        backref: "subject",
        ref_kinds: &[ObjectKind::Constraint],
        requires_explicit_inherit: true,
    }],
};

static CONSTRAINT: ObjectClass = ObjectClass {
    kind: ObjectKind::Constraint,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        DECLARED_INHERITED,
        SUBJECT,
        EXPR,
        DELEGATED,
    ],
    refdicts: &[],
};

static INDEX: ObjectClass = ObjectClass {
    kind: ObjectKind::Index,
    fields: &[
        NAME,
        TITLE,
        DESCRIPTION,
        BASES,
        MRO,
        IS_ABSTRACT,
        IS_FINAL,
        IS_DERIVED,
        IS_VIRTUAL,
        DECLARED_INHERITED,
        SUBJECT,
        EXPR,
    ],
    refdicts: &[],
};
