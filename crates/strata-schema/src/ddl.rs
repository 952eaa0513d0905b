//! The DDL abstract syntax tree, as produced by the external
//! query-language parser.
//!
//! This module is a boundary contract: the engine consumes these nodes
//! through [`crate::delta::Command::from_ast`] and reproduces them
//! through [`crate::delta::Command::to_ast`]. Nothing here parses text.

use crate::error::Span;
use crate::object::ObjectKind;

/// A possibly module-qualified object reference as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub module: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
        }
    }
}

/// A literal or reference value carried by a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum AstValue {
    Bool(bool),
    Str(String),
    Ref(ObjectRef),
    RefList(Vec<ObjectRef>),
    /// An unevaluated expression in the query language.
    Expr(String),
}

/// One DDL statement or sub-clause.
#[derive(Debug, Clone, PartialEq)]
pub struct DdlNode {
    pub kind: DdlNodeKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DdlNodeKind {
    Create {
        object: ObjectKind,
        name: ObjectRef,
        extends: Vec<ObjectRef>,
        commands: Vec<DdlNode>,
    },
    Alter {
        object: ObjectKind,
        name: ObjectRef,
        commands: Vec<DdlNode>,
    },
    Drop {
        object: ObjectKind,
        name: ObjectRef,
        commands: Vec<DdlNode>,
    },
    /// Only valid nested in an `Alter`.
    Rename { new_name: ObjectRef },
    /// `SET field := value`; a missing value resets the field.
    SetField {
        field: String,
        value: Option<AstValue>,
    },
    /// `EXTENDS` list additions, nested in an `Alter`.
    AlterAddExtends { bases: Vec<ObjectRef> },
    /// `EXTENDS` list removals, nested in an `Alter`.
    AlterDropExtends { bases: Vec<ObjectRef> },
}

impl DdlNode {
    pub fn new(kind: DdlNodeKind) -> Self {
        Self { kind, span: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn create(object: ObjectKind, name: ObjectRef) -> Self {
        Self::new(DdlNodeKind::Create {
            object,
            name,
            extends: Vec::new(),
            commands: Vec::new(),
        })
    }

    pub fn alter(object: ObjectKind, name: ObjectRef) -> Self {
        Self::new(DdlNodeKind::Alter {
            object,
            name,
            commands: Vec::new(),
        })
    }

    pub fn drop(object: ObjectKind, name: ObjectRef) -> Self {
        Self::new(DdlNodeKind::Drop {
            object,
            name,
            commands: Vec::new(),
        })
    }

    pub fn rename(new_name: ObjectRef) -> Self {
        Self::new(DdlNodeKind::Rename { new_name })
    }

    pub fn set_field(field: impl Into<String>, value: AstValue) -> Self {
        Self::new(DdlNodeKind::SetField {
            field: field.into(),
            value: Some(value),
        })
    }

    pub fn reset_field(field: impl Into<String>) -> Self {
        Self::new(DdlNodeKind::SetField {
            field: field.into(),
            value: None,
        })
    }

    /// Appends an `EXTENDS` entry; only meaningful on a `Create`.
    pub fn extends(mut self, base: ObjectRef) -> Self {
        if let DdlNodeKind::Create { extends, .. } = &mut self.kind {
            extends.push(base);
        }
        self
    }

    /// Appends a nested sub-command.
    pub fn with(mut self, command: DdlNode) -> Self {
        match &mut self.kind {
            DdlNodeKind::Create { commands, .. }
            | DdlNodeKind::Alter { commands, .. }
            | DdlNodeKind::Drop { commands, .. } => commands.push(command),
            _ => {}
        }
        self
    }
}
