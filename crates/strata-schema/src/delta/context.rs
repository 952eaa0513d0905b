use crate::ddl::ObjectRef;
use crate::error::Span;
use crate::name::Name;
use crate::object::ObjectKind;
use crate::schema::Schema;
use crate::{Error, Result};
use indexmap::IndexMap;

/// One enclosing object command on the apply path, giving nested
/// commands access to their referrer.
#[derive(Debug, Clone)]
pub struct ContextFrame {
    pub object: ObjectKind,
    pub classname: Name,
}

/// State threaded through command application.
///
/// Frames are pushed for the duration of each object command's innards
/// phase and popped on exit; renames performed so far are recorded so
/// sibling commands still addressing the old name are transparently
/// rewritten. The context also keeps a snapshot of the schema as it was
/// before the first command ran, for diff bookkeeping.
#[derive(Debug, Default)]
pub struct CommandContext {
    /// Declarative schema loads enforce explicit `inherited` markers.
    pub declarative: bool,
    pub default_module: Option<String>,
    pub modaliases: IndexMap<String, String>,
    frames: Vec<ContextFrame>,
    pub(crate) renames: IndexMap<Name, Name>,
    snapshot: Option<Schema>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declarative() -> Self {
        Self {
            declarative: true,
            ..Self::default()
        }
    }

    pub fn with_default_module(mut self, module: impl Into<String>) -> Self {
        self.default_module = Some(module.into());
        self
    }

    pub fn with_module_alias(
        mut self,
        alias: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        self.modaliases.insert(alias.into(), module.into());
        self
    }

    /// Resolves a surface reference to a qualified name, applying module
    /// aliases and the default module.
    pub fn resolve_ref(&self, object_ref: &ObjectRef, span: Option<Span>) -> Result<Name> {
        let module = match &object_ref.module {
            Some(module) => self
                .modaliases
                .get(module)
                .cloned()
                .unwrap_or_else(|| module.clone()),
            None => self.default_module.clone().ok_or_else(|| {
                Error::name(format!(
                    "unqualified name '{}' and no default module set",
                    object_ref.name
                ))
                .with_span(span)
            })?,
        };
        Ok(Name::new(module, object_ref.name.clone()))
    }

    pub(crate) fn push_frame(&mut self, frame: ContextFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// The innermost enclosing object command, if any.
    pub fn referrer(&self) -> Option<&ContextFrame> {
        self.frames.last()
    }

    /// The schema as it was before the first command of this context
    /// was applied.
    pub fn snapshot(&self) -> Option<&Schema> {
        self.snapshot.as_ref()
    }

    pub(crate) fn ensure_snapshot(&mut self, schema: &Schema) {
        if self.snapshot.is_none() {
            self.snapshot = Some(schema.clone());
        }
    }

    /// The current name of an object that may have been renamed by an
    /// earlier sibling command.
    pub fn renamed(&self, name: &Name) -> Option<&Name> {
        self.renames.get(name)
    }
}
