//! The command engine: a typed delta tree over schema objects.
//!
//! Commands are built either from DDL AST nodes ([`Command::from_ast`])
//! or by diffing two schemas ([`diff::delta_schemas`]); applying a
//! command tree threads the schema value through every mutation and
//! yields the updated schema. The same tree renders back to AST nodes
//! through [`Command::to_ast`], which is how a computed migration is
//! turned into DDL text by the outer layers.

mod context;
pub mod diff;

pub use context::{CommandContext, ContextFrame};
pub use diff::delta_schemas;

use crate::ddl::{AstValue, DdlNode, DdlNodeKind, ObjectRef};
use crate::error::Span;
use crate::inherit;
use crate::name::Name;
use crate::object::{Object, ObjectKind, RefDictSpec, Value};
use crate::refdict;
use crate::schema::Schema;
use crate::{Error, Result};
use indexmap::IndexMap;
use tracing::debug;

/// Where a field value recorded in a delta came from. Only explicitly
/// declared values are rendered back to DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Explicit,
    Default,
    Inherited,
}

/// A single field change, including the previous value when the change
/// was computed by a diff.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterField {
    pub field: String,
    pub old_value: Option<Value>,
    /// `None` resets the field to its unset state.
    pub new_value: Option<Value>,
    pub source: FieldSource,
    pub span: Option<Span>,
}

impl AlterField {
    pub fn set(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            old_value: None,
            new_value: Some(value),
            source: FieldSource::Explicit,
            span: None,
        }
    }

    pub fn reset(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            old_value: None,
            new_value: None,
            source: FieldSource::Explicit,
            span: None,
        }
    }
}

/// A create, alter, or drop of one schema object, with its field
/// changes and nested sub-commands in `ops`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCommand {
    pub object: ObjectKind,
    pub classname: Name,
    pub ops: Vec<Command>,
    pub span: Option<Span>,
}

impl ObjectCommand {
    pub fn new(object: ObjectKind, classname: Name) -> Self {
        Self {
            object,
            classname,
            ops: Vec::new(),
            span: None,
        }
    }

    pub fn with(mut self, op: Command) -> Self {
        self.ops.push(op);
        self
    }

    fn set_fields(&self) -> impl Iterator<Item = &AlterField> {
        self.ops.iter().filter_map(|op| match op {
            Command::SetField(field) => Some(field),
            _ => None,
        })
    }

    /// Nested object commands, excluding field changes and the
    /// rename/rebase phases which the parent applies itself.
    fn nested(&self) -> impl Iterator<Item = &Command> {
        self.ops.iter().filter(|op| {
            matches!(
                op,
                Command::Group(_) | Command::Create(_) | Command::Alter(_) | Command::Delete(_)
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameObject {
    pub object: ObjectKind,
    pub classname: Name,
    pub new_name: Name,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebaseObject {
    pub object: ObjectKind,
    pub classname: Name,
    pub added: Vec<Name>,
    pub dropped: Vec<Name>,
    pub span: Option<Span>,
}

/// One node of a delta tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ordered composition; a whole migration is one group.
    Group(Vec<Command>),
    Create(ObjectCommand),
    Alter(ObjectCommand),
    Delete(ObjectCommand),
    Rename(RenameObject),
    Rebase(RebaseObject),
    /// Leaf change of one field of the enclosing object command.
    SetField(AlterField),
}

impl Command {
    /// Translates a DDL AST node into a command tree. Names are resolved
    /// against the context's module aliases and default module; nested
    /// nodes are addressed relative to their enclosing object.
    pub fn from_ast(node: &DdlNode, ctx: &CommandContext) -> Result<Command> {
        Self::translate(node, ctx, None)
    }

    fn translate(
        node: &DdlNode,
        ctx: &CommandContext,
        parent: Option<(ObjectKind, &Name)>,
    ) -> Result<Command> {
        match &node.kind {
            DdlNodeKind::Create {
                object,
                name,
                extends,
                commands,
            } => {
                let classname = classname_for(ctx, parent, *object, name, node.span)?;
                let mut ops = Vec::new();
                if !extends.is_empty() {
                    let bases = extends
                        .iter()
                        .map(|base| ctx.resolve_ref(base, node.span))
                        .collect::<Result<Vec<_>>>()?;
                    ops.push(Command::SetField(AlterField::set(
                        "bases",
                        Value::NameList(bases),
                    )));
                }
                for sub in commands {
                    ops.push(Self::translate(sub, ctx, Some((*object, &classname)))?);
                }
                Ok(Command::Create(ObjectCommand {
                    object: *object,
                    classname,
                    ops,
                    span: node.span,
                }))
            }
            DdlNodeKind::Alter {
                object,
                name,
                commands,
            } => {
                let classname = classname_for(ctx, parent, *object, name, node.span)?;
                let ops = commands
                    .iter()
                    .map(|sub| Self::translate(sub, ctx, Some((*object, &classname))))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Command::Alter(ObjectCommand {
                    object: *object,
                    classname,
                    ops,
                    span: node.span,
                }))
            }
            DdlNodeKind::Drop {
                object,
                name,
                commands,
            } => {
                let classname = classname_for(ctx, parent, *object, name, node.span)?;
                let ops = commands
                    .iter()
                    .map(|sub| Self::translate(sub, ctx, Some((*object, &classname))))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Command::Delete(ObjectCommand {
                    object: *object,
                    classname,
                    ops,
                    span: node.span,
                }))
            }
            DdlNodeKind::Rename { new_name } => {
                let (object, classname) = parent.ok_or_else(|| {
                    Error::internal("rename outside of an alter command".to_string())
                        .with_span(node.span)
                })?;
                Ok(Command::Rename(RenameObject {
                    object,
                    classname: classname.clone(),
                    new_name: ctx.resolve_ref(new_name, node.span)?,
                    span: node.span,
                }))
            }
            DdlNodeKind::SetField { field, value } => {
                let new_value = match value {
                    Some(value) => Some(value_from_ast(ctx, value, node.span)?),
                    None => None,
                };
                Ok(Command::SetField(AlterField {
                    field: field.clone(),
                    old_value: None,
                    new_value,
                    source: FieldSource::Explicit,
                    span: node.span,
                }))
            }
            DdlNodeKind::AlterAddExtends { bases } => {
                let (object, classname) = parent.ok_or_else(|| {
                    Error::internal("extends change outside of an alter command".to_string())
                        .with_span(node.span)
                })?;
                Ok(Command::Rebase(RebaseObject {
                    object,
                    classname: classname.clone(),
                    added: resolve_refs(ctx, bases, node.span)?,
                    dropped: Vec::new(),
                    span: node.span,
                }))
            }
            DdlNodeKind::AlterDropExtends { bases } => {
                let (object, classname) = parent.ok_or_else(|| {
                    Error::internal("extends change outside of an alter command".to_string())
                        .with_span(node.span)
                })?;
                Ok(Command::Rebase(RebaseObject {
                    object,
                    classname: classname.clone(),
                    added: Vec::new(),
                    dropped: resolve_refs(ctx, bases, node.span)?,
                    span: node.span,
                }))
            }
        }
    }

    /// Renders the command tree back to DDL AST nodes. Groups flatten;
    /// ephemeral and inherited field values are skipped; alters that
    /// carry no visible change render to nothing.
    pub fn to_ast(&self) -> Vec<DdlNode> {
        match self {
            Command::Group(ops) => ops.iter().flat_map(Command::to_ast).collect(),
            Command::Create(cmd) => {
                let mut node = DdlNode::create(cmd.object, name_to_ref(&cmd.classname));
                if let Some(span) = cmd.span {
                    node = node.with_span(span);
                }
                for field in cmd.set_fields() {
                    if field.field == "bases" {
                        if let Some(Value::NameList(bases)) = &field.new_value {
                            for base in bases {
                                node = node.extends(name_to_ref(base));
                            }
                        }
                        continue;
                    }
                    if let Some(sub) = field_to_ast(cmd.object, field) {
                        node = node.with(sub);
                    }
                }
                for sub in cmd.nested().flat_map(Command::to_ast) {
                    node = node.with(sub);
                }
                vec![node]
            }
            Command::Alter(cmd) => {
                let subs = alter_body_to_ast(cmd);
                if subs.is_empty() {
                    return Vec::new();
                }
                let mut node = DdlNode::alter(cmd.object, name_to_ref(&cmd.classname));
                if let Some(span) = cmd.span {
                    node = node.with_span(span);
                }
                for sub in subs {
                    node = node.with(sub);
                }
                vec![node]
            }
            Command::Delete(cmd) => {
                let mut node = DdlNode::drop(cmd.object, name_to_ref(&cmd.classname));
                if let Some(span) = cmd.span {
                    node = node.with_span(span);
                }
                for sub in cmd.nested().flat_map(Command::to_ast) {
                    node = node.with(sub);
                }
                vec![node]
            }
            // A bare rename or rebase renders as an alter wrapping it.
            Command::Rename(rename) => {
                vec![DdlNode::alter(rename.object, name_to_ref(&rename.classname))
                    .with(DdlNode::rename(name_to_ref(&rename.new_name)))]
            }
            Command::Rebase(rebase) => {
                let mut node = DdlNode::alter(rebase.object, name_to_ref(&rebase.classname));
                for sub in rebase_to_ast(rebase) {
                    node = node.with(sub);
                }
                vec![node]
            }
            Command::SetField(_) => Vec::new(),
        }
    }

    /// Applies the command to `schema`, returning the updated schema.
    pub fn apply(&self, schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
        ctx.ensure_snapshot(&schema);
        match self {
            Command::Group(ops) => apply_all(ops, schema, ctx),
            Command::Create(cmd) => apply_create(cmd, schema, ctx),
            Command::Alter(cmd) => apply_alter(cmd, schema, ctx),
            Command::Delete(cmd) => apply_delete(cmd, schema, ctx),
            Command::Rename(rename) => {
                let current = ctx
                    .renamed(&rename.classname)
                    .cloned()
                    .unwrap_or_else(|| rename.classname.clone());
                rename_object(schema, ctx, &current, &rename.new_name)
            }
            Command::Rebase(rebase) => {
                let current = ctx
                    .renamed(&rebase.classname)
                    .cloned()
                    .unwrap_or_else(|| rebase.classname.clone());
                apply_rebase(schema, ctx, &current, &rebase.added, &rebase.dropped, rebase.span)
            }
            Command::SetField(field) => Err(Error::internal(format!(
                "field change '{}' outside of an object command",
                field.field
            ))
            .with_span(field.span)),
        }
    }

    /// Rewrites object names through the renames performed by earlier
    /// sibling commands.
    fn apply_renames(&mut self, renames: &IndexMap<Name, Name>) {
        if renames.is_empty() {
            return;
        }
        match self {
            Command::Group(ops) => {
                for op in ops {
                    op.apply_renames(renames);
                }
            }
            Command::Create(cmd) | Command::Alter(cmd) | Command::Delete(cmd) => {
                if let Some(new) = renames.get(&cmd.classname) {
                    cmd.classname = new.clone();
                }
                for op in &mut cmd.ops {
                    op.apply_renames(renames);
                }
            }
            Command::Rename(rename) => {
                if let Some(new) = renames.get(&rename.classname) {
                    rename.classname = new.clone();
                }
            }
            Command::Rebase(rebase) => {
                if let Some(new) = renames.get(&rebase.classname) {
                    rebase.classname = new.clone();
                }
                for base in rebase.added.iter_mut().chain(rebase.dropped.iter_mut()) {
                    if let Some(new) = renames.get(base) {
                        *base = new.clone();
                    }
                }
            }
            Command::SetField(field) => {
                for value in field.new_value.iter_mut() {
                    rewrite_value(value, renames);
                }
            }
        }
    }
}

fn rewrite_value(value: &mut Value, renames: &IndexMap<Name, Name>) {
    match value {
        Value::Name(name) => {
            if let Some(new) = renames.get(name) {
                *name = new.clone();
            }
        }
        Value::NameList(names) => {
            for name in names {
                if let Some(new) = renames.get(name) {
                    *name = new.clone();
                }
            }
        }
        _ => {}
    }
}

/// Resolves the command-tree name of an object: module objects are
/// addressed bare; children of an object with a matching refdict are
/// addressed by short name relative to the owner's module.
fn classname_for(
    ctx: &CommandContext,
    parent: Option<(ObjectKind, &Name)>,
    object: ObjectKind,
    name: &ObjectRef,
    span: Option<Span>,
) -> Result<Name> {
    if object == ObjectKind::Module {
        return Ok(Name::for_module(name.name.clone()));
    }
    match parent {
        Some((parent_kind, parent_name))
            if parent_kind.class().refdict_for(object).is_some() =>
        {
            Ok(Name::new(parent_name.module.clone(), name.name.clone()))
        }
        _ => ctx.resolve_ref(name, span),
    }
}

fn resolve_refs(
    ctx: &CommandContext,
    refs: &[ObjectRef],
    span: Option<Span>,
) -> Result<Vec<Name>> {
    refs.iter().map(|r| ctx.resolve_ref(r, span)).collect()
}

fn value_from_ast(ctx: &CommandContext, value: &AstValue, span: Option<Span>) -> Result<Value> {
    Ok(match value {
        AstValue::Bool(b) => Value::Bool(*b),
        AstValue::Str(s) => Value::Str(s.clone()),
        AstValue::Ref(r) => Value::Name(ctx.resolve_ref(r, span)?),
        AstValue::RefList(refs) => Value::NameList(resolve_refs(ctx, refs, span)?),
        AstValue::Expr(e) => Value::Expr(crate::object::Expr::new(e.clone())),
    })
}

fn value_to_ast(value: &Value) -> Option<AstValue> {
    match value {
        Value::Bool(b) => Some(AstValue::Bool(*b)),
        Value::Str(s) => Some(AstValue::Str(s.clone())),
        Value::Name(name) => Some(AstValue::Ref(name_to_ref(name))),
        Value::NameList(names) => Some(AstValue::RefList(names.iter().map(name_to_ref).collect())),
        Value::Expr(e) => Some(AstValue::Expr(e.as_str().to_string())),
        Value::NameSet(_) | Value::ObjectDict(_) => None,
    }
}

fn name_to_ref(name: &Name) -> ObjectRef {
    if name.module.is_empty() {
        ObjectRef::unqualified(name.name.clone())
    } else {
        ObjectRef::qualified(name.module.clone(), name.name.clone())
    }
}

fn field_to_ast(object: ObjectKind, field: &AlterField) -> Option<DdlNode> {
    if field.source == FieldSource::Inherited {
        return None;
    }
    let spec = object.class().field(&field.field)?;
    if spec.ephemeral {
        return None;
    }
    match &field.new_value {
        Some(value) => Some(DdlNode::set_field(field.field.clone(), value_to_ast(value)?)),
        None => Some(DdlNode::reset_field(field.field.clone())),
    }
}

fn rebase_to_ast(rebase: &RebaseObject) -> Vec<DdlNode> {
    let mut nodes = Vec::new();
    if !rebase.dropped.is_empty() {
        nodes.push(DdlNode::new(DdlNodeKind::AlterDropExtends {
            bases: rebase.dropped.iter().map(name_to_ref).collect(),
        }));
    }
    if !rebase.added.is_empty() {
        nodes.push(DdlNode::new(DdlNodeKind::AlterAddExtends {
            bases: rebase.added.iter().map(name_to_ref).collect(),
        }));
    }
    nodes
}

fn alter_body_to_ast(cmd: &ObjectCommand) -> Vec<DdlNode> {
    let mut subs = Vec::new();
    for op in &cmd.ops {
        match op {
            Command::Rename(rename) => {
                subs.push(DdlNode::rename(name_to_ref(&rename.new_name)));
            }
            Command::Rebase(rebase) => subs.extend(rebase_to_ast(rebase)),
            Command::SetField(field) => subs.extend(field_to_ast(cmd.object, field)),
            nested => subs.extend(nested.to_ast()),
        }
    }
    subs
}

fn apply_all(ops: &[Command], mut schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
    for op in ops {
        let mut op = op.clone();
        op.apply_renames(&ctx.renames);
        schema = op.apply(schema, ctx)?;
    }
    Ok(schema)
}

/// The owner and refdict that a nested create materializes into, taken
/// from the innermost enclosing object command.
fn member_context(
    ctx: &CommandContext,
    object: ObjectKind,
) -> Option<(Name, &'static RefDictSpec)> {
    let frame = ctx.referrer()?;
    let rd = frame.object.class().refdict_for(object)?;
    Some((frame.classname.clone(), rd))
}

/// Writes the field changes of an object command into `obj`. A
/// multi-target pointer declaration collapses to its virtual parent.
fn write_fields<'a>(
    mut schema: Schema,
    obj: &mut Object,
    fields: impl Iterator<Item = &'a AlterField>,
) -> Result<Schema> {
    for field in fields {
        match &field.new_value {
            Some(Value::NameList(targets)) if obj.kind.is_pointer() && field.field == "target" => {
                let (updated, target) = inherit::ensure_virtual_parent(schema, targets)?;
                schema = updated;
                obj.set("target", Value::Name(target))
                    .map_err(|e| e.with_span(field.span))?;
            }
            Some(value) => obj
                .set(&field.field, value.clone())
                .map_err(|e| e.with_span(field.span))?,
            None => obj.unset(&field.field),
        }
    }
    Ok(schema)
}

/// Registers `member` in both dictionaries of the owner's refdict and
/// re-propagates the owner's subtree.
fn register_member(
    mut schema: Schema,
    owner: &Name,
    rd: &'static RefDictSpec,
    member: &Name,
    declarative: bool,
) -> Result<Schema> {
    let key = member.shortname().name;
    let mut owner_obj = (**schema.get(owner)?).clone();
    for attr in [rd.local_attr, rd.attr] {
        let mut dict = owner_obj.dict_field(attr).cloned().unwrap_or_default();
        dict.insert(key.clone(), member.clone());
        owner_obj.set(attr, Value::ObjectDict(dict))?;
    }
    schema = schema.update(owner_obj)?;
    schema = refdict::merge_refdicts(schema, owner, declarative)?;
    inherit::update_descendants(schema, owner, declarative)
}

fn apply_create(cmd: &ObjectCommand, mut schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
    // Nested creates materialize as specialized members of the referrer.
    let member_of = member_context(ctx, cmd.object);
    let name = match &member_of {
        Some((owner, _)) => {
            let owner_qual = owner.to_string();
            Name::specialized(owner.module.clone(), &cmd.classname, &[&owner_qual])
        }
        None => cmd.classname.clone(),
    };
    debug!(kind = cmd.object.display(), name = %name, "create");

    let mut obj = Object::new(cmd.object, name.clone());
    if let Some((owner, rd)) = &member_of {
        obj.set(rd.backref, Value::Name(owner.clone()))?;
    }
    schema = write_fields(schema, &mut obj, cmd.set_fields())?;
    schema = schema.insert(obj).map_err(|e| e.with_span(cmd.span))?;

    ctx.push_frame(ContextFrame {
        object: cmd.object,
        classname: name.clone(),
    });
    let inner = apply_all_nested(cmd, schema, ctx);
    ctx.pop_frame();
    schema = inner?;

    schema = inherit::finalize(schema, &name, ctx.declarative).map_err(|e| e.with_span(cmd.span))?;

    // Top-level member creates carry their owner in the back reference.
    let owner = match member_of {
        Some(pair) => Some(pair),
        None => {
            let obj = schema.get(&name)?;
            obj.kind
                .backref_field()
                .and_then(|field| obj.name_field(field).cloned())
                .and_then(|owner| {
                    schema
                        .get_opt(&owner)
                        .and_then(|o| o.class().refdict_for(cmd.object))
                        .map(|rd| (owner, rd))
                })
        }
    };
    if let Some((owner, rd)) = owner {
        schema = register_member(schema, &owner, rd, &name, ctx.declarative)?;
    }
    Ok(schema)
}

fn apply_all_nested(cmd: &ObjectCommand, schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
    let nested: Vec<Command> = cmd.nested().cloned().collect();
    apply_all(&nested, schema, ctx)
}

/// Resolves the object an alter or drop addresses: nested commands look
/// the short name up in the referrer's full dictionary, top-level
/// commands go through the rename map.
fn resolve_target(schema: &Schema, ctx: &CommandContext, cmd: &ObjectCommand) -> Result<Name> {
    if let Some((owner, rd)) = member_context(ctx, cmd.object) {
        let owner_obj = schema.get(&owner)?;
        let key = &cmd.classname.name;
        return owner_obj
            .dict_field(rd.attr)
            .and_then(|dict| dict.get(key))
            .cloned()
            .ok_or_else(|| {
                Error::name(format!(
                    "{} '{}' has no {} '{}'",
                    owner_obj.kind.display(),
                    owner,
                    cmd.object.display(),
                    key
                ))
                .with_span(cmd.span)
            });
    }
    Ok(ctx
        .renamed(&cmd.classname)
        .cloned()
        .unwrap_or_else(|| cmd.classname.clone()))
}

fn apply_alter(cmd: &ObjectCommand, mut schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
    let mut name = resolve_target(&schema, ctx, cmd)?;
    debug!(kind = cmd.object.display(), name = %name, "alter");

    // Renames run first so every later phase sees the final name.
    for op in &cmd.ops {
        if let Command::Rename(rename) = op {
            schema = rename_object(schema, ctx, &name, &rename.new_name)?;
            name = rename.new_name.clone();
        }
    }

    let has_fields = cmd.set_fields().next().is_some();
    if has_fields {
        let mut obj = (**schema.get(&name)?).clone();
        schema = write_fields(schema, &mut obj, cmd.set_fields())?;
        schema = schema.update(obj)?;
    }

    for op in &cmd.ops {
        if let Command::Rebase(rebase) = op {
            schema = apply_rebase(schema, ctx, &name, &rebase.added, &rebase.dropped, rebase.span)?;
        }
    }

    ctx.push_frame(ContextFrame {
        object: cmd.object,
        classname: name.clone(),
    });
    let inner = apply_all_nested(cmd, schema, ctx);
    ctx.pop_frame();
    schema = inner?;

    schema = inherit::finalize(schema, &name, ctx.declarative).map_err(|e| e.with_span(cmd.span))?;
    inherit::update_descendants(schema, &name, ctx.declarative)
}

fn apply_rebase(
    mut schema: Schema,
    ctx: &CommandContext,
    name: &Name,
    added: &[Name],
    dropped: &[Name],
    span: Option<Span>,
) -> Result<Schema> {
    let mut obj = (**schema.get(name)?).clone();
    let mut bases: Vec<Name> = obj
        .bases()
        .iter()
        .filter(|base| !dropped.contains(base))
        .cloned()
        .collect();
    for base in added {
        if !bases.contains(base) {
            bases.push(base.clone());
        }
    }
    obj.set("bases", Value::NameList(bases))?;
    schema = schema.update(obj)?;
    schema = inherit::finalize(schema, name, ctx.declarative).map_err(|e| e.with_span(span))?;
    inherit::update_descendants(schema, name, ctx.declarative)
}

/// Moves an object to a new name and repairs everything that referenced
/// the old one: field values across the whole schema, the owner's
/// dictionary keys, the specialized names of derived members of the
/// renamed object, and the rename map for later sibling commands.
fn rename_object(
    mut schema: Schema,
    ctx: &mut CommandContext,
    old: &Name,
    new: &Name,
) -> Result<Schema> {
    let kind = schema.get(old)?.kind;
    debug!(old = %old, new = %new, "rename");
    schema = schema.rename(old, new.clone())?;

    let holders: Vec<Name> = schema.objects().map(|obj| obj.name().clone()).collect();
    for holder in holders {
        let mut obj = (**schema.get(&holder)?).clone();
        obj.replace_name_refs(old, new);
        schema = schema.update(obj)?;
    }

    // Re-key the owner's dictionaries under the new short name.
    let obj = schema.get(new)?.clone();
    if let Some(backref) = kind.backref_field() {
        if let Some(owner) = obj.name_field(backref).cloned() {
            if let Some(owner_arc) = schema.get_opt(&owner).cloned() {
                if let Some(rd) = owner_arc.class().refdict_for(kind) {
                    let mut owner_obj = (*owner_arc).clone();
                    let key = new.shortname().name;
                    for attr in [rd.attr, rd.local_attr] {
                        if let Some(dict) = owner_obj.dict_field(attr) {
                            if dict.values().any(|member| member == new) {
                                let mut dict = dict.clone();
                                dict.retain(|_, member| member != new);
                                dict.insert(key.clone(), new.clone());
                                owner_obj.set(attr, Value::ObjectDict(dict))?;
                            }
                        }
                    }
                    schema = schema.update(owner_obj)?;
                }
            }
        }
    }

    ctx.renames.insert(old.clone(), new.clone());

    // Derived members embed the owner's name in their specialization
    // suffix; re-derive their names.
    let members: Vec<Name> = schema
        .objects()
        .filter(|obj| obj.name().is_specialized())
        .filter(|obj| {
            obj.kind
                .backref_field()
                .and_then(|field| obj.name_field(field))
                == Some(new)
        })
        .map(|obj| obj.name().clone())
        .collect();
    for member in members {
        let owner_qual = new.to_string();
        let fresh = Name::specialized(new.module.clone(), &member, &[&owner_qual]);
        if fresh != member {
            schema = rename_object(schema, ctx, &member, &fresh)?;
        }
    }

    inherit::update_descendants(schema, new, ctx.declarative)
}

fn apply_delete(cmd: &ObjectCommand, mut schema: Schema, ctx: &mut CommandContext) -> Result<Schema> {
    let name = resolve_target(&schema, ctx, cmd)?;
    debug!(kind = cmd.object.display(), name = %name, "delete");

    ctx.push_frame(ContextFrame {
        object: cmd.object,
        classname: name.clone(),
    });
    let inner = apply_all_nested(cmd, schema, ctx);
    ctx.pop_frame();
    schema = inner?;

    delete_object(schema, &name, ctx.declarative)
}

/// Deletes an object along with everything that only exists because of
/// it: derived copies on descendants, its own local refdict members, and
/// the per-owner materializations of those members.
fn delete_object(mut schema: Schema, name: &Name, declarative: bool) -> Result<Schema> {
    // Derived copies inherit from this object; their bases would dangle.
    let derived: Vec<Name> = schema
        .children(name)
        .into_iter()
        .filter(|child| {
            schema
                .get_opt(child)
                .map(|obj| obj.is_derived())
                .unwrap_or(false)
        })
        .collect();
    for child in derived {
        if schema.contains(&child) {
            schema = delete_object(schema, &child, declarative)?;
        }
    }

    let obj = schema.get(name)?.clone();
    let mut victims: Vec<Name> = Vec::new();
    for rd in obj.class().refdicts {
        if let Some(local) = obj.dict_field(rd.local_attr) {
            victims.extend(local.values().cloned());
        }
        if let Some(all) = obj.dict_field(rd.attr) {
            for member in all.values() {
                if let Some(member_obj) = schema.get_opt(member) {
                    let owned_here = member_obj
                        .kind
                        .backref_field()
                        .and_then(|field| member_obj.name_field(field))
                        == Some(name);
                    if member_obj.is_derived() && owned_here {
                        victims.push(member.clone());
                    }
                }
            }
        }
    }
    for victim in victims {
        if &victim != name && schema.contains(&victim) {
            schema = delete_object(schema, &victim, declarative)?;
        }
    }

    // Surviving children drop this object from their base lists.
    for child in schema.children(name) {
        let mut child_obj = (**schema.get(&child)?).clone();
        let bases: Vec<Name> = child_obj
            .bases()
            .iter()
            .filter(|base| *base != name)
            .cloned()
            .collect();
        child_obj.set("bases", Value::NameList(bases))?;
        schema = schema.update(child_obj)?;
    }

    // Unregister from the owner's dictionaries.
    let obj = schema.get(name)?.clone();
    let mut owner_to_refresh: Option<Name> = None;
    if let Some(backref) = obj.kind.backref_field() {
        if let Some(owner) = obj.name_field(backref).cloned() {
            if let Some(owner_arc) = schema.get_opt(&owner).cloned() {
                if let Some(rd) = owner_arc.class().refdict_for(obj.kind) {
                    let mut owner_obj = (*owner_arc).clone();
                    for attr in [rd.attr, rd.local_attr] {
                        if let Some(dict) = owner_obj.dict_field(attr) {
                            let mut dict = dict.clone();
                            let before = dict.len();
                            dict.retain(|_, member| member != name);
                            if dict.len() != before {
                                owner_obj.set(attr, Value::ObjectDict(dict))?;
                            }
                        }
                    }
                    schema = schema.update(owner_obj)?;
                    owner_to_refresh = Some(owner);
                }
            }
        }
    }

    schema = schema.delete(name)?;
    if let Some(owner) = owner_to_refresh {
        if schema.contains(&owner) {
            schema = inherit::update_descendants(schema, &owner, declarative)?;
        }
    }
    Ok(schema)
}
