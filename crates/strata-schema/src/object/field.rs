/// How an inheritable field combines with values coming from bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Adopt the nearest declared ancestor value when unset locally.
    Inherit,
    /// Boolean OR across the inheritance chain: true anywhere sticks.
    OrBool,
    /// Boolean AND across the inheritance chain: false anywhere sticks.
    AndBool,
    /// Order-preserving union of name lists, local entries first.
    UnionList,
    /// Cumulative conjunction of constraint expressions.
    AndExpr,
}

/// Static metadata for one field of a schema-object class.
///
/// The compare coefficient weighs the field in whole-object similarity
/// scoring; `None` excludes it. Ephemeral fields are engine-internal:
/// they never hash, never serialize to DDL, and never participate in
/// comparison.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub compcoef: Option<f64>,
    pub inheritable: bool,
    pub hashable: bool,
    pub ephemeral: bool,
    pub merge: MergeStrategy,
}

impl FieldSpec {
    pub const fn new(name: &'static str, compcoef: f64) -> Self {
        Self {
            name,
            compcoef: Some(compcoef),
            inheritable: true,
            hashable: true,
            ephemeral: false,
            merge: MergeStrategy::Inherit,
        }
    }

    pub const fn not_inheritable(mut self) -> Self {
        self.inheritable = false;
        self
    }

    pub const fn no_coef(mut self) -> Self {
        self.compcoef = None;
        self
    }

    pub const fn merge(mut self, merge: MergeStrategy) -> Self {
        self.merge = merge;
        self
    }

    /// Marks the field engine-internal.
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self.hashable = false;
        self.compcoef = None;
        self
    }
}
