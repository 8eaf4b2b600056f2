//! Logical query plan handed to the engine by an external parser/planner.
//!
//! Every structure here is serde-serializable so plans can be stored as JSON
//! or TOML next to the CSV relations they run against. Column references use
//! the compact string form `relation.column` (or just `column`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::value::Value;

/// Possibly-qualified reference to a column, e.g. `student.ID`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnRef {
    /// Relation name or alias, if the reference was qualified.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// Unqualified reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Reference qualified by a relation name or alias.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Parses `qualifier.name` or `name`.
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((qualifier, name)) => Self::qualified(qualifier.trim(), name.trim()),
            None => Self::new(text.trim()),
        }
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::parse(&value)
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::parse(value)
    }
}

impl From<ColumnRef> for String {
    fn from(value: ColumnRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        })
    }
}

/// Operand of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Column of the input tuple.
    Column(ColumnRef),
    /// Constant value.
    Literal(Value),
}

impl Operand {
    /// Column operand from `qualifier.name` text.
    pub fn col(text: &str) -> Self {
        Operand::Column(ColumnRef::parse(text))
    }

    /// Literal operand.
    pub fn lit(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(c) => write!(f, "{c}"),
            Operand::Literal(Value::String(s)) => write!(f, "'{s}'"),
            Operand::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// Boolean expression used by ON clauses and WHERE filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Constant TRUE or FALSE.
    Constant(bool),
    /// Binary comparison.
    Compare {
        /// Operator.
        op: CmpOp,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// `operand IS NULL`.
    IsNull(Operand),
    /// `operand IS NOT NULL`.
    IsNotNull(Operand),
    /// Conjunction of every child.
    And(Vec<Predicate>),
    /// Disjunction of every child.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Builds `left op right`.
    pub fn compare(op: CmpOp, left: Operand, right: Operand) -> Self {
        Predicate::Compare { op, left, right }
    }

    /// Column-to-column equality, the common ON-clause form.
    pub fn columns_eq(left: &str, right: &str) -> Self {
        Self::compare(CmpOp::Eq, Operand::col(left), Operand::col(right))
    }

    /// Column-to-literal equality.
    pub fn column_eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(CmpOp::Eq, Operand::col(column), Operand::lit(value))
    }

    /// `column IS NULL`.
    pub fn is_null(column: &str) -> Self {
        Predicate::IsNull(Operand::col(column))
    }

    /// `column IS NOT NULL`.
    pub fn is_not_null(column: &str) -> Self {
        Predicate::IsNotNull(Operand::col(column))
    }

    /// Conjunction of `self` and `other`, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Disjunction of `self` and `other`, flattening nested disjunctions.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut children) => {
                children.push(other);
                Predicate::Or(children)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    /// Negation of `self`.
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (idx, child) in children.iter().enumerate() {
                if idx > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }
        match self {
            Predicate::Constant(true) => f.write_str("TRUE"),
            Predicate::Constant(false) => f.write_str("FALSE"),
            Predicate::Compare { op, left, right } => write!(f, "{left} {op} {right}"),
            Predicate::IsNull(operand) => write!(f, "{operand} IS NULL"),
            Predicate::IsNotNull(operand) => write!(f, "{operand} IS NOT NULL"),
            Predicate::And(children) => join(f, children, " AND "),
            Predicate::Or(children) => join(f, children, " OR "),
            Predicate::Not(child) => write!(f, "NOT {child}"),
        }
    }
}

/// Which unmatched tuples a join preserves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Only matched pairs.
    #[default]
    Inner,
    /// Matched pairs plus unmatched left tuples.
    LeftOuter,
    /// Matched pairs plus unmatched right tuples. Output follows right-input order.
    RightOuter,
    /// Matched pairs plus unmatched tuples from both sides.
    FullOuter,
}

impl JoinKind {
    /// Whether unmatched left tuples are emitted.
    pub fn preserves_left(self) -> bool {
        matches!(self, JoinKind::LeftOuter | JoinKind::FullOuter)
    }

    /// Whether unmatched right tuples are emitted.
    pub fn preserves_right(self) -> bool {
        matches!(self, JoinKind::RightOuter | JoinKind::FullOuter)
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Inner => "inner",
            JoinKind::LeftOuter => "left outer",
            JoinKind::RightOuter => "right outer",
            JoinKind::FullOuter => "full outer",
        })
    }
}

/// How tuple pairs are matched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCondition {
    /// Equality on every column name shared by both inputs.
    Natural,
    /// Equality on the listed column names.
    Using(Vec<String>),
    /// Arbitrary predicate over the combined tuple.
    On(Predicate),
    /// Every pair matches (comma join in a FROM list).
    Cross,
}

/// Join kind plus match condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Which unmatched tuples survive.
    #[serde(default)]
    pub kind: JoinKind,
    /// How pairs are matched.
    pub condition: JoinCondition,
}

impl JoinSpec {
    /// Creates a join specification.
    pub fn new(kind: JoinKind, condition: JoinCondition) -> Self {
        Self { kind, condition }
    }

    /// `NATURAL [kind] JOIN`.
    pub fn natural(kind: JoinKind) -> Self {
        Self::new(kind, JoinCondition::Natural)
    }

    /// `[kind] JOIN ... USING (columns)`.
    pub fn using<I, S>(kind: JoinKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            kind,
            JoinCondition::Using(columns.into_iter().map(Into::into).collect()),
        )
    }

    /// `[kind] JOIN ... ON predicate`.
    pub fn on(kind: JoinKind, predicate: Predicate) -> Self {
        Self::new(kind, JoinCondition::On(predicate))
    }

    /// `CROSS JOIN`.
    pub fn cross() -> Self {
        Self::new(JoinKind::Inner, JoinCondition::Cross)
    }
}

/// Node of the FROM tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanNode {
    /// Reads a relation from the provider, optionally under an alias.
    Scan {
        /// Relation name known to the provider.
        relation: String,
        /// Alias that qualifies the relation's columns instead of its name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    /// Joins two sub-trees.
    Join {
        /// Left (outer) input.
        left: Box<PlanNode>,
        /// Right (inner) input.
        right: Box<PlanNode>,
        /// Join kind and condition.
        spec: JoinSpec,
    },
}

impl PlanNode {
    /// Scan of `relation` under its own name.
    pub fn scan(relation: impl Into<String>) -> Self {
        PlanNode::Scan {
            relation: relation.into(),
            alias: None,
        }
    }

    /// Scan of `relation` under `alias`.
    pub fn scan_as(relation: impl Into<String>, alias: impl Into<String>) -> Self {
        PlanNode::Scan {
            relation: relation.into(),
            alias: Some(alias.into()),
        }
    }

    /// Joins `self` (left) with `right`.
    pub fn join(self, right: PlanNode, spec: JoinSpec) -> Self {
        PlanNode::Join {
            left: Box::new(self),
            right: Box::new(right),
            spec,
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::Scan {
                relation,
                alias: Some(alias),
            } => write!(f, "{relation} AS {alias}"),
            PlanNode::Scan { relation, .. } => f.write_str(relation),
            PlanNode::Join { left, right, spec } => match &spec.condition {
                JoinCondition::Natural => {
                    write!(f, "({left} NATURAL {} JOIN {right})", spec.kind)
                }
                JoinCondition::Using(cols) => write!(
                    f,
                    "({left} {} JOIN {right} USING ({}))",
                    spec.kind,
                    cols.join(", ")
                ),
                JoinCondition::On(pred) => {
                    write!(f, "({left} {} JOIN {right} ON {pred})", spec.kind)
                }
                JoinCondition::Cross => write!(f, "({left} CROSS JOIN {right})"),
            },
        }
    }
}

/// Entry of the select list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectItem {
    /// `*`: every column of the joined relation.
    Wildcard,
    /// A single column, optionally renamed.
    Column {
        /// Column to project.
        column: ColumnRef,
        /// Output name; defaults to the column's own name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

/// ORDER BY key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderKey {
    /// Column to sort on.
    pub column: ColumnRef,
    /// Sort descending instead of ascending. NULLs sort last either way.
    #[serde(default)]
    pub descending: bool,
}

/// Complete logical query: FROM tree, WHERE, ORDER BY, and select list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// FROM tree.
    pub from: PlanNode,
    /// WHERE predicate; rows are admitted only when it evaluates to TRUE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
    /// Select list; empty means `*`.
    #[serde(default)]
    pub select: Vec<SelectItem>,
    /// ORDER BY keys; empty keeps join enumeration order.
    #[serde(default)]
    pub order_by: Vec<OrderKey>,
}
