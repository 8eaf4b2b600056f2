//! Predicate binding and three-valued evaluation.
//!
//! A [`Predicate`] names columns; before any row is evaluated it is bound to a
//! concrete [`Schema`], which resolves every reference to a position and checks
//! that compared operands share a domain. Binding failures
//! ([`QueryError::MissingColumn`], [`QueryError::AmbiguousColumn`],
//! [`QueryError::TypeMismatch`]) therefore surface once per query, before the
//! first tuple is read, regardless of how many rows the inputs hold.

use std::cmp::Ordering;

use crate::query::ast::{CmpOp, Operand, Predicate};
use crate::query::errors::{QueryError, Result};
use crate::query::relation::Tuple;
use crate::query::schema::{DataType, Schema};
use crate::query::truth::Truth;
use crate::query::value::Value;

/// Positional access to the values of a (possibly virtual) tuple.
pub(crate) trait RowAccess {
    fn value(&self, idx: usize) -> &Value;
}

impl RowAccess for [Value] {
    fn value(&self, idx: usize) -> &Value {
        &self[idx]
    }
}

/// Left tuple followed by right tuple, without materializing the concatenation.
pub(crate) struct PairView<'a> {
    pub(crate) left: &'a [Value],
    pub(crate) right: &'a [Value],
}

impl RowAccess for PairView<'_> {
    fn value(&self, idx: usize) -> &Value {
        if idx < self.left.len() {
            &self.left[idx]
        } else {
            &self.right[idx - self.left.len()]
        }
    }
}

/// Operand with its column reference resolved to a position.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundOperand {
    /// Column at this position of the input tuple.
    Column(usize),
    /// Constant value.
    Literal(Value),
}

impl BoundOperand {
    fn get<'a, R: RowAccess + ?Sized>(&'a self, row: &'a R) -> &'a Value {
        match self {
            BoundOperand::Column(idx) => row.value(*idx),
            BoundOperand::Literal(value) => value,
        }
    }
}

/// Predicate bound to a schema, ready for per-row evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundPredicate {
    /// Constant result.
    Constant(Truth),
    /// Comparison between two operands.
    Compare {
        /// Operator.
        op: CmpOp,
        /// Left operand.
        left: BoundOperand,
        /// Right operand.
        right: BoundOperand,
    },
    /// `IS NULL`.
    IsNull(BoundOperand),
    /// `IS NOT NULL`.
    IsNotNull(BoundOperand),
    /// Conjunction.
    And(Vec<BoundPredicate>),
    /// Disjunction.
    Or(Vec<BoundPredicate>),
    /// Negation.
    Not(Box<BoundPredicate>),
}

/// Resolves `predicate` against `schema`.
pub fn bind(predicate: &Predicate, schema: &Schema, context: &'static str) -> Result<BoundPredicate> {
    Ok(match predicate {
        Predicate::Constant(value) => BoundPredicate::Constant(Truth::from(*value)),
        Predicate::Compare { op, left, right } => {
            let (left, left_ty) = bind_operand(left, schema, context)?;
            let (right, right_ty) = bind_operand(right, schema, context)?;
            if let (Some(l), Some(r)) = (left_ty, right_ty) {
                if !l.comparable_with(r) {
                    return Err(QueryError::TypeMismatch {
                        left: l,
                        right: r,
                        context,
                    });
                }
            }
            BoundPredicate::Compare {
                op: *op,
                left,
                right,
            }
        }
        Predicate::IsNull(operand) => BoundPredicate::IsNull(bind_operand(operand, schema, context)?.0),
        Predicate::IsNotNull(operand) => {
            BoundPredicate::IsNotNull(bind_operand(operand, schema, context)?.0)
        }
        Predicate::And(children) => BoundPredicate::And(
            children
                .iter()
                .map(|child| bind(child, schema, context))
                .collect::<Result<_>>()?,
        ),
        Predicate::Or(children) => BoundPredicate::Or(
            children
                .iter()
                .map(|child| bind(child, schema, context))
                .collect::<Result<_>>()?,
        ),
        Predicate::Not(child) => BoundPredicate::Not(Box::new(bind(child, schema, context)?)),
    })
}

fn bind_operand(
    operand: &Operand,
    schema: &Schema,
    context: &'static str,
) -> Result<(BoundOperand, Option<DataType>)> {
    match operand {
        Operand::Column(reference) => {
            let idx = schema.resolve(reference, context)?;
            Ok((BoundOperand::Column(idx), Some(schema.column(idx).data_type)))
        }
        Operand::Literal(value) => Ok((BoundOperand::Literal(value.clone()), value.data_type())),
    }
}

/// Binds and evaluates `predicate` for a single tuple of `schema`.
pub fn evaluate(predicate: &Predicate, schema: &Schema, tuple: &Tuple) -> Result<Truth> {
    bind(predicate, schema, "predicate")?.evaluate(tuple.as_slice())
}

impl BoundPredicate {
    /// Evaluates the predicate for one row.
    ///
    /// `AND` stops at the first FALSE child and `OR` at the first TRUE child;
    /// otherwise UNKNOWN propagates per Kleene logic.
    pub(crate) fn evaluate<R: RowAccess + ?Sized>(&self, row: &R) -> Result<Truth> {
        match self {
            BoundPredicate::Constant(truth) => Ok(*truth),
            BoundPredicate::Compare { op, left, right } => {
                let ordering = left.get(row).sql_cmp(right.get(row), "predicate")?;
                Ok(ordering.map_or(Truth::Unknown, |ord| Truth::from(op_holds(*op, ord))))
            }
            BoundPredicate::IsNull(operand) => Ok(Truth::from(operand.get(row).is_null())),
            BoundPredicate::IsNotNull(operand) => Ok(Truth::from(!operand.get(row).is_null())),
            BoundPredicate::And(children) => {
                let mut acc = Truth::True;
                for child in children {
                    let truth = child.evaluate(row)?;
                    if truth == Truth::False {
                        return Ok(Truth::False);
                    }
                    acc = acc.and(truth);
                }
                Ok(acc)
            }
            BoundPredicate::Or(children) => {
                let mut acc = Truth::False;
                for child in children {
                    let truth = child.evaluate(row)?;
                    if truth == Truth::True {
                        return Ok(Truth::True);
                    }
                    acc = acc.or(truth);
                }
                Ok(acc)
            }
            BoundPredicate::Not(child) => Ok(!child.evaluate(row)?),
        }
    }

    /// Evaluates the predicate against a standalone tuple.
    pub fn evaluate_tuple(&self, tuple: &[Value]) -> Result<Truth> {
        self.evaluate(tuple)
    }

    /// When the predicate is a conjunction of equalities that each pair a column
    /// of the left input (positions `< split`) with a column of the right input,
    /// returns those pairs as `(left_idx, right_idx)` with the right index
    /// rebased to the right tuple. Used to route ON joins to the hash strategy.
    pub(crate) fn equi_pairs(&self, split: usize) -> Option<Vec<(usize, usize)>> {
        let mut pairs = Vec::new();
        if self.collect_equi_pairs(split, &mut pairs) && !pairs.is_empty() {
            Some(pairs)
        } else {
            None
        }
    }

    fn collect_equi_pairs(&self, split: usize, out: &mut Vec<(usize, usize)>) -> bool {
        match self {
            BoundPredicate::Compare {
                op: CmpOp::Eq,
                left: BoundOperand::Column(a),
                right: BoundOperand::Column(b),
            } => {
                let (a, b) = (*a, *b);
                if a < split && b >= split {
                    out.push((a, b - split));
                    true
                } else if b < split && a >= split {
                    out.push((b, a - split));
                    true
                } else {
                    false
                }
            }
            BoundPredicate::And(children) => children
                .iter()
                .all(|child| child.collect_equi_pairs(split, out)),
            _ => false,
        }
    }
}

fn op_holds(op: CmpOp, ord: Ordering) -> bool {
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    }
}
