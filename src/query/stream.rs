//! Pull-based tuple streams shared by the join evaluator and the executor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::query::errors::{QueryError, Result};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::relation::{Relation, Tuple};

pub(crate) trait TupleStream: Send {
    fn try_next(&mut self) -> Result<Option<Tuple>>;
}

pub(crate) type BoxTupleStream = Box<dyn TupleStream>;

/// Cooperative cancellation flag, checked between units of work.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken(Option<Arc<AtomicBool>>);

impl CancelToken {
    pub(crate) fn new(flag: Option<Arc<AtomicBool>>) -> Self {
        Self(flag)
    }

    pub(crate) fn check(&self) -> Result<()> {
        match &self.0 {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(QueryError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Reads an `Arc` snapshot of a relation from top to bottom.
pub(crate) struct ScanStream {
    relation: Arc<Relation>,
    pos: usize,
}

impl ScanStream {
    pub(crate) fn new(relation: Arc<Relation>) -> Self {
        Self { relation, pos: 0 }
    }
}

impl TupleStream for ScanStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        let timer = profile_timer();
        let next = self.relation.tuples().get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        record_profile_timer(QueryProfileKind::Scan, timer);
        Ok(next)
    }
}

/// Owned tuples, emitted in order.
#[cfg(test)]
pub(crate) struct VecStream {
    tuples: std::vec::IntoIter<Tuple>,
}

#[cfg(test)]
impl VecStream {
    pub(crate) fn new(tuples: Vec<Tuple>) -> Self {
        Self {
            tuples: tuples.into_iter(),
        }
    }
}

#[cfg(test)]
impl TupleStream for VecStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        Ok(self.tuples.next())
    }
}

pub(crate) fn collect_tuples(stream: &mut dyn TupleStream) -> Result<Vec<Tuple>> {
    let mut tuples = Vec::new();
    while let Some(tuple) = stream.try_next()? {
        tuples.push(tuple);
    }
    Ok(tuples)
}
