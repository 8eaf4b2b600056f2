//! Relational join evaluation over immutable, in-memory relations.
//!
//! A [`query::Query`] names a tree of relation scans joined with NATURAL,
//! USING, ON, or cross conditions under inner, left, right, or full outer
//! semantics, followed by a WHERE predicate, ORDER BY keys, and a select list.
//! The [`query::Executor`] resolves the plan against a
//! [`query::RelationProvider`] and produces rows under SQL's three-valued
//! NULL semantics.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod query;

pub use config::EngineConfig;
