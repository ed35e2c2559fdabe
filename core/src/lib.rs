//! Core of the Morel type system: hash-consed types, Hindley-Milner
//! inference machinery, and a Martelli-Montanari unifier with
//! overload-resolution constraints.
//!
//! The crate has three layers, leaves first:
//!
//! - [`types`]: structural [`types::Key`]s, the arena-backed
//!   [`types::TypeSystem`] interner, and the simple [`types::unify_with`]
//!   matcher;
//! - [`unify`]: terms, substitutions, the queue-driven unifier and its
//!   overload constraint engine;
//! - the bridge in [`unify::bridge`] that flattens types to terms and maps
//!   solved terms back.
//!
//! Parser, evaluator, pretty-printer and REPL are external collaborators;
//! they only see the interner's factory surface and the `unify` entry
//! point.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod types;
pub mod unify;

pub use types::{
    Binding, BindingKind, DataType, DataTypeDef, Field, Key, Primitive, Type, TypeError,
    TypeSystem, unify_with,
};
pub use unify::{
    Candidate, Constraint, LogTracer, NullTracer, Substitution, Term, TermActions, TermPair,
    TermStore, Tracer, UnifyError, Variable, overload_constraint, term_for_type, type_for_term,
    unify,
};
