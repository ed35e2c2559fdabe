pub mod bridge;
pub mod constraint;
pub mod engine;
pub mod substitution;
pub mod term;
pub mod tracer;

pub use bridge::{overload_constraint, term_for_type, type_for_term};
pub use constraint::{Candidate, Constraint, ConstraintAction, may_unify};
pub use engine::{Kind, TermActions, UnifyError, VarAction, kind_of, unify};
pub use substitution::Substitution;
pub use term::{Sequence, Term, TermPair, TermStore, Variable};
pub use tracer::{LogTracer, NullTracer, Tracer};
