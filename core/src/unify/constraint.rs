//! Overload-resolution constraints.
//!
//! A constraint records a call site of an overloaded name: an argument
//! placeholder plus one candidate per overload instance. As unification
//! binds variables, candidates whose shape can no longer match are pruned;
//! when exactly one survives, its action fires and the constraint retires.

use core::fmt;

use crate::{Box, Vec};
use crate::unify::substitution::Substitution;
use crate::unify::term::{Term, TermStore};

/// Callback fired when a constraint narrows to a single candidate. Receives
/// the (rewritten) argument term, the surviving candidate term, and an
/// `emit` sink for new equations.
pub type ConstraintAction<'a> =
    Box<dyn FnMut(Term<'a>, Term<'a>, &mut dyn FnMut(Term<'a>, Term<'a>)) + 'a>;

pub struct Candidate<'a> {
    pub term: Term<'a>,
    pub(crate) action: ConstraintAction<'a>,
}

impl<'a> Candidate<'a> {
    pub fn new(
        term: Term<'a>,
        action: impl FnMut(Term<'a>, Term<'a>, &mut dyn FnMut(Term<'a>, Term<'a>)) + 'a,
    ) -> Self {
        Candidate {
            term,
            action: Box::new(action),
        }
    }

    /// The basic action family: emit `actual = candidate`.
    pub fn equiv(term: Term<'a>) -> Self {
        Candidate::new(term, |actual, candidate, emit| emit(actual, candidate))
    }

    /// An overloaded function site: equate the actual argument with this
    /// candidate's argument shape and the site's result variable with the
    /// candidate's result, in one step.
    pub fn overload(arg: Term<'a>, result_var: Term<'a>, result: Term<'a>) -> Self {
        Candidate::new(arg, move |actual, candidate, emit| {
            emit(actual, candidate);
            emit(result_var, result);
        })
    }
}

impl fmt::Debug for Candidate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate").field("term", &self.term).finish()
    }
}

pub struct Constraint<'a> {
    pub arg: Term<'a>,
    pub(crate) candidates: Vec<Candidate<'a>>,
}

impl<'a> Constraint<'a> {
    pub fn new(arg: Term<'a>, candidates: Vec<Candidate<'a>>) -> Self {
        assert!(!candidates.is_empty(), "constraint with no candidates");
        Constraint { arg, candidates }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Rewrites the argument and all candidates under `subst`, then prunes
    /// candidates that can no longer unify with the argument. Returns
    /// `(pruned, remaining)`.
    pub(crate) fn narrow(
        &mut self,
        store: &TermStore<'a>,
        subst: &Substitution<'a>,
    ) -> (usize, usize) {
        self.arg = subst.apply(store, self.arg);
        for candidate in &mut self.candidates {
            candidate.term = subst.apply(store, candidate.term);
        }
        let before = self.candidates.len();
        let arg = self.arg;
        self.candidates.retain(|c| may_unify(arg, c.term));
        let after = self.candidates.len();
        (before - after, after)
    }
}

impl fmt::Debug for Constraint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("arg", &self.arg)
            .field("candidates", &self.candidates)
            .finish()
    }
}

/// Lightweight possibility check: could the two terms still unify? Either
/// side being a variable says yes; two sequences must agree on operator and
/// arity with all children pairwise possible.
pub fn may_unify<'a>(left: Term<'a>, right: Term<'a>) -> bool {
    match (left, right) {
        (Term::Var(_), _) | (_, Term::Var(_)) => true,
        (Term::Seq(a), Term::Seq(b)) => {
            a.op == b.op
                && a.terms.len() == b.terms.len()
                && a.terms
                    .iter()
                    .zip(b.terms.iter())
                    .all(|(x, y)| may_unify(*x, *y))
        }
    }
}
