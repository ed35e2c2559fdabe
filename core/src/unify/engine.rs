//! Martelli-Montanari unification with work queues.
//!
//! Every equation is classified on insertion into one of four kinds and
//! queued accordingly; queues drain in a fixed priority (DELETE, SEQ_SEQ,
//! VAR_ANY; NON_VAR_VAR pairs are swapped into VAR_ANY as they arrive).
//! Each variable binding substitutes through all queues and the result map,
//! runs the variable's action, and narrows the overload constraints, so a
//! successful run returns an idempotent substitution.

use alloc::collections::VecDeque;
use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::unify::constraint::Constraint;
use crate::unify::substitution::{Substitution, subst_one};
use crate::unify::term::{Term, TermPair, TermStore, Variable};
use crate::unify::tracer::Tracer;
use crate::{Box, Vec};

/// Classification of an equation by the shapes of its sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `t = t`: dropped.
    Delete,
    /// `f(...) = g(...)`: decomposed, or a conflict.
    SeqSeq,
    /// `f(...) = X`: swapped in place to `X = f(...)`.
    NonVarVar,
    /// `X = t`: occurs-checked, then bound.
    VarAny,
}

pub fn kind_of(pair: &TermPair<'_>) -> Kind {
    if pair.left == pair.right {
        Kind::Delete
    } else {
        match (pair.left, pair.right) {
            (Term::Seq(_), Term::Seq(_)) => Kind::SeqSeq,
            (Term::Seq(_), Term::Var(_)) => Kind::NonVarVar,
            (Term::Var(_), _) => Kind::VarAny,
        }
    }
}

/// Why a unification run failed. Carried as a value; `Display` gives the
/// human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnifyError<'a> {
    #[error("cannot unify {left} with {right}")]
    Conflict { left: Term<'a>, right: Term<'a> },
    #[error("cycle: variable {var} occurs in {term}")]
    Cycle {
        var: &'a Variable<'a>,
        term: Term<'a>,
    },
    #[error("no overload candidate accepts {arg}")]
    ConstraintExhausted { arg: Term<'a> },
}

/// Callback invoked when its variable is bound: `(var, term, substitution,
/// emit)`; `emit` adds a new equation to the run.
pub type VarAction<'a> = Box<
    dyn FnMut(&'a Variable<'a>, Term<'a>, &Substitution<'a>, &mut dyn FnMut(Term<'a>, Term<'a>))
        + 'a,
>;

/// Per-variable actions, keyed by the variable the caller watches.
#[derive(Default)]
pub struct TermActions<'a> {
    map: HashMap<&'a Variable<'a>, VarAction<'a>>,
}

impl<'a> TermActions<'a> {
    pub fn new() -> Self {
        TermActions {
            map: HashMap::new(),
        }
    }

    /// Registers `action` to run when `var` (which must be a variable term)
    /// is bound.
    pub fn on(
        &mut self,
        var: Term<'a>,
        action: impl FnMut(&'a Variable<'a>, Term<'a>, &Substitution<'a>, &mut dyn FnMut(Term<'a>, Term<'a>))
        + 'a,
    ) {
        let Term::Var(v) = var else {
            panic!("action target must be a variable, got {var}")
        };
        self.map.insert(v, Box::new(action));
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Solves the given equations. Returns the substitution on success, or the
/// first failure; no failure is ever recovered within a run.
pub fn unify<'s, 'a>(
    store: &'s TermStore<'a>,
    pairs: impl IntoIterator<Item = TermPair<'a>>,
    actions: TermActions<'a>,
    constraints: Vec<Constraint<'a>>,
    tracer: &mut dyn Tracer<'a>,
) -> Result<Substitution<'a>, UnifyError<'a>> {
    let pairs: Vec<TermPair<'a>> = pairs.into_iter().collect();
    tracer.on_start(&pairs);
    let mut solver = Solver {
        store,
        delete: VecDeque::new(),
        seq_seq: VecDeque::new(),
        var_any: VecDeque::new(),
        subst: Substitution::new(),
        constraints,
        actions,
        acting: HashSet::new(),
        tracer,
    };
    for pair in pairs {
        solver.insert(pair);
    }
    solver.solve()
}

struct Solver<'s, 'a, 't> {
    store: &'s TermStore<'a>,
    delete: VecDeque<TermPair<'a>>,
    seq_seq: VecDeque<TermPair<'a>>,
    var_any: VecDeque<TermPair<'a>>,
    subst: Substitution<'a>,
    constraints: Vec<Constraint<'a>>,
    actions: TermActions<'a>,
    /// Variables whose actions are currently running; re-entrant actions
    /// are skipped.
    acting: HashSet<&'a Variable<'a>>,
    tracer: &'t mut dyn Tracer<'a>,
}

impl<'s, 'a> Solver<'s, 'a, '_> {
    fn insert(&mut self, pair: TermPair<'a>) {
        match kind_of(&pair) {
            Kind::Delete => self.delete.push_back(pair),
            Kind::SeqSeq => self.seq_seq.push_back(pair),
            Kind::NonVarVar => {
                self.tracer.on_swap(pair);
                self.var_any.push_back(TermPair::new(pair.right, pair.left));
            }
            Kind::VarAny => self.var_any.push_back(pair),
        }
    }

    fn solve(mut self) -> Result<Substitution<'a>, UnifyError<'a>> {
        // Some constraints are decidable before any equation is solved.
        self.narrow_constraints()?;
        loop {
            if let Some(pair) = self.delete.pop_front() {
                self.tracer.on_delete(pair);
                continue;
            }
            if let Some(pair) = self.seq_seq.pop_front() {
                self.decompose(pair)?;
                continue;
            }
            if let Some(pair) = self.var_any.pop_front() {
                self.bind(pair)?;
                continue;
            }
            break;
        }
        debug_assert!(
            self.subst.find_cycle().is_none(),
            "solved substitution contains a cycle"
        );
        Ok(self.subst)
    }

    fn decompose(&mut self, pair: TermPair<'a>) -> Result<(), UnifyError<'a>> {
        let (Term::Seq(left), Term::Seq(right)) = (pair.left, pair.right) else {
            unreachable!("equation classified SEQ_SEQ has two sequences")
        };
        if left.op != right.op || left.terms.len() != right.terms.len() {
            self.tracer.on_conflict(pair);
            return Err(UnifyError::Conflict {
                left: pair.left,
                right: pair.right,
            });
        }
        self.tracer.on_sequence(pair);
        for (a, b) in left.terms.iter().zip(right.terms.iter()) {
            self.insert(TermPair::new(*a, *b));
        }
        Ok(())
    }

    fn bind(&mut self, pair: TermPair<'a>) -> Result<(), UnifyError<'a>> {
        let Term::Var(var) = pair.left else {
            unreachable!("equation classified VAR_ANY starts with a variable")
        };
        // Bring the right side up to date first: equations emitted by
        // actions and constraints may mention variables bound since they
        // were queued, and the occurs check must see through them.
        let term = self.subst.apply(self.store, pair.right);
        if let Term::Var(v) = term {
            if core::ptr::eq(v, var) {
                return Ok(());
            }
        }
        if term.contains_var(var) {
            self.tracer.on_cycle(var, term);
            return Err(UnifyError::Cycle { var, term });
        }
        if let Some(previous) = self.subst.get(var) {
            // Chains of variable equivalences converge through the new
            // equation `previous = term`.
            if previous != term {
                self.insert(TermPair::new(previous, term));
            }
            return Ok(());
        }
        self.subst.insert(var, term);
        self.tracer.on_variable(var, term);
        self.substitute_queues(var, term);
        self.subst.substitute_values(self.store, var, term);
        self.run_action(var, term);
        self.narrow_constraints()
    }

    /// Rewrites every queued equation under `var := term`, migrating pairs
    /// whose kind changed to the right queue.
    fn substitute_queues(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        self.tracer.on_substitute(var, term);
        let drained: Vec<TermPair<'a>> = self
            .delete
            .drain(..)
            .chain(self.seq_seq.drain(..))
            .chain(self.var_any.drain(..))
            .collect();
        for pair in drained {
            let left = subst_one(self.store, pair.left, var, term);
            let right = subst_one(self.store, pair.right, var, term);
            self.insert(TermPair::new(left, right));
        }
    }

    fn run_action(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        if !self.actions.map.contains_key(&var) {
            return;
        }
        // Working set: an action that re-enters its own variable is
        // skipped rather than recursed into.
        if !self.acting.insert(var) {
            return;
        }
        self.tracer.on_action(var);
        let mut emitted: Vec<(Term<'a>, Term<'a>)> = Vec::new();
        if let Some(action) = self.actions.map.get_mut(&var) {
            action(var, term, &self.subst, &mut |l, r| emitted.push((l, r)));
        }
        self.acting.remove(&var);
        for (left, right) in emitted {
            self.insert(TermPair::new(left, right));
        }
    }

    fn narrow_constraints(&mut self) -> Result<(), UnifyError<'a>> {
        let mut index = 0;
        while index < self.constraints.len() {
            let (pruned, remaining) = {
                let constraint = &mut self.constraints[index];
                constraint.narrow(self.store, &self.subst)
            };
            match remaining {
                0 => {
                    let constraint = self.constraints.swap_remove(index);
                    self.tracer.on_exhausted(constraint.arg);
                    return Err(UnifyError::ConstraintExhausted {
                        arg: constraint.arg,
                    });
                }
                1 => {
                    let mut constraint = self.constraints.swap_remove(index);
                    self.tracer.on_narrow(constraint.arg, 1);
                    let mut candidate =
                        constraint.candidates.pop().expect("exactly one candidate");
                    let mut emitted: Vec<(Term<'a>, Term<'a>)> = Vec::new();
                    (candidate.action)(constraint.arg, candidate.term, &mut |l, r| {
                        emitted.push((l, r))
                    });
                    for (left, right) in emitted {
                        self.insert(TermPair::new(left, right));
                    }
                    // swap_remove moved a new constraint here; revisit it.
                }
                n => {
                    if pruned > 0 {
                        self.tracer.on_narrow(self.constraints[index].arg, n);
                    }
                    index += 1;
                }
            }
        }
        Ok(())
    }
}
