//! Trace sinks for unifier runs.

use crate::unify::term::{Term, TermPair, Variable};

/// Receives the unifier's step-by-step events. Every method defaults to a
/// no-op, so implementors override only what they observe.
pub trait Tracer<'a> {
    fn on_start(&mut self, _pairs: &[TermPair<'a>]) {}

    /// A trivial equation `t = t` was dropped.
    fn on_delete(&mut self, _pair: TermPair<'a>) {}

    /// A sequence pair decomposed into its children.
    fn on_sequence(&mut self, _pair: TermPair<'a>) {}

    /// A `seq = var` equation was swapped to `var = seq`.
    fn on_swap(&mut self, _pair: TermPair<'a>) {}

    /// A variable was bound.
    fn on_variable(&mut self, _var: &'a Variable<'a>, _term: Term<'a>) {}

    /// A new binding is being substituted through the work queues.
    fn on_substitute(&mut self, _var: &'a Variable<'a>, _term: Term<'a>) {}

    fn on_conflict(&mut self, _pair: TermPair<'a>) {}

    fn on_cycle(&mut self, _var: &'a Variable<'a>, _term: Term<'a>) {}

    /// A bound variable's action is about to run.
    fn on_action(&mut self, _var: &'a Variable<'a>) {}

    /// An overload constraint lost candidates; `remaining` are left.
    fn on_narrow(&mut self, _arg: Term<'a>, _remaining: usize) {}

    /// An overload constraint ran out of candidates.
    fn on_exhausted(&mut self, _arg: Term<'a>) {}
}

/// Discards every event.
#[derive(Default)]
pub struct NullTracer;

impl<'a> Tracer<'a> for NullTracer {}

/// Forwards events to the `tracing` subscriber at TRACE level.
#[derive(Default)]
pub struct LogTracer;

impl<'a> Tracer<'a> for LogTracer {
    fn on_start(&mut self, pairs: &[TermPair<'a>]) {
        tracing::trace!(equations = pairs.len(), "unify start");
    }

    fn on_delete(&mut self, pair: TermPair<'a>) {
        tracing::trace!(%pair, "delete");
    }

    fn on_sequence(&mut self, pair: TermPair<'a>) {
        tracing::trace!(%pair, "decompose");
    }

    fn on_swap(&mut self, pair: TermPair<'a>) {
        tracing::trace!(%pair, "swap");
    }

    fn on_variable(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        tracing::trace!(%var, %term, "bind");
    }

    fn on_substitute(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        tracing::trace!(%var, %term, "substitute");
    }

    fn on_conflict(&mut self, pair: TermPair<'a>) {
        tracing::trace!(%pair, "conflict");
    }

    fn on_cycle(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        tracing::trace!(%var, %term, "cycle");
    }

    fn on_action(&mut self, var: &'a Variable<'a>) {
        tracing::trace!(%var, "action");
    }

    fn on_narrow(&mut self, arg: Term<'a>, remaining: usize) {
        tracing::trace!(%arg, remaining, "narrow");
    }

    fn on_exhausted(&mut self, arg: Term<'a>) {
        tracing::trace!(%arg, "constraint exhausted");
    }
}
