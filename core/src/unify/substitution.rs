//! Variable-to-term substitutions.

use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::Vec;
use crate::unify::term::{Term, TermStore, Variable};

/// The result of a successful unification: a map from variables to terms.
/// The solver substitutes through stored values on every new binding, so a
/// finished substitution is idempotent.
#[derive(Clone, Debug, Default)]
pub struct Substitution<'a> {
    map: HashMap<&'a Variable<'a>, Term<'a>>,
}

impl<'a> Substitution<'a> {
    pub fn new() -> Self {
        Substitution {
            map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, var: &'a Variable<'a>) -> Option<Term<'a>> {
        self.map.get(&var).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a Variable<'a>, Term<'a>)> + '_ {
        self.map.iter().map(|(&v, &t)| (v, t))
    }

    pub(crate) fn insert(&mut self, var: &'a Variable<'a>, term: Term<'a>) {
        self.map.insert(var, term);
    }

    /// Follows variable bindings until a sequence or an unbound variable.
    pub fn resolve(&self, mut term: Term<'a>) -> Term<'a> {
        while let Term::Var(v) = term {
            match self.get(v) {
                Some(t) => term = t,
                None => break,
            }
        }
        term
    }

    /// Applies the whole substitution structurally, rebuilding through the
    /// store. Identity-preserving on terms without bound variables.
    pub fn apply(&self, store: &TermStore<'a>, term: Term<'a>) -> Term<'a> {
        match term {
            Term::Var(v) => match self.get(v) {
                Some(t) => self.apply(store, t),
                None => term,
            },
            Term::Seq(s) => {
                if s.terms.is_empty() {
                    return term;
                }
                let children: Vec<Term<'a>> =
                    s.terms.iter().map(|t| self.apply(store, *t)).collect();
                if s.terms
                    .iter()
                    .zip(children.iter())
                    .all(|(a, b)| a.same(*b))
                {
                    term
                } else {
                    store.seq(s.op, &children)
                }
            }
        }
    }

    /// Rewrites every stored value under the new binding `var := term`.
    pub(crate) fn substitute_values(
        &mut self,
        store: &TermStore<'a>,
        var: &'a Variable<'a>,
        term: Term<'a>,
    ) {
        for value in self.map.values_mut() {
            *value = subst_one(store, *value, var, term);
        }
    }

    /// Detects a cycle in the binding graph: DFS with an in-progress mark
    /// per variable. Returns an offending variable, or `None` when the
    /// substitution is well-founded.
    pub fn find_cycle(&self) -> Option<&'a Variable<'a>> {
        let mut done: HashSet<&'a Variable<'a>> = HashSet::new();
        let mut in_progress: HashSet<&'a Variable<'a>> = HashSet::new();
        for &var in self.map.keys() {
            if self.visit(var, &mut done, &mut in_progress) {
                return Some(var);
            }
        }
        None
    }

    fn visit(
        &self,
        var: &'a Variable<'a>,
        done: &mut HashSet<&'a Variable<'a>>,
        in_progress: &mut HashSet<&'a Variable<'a>>,
    ) -> bool {
        if done.contains(&var) {
            return false;
        }
        if !in_progress.insert(var) {
            return true;
        }
        let mut cyclic = false;
        if let Some(term) = self.get(var) {
            term.for_each_var(&mut |v| {
                cyclic = cyclic || self.visit(v, done, in_progress);
            });
        }
        in_progress.remove(&var);
        done.insert(var);
        cyclic
    }
}

/// Substitutes a single binding `var := replacement` through a term.
pub(crate) fn subst_one<'a>(
    store: &TermStore<'a>,
    term: Term<'a>,
    var: &'a Variable<'a>,
    replacement: Term<'a>,
) -> Term<'a> {
    match term {
        Term::Var(v) if core::ptr::eq(v, var) => replacement,
        Term::Var(_) => term,
        Term::Seq(s) => {
            if !term.contains_var(var) {
                return term;
            }
            let children: Vec<Term<'a>> = s
                .terms
                .iter()
                .map(|t| subst_one(store, *t, var, replacement))
                .collect();
            store.seq(s.op, &children)
        }
    }
}

impl fmt::Display for Substitution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted for deterministic output.
        let mut entries: Vec<(&Variable<'_>, Term<'_>)> = self.iter().collect();
        entries.sort_by_key(|(v, _)| (v.ordinal, v.name));
        f.write_str("[")?;
        for (i, (v, t)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}={t}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn test_apply_identity_preserving() {
        let arena = Bump::new();
        let store = TermStore::new(&arena);
        let subst = Substitution::new();

        let ground = store.seq("fn", &[store.atom("int"), store.atom("bool")]);
        assert!(subst.apply(store, ground).same(ground));
    }

    #[test]
    fn test_apply_rewrites_bound_vars() {
        let arena = Bump::new();
        let store = TermStore::new(&arena);
        let mut subst = Substitution::new();

        let x = store.variable("X");
        let int = store.atom("int");
        subst.insert(x.as_var().unwrap(), int);

        let t = store.seq("list", &[x]);
        let applied = subst.apply(store, t);
        assert!(applied.same(store.seq("list", &[int])));
    }

    #[test]
    fn test_resolve_follows_chains() {
        let arena = Bump::new();
        let store = TermStore::new(&arena);
        let mut subst = Substitution::new();

        let x = store.variable("X");
        let y = store.variable("Y");
        let int = store.atom("int");
        subst.insert(x.as_var().unwrap(), y);
        subst.insert(y.as_var().unwrap(), int);
        assert!(subst.resolve(x).same(int));
    }

    #[test]
    fn test_find_cycle() {
        let arena = Bump::new();
        let store = TermStore::new(&arena);
        let mut subst = Substitution::new();

        let x = store.variable("X");
        let y = store.variable("Y");
        subst.insert(x.as_var().unwrap(), store.seq("list", &[y]));
        assert!(subst.find_cycle().is_none());

        subst.insert(y.as_var().unwrap(), store.seq("fn", &[x, x]));
        assert!(subst.find_cycle().is_some());
    }
}
