//! Terms: the unifier's internal representation.
//!
//! A term is either a variable or an n-ary sequence (an atom is a sequence
//! of arity zero). Terms are interned in a per-unifier [`TermStore`]:
//! variables by their uppercase name, sequences by their rendered string
//! form, so a variable and an atom of the same spelling never collide.

use core::cell::RefCell;
use core::fmt;
use core::fmt::Write as _;

use bumpalo::Bump;
use hashbrown::{DefaultHashBuilder, HashMap};

use crate::{String, format};

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub ordinal: usize,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Sequence<'a> {
    pub op: &'a str,
    pub terms: &'a [Term<'a>],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Term<'a> {
    Var(&'a Variable<'a>),
    Seq(&'a Sequence<'a>),
}

impl<'a> Term<'a> {
    pub fn is_var(self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn as_var(self) -> Option<&'a Variable<'a>> {
        match self {
            Term::Var(v) => Some(v),
            Term::Seq(_) => None,
        }
    }

    /// Identity comparison; with interned terms this is equivalent to
    /// structural equality but constant-time.
    pub fn same(self, other: Term<'a>) -> bool {
        match (self, other) {
            (Term::Var(a), Term::Var(b)) => core::ptr::eq(a, b),
            (Term::Seq(a), Term::Seq(b)) => core::ptr::eq(a, b),
            _ => false,
        }
    }

    /// The occurs check: does `var` appear anywhere in this term?
    pub fn contains_var(self, var: &'a Variable<'a>) -> bool {
        match self {
            Term::Var(v) => core::ptr::eq(v, var),
            Term::Seq(s) => s.terms.iter().any(|t| t.contains_var(var)),
        }
    }

    pub fn for_each_var(self, f: &mut dyn FnMut(&'a Variable<'a>)) {
        match self {
            Term::Var(v) => f(v),
            Term::Seq(s) => {
                for t in s.terms {
                    t.for_each_var(f);
                }
            }
        }
    }
}

/// An equation between two terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermPair<'a> {
    pub left: Term<'a>,
    pub right: Term<'a>,
}

impl<'a> TermPair<'a> {
    pub fn new(left: Term<'a>, right: Term<'a>) -> Self {
        TermPair { left, right }
    }
}

impl fmt::Display for Variable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Sequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op)?;
        if !self.terms.is_empty() {
            f.write_str("(")?;
            for (i, t) in self.terms.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{t}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Term<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::Seq(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for TermPair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// The unifier's term workspace: interning tables for variables and
/// sequences plus fresh-name generators with a per-prefix cursor, so
/// repeated allocations are amortized O(1).
pub struct TermStore<'a> {
    arena: &'a Bump,
    interned_strs: RefCell<HashMap<&'a str, &'a str, DefaultHashBuilder, &'a Bump>>,
    variables: RefCell<HashMap<&'a str, &'a Variable<'a>, DefaultHashBuilder, &'a Bump>>,
    sequences: RefCell<HashMap<&'a str, &'a Sequence<'a>, DefaultHashBuilder, &'a Bump>>,
    cursors: RefCell<HashMap<&'a str, usize, DefaultHashBuilder, &'a Bump>>,
}

impl<'a> TermStore<'a> {
    pub fn new(arena: &'a Bump) -> &'a Self {
        arena.alloc(Self {
            arena,
            interned_strs: RefCell::new(HashMap::new_in(arena)),
            variables: RefCell::new(HashMap::new_in(arena)),
            sequences: RefCell::new(HashMap::new_in(arena)),
            cursors: RefCell::new(HashMap::new_in(arena)),
        })
    }

    fn intern_str(&self, s: &str) -> &'a str {
        if let Some(&interned) = self.interned_strs.borrow().get(s) {
            return interned;
        }
        let arena_str = self.arena.alloc_str(s);
        self.interned_strs.borrow_mut().insert(arena_str, arena_str);
        arena_str
    }

    /// Interns a variable. Variable names start with an uppercase ASCII
    /// letter; the numeric suffix, if any, becomes the ordinal.
    pub fn variable(&self, name: &str) -> Term<'a> {
        assert!(
            name.chars().next().is_some_and(|c| c.is_ascii_uppercase()),
            "variable name must start with an uppercase letter: {name:?}"
        );
        if let Some(&v) = self.variables.borrow().get(name) {
            return Term::Var(v);
        }
        let digits = name.len() - name.chars().rev().take_while(|c| c.is_ascii_digit()).count();
        let ordinal = name[digits..].parse::<usize>().unwrap_or(0);
        let name = self.intern_str(name);
        let v = &*self.arena.alloc(Variable { name, ordinal });
        self.variables.borrow_mut().insert(name, v);
        Term::Var(v)
    }

    /// The smallest unused `T{k}` variable.
    pub fn fresh_variable(&self) -> Term<'a> {
        self.fresh_variable_with("T")
    }

    pub fn fresh_variable_with(&self, prefix: &str) -> Term<'a> {
        let name = self.fresh_name(prefix, |name| self.variables.borrow().contains_key(name));
        self.variable(&name)
    }

    /// Interns a zero-arity sequence.
    pub fn atom(&self, op: &str) -> Term<'a> {
        self.seq(op, &[])
    }

    /// The smallest unused `{prefix}{k}` atom.
    pub fn fresh_atom(&self, prefix: &str) -> Term<'a> {
        let name = self.fresh_name(prefix, |name| self.sequences.borrow().contains_key(name));
        self.atom(&name)
    }

    fn fresh_name(&self, prefix: &str, in_use: impl Fn(&str) -> bool) -> String {
        let mut cursors = self.cursors.borrow_mut();
        let prefix_key = self.intern_str(prefix);
        let mut k = cursors.get(prefix_key).copied().unwrap_or(0);
        let mut name = format!("{prefix}{k}");
        while in_use(&name) {
            k += 1;
            name = format!("{prefix}{k}");
        }
        cursors.insert(prefix_key, k + 1);
        name
    }

    /// Interns a sequence by its rendered string form.
    pub fn seq(&self, op: &str, terms: &[Term<'a>]) -> Term<'a> {
        let mut form = String::from(op);
        if !terms.is_empty() {
            form.push('(');
            for (i, t) in terms.iter().enumerate() {
                if i > 0 {
                    form.push_str(", ");
                }
                write!(form, "{t}").expect("writing to String cannot fail");
            }
            form.push(')');
        }
        if let Some(&s) = self.sequences.borrow().get(form.as_str()) {
            return Term::Seq(s);
        }
        let form = self.intern_str(&form);
        let op = self.intern_str(op);
        let terms = self.arena.alloc_slice_copy(terms);
        let s = &*self.arena.alloc(Sequence { op, terms });
        self.sequences.borrow_mut().insert(form, s);
        Term::Seq(s)
    }
}
