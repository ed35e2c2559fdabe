//! Glue between interned types and unifier terms.
//!
//! The caller decides which terms are variables: type variables are mapped
//! through a callback in both directions, so an inference loop can allocate
//! fresh `T{k}` variables per typing obligation and map the solved terms
//! back to types afterwards.
//!
//! Operators: `fn`, `list`, `tuple`, `record:<labels>`, a primitive's name,
//! or a datatype's name. Aliases are unfolded before translation, keeping
//! them transparent to unification.

use smallvec::SmallVec;

use crate::Vec;
use crate::types::key::Key;
use crate::types::system::{TypeError, TypeSystem};
use crate::types::{Primitive, Type};
use crate::unify::constraint::{Candidate, Constraint};
use crate::unify::term::{Term, TermStore, Variable};

const RECORD_OP_PREFIX: &str = "record:";

/// Flattens an interned type into a term. `var_term` supplies the term for
/// each type-variable ordinal (typically an interned unifier variable).
///
/// # Panics
///
/// Quantified types, unreduced applications and overload sentinels have no
/// term form; the caller instantiates or destructures them first.
pub fn term_for_type<'s, 'a>(
    store: &'s TermStore<'a>,
    ty: &'a Type<'a>,
    var_term: &mut dyn FnMut(u32) -> Term<'a>,
) -> Term<'a> {
    match *ty {
        Type::Var(i) => var_term(i),
        Type::Primitive(p) => store.atom(p.name()),
        Type::Fn(param, result) => {
            let param = term_for_type(store, param, var_term);
            let result = term_for_type(store, result, var_term);
            store.seq("fn", &[param, result])
        }
        Type::List(elem) => {
            let elem = term_for_type(store, elem, var_term);
            store.seq("list", &[elem])
        }
        Type::Tuple(elems) => {
            let terms: SmallVec<[Term<'a>; 4]> = elems
                .iter()
                .map(|&t| term_for_type(store, t, var_term))
                .collect();
            store.seq("tuple", &terms)
        }
        Type::Record { fields, .. } => {
            let mut op = crate::String::from(RECORD_OP_PREFIX);
            for (i, &(label, _)) in fields.iter().enumerate() {
                if i > 0 {
                    op.push(':');
                }
                op.push_str(label);
            }
            let terms: SmallVec<[Term<'a>; 4]> = fields
                .iter()
                .map(|&(_, t)| term_for_type(store, t, var_term))
                .collect();
            store.seq(&op, &terms)
        }
        Type::Data(data) => {
            let terms: SmallVec<[Term<'a>; 4]> = data
                .args()
                .iter()
                .map(|&t| term_for_type(store, t, var_term))
                .collect();
            store.seq(data.name(), &terms)
        }
        Type::Alias { target, .. } => term_for_type(store, target, var_term),
        Type::Dummy => store.atom("dummy"),
        Type::Forall(..) | Type::Apply(..) | Type::Multi(_) => {
            panic!("type has no term form: {ty}")
        }
    }
}

/// Maps a solved term back to an interned type. `var_type` supplies the
/// type for each remaining unifier variable (typically a fresh type
/// variable ordinal). Unknown operators fail with
/// [`TypeError::UnknownType`].
pub fn type_for_term<'a>(
    ts: &TypeSystem<'a>,
    term: Term<'a>,
    var_type: &mut dyn FnMut(&'a Variable<'a>) -> &'a Type<'a>,
) -> Result<&'a Type<'a>, TypeError> {
    match term {
        Term::Var(v) => Ok(var_type(v)),
        Term::Seq(s) => {
            let children: Vec<&'a Type<'a>> = s
                .terms
                .iter()
                .map(|t| type_for_term(ts, *t, var_type))
                .collect::<Result<_, _>>()?;
            match s.op {
                "fn" => {
                    assert_eq!(children.len(), 2, "fn term has two children");
                    Ok(ts.fn_type(children[0], children[1]))
                }
                "list" => {
                    assert_eq!(children.len(), 1, "list term has one child");
                    Ok(ts.list_type(children[0]))
                }
                "tuple" => Ok(ts.tuple_type(&children)),
                "dummy" => Ok(ts.dummy_type()),
                op if op.starts_with(RECORD_OP_PREFIX) => {
                    let labels: Vec<&str> = op[RECORD_OP_PREFIX.len()..]
                        .split(':')
                        .filter(|l| !l.is_empty())
                        .collect();
                    assert_eq!(
                        labels.len(),
                        children.len(),
                        "record term labels match its children"
                    );
                    Ok(ts.record_type(labels.into_iter().zip(children).collect()))
                }
                op => {
                    if let Some(p) = Primitive::from_name(op) {
                        Ok(ts.primitive(p))
                    } else {
                        let scheme = ts.lookup(op)?;
                        Ok(ts.apply(scheme, &children))
                    }
                }
            }
        }
    }
}

/// The key a fresh unifier variable maps back to when it survives solving:
/// its own ordinal as a type variable.
pub fn var_key(var: &Variable<'_>) -> Key {
    Key::Var(var.ordinal as u32)
}

/// Destructures an overload sentinel into a call-site constraint.
///
/// Each alternative of the [`Type::Multi`] becomes one candidate: its
/// parameter shape narrows against `arg_var`, and when a single candidate
/// survives, the compound action equates the argument and binds
/// `result_var` to the candidate's result. The sentinel itself never
/// reaches the unifier.
pub fn overload_constraint<'s, 'a>(
    store: &'s TermStore<'a>,
    ty: &'a Type<'a>,
    arg_var: Term<'a>,
    result_var: Term<'a>,
    var_term: &mut dyn FnMut(u32) -> Term<'a>,
) -> Constraint<'a> {
    let Type::Multi(alternatives) = *ty else {
        panic!("expected overload alternatives, got {ty}")
    };
    let candidates = alternatives
        .iter()
        .map(|&alt| {
            let Type::Fn(param, result) = *alt else {
                panic!("overload alternative is not a function: {alt}")
            };
            let param = term_for_type(store, param, var_term);
            let result = term_for_type(store, result, var_term);
            Candidate::overload(param, result_var, result)
        })
        .collect();
    Constraint::new(arg_var, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;
    use bumpalo::Bump;

    #[test]
    fn test_round_trip_ground_type() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);
        let store = TermStore::new(&arena);

        // (int * bool) list -> {a:string}
        let tuple = ts.tuple_type(&[ts.int_type(), ts.bool_type()]);
        let rec = ts.record_type(vec![("a", ts.string_type())]);
        let ty = ts.fn_type(ts.list_type(tuple), rec);

        let term = term_for_type(store, ty, &mut |_| unreachable!("ground type"));
        assert_eq!(
            term.to_string(),
            "fn(list(tuple(int, bool)), record:a(string))"
        );

        let back =
            type_for_term(ts, term, &mut |_| unreachable!("ground term")).expect("maps back");
        assert!(core::ptr::eq(back, ty));
    }

    #[test]
    fn test_type_vars_go_through_callback() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);
        let store = TermStore::new(&arena);

        let ty = ts.fn_type(ts.type_variable(0), ts.type_variable(0));
        let term = term_for_type(store, ty, &mut |i| store.variable(&crate::format!("T{i}")));
        assert_eq!(term.to_string(), "fn(T0, T0)");

        let back = type_for_term(ts, term, &mut |v| {
            ts.type_variable(v.ordinal as u32)
        })
        .expect("maps back");
        assert!(core::ptr::eq(back, ty));
    }

    #[test]
    fn test_alias_unfolds() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);
        let store = TermStore::new(&arena);

        let point = ts.alias_type("point", ts.int_type(), &[]);
        let term = term_for_type(store, point, &mut |_| unreachable!());
        assert!(term.same(store.atom("int")));
    }

    #[test]
    fn test_unknown_operator() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);
        let store = TermStore::new(&arena);

        let term = store.atom("mystery");
        let err = type_for_term(ts, term, &mut |_| unreachable!()).unwrap_err();
        assert_eq!(err, TypeError::UnknownType("mystery".into()));
    }
}
