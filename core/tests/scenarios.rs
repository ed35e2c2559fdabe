//! End-to-end scenarios across the type system, the bridge and the
//! unifier, plus the structural properties a solved substitution must
//! satisfy.

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use morel_core::unify::{
    Candidate, Constraint, NullTracer, Substitution, Term, TermActions, TermPair, TermStore,
    UnifyError, overload_constraint, term_for_type, type_for_term, unify,
};
use morel_core::types::{DataTypeDef, Key, TypeSystem};

fn solve<'s, 'a>(
    store: &'s TermStore<'a>,
    pairs: Vec<TermPair<'a>>,
) -> Result<Substitution<'a>, UnifyError<'a>> {
    unify(store, pairs, TermActions::new(), Vec::new(), &mut NullTracer)
}

fn check_solution<'a>(store: &TermStore<'a>, pairs: &[TermPair<'a>], subst: &Substitution<'a>) {
    for pair in pairs {
        // Soundness: the substitution equates both sides of every input
        // equation.
        let left = subst.apply(store, pair.left);
        let right = subst.apply(store, pair.right);
        assert!(left.same(right), "{pair} not solved: {left} vs {right}");
    }
    for (_, term) in subst.iter() {
        // Idempotence: applying again changes nothing.
        assert!(subst.apply(store, term).same(term));
        // Occurs: no bound variable survives in any value.
        for (bound, _) in subst.iter() {
            assert!(!term.contains_var(bound), "{bound} occurs in {term}");
        }
    }
}

#[test]
fn s1_fn_binds_both_sides() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let x = store.variable("X");
    let y = store.variable("Y");
    let int = store.atom("int");
    let bool_ = store.atom("bool");
    let pairs = vec![TermPair::new(
        store.seq("fn", &[x, int]),
        store.seq("fn", &[bool_, y]),
    )];

    let subst = solve(store, pairs.clone()).expect("unifies");
    assert_eq!(subst.len(), 2);
    assert!(subst.resolve(x).same(bool_));
    assert!(subst.resolve(y).same(int));
    check_solution(store, &pairs, &subst);
}

#[test]
fn s2_substitution_propagates_through_bindings() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let x = store.variable("X");
    let y = store.variable("Y");
    let int = store.atom("int");
    let pairs = vec![
        TermPair::new(
            store.seq("list", &[x]),
            store.seq("list", &[store.seq("list", &[y])]),
        ),
        TermPair::new(y, int),
    ];

    let subst = solve(store, pairs.clone()).expect("unifies");
    assert!(
        subst
            .resolve(x)
            .same(store.seq("list", &[int]))
    );
    assert!(subst.resolve(y).same(int));
    check_solution(store, &pairs, &subst);
}

#[test]
fn s3_occurs_check_reports_cycle() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let x = store.variable("X");
    let f = store.seq("fn", &[x, store.atom("int")]);

    match solve(store, vec![TermPair::new(x, f)]) {
        Err(UnifyError::Cycle { var, term }) => {
            assert_eq!(var.name, "X");
            assert!(term.same(f));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn s4_operator_mismatch_reports_conflict() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let a = store.variable("A");
    let b = store.variable("B");
    let c = store.variable("C");
    let f = store.seq("fn", &[a, b]);
    let l = store.seq("list", &[c]);

    match solve(store, vec![TermPair::new(f, l)]) {
        Err(UnifyError::Conflict { left, right }) => {
            assert!(left.same(f));
            assert!(right.same(l));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn s5_records_unify_field_by_field() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);
    let store = TermStore::new(&arena);

    // {a:int, b:X} against {a:Y, b:string}, with the type variables mapped
    // to unifier variables through the bridge.
    let r1 = ts.record_type(vec![("a", ts.int_type()), ("b", ts.type_variable(0))]);
    let r2 = ts.record_type(vec![("a", ts.type_variable(1)), ("b", ts.string_type())]);

    let x = store.variable("X");
    let y = store.variable("Y");
    let mut to_var = |i: u32| if i == 0 { x } else { y };
    let pairs = vec![TermPair::new(
        term_for_type(store, r1, &mut to_var),
        term_for_type(store, r2, &mut to_var),
    )];

    let subst = solve(store, pairs.clone()).expect("unifies");
    assert!(subst.resolve(x).same(store.atom("string")));
    assert!(subst.resolve(y).same(store.atom("int")));
    check_solution(store, &pairs, &subst);
}

#[test]
fn s6_overload_narrows_to_single_candidate() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let arg = store.variable("A");
    let result = store.variable("R");
    let int = store.atom("int");
    let real = store.atom("real");

    // Candidates int -> int and real -> real; the argument placeholder is
    // then unified with int.
    let constraint = Constraint::new(
        arg,
        vec![
            Candidate::overload(int, result, int),
            Candidate::overload(real, result, real),
        ],
    );

    let subst = unify(
        store,
        vec![TermPair::new(arg, int)],
        TermActions::new(),
        vec![constraint],
        &mut NullTracer,
    )
    .expect("resolves");
    assert!(subst.resolve(arg).same(int));
    assert!(subst.resolve(result).same(int));
}

#[test]
fn s6b_overload_with_no_viable_candidate_fails() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let arg = store.variable("A");
    let result = store.variable("R");
    let int = store.atom("int");
    let real = store.atom("real");
    let string = store.atom("string");

    let constraint = Constraint::new(
        arg,
        vec![
            Candidate::overload(int, result, int),
            Candidate::overload(real, result, real),
        ],
    );

    match unify(
        store,
        vec![TermPair::new(arg, string)],
        TermActions::new(),
        vec![constraint],
        &mut NullTracer,
    ) {
        Err(UnifyError::ConstraintExhausted { arg }) => {
            assert!(arg.same(string));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[test]
fn overload_sentinel_destructures_into_constraint() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);
    let store = TermStore::new(&arena);

    // An overloaded built-in with instances int -> int and real -> real.
    // The sentinel never reaches the unifier; it only seeds the constraint.
    let multi = ts.multi_type(&[
        ts.fn_type(ts.int_type(), ts.int_type()),
        ts.fn_type(ts.real_type(), ts.real_type()),
    ]);

    let arg = store.variable("A");
    let result = store.variable("R");
    let constraint = overload_constraint(store, multi, arg, result, &mut |_| {
        unreachable!("monomorphic alternatives")
    });
    assert_eq!(constraint.candidate_count(), 2);

    let subst = unify(
        store,
        vec![TermPair::new(arg, store.atom("real"))],
        TermActions::new(),
        vec![constraint],
        &mut NullTracer,
    )
    .expect("resolves");
    assert!(subst.resolve(result).same(store.atom("real")));

    let back = type_for_term(ts, subst.resolve(result), &mut |_| unreachable!("ground"))
        .expect("maps back");
    assert!(core::ptr::eq(back, ts.real_type()));
}

#[test]
fn s7_forall_prints_canonically() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);

    let scheme = ts.forall_type(1, |vars| ts.fn_type(ts.list_type(vars[0]), vars[0]));
    assert_eq!(scheme.to_string(), "forall 'a. 'a list -> 'a");
}

#[test]
fn s8_record_labels_iterate_in_canonical_order() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);

    let r = ts.record_type(vec![
        ("a", ts.int_type()),
        ("10", ts.int_type()),
        ("2", ts.int_type()),
        ("1", ts.int_type()),
    ]);
    assert_eq!(r.to_string(), "{1:int, 2:int, 10:int, a:int}");
}

#[test]
fn solved_substitution_is_order_independent() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let x = store.variable("X");
    let y = store.variable("Y");
    let z = store.variable("Z");
    let int = store.atom("int");
    let pairs = vec![
        TermPair::new(store.seq("fn", &[x, y]), store.seq("fn", &[y, z])),
        TermPair::new(z, int),
    ];
    let mut reversed = pairs.clone();
    reversed.reverse();

    let a = solve(store, pairs.clone()).expect("unifies");
    let b = solve(store, reversed).expect("unifies");
    for var in [x, y, z] {
        let var = var.as_var().unwrap();
        assert!(
            a.resolve(Term::Var(var)).same(b.resolve(Term::Var(var))),
            "{var} resolved differently"
        );
    }
    check_solution(store, &pairs, &a);
}

#[test]
fn inference_pipeline_round_trips() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);
    let store = TermStore::new(&arena);

    // A polymorphic head: forall 'a. 'a list -> 'a, instantiated at a
    // fresh type variable, then unified against the call shape
    // fn(list(int), R).
    let scheme = ts.forall_type(1, |vars| ts.fn_type(ts.list_type(vars[0]), vars[0]));
    let instantiated = ts.apply(scheme, &[ts.type_variable(0)]);

    let r = store.variable("R");
    let head = term_for_type(store, instantiated, &mut |i| {
        store.variable(&format!("T{i}"))
    });
    let call = store.seq(
        "fn",
        &[
            store.seq("list", &[store.atom("int")]),
            r,
        ],
    );

    let subst = solve(store, vec![TermPair::new(head, call)]).expect("unifies");
    let solved = subst.resolve(r);
    let result_ty = type_for_term(ts, solved, &mut |v| {
        ts.type_variable(v.ordinal as u32)
    })
    .expect("maps back");
    assert!(core::ptr::eq(result_ty, ts.int_type()));
}

#[test]
fn datatype_terms_unify_by_name_and_arity() {
    let arena = Bump::new();
    let ts = TypeSystem::new(&arena);
    let store = TermStore::new(&arena);

    let option = ts.data_type_scheme(
        DataTypeDef::new("option", 1)
            .nullary("NONE")
            .constructor("SOME", Key::Var(0)),
    );
    let opt_int = ts.apply(option, &[ts.int_type()]);
    let opt_var = ts.apply(option, &[ts.type_variable(0)]);

    let x = store.variable("X");
    let left = term_for_type(store, opt_var, &mut |_| x);
    let right = term_for_type(store, opt_int, &mut |_| unreachable!("ground"));
    let pairs = vec![TermPair::new(left, right)];

    let subst = solve(store, pairs.clone()).expect("unifies");
    assert!(subst.resolve(x).same(store.atom("int")));
    check_solution(store, &pairs, &subst);

    // A different datatype of the same arity conflicts.
    let wrap = ts.data_type_scheme(
        DataTypeDef::new("wrap", 1).constructor("Wrap", Key::Var(0)),
    );
    let wrap_int = ts.apply(wrap, &[ts.int_type()]);
    let wrap_term = term_for_type(store, wrap_int, &mut |_| unreachable!("ground"));
    assert!(matches!(
        solve(store, vec![TermPair::new(right, wrap_term)]),
        Err(UnifyError::Conflict { .. })
    ));
}

#[test]
fn actions_emit_new_equations() {
    let arena = Bump::new();
    let store = TermStore::new(&arena);

    let x = store.variable("X");
    let y = store.variable("Y");
    let z = store.variable("Z");
    let int = store.atom("int");

    // Binding X forwards its term to Y; binding Y forwards to Z. The
    // emitted equations run through the normal queues.
    let mut actions = TermActions::new();
    actions.on(x, move |_var, term, _subst, emit| emit(y, term));
    actions.on(y, move |_var, term, _subst, emit| emit(z, term));

    let subst = unify(
        store,
        vec![TermPair::new(x, int)],
        actions,
        Vec::new(),
        &mut NullTracer,
    )
    .expect("unifies");
    assert!(subst.resolve(z).same(int));
}
