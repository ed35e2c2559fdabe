//! Direct structural unification over interned types.
//!
//! A lighter alternative to the term-level unifier for simple queries: no
//! queues, no constraints, just recursion on the type structure, producing
//! a map from variable ordinals to types. Function types and quantifiers
//! are out of scope here; the inference loop goes through the full unifier.

use hashbrown::HashMap;

use crate::types::ty::Type;

/// Unifies two types, returning the variable bindings on success. Aliases
/// are transparent: they unfold to their target before comparison.
pub fn unify_with<'a>(
    t1: &'a Type<'a>,
    t2: &'a Type<'a>,
) -> Option<HashMap<u32, &'a Type<'a>>> {
    let mut map = HashMap::new();
    if unify(t1, t2, &mut map) { Some(map) } else { None }
}

fn unify<'a>(
    t1: &'a Type<'a>,
    t2: &'a Type<'a>,
    map: &mut HashMap<u32, &'a Type<'a>>,
) -> bool {
    let t1 = t1.unfold_alias();
    let t2 = t2.unfold_alias();
    if core::ptr::eq(t1, t2) {
        return true;
    }
    match (*t1, *t2) {
        (Type::Var(i), _) => bind(map, i, t2),
        (_, Type::Var(i)) => bind(map, i, t1),
        (Type::Primitive(a), Type::Primitive(b)) => a == b,
        (Type::List(a), Type::List(b)) => unify(a, b, map),
        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(&x, &y)| unify(x, y, map))
        }
        (Type::Record { fields: fa, .. }, Type::Record { fields: fb, .. }) => {
            // Fields are sorted, so equal key sets mean pairwise equal
            // labels.
            fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb.iter())
                    .all(|(&(na, ta), &(nb, tb))| na == nb && unify(ta, tb, map))
        }
        (Type::Data(a), Type::Data(b)) => {
            a.name() == b.name()
                && a.args().len() == b.args().len()
                && a.args()
                    .iter()
                    .zip(b.args().iter())
                    .all(|(&x, &y)| unify(x, y, map))
        }
        _ => false,
    }
}

fn bind<'a>(map: &mut HashMap<u32, &'a Type<'a>>, ordinal: u32, ty: &'a Type<'a>) -> bool {
    match map.get(&ordinal) {
        Some(&bound) => core::ptr::eq(bound, ty),
        None => {
            map.insert(ordinal, ty);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::system::TypeSystem;
    use bumpalo::Bump;

    #[test]
    fn test_unify_var_with_primitive() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let v = ts.type_variable(0);
        let int = ts.int_type();
        let m = unify_with(ts.list_type(v), ts.list_type(int)).expect("should unify");
        assert!(core::ptr::eq(m[&0], int));
    }

    #[test]
    fn test_unify_records() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let x = ts.type_variable(0);
        let y = ts.type_variable(1);
        let r1 = ts.record_type(vec![("a", ts.int_type()), ("b", x)]);
        let r2 = ts.record_type(vec![("a", y), ("b", ts.string_type())]);
        let m = unify_with(r1, r2).expect("should unify");
        assert!(core::ptr::eq(m[&0], ts.string_type()));
        assert!(core::ptr::eq(m[&1], ts.int_type()));
    }

    #[test]
    fn test_unify_record_key_mismatch() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let r1 = ts.record_type(vec![("a", ts.int_type())]);
        let r2 = ts.record_type(vec![("b", ts.int_type())]);
        assert!(unify_with(r1, r2).is_none());
    }

    #[test]
    fn test_fn_types_not_handled() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let f = ts.fn_type(ts.int_type(), ts.int_type());
        let g = ts.fn_type(ts.int_type(), ts.int_type());
        // Same interned object unifies trivially; distinct function shapes
        // are out of scope for the simple matcher.
        assert!(unify_with(f, g).is_some());
        let h = ts.fn_type(ts.bool_type(), ts.int_type());
        assert!(unify_with(f, h).is_none());
    }

    #[test]
    fn test_alias_transparent() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let point = ts.alias_type("point", ts.int_type(), &[]);
        assert!(unify_with(point, ts.int_type()).is_some());
        assert!(unify_with(ts.int_type(), point).is_some());
        assert!(unify_with(point, ts.bool_type()).is_none());
    }
}
