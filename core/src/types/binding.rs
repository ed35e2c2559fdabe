//! Name bindings consumed by the core.
//!
//! Environments live in the surrounding compiler; the core only reads
//! bindings. A binding is immutable: the `with_*` methods return fresh
//! values.

use crate::types::ty::Type;

/// How a name was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Ordinary value binding.
    Val,
    /// Declares a name as overloaded; carries no value.
    Over,
    /// One instance of an overloaded name, pointing back at its overload
    /// site.
    Inst,
}

/// A pattern identifier bound to a type, an optional defining expression
/// `E`, and an optional runtime value `V`. Expression and value
/// representations belong to external collaborators, so both are type
/// parameters here.
#[derive(Debug, Clone)]
pub struct Binding<'a, E = (), V = ()> {
    pub name: &'a str,
    pub ty: &'a Type<'a>,
    pub exp: Option<E>,
    pub value: Option<V>,
    pub kind: BindingKind,
    /// Back-reference to the overload site, for `Inst` bindings.
    pub overload_id: Option<u32>,
}

impl<'a, E, V> Binding<'a, E, V> {
    pub fn of(name: &'a str, ty: &'a Type<'a>) -> Self {
        Binding {
            name,
            ty,
            exp: None,
            value: None,
            kind: BindingKind::Val,
            overload_id: None,
        }
    }

    pub fn over(name: &'a str, ty: &'a Type<'a>) -> Self {
        Binding {
            kind: BindingKind::Over,
            ..Binding::of(name, ty)
        }
    }

    pub fn inst(name: &'a str, ty: &'a Type<'a>, overload_id: u32) -> Self {
        Binding {
            kind: BindingKind::Inst,
            overload_id: Some(overload_id),
            ..Binding::of(name, ty)
        }
    }

    pub fn with_type(self, ty: &'a Type<'a>) -> Self {
        Binding { ty, ..self }
    }

    pub fn with_exp(self, exp: E) -> Self {
        Binding {
            exp: Some(exp),
            ..self
        }
    }

    pub fn with_value(self, value: V) -> Self {
        Binding {
            value: Some(value),
            ..self
        }
    }

    pub fn is_overloaded(&self) -> bool {
        self.kind == BindingKind::Over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::system::TypeSystem;
    use bumpalo::Bump;

    #[test]
    fn test_with_returns_fresh_binding() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let b: Binding<'_, (), i64> = Binding::of("x", ts.int_type());
        let b2 = b.clone().with_value(42);
        assert!(b.value.is_none());
        assert_eq!(b2.value, Some(42));
        assert_eq!(b2.kind, BindingKind::Val);
    }

    #[test]
    fn test_inst_points_at_overload() {
        let arena = Bump::new();
        let ts = TypeSystem::new(&arena);

        let over: Binding<'_> = Binding::over("+", ts.dummy_type());
        assert!(over.is_overloaded());

        let inst: Binding<'_> =
            Binding::inst("+", ts.fn_type(ts.int_type(), ts.int_type()), 7);
        assert_eq!(inst.kind, BindingKind::Inst);
        assert_eq!(inst.overload_id, Some(7));
    }
}
