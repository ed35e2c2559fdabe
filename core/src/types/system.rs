//! The type interner.
//!
//! Every type is constructed at most once: [`TypeSystem::type_for`] consults
//! the key table and otherwise delegates to [`Key::to_type`], which interns
//! children before parents. All callers therefore share canonical objects
//! and can compare types by pointer.

use core::cell::RefCell;

use alloc::collections::{BTreeMap, BTreeSet};
use bumpalo::Bump;
use ecow::EcoString;
use hashbrown::{DefaultHashBuilder, HashMap};
use thiserror::Error;

use crate::types::key::Key;
use crate::types::ordering::{compare_labels, label_int};
use crate::types::ty::{DataType, Field, Primitive, Type};
use crate::{Box, Vec};

/// Lookup failures surfaced to the caller. Inconsistent construction inputs
/// are bugs and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown type: {0}")]
    UnknownType(EcoString),
}

/// One datatype in a (possibly mutually recursive) `datatype` declaration.
///
/// Constructor payload keys may reference the datatype itself or its
/// siblings by [`Key::Name`]; `None` marks a nullary constructor.
#[derive(Clone, Debug)]
pub struct DataTypeDef {
    pub name: EcoString,
    pub params: u32,
    pub constructors: Vec<(EcoString, Option<Key>)>,
}

impl DataTypeDef {
    pub fn new(name: impl Into<EcoString>, params: u32) -> Self {
        DataTypeDef {
            name: name.into(),
            params,
            constructors: Vec::new(),
        }
    }

    pub fn constructor(mut self, name: impl Into<EcoString>, payload: Key) -> Self {
        self.constructors.push((name.into(), Some(payload)));
        self
    }

    pub fn nullary(mut self, name: impl Into<EcoString>) -> Self {
        self.constructors.push((name.into(), None));
        self
    }
}

pub struct TypeSystem<'a> {
    // Arena holding all types from this TypeSystem.
    arena: &'a Bump,
    interned_strs: RefCell<HashMap<&'a str, &'a str, DefaultHashBuilder, &'a Bump>>,
    by_key: RefCell<HashMap<Key, &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
    by_name: RefCell<HashMap<&'a str, &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
    constructor_by_name: RefCell<HashMap<&'a str, &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
}

impl<'a> TypeSystem<'a> {
    pub fn new(arena: &'a Bump) -> &'a Self {
        let ts = arena.alloc(Self {
            arena,
            interned_strs: RefCell::new(HashMap::new_in(arena)),
            by_key: RefCell::new(HashMap::new_in(arena)),
            by_name: RefCell::new(HashMap::new_in(arena)),
            constructor_by_name: RefCell::new(HashMap::new_in(arena)),
        });
        for p in Primitive::ALL {
            let ty = ts.type_for(&Key::Primitive(p));
            let name = ts.intern_str(p.name());
            ts.by_name.borrow_mut().insert(name, ty);
        }
        ts
    }

    pub(crate) fn intern_str(&self, s: &str) -> &'a str {
        if let Some(&interned) = self.interned_strs.borrow().get(s) {
            return interned;
        }
        let arena_str = self.arena.alloc_str(s);
        self.interned_strs.borrow_mut().insert(arena_str, arena_str);
        arena_str
    }

    pub(crate) fn alloc_type(&self, ty: Type<'a>) -> &'a Type<'a> {
        self.arena.alloc(ty)
    }

    pub(crate) fn alloc_type_slice(&self, types: &[&'a Type<'a>]) -> &'a [&'a Type<'a>] {
        self.arena.alloc_slice_copy(types)
    }

    pub(crate) fn alloc_fields(&self, fields: &[Field<'a>]) -> &'a [Field<'a>] {
        self.arena.alloc_slice_copy(fields)
    }

    /// The only legal way to materialize a type from a key. Hash-consing:
    /// equal keys always yield the identical object.
    ///
    /// A key that reduces on conversion (a [`Key::Apply`] of a forall) is
    /// not stored, so the table invariant `by_key[k].key() == k` holds for
    /// every entry.
    pub fn type_for(&self, key: &Key) -> &'a Type<'a> {
        if let Some(&ty) = self.by_key.borrow().get(key) {
            return ty;
        }
        let ty = key.to_type(self);
        if ty.key() == *key {
            self.by_key.borrow_mut().insert(key.clone(), ty);
        }
        ty
    }

    pub fn lookup_opt(&self, name: &str) -> Option<&'a Type<'a>> {
        self.by_name.borrow().get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> Result<&'a Type<'a>, TypeError> {
        self.lookup_opt(name)
            .ok_or_else(|| TypeError::UnknownType(EcoString::from(name)))
    }

    /// The datatype (scheme) owning a value constructor, if any.
    pub fn constructor_opt(&self, name: &str) -> Option<&'a Type<'a>> {
        self.constructor_by_name.borrow().get(name).copied()
    }

    // Factory methods for types.
    pub fn primitive(&self, p: Primitive) -> &'a Type<'a> {
        self.type_for(&Key::Primitive(p))
    }

    pub fn bool_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::Bool)
    }

    pub fn char_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::Char)
    }

    pub fn int_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::Int)
    }

    pub fn real_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::Real)
    }

    pub fn string_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::String)
    }

    pub fn unit_type(&self) -> &'a Type<'a> {
        self.primitive(Primitive::Unit)
    }

    pub fn dummy_type(&self) -> &'a Type<'a> {
        self.type_for(&Key::Dummy)
    }

    pub fn type_variable(&self, ordinal: u32) -> &'a Type<'a> {
        self.type_for(&Key::Var(ordinal))
    }

    pub fn fn_type(&self, param: &'a Type<'a>, result: &'a Type<'a>) -> &'a Type<'a> {
        self.type_for(&Key::Fn(Box::new(param.key()), Box::new(result.key())))
    }

    pub fn list_type(&self, elem: &'a Type<'a>) -> &'a Type<'a> {
        self.type_for(&Key::List(Box::new(elem.key())))
    }

    /// A zero-element tuple is `unit`; a one-element tuple collapses to its
    /// element.
    pub fn tuple_type(&self, elems: &[&'a Type<'a>]) -> &'a Type<'a> {
        match elems {
            [] => self.unit_type(),
            [single] => single,
            _ => self.type_for(&Key::Tuple(elems.iter().map(|t| t.key()).collect())),
        }
    }

    pub fn record_type(&self, fields: Vec<(&str, &'a Type<'a>)>) -> &'a Type<'a> {
        let fields: Vec<Field<'a>> = fields
            .into_iter()
            .map(|(name, t)| (self.intern_str(name), t))
            .collect();
        self.record(false, fields)
    }

    pub fn progressive_record_type(&self, fields: Vec<(&str, &'a Type<'a>)>) -> &'a Type<'a> {
        let fields: Vec<Field<'a>> = fields
            .into_iter()
            .map(|(name, t)| (self.intern_str(name), t))
            .collect();
        self.record(true, fields)
    }

    /// A map with exactly one entry denotes its value; anything else is a
    /// record.
    pub fn record_or_scalar_type(&self, fields: Vec<(&str, &'a Type<'a>)>) -> &'a Type<'a> {
        if fields.len() == 1 {
            fields[0].1
        } else {
            self.record_type(fields)
        }
    }

    pub(crate) fn record(&self, progressive: bool, mut fields: Vec<Field<'a>>) -> &'a Type<'a> {
        fields.sort_by(|(a, _), (b, _)| compare_labels(a, b));
        assert!(
            fields.windows(2).all(|w| w[0].0 != w[1].0),
            "duplicate record label"
        );
        if !progressive {
            if fields.is_empty() {
                return self.unit_type();
            }
            // Labels "1".."n" make this a tuple in disguise.
            let tuple_shaped = fields
                .iter()
                .enumerate()
                .all(|(i, (label, _))| label_int(label) == Some(i as u32 + 1));
            if tuple_shaped {
                let elems: Vec<&'a Type<'a>> = fields.iter().map(|(_, t)| *t).collect();
                return self.tuple_type(&elems);
            }
        }
        self.type_for(&Key::Record {
            progressive,
            fields: fields
                .iter()
                .map(|(name, t)| (EcoString::from(*name), t.key()))
                .collect(),
        })
    }

    /// Wraps `body` in a universal quantifier over `n` variables. `n == 0`
    /// returns `body` unchanged.
    pub fn forall(&self, body: &'a Type<'a>, n: u32) -> &'a Type<'a> {
        if n == 0 {
            return body;
        }
        let mut free = BTreeSet::new();
        body.free_vars(&mut free);
        if let Some(max) = free.last() {
            assert!(
                *max < n,
                "forall arity {n} does not cover variable ordinal {max}"
            );
        }
        self.type_for(&Key::Forall(n, Box::new(body.key())))
    }

    /// Builds a forall body from the bound variables it quantifies.
    pub fn forall_type(
        &self,
        n: u32,
        build: impl FnOnce(&[&'a Type<'a>]) -> &'a Type<'a>,
    ) -> &'a Type<'a> {
        let vars: Vec<&'a Type<'a>> = (0..n).map(|i| self.type_variable(i)).collect();
        let body = build(&vars);
        self.forall(body, n)
    }

    /// Applies a polymorphic type to arguments. A forall reduces by
    /// substitution; any other target stays as an unreduced application.
    pub fn apply(&self, ty: &'a Type<'a>, args: &[&'a Type<'a>]) -> &'a Type<'a> {
        match *ty {
            Type::Forall(n, body) => {
                assert_eq!(
                    args.len(),
                    n as usize,
                    "applied {} arguments to forall of arity {n}",
                    args.len()
                );
                self.substitute(body, args)
            }
            _ if args.is_empty() => ty,
            _ => self.type_for(&Key::Apply(
                Box::new(ty.key()),
                args.iter().map(|t| t.key()).collect(),
            )),
        }
    }

    /// Replaces `Var(i)` by `args[i]` throughout, leaving nested foralls
    /// untouched (their indices shadow the outer ones).
    pub fn substitute(&self, ty: &'a Type<'a>, args: &[&'a Type<'a>]) -> &'a Type<'a> {
        match *ty {
            Type::Var(i) => {
                assert!(
                    (i as usize) < args.len(),
                    "substitution has no argument for ordinal {i}"
                );
                args[i as usize]
            }
            Type::Forall(..) => ty,
            _ => ty.copy(self, &mut |child| self.substitute(child, args)),
        }
    }

    /// Closes a type over its free variables: free ordinals are renumbered
    /// densely and quantified by a fresh forall. A closed type is returned
    /// unchanged.
    pub fn ensure_closed(&self, ty: &'a Type<'a>) -> &'a Type<'a> {
        let mut free = BTreeSet::new();
        ty.free_vars(&mut free);
        if free.is_empty() {
            return ty;
        }
        let n = free.len() as u32;
        let dense = free.iter().copied().eq(0..n);
        let body = if dense {
            ty
        } else {
            let map: BTreeMap<u32, u32> = free
                .iter()
                .enumerate()
                .map(|(rank, ordinal)| (*ordinal, rank as u32))
                .collect();
            self.renumber(ty, &map)
        };
        self.forall(body, n)
    }

    fn renumber(&self, ty: &'a Type<'a>, map: &BTreeMap<u32, u32>) -> &'a Type<'a> {
        match *ty {
            Type::Var(i) => self.type_variable(map[&i]),
            Type::Forall(..) => ty,
            _ => ty.copy(self, &mut |child| self.renumber(child, map)),
        }
    }

    /// An overload sentinel: every alternative must be a function type and
    /// no two alternatives may share a parameter type. Not a true type;
    /// the constraint engine destructures it immediately.
    pub fn multi_type(&self, types: &[&'a Type<'a>]) -> &'a Type<'a> {
        for (i, &ty) in types.iter().enumerate() {
            let Type::Fn(param, _) = *ty else {
                panic!("overload alternative is not a function: {ty}")
            };
            for &other in &types[..i] {
                let Type::Fn(other_param, _) = *other else {
                    unreachable!("checked above")
                };
                assert!(
                    !core::ptr::eq(param, other_param),
                    "overload alternatives share parameter type {param}"
                );
            }
        }
        self.type_for(&Key::Multi(types.iter().map(|t| t.key()).collect()))
    }

    /// Declares a named synonym. Transparent to unification, opaque to
    /// printing.
    pub fn alias_type(
        &self,
        name: &str,
        target: &'a Type<'a>,
        args: &[&'a Type<'a>],
    ) -> &'a Type<'a> {
        let key = Key::Alias {
            name: EcoString::from(name),
            args: args.iter().map(|t| t.key()).collect(),
        };
        if let Some(&ty) = self.by_key.borrow().get(&key) {
            return ty;
        }
        let name = self.intern_str(name);
        let ty = self.alloc_type(Type::Alias {
            name,
            target,
            args: self.alloc_type_slice(args),
        });
        self.by_key.borrow_mut().insert(key, ty);
        self.by_name.borrow_mut().insert(name, ty);
        ty
    }

    /// An instantiation of `data` at new arguments, sharing its generic
    /// constructor slice.
    pub(crate) fn data_type_instance(
        &self,
        data: &'a DataType<'a>,
        args: &[&'a Type<'a>],
    ) -> &'a Type<'a> {
        let key = Key::Data {
            name: EcoString::from(data.name()),
            args: args.iter().map(|t| t.key()).collect(),
        };
        if let Some(&ty) = self.by_key.borrow().get(&key) {
            return ty;
        }
        let dt = &*self.arena.alloc(DataType::new(
            data.name(),
            self.alloc_type_slice(args),
            data.constructors(),
            false,
        ));
        let ty = self.alloc_type(Type::Data(dt));
        self.by_key.borrow_mut().insert(key, ty);
        ty
    }

    /// Defines one or more datatypes in a single declaration; mutual and
    /// self references in constructor payloads are written as
    /// [`Key::Name`] and resolved through a transaction overlay.
    ///
    /// Returns the registered scheme for each definition: the datatype
    /// itself when it has no parameters, otherwise a forall wrapping it.
    pub fn data_types(&self, defs: &[DataTypeDef]) -> Vec<&'a Type<'a>> {
        let mut tx = self.transaction();
        // Pass 1: a temporary placeholder per definition, so payload keys
        // can resolve names that do not exist yet.
        for def in defs {
            let name = self.intern_str(&def.name);
            let args: Vec<&'a Type<'a>> =
                (0..def.params).map(|i| self.type_variable(i)).collect();
            let tmp = &*self.arena.alloc(DataType::new(
                name,
                self.alloc_type_slice(&args),
                &[],
                true,
            ));
            tx.install(name, self.alloc_type(Type::Data(tmp)));
        }
        // Pass 2: the real datatypes; payloads may still point at
        // temporaries.
        let mut built: Vec<(&'a str, &'a DataType<'a>, &'a Type<'a>)> = Vec::new();
        for def in defs {
            let name = self.intern_str(&def.name);
            let args: Vec<&'a Type<'a>> =
                (0..def.params).map(|i| self.type_variable(i)).collect();
            let ctors: Vec<(&'a str, &'a Type<'a>)> = def
                .constructors
                .iter()
                .map(|(cname, payload)| {
                    let payload = match payload {
                        Some(key) => self.type_for(key),
                        None => self.dummy_type(),
                    };
                    (self.intern_str(cname), payload)
                })
                .collect();
            assert!(!ctors.is_empty(), "datatype {name} has no constructors");
            let dt = &*self.arena.alloc(DataType::new(
                name,
                self.alloc_type_slice(&args),
                self.arena.alloc_slice_copy(&ctors),
                false,
            ));
            let ty = self.alloc_type(Type::Data(dt));
            let key = Key::Data {
                name: def.name.clone(),
                args: args.iter().map(|t| t.key()).collect(),
            };
            self.by_key.borrow_mut().insert(key, ty);
            built.push((name, dt, ty));
        }
        // Pass 3: swap temporaries for the real datatypes inside every
        // constructor payload. The single mutation a datatype ever sees,
        // performed before any caller can observe it.
        let mut real_by_name: HashMap<&str, &'a Type<'a>> = HashMap::new();
        for &(name, _, ty) in &built {
            real_by_name.insert(name, ty);
        }
        for &(_, dt, _) in &built {
            let ctors = dt.constructors();
            let resolved: Vec<(&'a str, &'a Type<'a>)> = ctors
                .iter()
                .map(|(cname, t)| (*cname, self.resolve_temporaries(t, &real_by_name)))
                .collect();
            let changed = ctors
                .iter()
                .zip(resolved.iter())
                .any(|((_, a), (_, b))| !core::ptr::eq(*a, *b));
            if changed {
                dt.set_constructors(self.arena.alloc_slice_copy(&resolved));
            }
        }
        // Pass 4: register schemes and value constructors. Registration
        // overwrites the temporary entries; the transaction removes only
        // what is still temporary when it closes.
        let mut result = Vec::new();
        for (def, &(name, dt, ty)) in defs.iter().zip(built.iter()) {
            let scheme = if def.params == 0 {
                ty
            } else {
                self.forall(ty, def.params)
            };
            self.by_name.borrow_mut().insert(name, scheme);
            for &(cname, _) in dt.constructors() {
                self.constructor_by_name.borrow_mut().insert(cname, scheme);
            }
            tracing::debug!(
                name,
                constructors = dt.constructors().len(),
                "defined datatype"
            );
            result.push(scheme);
        }
        result
    }

    /// Single-definition convenience over [`TypeSystem::data_types`].
    pub fn data_type_scheme(&self, def: DataTypeDef) -> &'a Type<'a> {
        self.data_types(core::slice::from_ref(&def))
            .pop()
            .expect("one definition yields one scheme")
    }

    fn resolve_temporaries(
        &self,
        ty: &'a Type<'a>,
        real: &HashMap<&str, &'a Type<'a>>,
    ) -> &'a Type<'a> {
        match *ty {
            Type::Data(d) if d.is_temporary() => real
                .get(d.name())
                .copied()
                .unwrap_or_else(|| panic!("unresolved temporary type {}", d.name())),
            Type::Forall(..) => ty,
            _ => ty.copy(self, &mut |child| self.resolve_temporaries(child, real)),
        }
    }

    /// A scoped overlay on the name table. Names installed through the
    /// returned guard are removed again when it drops, on every exit path,
    /// unless a permanent registration replaced them first.
    pub fn transaction(&self) -> Transaction<'_, 'a> {
        Transaction {
            ts: self,
            installed: Vec::new(),
        }
    }
}

/// See [`TypeSystem::transaction`].
pub struct Transaction<'ts, 'a> {
    ts: &'ts TypeSystem<'a>,
    installed: Vec<&'a str>,
}

impl<'ts, 'a> Transaction<'ts, 'a> {
    pub fn install(&mut self, name: &'a str, ty: &'a Type<'a>) {
        self.ts.by_name.borrow_mut().insert(name, ty);
        self.installed.push(name);
    }
}

impl Drop for Transaction<'_, '_> {
    fn drop(&mut self) {
        for name in self.installed.drain(..) {
            let still_temporary = matches!(
                self.ts.by_name.borrow().get(name),
                Some(Type::Data(d)) if d.is_temporary()
            );
            if still_temporary {
                self.ts.by_name.borrow_mut().remove(name);
            }
            // Key::Name entries exist only for temporaries.
            let key = Key::Name(EcoString::from(name));
            let key_temporary = matches!(
                self.ts.by_key.borrow().get(&key),
                Some(Type::Data(d)) if d.is_temporary()
            );
            if key_temporary {
                self.ts.by_key.borrow_mut().remove(&key);
            }
        }
    }
}
