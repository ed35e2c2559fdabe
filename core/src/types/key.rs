//! Structural type keys.
//!
//! A [`Key`] is the owned, hashable identifier under which a type is
//! interned. Keys are also the canonical printer: [`Key::describe`] emits
//! the surface syntax (`'a list -> 'a`, `{a:int, b:bool}`, ...) with
//! precedence-driven parenthesization.

use core::fmt;

use ecow::EcoString;

use crate::types::ty::{Field, Primitive, Type, var_name};
use crate::types::system::TypeSystem;
use crate::{Box, Vec};

const PREC_FORALL: u8 = 1;
const PREC_FN: u8 = 5;
const PREC_TUPLE: u8 = 7;
const PREC_APPLY: u8 = 8;

/// Structural identifier for a type shape. See module docs.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Var(u32),
    Primitive(Primitive),
    Fn(Box<Key>, Box<Key>),
    List(Box<Key>),
    /// At least two elements; smaller tuples collapse before a key is built.
    Tuple(Vec<Key>),
    /// Fields must be sorted by [`crate::types::ordering::compare_labels`].
    Record {
        progressive: bool,
        fields: Vec<(EcoString, Key)>,
    },
    /// A declared datatype applied to arguments. Nominal: the constructor
    /// payloads are not part of the identity.
    Data { name: EcoString, args: Vec<Key> },
    /// A bare reference to a declared name; used for the temporary
    /// placeholders installed while a recursive datatype is being built.
    Name(EcoString),
    Forall(u32, Box<Key>),
    Apply(Box<Key>, Vec<Key>),
    Alias { name: EcoString, args: Vec<Key> },
    Multi(Vec<Key>),
    Dummy,
}

impl Key {
    /// Materializes the type this key stands for. The sole constructor
    /// authority behind [`TypeSystem::type_for`]; children are interned
    /// before the parent, so child links are already canonical.
    ///
    /// # Panics
    ///
    /// `Data`, `Name` and `Alias` keys resolve through the name table and
    /// panic if the name was never declared; that is a caller bug, not a
    /// recoverable error.
    pub fn to_type<'a>(&self, ts: &TypeSystem<'a>) -> &'a Type<'a> {
        match self {
            Key::Var(i) => ts.alloc_type(Type::Var(*i)),
            Key::Primitive(p) => ts.alloc_type(Type::Primitive(*p)),
            Key::Fn(param, result) => {
                let param = ts.type_for(param);
                let result = ts.type_for(result);
                ts.alloc_type(Type::Fn(param, result))
            }
            Key::List(elem) => {
                let elem = ts.type_for(elem);
                ts.alloc_type(Type::List(elem))
            }
            Key::Tuple(keys) => {
                assert!(keys.len() >= 2, "tuple key with fewer than 2 elements");
                let elems: Vec<&'a Type<'a>> = keys.iter().map(|k| ts.type_for(k)).collect();
                ts.alloc_type(Type::Tuple(ts.alloc_type_slice(&elems)))
            }
            Key::Record {
                progressive,
                fields,
            } => {
                let fields: Vec<Field<'a>> = fields
                    .iter()
                    .map(|(name, k)| (ts.intern_str(name), ts.type_for(k)))
                    .collect();
                ts.alloc_type(Type::Record {
                    progressive: *progressive,
                    fields: ts.alloc_fields(&fields),
                })
            }
            Key::Data { name, args } => {
                let scheme = ts
                    .lookup_opt(name)
                    .unwrap_or_else(|| panic!("datatype key names undeclared type {name}"));
                if args.is_empty() {
                    scheme
                } else {
                    let args: Vec<&'a Type<'a>> = args.iter().map(|k| ts.type_for(k)).collect();
                    ts.apply(scheme, &args)
                }
            }
            Key::Name(name) => ts
                .lookup_opt(name)
                .unwrap_or_else(|| panic!("name key names undeclared type {name}")),
            Key::Forall(n, body) => {
                let body = ts.type_for(body);
                ts.alloc_type(Type::Forall(*n, body))
            }
            Key::Apply(poly, args) => {
                let poly = ts.type_for(poly);
                let args: Vec<&'a Type<'a>> = args.iter().map(|k| ts.type_for(k)).collect();
                if matches!(poly, Type::Forall(..)) {
                    // Reducible application; the reduced type interns under
                    // its own key.
                    ts.apply(poly, &args)
                } else {
                    ts.alloc_type(Type::Apply(poly, ts.alloc_type_slice(&args)))
                }
            }
            Key::Alias { name, .. } => ts
                .lookup_opt(name)
                .unwrap_or_else(|| panic!("alias key names undeclared type {name}")),
            Key::Multi(keys) => {
                let types: Vec<&'a Type<'a>> = keys.iter().map(|k| ts.type_for(k)).collect();
                ts.alloc_type(Type::Multi(ts.alloc_type_slice(&types)))
            }
            Key::Dummy => ts.alloc_type(Type::Dummy),
        }
    }

    /// Writes the canonical textual form. `left` and `right` are the
    /// binding strengths of the surrounding context; a construct
    /// parenthesizes itself when its own precedence is below either.
    pub fn describe(
        &self,
        f: &mut fmt::Formatter<'_>,
        left: u8,
        right: u8,
    ) -> fmt::Result {
        match self {
            Key::Var(i) => write!(f, "'{}", var_name(*i)),
            Key::Primitive(p) => f.write_str(p.name()),
            Key::Name(name) => f.write_str(name),
            Key::Dummy => f.write_str("dummy"),
            Key::Fn(param, result) => {
                if PREC_FN < left || PREC_FN < right {
                    f.write_str("(")?;
                    self.describe(f, 0, 0)?;
                    return f.write_str(")");
                }
                param.describe(f, left, PREC_FN + 1)?;
                f.write_str(" -> ")?;
                result.describe(f, PREC_FN, right)
            }
            Key::Tuple(keys) => {
                if PREC_TUPLE < left || PREC_TUPLE < right {
                    f.write_str("(")?;
                    self.describe(f, 0, 0)?;
                    return f.write_str(")");
                }
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" * ")?;
                    }
                    k.describe(f, PREC_TUPLE + 1, PREC_TUPLE + 1)?;
                }
                Ok(())
            }
            Key::List(elem) => {
                elem.describe(f, PREC_APPLY, PREC_APPLY)?;
                f.write_str(" list")
            }
            Key::Record {
                progressive,
                fields,
            } => {
                f.write_str("{")?;
                for (i, (name, k)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}:")?;
                    k.describe(f, 0, 0)?;
                }
                if *progressive {
                    if fields.is_empty() {
                        f.write_str("...")?;
                    } else {
                        f.write_str(", ...")?;
                    }
                }
                f.write_str("}")
            }
            Key::Data { name, args } => describe_applied(f, args, |f| f.write_str(name)),
            Key::Alias { name, args } => describe_applied(f, args, |f| f.write_str(name)),
            Key::Apply(poly, args) => {
                describe_applied(f, args, |f| poly.describe(f, PREC_APPLY, PREC_APPLY))
            }
            Key::Forall(n, body) => {
                if PREC_FORALL < left || PREC_FORALL < right {
                    f.write_str("(")?;
                    self.describe(f, 0, 0)?;
                    return f.write_str(")");
                }
                f.write_str("forall")?;
                for i in 0..*n {
                    write!(f, " '{}", var_name(i))?;
                }
                f.write_str(". ")?;
                body.describe(f, PREC_FORALL, right)
            }
            Key::Multi(keys) => {
                let parenthesize = left > 0 || right > 0;
                if parenthesize {
                    f.write_str("(")?;
                }
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    k.describe(f, 0, 0)?;
                }
                if parenthesize {
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

/// Postfix type application: `int list`, `'a option`, `(int, bool) pair`.
fn describe_applied(
    f: &mut fmt::Formatter<'_>,
    args: &[Key],
    name: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    match args {
        [] => name(f),
        [arg] => {
            arg.describe(f, PREC_APPLY, PREC_APPLY)?;
            f.write_str(" ")?;
            name(f)
        }
        _ => {
            f.write_str("(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                arg.describe(f, 0, 0)?;
            }
            f.write_str(") ")?;
            name(f)
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0, 0)
    }
}
