use core::cell::Cell;
use core::fmt;

use alloc::collections::BTreeSet;
use ecow::EcoString;
use smallvec::SmallVec;

use crate::types::key::Key;
use crate::types::system::TypeSystem;
use crate::{Box, Vec};

/// The six built-in scalar types.
///
/// `Unit` behaves like a record with zero fields; it is what a zero-element
/// tuple collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    Int,
    Real,
    String,
    Unit,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Primitive::Bool,
        Primitive::Char,
        Primitive::Int,
        Primitive::Real,
        Primitive::String,
        Primitive::Unit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Real => "real",
            Primitive::String => "string",
            Primitive::Unit => "unit",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name of a type variable ordinal: `a` for 0, `b` for 1, ... `z`
/// for 25, then `ba`, `bb`, ... (base 26 in the alphabet a-z). Printers
/// prepend the tick, e.g. `'a`.
pub fn var_name(ordinal: u32) -> EcoString {
    let mut ordinal = ordinal;
    let mut bytes = SmallVec::<[u8; 8]>::new();
    loop {
        bytes.push(b'a' + (ordinal % 26) as u8);
        ordinal /= 26;
        if ordinal == 0 {
            break;
        }
    }
    bytes.reverse();
    // The buffer only ever holds bytes in a..z.
    EcoString::from(core::str::from_utf8(&bytes).expect("ascii"))
}

/// A record field: label plus field type. Field slices are always sorted by
/// [`crate::types::ordering::compare_labels`].
pub type Field<'a> = (&'a str, &'a Type<'a>);

/// An algebraic datatype.
///
/// `constructors` maps constructor name to argument type in declaration
/// order; nullary constructors carry [`Type::Dummy`]. Payload types are
/// stored generically (they refer to the datatype's own parameters as
/// `Type::Var(i)`); [`DataType::constructor_type`] substitutes the actual
/// arguments. Sharing the generic payload slice between instantiations is
/// what keeps every traversal of the (cyclic, after fixup) datatype graph
/// finite: walks descend into `args`, never into payloads.
///
/// The constructor slice is patched exactly once, while resolving the
/// temporary placeholders of a recursive definition, before the datatype is
/// visible to any caller.
pub struct DataType<'a> {
    name: &'a str,
    args: &'a [&'a Type<'a>],
    constructors: Cell<&'a [(&'a str, &'a Type<'a>)]>,
    temporary: Cell<bool>,
}

impl<'a> DataType<'a> {
    pub(crate) fn new(
        name: &'a str,
        args: &'a [&'a Type<'a>],
        constructors: &'a [(&'a str, &'a Type<'a>)],
        temporary: bool,
    ) -> Self {
        DataType {
            name,
            args,
            constructors: Cell::new(constructors),
            temporary: Cell::new(temporary),
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn args(&self) -> &'a [&'a Type<'a>] {
        self.args
    }

    /// The generic constructor list, in declaration order.
    pub fn constructors(&self) -> &'a [(&'a str, &'a Type<'a>)] {
        self.constructors.get()
    }

    /// The argument type of a constructor, instantiated at this datatype's
    /// arguments. `None` if the constructor does not belong to this
    /// datatype; nullary constructors yield [`Type::Dummy`].
    pub fn constructor_type(
        &self,
        ts: &TypeSystem<'a>,
        name: &str,
    ) -> Option<&'a Type<'a>> {
        self.constructors
            .get()
            .iter()
            .find(|&&(n, _)| n == name)
            .map(|&(_, t)| ts.substitute(t, self.args))
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary.get()
    }

    /// The single post-construction mutation: installing the
    /// temporary-free constructor slice during recursive-definition fixup.
    pub(crate) fn set_constructors(&self, constructors: &'a [(&'a str, &'a Type<'a>)]) {
        self.constructors.set(constructors);
    }
}

impl fmt::Debug for DataType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Deliberately shallow: the constructor graph is cyclic.
        f.debug_struct("DataType")
            .field("name", &self.name)
            .field("args", &self.args.len())
            .field("temporary", &self.temporary.get())
            .finish()
    }
}

/// A canonical, interned type. Equality of interned types is pointer
/// equality; every `Type` is created through [`TypeSystem::type_for`] and
/// lives for the lifetime of its arena.
#[derive(Clone, Copy, Debug)]
pub enum Type<'a> {
    /// A type variable, printed `'a`, `'b`, ... by ordinal.
    Var(u32),
    Primitive(Primitive),
    /// Function type, right-associative.
    Fn(&'a Type<'a>, &'a Type<'a>),
    List(&'a Type<'a>),
    /// A record whose labels are exactly `"1".."n"`, n >= 2.
    Tuple(&'a [&'a Type<'a>]),
    /// General record; `progressive` records may grow more fields on demand
    /// and print with a trailing `...`.
    Record {
        progressive: bool,
        fields: &'a [Field<'a>],
    },
    Data(&'a DataType<'a>),
    /// Universal quantification over `n` variables `Var(0)..Var(n-1)`.
    Forall(u32, &'a Type<'a>),
    /// An application of a polymorphic type that cannot yet be reduced.
    Apply(&'a Type<'a>, &'a [&'a Type<'a>]),
    /// A named synonym: unifies as its target, prints under its own name.
    Alias {
        name: &'a str,
        target: &'a Type<'a>,
        args: &'a [&'a Type<'a>],
    },
    /// Overload alternatives; a sentinel destructured by the constraint
    /// engine, never part of a solved substitution.
    Multi(&'a [&'a Type<'a>]),
    /// Placeholder argument of a nullary constructor.
    Dummy,
}

impl<'a> Type<'a> {
    /// The structural key under which this type is interned.
    pub fn key(&self) -> Key {
        match self {
            Type::Var(i) => Key::Var(*i),
            Type::Primitive(p) => Key::Primitive(*p),
            Type::Fn(param, result) => Key::Fn(Box::new(param.key()), Box::new(result.key())),
            Type::List(elem) => Key::List(Box::new(elem.key())),
            Type::Tuple(elems) => Key::Tuple(elems.iter().map(|t| t.key()).collect()),
            Type::Record {
                progressive,
                fields,
            } => Key::Record {
                progressive: *progressive,
                fields: fields
                    .iter()
                    .map(|(name, t)| (EcoString::from(*name), t.key()))
                    .collect(),
            },
            Type::Data(data) => {
                if data.is_temporary() {
                    Key::Name(EcoString::from(data.name()))
                } else {
                    Key::Data {
                        name: EcoString::from(data.name()),
                        args: data.args().iter().map(|t| t.key()).collect(),
                    }
                }
            }
            Type::Forall(n, body) => Key::Forall(*n, Box::new(body.key())),
            Type::Apply(poly, args) => Key::Apply(
                Box::new(poly.key()),
                args.iter().map(|t| t.key()).collect(),
            ),
            Type::Alias { name, args, .. } => Key::Alias {
                name: EcoString::from(*name),
                args: args.iter().map(|t| t.key()).collect(),
            },
            Type::Multi(types) => Key::Multi(types.iter().map(|t| t.key()).collect()),
            Type::Dummy => Key::Dummy,
        }
    }

    /// Rebuilds this type with `transform` applied to each immediate child,
    /// re-interning through `ts`. Identity-preserving: if no child changes,
    /// the original object is returned.
    ///
    /// This is the single substitution mechanism; the transformer drives
    /// the recursion. Datatype children are the type arguments only, so
    /// `copy` stays finite on the cyclic datatype graph.
    pub fn copy(
        &'a self,
        ts: &TypeSystem<'a>,
        transform: &mut dyn FnMut(&'a Type<'a>) -> &'a Type<'a>,
    ) -> &'a Type<'a> {
        match *self {
            Type::Var(_) | Type::Primitive(_) | Type::Dummy => self,
            // No copy semantics: a sentinel the constraint engine
            // destructures before substitution ever sees it.
            Type::Multi(_) => self,
            Type::Fn(param, result) => {
                let param2 = transform(param);
                let result2 = transform(result);
                if core::ptr::eq(param, param2) && core::ptr::eq(result, result2) {
                    self
                } else {
                    ts.fn_type(param2, result2)
                }
            }
            Type::List(elem) => {
                let elem2 = transform(elem);
                if core::ptr::eq(elem, elem2) {
                    self
                } else {
                    ts.list_type(elem2)
                }
            }
            Type::Tuple(elems) => {
                let elems2: Vec<&'a Type<'a>> = elems.iter().map(|&t| transform(t)).collect();
                if same_refs(elems, &elems2) {
                    self
                } else {
                    ts.tuple_type(&elems2)
                }
            }
            Type::Record {
                progressive,
                fields,
            } => {
                let fields2: Vec<Field<'a>> = fields
                    .iter()
                    .map(|&(name, t)| (name, transform(t)))
                    .collect();
                if fields
                    .iter()
                    .zip(fields2.iter())
                    .all(|((_, a), (_, b))| core::ptr::eq(*a, *b))
                {
                    self
                } else {
                    ts.record(progressive, fields2)
                }
            }
            Type::Data(data) => {
                let args2: Vec<&'a Type<'a>> =
                    data.args().iter().map(|&t| transform(t)).collect();
                if same_refs(data.args(), &args2) {
                    self
                } else {
                    ts.data_type_instance(data, &args2)
                }
            }
            Type::Forall(n, body) => {
                let body2 = transform(body);
                if core::ptr::eq(body, body2) {
                    self
                } else {
                    ts.forall(body2, n)
                }
            }
            Type::Apply(poly, args) => {
                let poly2 = transform(poly);
                let args2: Vec<&'a Type<'a>> = args.iter().map(|&t| transform(t)).collect();
                if core::ptr::eq(poly, poly2) && same_refs(args, &args2) {
                    self
                } else {
                    ts.apply(poly2, &args2)
                }
            }
            Type::Alias { name, target, args } => {
                let target2 = transform(target);
                let args2: Vec<&'a Type<'a>> = args.iter().map(|&t| transform(t)).collect();
                if core::ptr::eq(target, target2) && same_refs(args, &args2) {
                    self
                } else {
                    ts.alias_type(name, target2, &args2)
                }
            }
        }
    }

    /// Follows alias targets to the underlying type.
    pub fn unfold_alias(&'a self) -> &'a Type<'a> {
        let mut t = self;
        while let Type::Alias { target, .. } = *t {
            t = target;
        }
        t
    }

    /// Collects the ordinals of free type variables. `Forall` bodies are
    /// closed and datatype payloads are generic over their own parameters,
    /// so neither contributes.
    pub fn free_vars(&'a self, out: &mut BTreeSet<u32>) {
        match self {
            Type::Var(i) => {
                out.insert(*i);
            }
            Type::Primitive(_) | Type::Dummy | Type::Forall(..) => {}
            Type::Fn(param, result) => {
                param.free_vars(out);
                result.free_vars(out);
            }
            Type::List(elem) => elem.free_vars(out),
            Type::Tuple(elems) => {
                for t in *elems {
                    t.free_vars(out);
                }
            }
            Type::Record { fields, .. } => {
                for (_, t) in *fields {
                    t.free_vars(out);
                }
            }
            Type::Data(data) => {
                for t in data.args() {
                    t.free_vars(out);
                }
            }
            Type::Apply(poly, args) => {
                poly.free_vars(out);
                for t in *args {
                    t.free_vars(out);
                }
            }
            Type::Alias { target, args, .. } => {
                target.free_vars(out);
                for t in *args {
                    t.free_vars(out);
                }
            }
            Type::Multi(types) => {
                for t in *types {
                    t.free_vars(out);
                }
            }
        }
    }

    pub fn is_progressive(&self) -> bool {
        matches!(
            self,
            Type::Record {
                progressive: true,
                ..
            }
        )
    }
}

fn same_refs<'a>(old: &[&'a Type<'a>], new: &[&'a Type<'a>]) -> bool {
    old.iter()
        .zip(new.iter())
        .all(|(a, b)| core::ptr::eq(*a, *b))
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_name() {
        assert_eq!(var_name(0), "a");
        assert_eq!(var_name(1), "b");
        assert_eq!(var_name(25), "z");
        assert_eq!(var_name(26), "ba");
        assert_eq!(var_name(27), "bb");
        assert_eq!(var_name(26 * 26), "baa");
    }

    #[test]
    fn test_primitive_names() {
        for p in Primitive::ALL {
            assert_eq!(Primitive::from_name(p.name()), Some(p));
        }
        assert_eq!(Primitive::from_name("float"), None);
    }
}
