pub mod binding;
pub mod key;
pub mod matcher;
pub mod ordering;
pub mod system;
mod ty;


pub use binding::{Binding, BindingKind};
pub use key::Key;
pub use matcher::unify_with;
pub use system::{DataTypeDef, Transaction, TypeError, TypeSystem};
pub use ty::{DataType, Field, Primitive, Type, var_name};
