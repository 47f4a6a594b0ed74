//! Shared type descriptors and the process-wide intern table.
//!
//! Types are immutable after construction and shared through `Arc`. The
//! [`TypeTable`] guarantees that two structurally equal types resolve to
//! the same descriptor; primitive types are singletons registered when
//! the table is created.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    U8,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    Str,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::U8 => "u8",
            Primitive::I32 => "i32",
            Primitive::U32 => "u32",
            Primitive::I64 => "i64",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
            Primitive::Str => "str",
        }
    }
}

/// A Flint type. Structural equality is derived; rendering goes through
/// `Display` and doubles as the intern key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(Primitive),
    /// Fixed-width SIMD vector of a numeric primitive, e.g. `i32x4`.
    Simd { base: Primitive, width: u8 },
    Array { element: Arc<Type> },
    Tuple { elements: Vec<Arc<Type>> },
    Optional { base: Arc<Type> },
    /// Reference to a data module by name.
    Data { name: String },
    Variant { name: String },
    ErrorSet { name: String },
    FnPtr {
        params: Vec<Arc<Type>>,
        returns: Vec<Arc<Type>>,
    },
}

impl Type {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_) | Type::Simd { .. })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::Simd { base, width } => write!(f, "{}x{}", base.name(), width),
            Type::Array { element } => write!(f, "{}[]", element),
            Type::Tuple { elements } => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            Type::Optional { base } => write!(f, "{}?", base),
            Type::Data { name } => write!(f, "{}", name),
            Type::Variant { name } => write!(f, "{}", name),
            Type::ErrorSet { name } => write!(f, "{}", name),
            Type::FnPtr { params, returns } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")?;
                if !returns.is_empty() {
                    write!(f, " -> ")?;
                    for (i, ret) in returns.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", ret)?;
                    }
                }
                Ok(())
            }
        }
    }
}

const SIMD_WIDTHS: &[(Primitive, &[u8])] = &[
    (Primitive::U8, &[2, 3, 4, 8]),
    (Primitive::I32, &[2, 3, 4, 8]),
    (Primitive::I64, &[2, 3, 4]),
    (Primitive::F32, &[2, 3, 4, 8]),
    (Primitive::F64, &[2, 3, 4]),
];

const SCALARS: &[Primitive] = &[
    Primitive::Void,
    Primitive::Bool,
    Primitive::U8,
    Primitive::I32,
    Primitive::U32,
    Primitive::I64,
    Primitive::U64,
    Primitive::F32,
    Primitive::F64,
    Primitive::Char,
    Primitive::Str,
];

/// Intern table mapping a type's rendered form to its shared descriptor.
/// The table must be locked on every access; stabilization is never
/// assumed.
pub struct TypeTable {
    interned: Mutex<HashMap<String, Arc<Type>>>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut interned = HashMap::new();
        for &prim in SCALARS {
            let ty = Arc::new(Type::Primitive(prim));
            interned.insert(prim.name().to_string(), ty);
        }
        for &(base, widths) in SIMD_WIDTHS {
            for &width in widths {
                let ty = Arc::new(Type::Simd { base, width });
                interned.insert(ty.to_string(), ty);
            }
        }
        Self {
            interned: Mutex::new(interned),
        }
    }

    /// The shared descriptor of a scalar primitive.
    pub fn primitive_of(&self, prim: Primitive) -> Arc<Type> {
        self.intern(Type::Primitive(prim))
    }

    /// Look up a primitive (or SIMD) type by its source-level name.
    pub fn primitive(&self, name: &str) -> Option<Arc<Type>> {
        let table = self.interned.lock().unwrap();
        table.get(name).filter(|ty| ty.is_primitive()).cloned()
    }

    /// Whether the given identifier names a primitive type.
    pub fn is_primitive_name(&self, name: &str) -> bool {
        self.primitive(name).is_some()
    }

    /// Intern a type, returning the shared descriptor for its structure.
    pub fn intern(&self, ty: Type) -> Arc<Type> {
        let key = ty.to_string();
        let mut table = self.interned.lock().unwrap();
        if let Some(existing) = table.get(&key) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(ty);
        table.insert(key, Arc::clone(&shared));
        shared
    }

    /// Look up any interned type by its rendered form.
    pub fn lookup(&self, rendered: &str) -> Option<Arc<Type>> {
        self.interned.lock().unwrap().get(rendered).cloned()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_singletons() {
        let table = TypeTable::new();
        let a = table.primitive("i32").unwrap();
        let b = table.primitive("i32").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn interning_is_structural() {
        let table = TypeTable::new();
        let element = table.primitive("str").unwrap();
        let a = table.intern(Type::Array {
            element: Arc::clone(&element),
        });
        let b = table.intern(Type::Array { element });
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.to_string(), "str[]");
    }

    #[test]
    fn simd_widths_are_registered() {
        let table = TypeTable::new();
        assert!(table.primitive("i32x4").is_some());
        assert!(table.primitive("f64x3").is_some());
        assert!(table.primitive("i32x5").is_none());
    }

    #[test]
    fn tuple_rendering() {
        let table = TypeTable::new();
        let tuple = table.intern(Type::Tuple {
            elements: vec![
                table.primitive("i32").unwrap(),
                table.primitive("bool").unwrap(),
            ],
        });
        assert_eq!(tuple.to_string(), "(i32, bool)");
        assert!(!tuple.is_primitive());
    }
}
