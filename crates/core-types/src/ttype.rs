//! Element type descriptors.

use std::sync::{Arc, LazyLock};

/// Opaque element type descriptor.
///
/// `code` is the unique key fragment embedded in algorithm and program cache
/// keys (`INT`, `FLOAT`, ...). `cl_decl` is the OpenCL-side spelling of the
/// type, substituted into kernel templates as a `typedef`. A `byte_size` of
/// zero marks a pattern (value-less) type: operands of that type carry
/// structure only and algorithms take the no-values path.
#[derive(Debug, PartialEq, Eq)]
pub struct Type {
    name: String,
    code: String,
    byte_size: usize,
    cl_decl: String,
}

pub type TypeRef = Arc<Type>;

impl Type {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        byte_size: usize,
        cl_decl: impl Into<String>,
    ) -> TypeRef {
        Arc::new(Type {
            name: name.into(),
            code: code.into(),
            byte_size,
            cl_decl: cl_decl.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key fragment for registry and program cache keys.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// OpenCL declaration snippet this type expands to in templates.
    pub fn cl_decl(&self) -> &str {
        &self.cl_decl
    }

    /// Pattern types (byte size 0) carry no values.
    pub fn has_values(&self) -> bool {
        self.byte_size > 0
    }
}

pub static INT: LazyLock<TypeRef> = LazyLock::new(|| Type::new("int", "INT", 4, "int"));
pub static UINT: LazyLock<TypeRef> = LazyLock::new(|| Type::new("uint", "UINT", 4, "uint"));
pub static FLOAT: LazyLock<TypeRef> = LazyLock::new(|| Type::new("float", "FLOAT", 4, "float"));
pub static DOUBLE: LazyLock<TypeRef> = LazyLock::new(|| Type::new("double", "DOUBLE", 8, "double"));
/// Structure-only operands (pattern masks, unweighted graphs).
pub static VOID: LazyLock<TypeRef> = LazyLock::new(|| Type::new("void", "VOID", 0, "void"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_codes_are_distinct() {
        let codes = [
            INT.code(),
            UINT.code(),
            FLOAT.code(),
            DOUBLE.code(),
            VOID.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn void_has_no_values() {
        assert!(!VOID.has_values());
        assert_eq!(VOID.byte_size(), 0);
        assert!(INT.has_values());
    }
}
