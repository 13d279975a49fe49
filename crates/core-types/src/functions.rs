//! Builtin operator catalog.
//!
//! Every builtin carries the OpenCL body the program builder splices into
//! kernel templates and the equivalent host closure. Device pointer casts
//! always carry the address-space qualifier; the body reads its operands
//! through `vp_a`/`vp_b` and writes through `vp_c` so one calling convention
//! serves every element width.

use std::sync::LazyLock;

use crate::ops::{OpBinary, OpBinaryRef, OpSelect, OpSelectRef, OpUnary, OpUnaryRef};

fn binary_body(decl: &str, expr: &str) -> String {
    format!(
        "const {decl} a = *((const __global {decl}*)vp_a); \
         const {decl} b = *((const __global {decl}*)vp_b); \
         __global {decl}* c = (__global {decl}*)vp_c; \
         *c = {expr};"
    )
}

fn unary_body(decl: &str, expr: &str) -> String {
    format!(
        "const {decl} a = *((const __global {decl}*)vp_a); \
         __global {decl}* c = (__global {decl}*)vp_c; \
         *c = {expr};"
    )
}

fn select_body(decl: &str, expr: &str) -> String {
    format!(
        "const {decl} a = *((const __global {decl}*)vp_a); \
         return {expr};"
    )
}

macro_rules! builtin_binary {
    ($name:ident, $t:ty, $decl:literal, $key:expr, $cl:expr, $f:expr) => {
        pub static $name: LazyLock<OpBinaryRef> =
            LazyLock::new(|| OpBinary::from_fn::<$t, $t, $t, _>($key, binary_body($decl, $cl), $f));
    };
}

macro_rules! builtin_unary {
    ($name:ident, $t:ty, $decl:literal, $key:expr, $cl:expr, $f:expr) => {
        pub static $name: LazyLock<OpUnaryRef> =
            LazyLock::new(|| OpUnary::from_fn::<$t, $t, _>($key, unary_body($decl, $cl), $f));
    };
}

macro_rules! builtin_select {
    ($name:ident, $t:ty, $decl:literal, $key:expr, $cl:expr, $f:expr) => {
        pub static $name: LazyLock<OpSelectRef> =
            LazyLock::new(|| OpSelect::from_fn::<$t, _>($key, select_body($decl, $cl), $f));
    };
}

macro_rules! builtin_family {
    ($t:ty, $decl:literal, $suffix:literal,
     $plus:ident, $minus:ident, $mult:ident, $div:ident,
     $min:ident, $max:ident, $first:ident, $second:ident, $one:ident,
     $identity:ident, $eqzero:ident, $nqzero:ident, $gtzero:ident, $always:ident) => {
        builtin_binary!($plus, $t, $decl, concat!("PLUS_", $suffix), "a + b", |a, b| a + b);
        builtin_binary!($minus, $t, $decl, concat!("MINUS_", $suffix), "a - b", |a, b| a - b);
        builtin_binary!($mult, $t, $decl, concat!("MULT_", $suffix), "a * b", |a, b| a * b);
        builtin_binary!($div, $t, $decl, concat!("DIV_", $suffix), "a / b", |a, b| a / b);
        builtin_binary!(
            $min,
            $t,
            $decl,
            concat!("MIN_", $suffix),
            "a < b ? a : b",
            |a, b| if a < b { a } else { b }
        );
        builtin_binary!(
            $max,
            $t,
            $decl,
            concat!("MAX_", $suffix),
            "a > b ? a : b",
            |a, b| if a > b { a } else { b }
        );
        builtin_binary!($first, $t, $decl, concat!("FIRST_", $suffix), "a", |a, _b| a);
        builtin_binary!($second, $t, $decl, concat!("SECOND_", $suffix), "b", |_a, b| b);
        builtin_binary!(
            $one,
            $t,
            $decl,
            concat!("ONE_", $suffix),
            concat!("(", $decl, ")1"),
            |_a, _b| 1 as $t
        );
        builtin_unary!($identity, $t, $decl, concat!("IDENTITY_", $suffix), "a", |a| a);
        builtin_select!(
            $eqzero,
            $t,
            $decl,
            concat!("EQZERO_", $suffix),
            concat!("a == (", $decl, ")0"),
            |a| a == 0 as $t
        );
        builtin_select!(
            $nqzero,
            $t,
            $decl,
            concat!("NQZERO_", $suffix),
            concat!("a != (", $decl, ")0"),
            |a| a != 0 as $t
        );
        builtin_select!(
            $gtzero,
            $t,
            $decl,
            concat!("GTZERO_", $suffix),
            concat!("a > (", $decl, ")0"),
            |a| a > 0 as $t
        );
        builtin_select!($always, $t, $decl, concat!("ALWAYS_", $suffix), "true", |_a| true);
    };
}

builtin_family!(
    i32, "int", "INT", PLUS_INT, MINUS_INT, MULT_INT, DIV_INT, MIN_INT, MAX_INT, FIRST_INT,
    SECOND_INT, ONE_INT, IDENTITY_INT, EQZERO_INT, NQZERO_INT, GTZERO_INT, ALWAYS_INT
);

builtin_family!(
    u32, "uint", "UINT", PLUS_UINT, MINUS_UINT, MULT_UINT, DIV_UINT, MIN_UINT, MAX_UINT,
    FIRST_UINT, SECOND_UINT, ONE_UINT, IDENTITY_UINT, EQZERO_UINT, NQZERO_UINT, GTZERO_UINT,
    ALWAYS_UINT
);

builtin_family!(
    f32, "float", "FLOAT", PLUS_FLOAT, MINUS_FLOAT, MULT_FLOAT, DIV_FLOAT, MIN_FLOAT, MAX_FLOAT,
    FIRST_FLOAT, SECOND_FLOAT, ONE_FLOAT, IDENTITY_FLOAT, EQZERO_FLOAT, NQZERO_FLOAT,
    GTZERO_FLOAT, ALWAYS_FLOAT
);

builtin_family!(
    f64, "double", "DOUBLE", PLUS_DOUBLE, MINUS_DOUBLE, MULT_DOUBLE, DIV_DOUBLE, MIN_DOUBLE,
    MAX_DOUBLE, FIRST_DOUBLE, SECOND_DOUBLE, ONE_DOUBLE, IDENTITY_DOUBLE, EQZERO_DOUBLE,
    NQZERO_DOUBLE, GTZERO_DOUBLE, ALWAYS_DOUBLE
);

// Additive inverse; unsigned negation is modular on both backends.
builtin_unary!(AINV_INT, i32, "int", "AINV_INT", "-a", |a: i32| a.wrapping_neg());
builtin_unary!(AINV_UINT, u32, "uint", "AINV_UINT", "-a", |a: u32| a.wrapping_neg());
builtin_unary!(AINV_FLOAT, f32, "float", "AINV_FLOAT", "-a", |a: f32| -a);
builtin_unary!(AINV_DOUBLE, f64, "double", "AINV_DOUBLE", "-a", |a: f64| -a);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_int_evaluates() {
        let mut out = [0u8; 4];
        PLUS_INT.eval(&3i32.to_le_bytes(), &4i32.to_le_bytes(), &mut out);
        assert_eq!(i32::from_le_bytes(out), 7);
    }

    #[test]
    fn keys_embed_type_suffix() {
        assert_eq!(PLUS_FLOAT.key(), "PLUS_FLOAT");
        assert_eq!(MULT_INT.key(), "MULT_INT");
        assert_eq!(NQZERO_UINT.key(), "NQZERO_UINT");
    }

    #[test]
    fn device_pointer_casts_carry_address_space() {
        // Every cast in every builtin body must name __global, including the
        // output pointer of the double-precision addition.
        let body = PLUS_DOUBLE.source().to_string();
        assert!(body.contains("(__global double*)vp_c"));
        assert!(!body.contains(" (double*)vp_c"));
        for op in [&*PLUS_INT, &*MULT_FLOAT, &*MIN_UINT] {
            assert!(op.source().matches("__global").count() >= 3);
        }
    }

    #[test]
    fn min_max_follow_host_semantics() {
        let mut out = [0u8; 4];
        MIN_FLOAT.eval(&2.5f32.to_le_bytes(), &1.5f32.to_le_bytes(), &mut out);
        assert_eq!(f32::from_le_bytes(out), 1.5);
        MAX_INT.eval(&(-3i32).to_le_bytes(), &9i32.to_le_bytes(), &mut out);
        assert_eq!(i32::from_le_bytes(out), 9);
    }

    #[test]
    fn ainv_uint_wraps() {
        let mut out = [0u8; 4];
        AINV_UINT.eval(&1u32.to_le_bytes(), &mut out);
        assert_eq!(u32::from_le_bytes(out), u32::MAX);
    }
}
