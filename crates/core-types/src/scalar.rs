//! Bridge between typed host scalars and the byte-oriented value storage.
//!
//! Storage blocks keep values as little-endian raw bytes (`nvals * byte_size`)
//! so one algorithm instance serves every element type. `Scalar` is the rim
//! of that design: typed construction and readback for callers and tests,
//! and typed closures for builtin operators.

use crate::ttype::{TypeRef, DOUBLE, FLOAT, INT, UINT};

/// Host-side scalar that can round-trip through byte storage.
pub trait Scalar: Copy + PartialEq + Send + Sync + 'static {
    const CODE: &'static str;
    const BYTE_SIZE: usize;

    fn ttype() -> TypeRef;
    fn write_to(self, out: &mut [u8]);
    fn read_from(bytes: &[u8]) -> Self;

    fn encode_vec(vals: &[Self]) -> Vec<u8> {
        let mut out = vec![0u8; vals.len() * Self::BYTE_SIZE];
        for (i, v) in vals.iter().enumerate() {
            v.write_to(&mut out[i * Self::BYTE_SIZE..(i + 1) * Self::BYTE_SIZE]);
        }
        out
    }

    fn decode_vec(bytes: &[u8]) -> Vec<Self> {
        debug_assert_eq!(bytes.len() % Self::BYTE_SIZE, 0);
        bytes
            .chunks_exact(Self::BYTE_SIZE)
            .map(Self::read_from)
            .collect()
    }
}

macro_rules! impl_scalar {
    ($t:ty, $code:literal, $size:literal, $ttype:expr) => {
        impl Scalar for $t {
            const CODE: &'static str = $code;
            const BYTE_SIZE: usize = $size;

            fn ttype() -> TypeRef {
                $ttype.clone()
            }

            fn write_to(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            fn read_from(bytes: &[u8]) -> Self {
                <$t>::from_le_bytes(bytes.try_into().expect("scalar byte width"))
            }
        }
    };
}

impl_scalar!(i32, "INT", 4, *INT);
impl_scalar!(u32, "UINT", 4, *UINT);
impl_scalar!(f32, "FLOAT", 4, *FLOAT);
impl_scalar!(f64, "DOUBLE", 8, *DOUBLE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let vals = [1i32, -7, i32::MAX];
        let bytes = i32::encode_vec(&vals);
        assert_eq!(bytes.len(), 12);
        assert_eq!(i32::decode_vec(&bytes), vals);
    }

    #[test]
    fn scalar_codes_match_type_descriptors() {
        assert_eq!(i32::CODE, i32::ttype().code());
        assert_eq!(f64::ttype().byte_size(), f64::BYTE_SIZE);
    }
}
