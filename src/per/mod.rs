//! Packed Encoding Rules (aligned variant, ITU-T X.691) codec and typed value library.
//!
//! [`bits`] is the bit-cursor layer, [`primitives`] is every coder X.691 §10 mandates, [`value`]
//! is the typed templates built on top of them, and [`json`] is the diagnostic dumper decoded
//! values render themselves through.

pub mod bits;
pub mod json;
pub mod primitives;
pub mod value;

pub use bits::{BitReader, BitWriter};
pub use json::JsonWriter;

#[cfg(test)]
pub(crate) mod proptest_support {
    use super::bits::{BitReader, BitWriter};
    use crate::error::Result;

    /// Packs `value` with `pack`, decodes it back with `unpack`, and asserts the round trip is
    /// exact. Shared by every typed-value property test so the buffer-sizing and assertion logic
    /// only needs to be right once.
    pub fn assert_pack_unpack_roundtrip<T: PartialEq + std::fmt::Debug>(
        value: &T,
        pack: impl FnOnce(&T, &mut BitWriter) -> Result<()>,
        unpack: impl FnOnce(&mut BitReader) -> Result<T>,
    ) {
        let mut buf = [0u8; 512];
        {
            let mut w = BitWriter::new(&mut buf);
            pack(value, &mut w).expect("pack should not fail for a valid value");
        }
        let mut r = BitReader::new(&buf);
        let decoded = unpack(&mut r).expect("unpack should not fail on freshly packed bytes");
        assert_eq!(&decoded, value, "round trip did not preserve the value");
    }
}

#[cfg(test)]
mod proptests {
    use super::primitives::*;
    use super::proptest_support::assert_pack_unpack_roundtrip;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn constrained_whole_number_roundtrips(n in 0i64..=1000, lb in 0i64..=10, ub in 1000i64..=2000) {
            let n = n.clamp(lb, ub);
            assert_pack_unpack_roundtrip(
                &n,
                |v, w| pack_constrained_whole_number(w, *v, lb, ub),
                |r| unpack_constrained_whole_number(r, lb, ub),
            );
        }

        #[test]
        fn unconstrained_whole_number_roundtrips(n in any::<i32>()) {
            let n = n as i64;
            assert_pack_unpack_roundtrip(
                &n,
                |v, w| pack_unconstrained_whole_number(w, *v),
                |r| unpack_unconstrained_whole_number(r),
            );
        }

        #[test]
        fn octetstring_roundtrips(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
            let lb = 0usize;
            let ub = 65_535usize;
            assert_pack_unpack_roundtrip(
                &bytes,
                |v, w| pack_octetstring(w, v, lb, ub, true),
                |r| unpack_octetstring(r, lb, ub, true),
            );
        }
    }
}
