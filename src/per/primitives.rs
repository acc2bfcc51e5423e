//! Primitive value coders mandated by ITU-T X.691 §10 (aligned PER).
//!
//! Every typed value template in [`crate::per::value`] is built by composing these. Keeping
//! them free functions over [`BitWriter`]/[`BitReader`] (rather than methods on the templates)
//! means the round-trip contract in §4.2.4 only has to be proven once, here.

use super::bits::{BitReader, BitWriter};
use crate::error::{Result, RlcError};

/// Number of bits needed to represent `range` distinct values: `ceil(log2(range))`, or `0` when
/// `range <= 1` (a degenerate range carries no information and costs no bits).
pub fn bits_for_range(range: u64) -> u32 {
    if range <= 1 {
        0
    } else {
        64 - (range - 1).leading_zeros()
    }
}

fn pack_constrained_uint(w: &mut BitWriter, value: u64, range: u64) -> Result<()> {
    let nbits = bits_for_range(range);
    if nbits == 0 {
        return Ok(());
    }
    w.pack(value, nbits)
}

fn unpack_constrained_uint(r: &mut BitReader, range: u64) -> Result<u64> {
    let nbits = bits_for_range(range);
    if nbits == 0 {
        return Ok(0);
    }
    r.unpack(nbits)
}

/// Constrained whole number, §10.5: `n` within `[lb, ub]` inclusive.
pub fn pack_constrained_whole_number(w: &mut BitWriter, n: i64, lb: i64, ub: i64) -> Result<()> {
    if lb > ub || n < lb || n > ub {
        return Err(RlcError::EncodeFail("value outside constrained range"));
    }
    let range = (ub - lb) as u64 + 1;
    let value = (n - lb) as u64;
    if (ub - lb) as u64 <= 65_535 {
        pack_constrained_uint(w, value, range)
    } else {
        let nbytes = ((bits_for_range(range) + 7) / 8) as usize;
        w.align_to_byte()?;
        let full = value.to_be_bytes();
        w.pack_bytes(&full[8 - nbytes..])
    }
}

pub fn unpack_constrained_whole_number(r: &mut BitReader, lb: i64, ub: i64) -> Result<i64> {
    if lb > ub {
        return Err(RlcError::DecodeFail("empty constrained range"));
    }
    let range = (ub - lb) as u64 + 1;
    if (ub - lb) as u64 <= 65_535 {
        let v = unpack_constrained_uint(r, range)?;
        Ok(lb + v as i64)
    } else {
        let nbytes = ((bits_for_range(range) + 7) / 8) as usize;
        r.align_to_byte()?;
        let bytes = r.unpack_bytes(nbytes)?;
        let mut full = [0u8; 8];
        full[8 - nbytes..].copy_from_slice(bytes);
        Ok(lb + u64::from_be_bytes(full) as i64)
    }
}

/// Length determinant in its general, unbounded form, §10.9.
pub fn pack_length_determinant_unbounded(w: &mut BitWriter, len: usize) -> Result<()> {
    if len <= 127 {
        w.pack(0, 1)?;
        w.pack(len as u64, 7)
    } else if len <= 16_383 {
        w.pack(0b10, 2)?;
        w.pack(len as u64, 14)
    } else {
        let frag = (len / 16_384).min(4);
        w.pack(0b11, 2)?;
        w.pack(frag as u64, 6)?;
        pack_length_determinant_unbounded(w, len - frag * 16_384)
    }
}

pub fn unpack_length_determinant_unbounded(r: &mut BitReader) -> Result<usize> {
    if r.unpack(1)? == 0 {
        Ok(r.unpack(7)? as usize)
    } else if r.unpack(1)? == 0 {
        Ok(r.unpack(14)? as usize)
    } else {
        let frag = r.unpack(6)? as usize;
        let rest = unpack_length_determinant_unbounded(r)?;
        Ok(frag * 16_384 + rest)
    }
}

/// Length determinant, §10.9: uses the constrained encoding when `ub` is bounded and below 64K,
/// otherwise falls back to the general unbounded form.
pub fn pack_length_determinant(w: &mut BitWriter, len: usize, lb: usize, ub: usize) -> Result<()> {
    if ub < 65_536 {
        pack_constrained_whole_number(w, len as i64, lb as i64, ub as i64)
    } else {
        pack_length_determinant_unbounded(w, len)
    }
}

pub fn unpack_length_determinant(r: &mut BitReader, lb: usize, ub: usize) -> Result<usize> {
    if ub < 65_536 {
        let v = unpack_constrained_whole_number(r, lb as i64, ub as i64)?;
        Ok(v as usize)
    } else {
        unpack_length_determinant_unbounded(r)
    }
}

/// Normally-small non-negative whole number, §10.6.
pub fn pack_normally_small_non_negative(w: &mut BitWriter, n: u64) -> Result<()> {
    if n <= 63 {
        w.pack(0, 1)?;
        w.pack(n, 6)
    } else {
        w.pack(1, 1)?;
        pack_semi_constrained_whole_number(w, n)
    }
}

pub fn unpack_normally_small_non_negative(r: &mut BitReader) -> Result<u64> {
    if r.unpack(1)? == 0 {
        r.unpack(6)
    } else {
        unpack_semi_constrained_whole_number(r)
    }
}

fn minimal_unsigned_bytes(n: u64) -> Vec<u8> {
    let full = n.to_be_bytes();
    let mut start = 0;
    while start < 7 && full[start] == 0 {
        start += 1;
    }
    full[start..].to_vec()
}

fn pack_semi_constrained_whole_number(w: &mut BitWriter, n: u64) -> Result<()> {
    let bytes = minimal_unsigned_bytes(n);
    w.align_to_byte()?;
    pack_length_determinant_unbounded(w, bytes.len())?;
    w.pack_bytes(&bytes)
}

fn unpack_semi_constrained_whole_number(r: &mut BitReader) -> Result<u64> {
    r.align_to_byte()?;
    let nbytes = unpack_length_determinant_unbounded(r)?;
    if nbytes == 0 || nbytes > 8 {
        return Err(RlcError::DecodeFail("semi-constrained length out of range"));
    }
    let bytes = r.unpack_bytes(nbytes)?;
    let mut full = [0u8; 8];
    full[8 - nbytes..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(full))
}

fn minimal_signed_bytes(n: i64) -> Vec<u8> {
    let full = n.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let b = full[start];
        let next_msb = full[start + 1] & 0x80 != 0;
        if (b == 0x00 && !next_msb) || (b == 0xff && next_msb) {
            start += 1;
        } else {
            break;
        }
    }
    full[start..].to_vec()
}

/// Unconstrained whole number, §10.8: length determinant in octets, then a minimal two's
/// complement big-endian encoding.
pub fn pack_unconstrained_whole_number(w: &mut BitWriter, n: i64) -> Result<()> {
    let bytes = minimal_signed_bytes(n);
    w.align_to_byte()?;
    pack_length_determinant_unbounded(w, bytes.len())?;
    w.pack_bytes(&bytes)
}

pub fn unpack_unconstrained_whole_number(r: &mut BitReader) -> Result<i64> {
    r.align_to_byte()?;
    let nbytes = unpack_length_determinant_unbounded(r)?;
    if nbytes == 0 || nbytes > 8 {
        return Err(RlcError::DecodeFail("unconstrained integer width out of range"));
    }
    let bytes = r.unpack_bytes(nbytes)?;
    let mut full = if bytes[0] & 0x80 != 0 { [0xffu8; 8] } else { [0u8; 8] };
    full[8 - nbytes..].copy_from_slice(bytes);
    Ok(i64::from_be_bytes(full))
}

/// Enumerated, §13: `idx` in `[0, nof_types)` is a regular value, `[nof_types, nof_types +
/// nof_exts)` is an extension value (only reachable when `has_ext`).
pub fn pack_enumerated(
    w: &mut BitWriter,
    idx: usize,
    nof_types: usize,
    nof_exts: usize,
    has_ext: bool,
) -> Result<()> {
    if has_ext && idx >= nof_types {
        let ext_idx = idx - nof_types;
        if ext_idx >= nof_exts {
            return Err(RlcError::EncodeFail("enumerated extension index out of range"));
        }
        w.pack(1, 1)?;
        pack_normally_small_non_negative(w, ext_idx as u64)
    } else if idx < nof_types {
        if has_ext {
            w.pack(0, 1)?;
        }
        pack_constrained_whole_number(w, idx as i64, 0, (nof_types - 1) as i64)
    } else {
        Err(RlcError::EncodeFail("enumerated index out of range"))
    }
}

pub fn unpack_enumerated(
    r: &mut BitReader,
    nof_types: usize,
    nof_exts: usize,
    has_ext: bool,
) -> Result<usize> {
    let is_ext = if has_ext { r.unpack(1)? == 1 } else { false };
    if is_ext {
        let ext_idx = unpack_normally_small_non_negative(r)? as usize;
        if ext_idx >= nof_exts {
            return Err(RlcError::DecodeFail("enumerated extension index out of range"));
        }
        Ok(nof_types + ext_idx)
    } else {
        let v = unpack_constrained_whole_number(r, 0, (nof_types - 1) as i64)?;
        Ok(v as usize)
    }
}

/// Octetstring, §16. `lb == ub` means a fixed-length string.
pub fn pack_octetstring(w: &mut BitWriter, bytes: &[u8], lb: usize, ub: usize, aligned: bool) -> Result<()> {
    if bytes.len() < lb || bytes.len() > ub {
        return Err(RlcError::EncodeFail("octetstring length outside bounds"));
    }
    if lb == ub {
        if aligned && lb > 2 {
            w.align_to_byte()?;
            w.pack_bytes(bytes)
        } else {
            for &b in bytes {
                w.pack(b as u64, 8)?;
            }
            Ok(())
        }
    } else {
        pack_length_determinant(w, bytes.len(), lb, ub)?;
        w.align_to_byte()?;
        w.pack_bytes(bytes)
    }
}

pub fn unpack_octetstring(r: &mut BitReader, lb: usize, ub: usize, aligned: bool) -> Result<Vec<u8>> {
    if lb == ub {
        if aligned && lb > 2 {
            r.align_to_byte()?;
            Ok(r.unpack_bytes(lb)?.to_vec())
        } else {
            let mut v = Vec::with_capacity(lb);
            for _ in 0..lb {
                v.push(r.unpack(8)? as u8);
            }
            Ok(v)
        }
    } else {
        let len = unpack_length_determinant(r, lb, ub)?;
        r.align_to_byte()?;
        Ok(r.unpack_bytes(len)?.to_vec())
    }
}

fn pack_raw_bits(w: &mut BitWriter, bits: &[u8], n_bits: usize) -> Result<()> {
    for i in 0..n_bits {
        let bit = (bits[i / 8] >> (7 - i % 8)) & 1;
        w.pack(bit as u64, 1)?;
    }
    Ok(())
}

fn unpack_raw_bits(r: &mut BitReader, n_bits: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; (n_bits + 7) / 8];
    for i in 0..n_bits {
        let bit = r.unpack(1)?;
        if bit == 1 {
            out[i / 8] |= 1 << (7 - i % 8);
        }
    }
    Ok(out)
}

/// Bitstring, §15. `lb == ub` means a fixed-length string; packed MSB-first within each byte of
/// `bits`, with any trailing bits in the last byte ignored beyond `n_bits`.
pub fn pack_bitstring(w: &mut BitWriter, bits: &[u8], n_bits: usize, lb: usize, ub: usize, aligned: bool) -> Result<()> {
    if n_bits < lb || n_bits > ub {
        return Err(RlcError::EncodeFail("bitstring length outside bounds"));
    }
    if lb == ub {
        if aligned && ub > 16 {
            w.align_to_byte()?;
        }
        pack_raw_bits(w, bits, n_bits)
    } else {
        pack_length_determinant(w, n_bits, lb, ub)?;
        w.align_to_byte()?;
        pack_raw_bits(w, bits, n_bits)
    }
}

/// Returns the decoded bits (MSB-first packed bytes) and their count.
pub fn unpack_bitstring(r: &mut BitReader, lb: usize, ub: usize, aligned: bool) -> Result<(Vec<u8>, usize)> {
    if lb == ub {
        if aligned && ub > 16 {
            r.align_to_byte()?;
        }
        Ok((unpack_raw_bits(r, ub)?, ub))
    } else {
        let n = unpack_length_determinant(r, lb, ub)?;
        r.align_to_byte()?;
        Ok((unpack_raw_bits(r, n)?, n))
    }
}

/// Extension flag for SEQUENCE / CHOICE: a 1-bit prefix present only when the type carries an
/// extension marker.
pub fn pack_extension_flag(w: &mut BitWriter, is_extension: bool) -> Result<()> {
    w.pack(is_extension as u64, 1)
}

pub fn unpack_extension_flag(r: &mut BitReader) -> Result<bool> {
    Ok(r.unpack(1)? == 1)
}

/// Scratch capacity for the open-type wrapper's nested encoding. Generous relative to the
/// largest RLC/PER messages this crate produces.
const OPEN_TYPE_SCRATCH_BYTES: usize = 4096;

/// Open type / variable-length field wrapper: byte-align, write a length determinant measuring
/// the nested encoding's octet length, then the nested encoding padded to a whole octet.
pub fn pack_open_type(w: &mut BitWriter, f: impl FnOnce(&mut BitWriter) -> Result<()>) -> Result<()> {
    let mut scratch = [0u8; OPEN_TYPE_SCRATCH_BYTES];
    let nbytes = {
        let mut inner = BitWriter::new(&mut scratch);
        f(&mut inner)?;
        inner.align_to_byte()?;
        inner.distance_bytes()
    };
    w.align_to_byte()?;
    pack_length_determinant_unbounded(w, nbytes)?;
    w.pack_bytes(&scratch[..nbytes])
}

/// Decodes an open-type field: the inner cursor is bounded to the declared octet span, and any
/// residual bits left unread by `f` are simply discarded along with the bounded sub-reader.
pub fn unpack_open_type<T>(r: &mut BitReader, f: impl FnOnce(&mut BitReader) -> Result<T>) -> Result<T> {
    r.align_to_byte()?;
    let nbytes = unpack_length_determinant_unbounded(r)?;
    let mut inner = r.sub_reader(nbytes)?;
    f(&mut inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_constrained(n: i64, lb: i64, ub: i64) {
        let mut buf = [0u8; 16];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_constrained_whole_number(&mut w, n, lb, ub).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_constrained_whole_number(&mut r, lb, ub).unwrap(), n);
    }

    #[test]
    fn s4_constrained_int_7_in_3_to_18() {
        let mut buf = [0u8; 1];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_constrained_whole_number(&mut w, 7, 3, 18).unwrap();
        }
        assert_eq!(buf[0] >> 4, 0b0100);
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_constrained_whole_number(&mut r, 3, 18).unwrap(), 7);
    }

    #[test]
    fn constrained_int_roundtrips() {
        roundtrip_constrained(0, 0, 0);
        roundtrip_constrained(5, 0, 7);
        roundtrip_constrained(-3, -10, 10);
        roundtrip_constrained(70_000, 0, 100_000);
    }

    #[test]
    fn s5_enumerated_extension() {
        let mut buf = [0u8; 1];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_enumerated(&mut w, 5, 4, 2, true).unwrap();
        }
        assert_eq!(buf[0] >> 7, 1);
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_enumerated(&mut r, 4, 2, true).unwrap(), 5);
    }

    #[test]
    fn enumerated_regular_branch_roundtrips() {
        let mut buf = [0u8; 1];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_enumerated(&mut w, 2, 4, 2, true).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_enumerated(&mut r, 4, 2, true).unwrap(), 2);
    }

    #[test]
    fn s6_dyn_octetstring_128_bytes_uses_14_bit_form() {
        let data = vec![0x5au8; 128];
        let mut buf = [0u8; 256];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_octetstring(&mut w, &data, 0, 65535, true).unwrap();
        }
        assert_eq!(buf[0] >> 6, 0b10);
        let len_bits = ((buf[0] as u16) << 8 | buf[1] as u16) & 0x3fff;
        assert_eq!(len_bits, 128);
        let mut r = BitReader::new(&buf);
        let decoded = unpack_octetstring(&mut r, 0, 65535, true).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn fixed_octetstring_short_is_bit_packed() {
        let data = [0xabu8, 0xcd];
        let mut buf = [0u8; 2];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_octetstring(&mut w, &data, 2, 2, true).unwrap();
        }
        assert_eq!(buf, data);
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_octetstring(&mut r, 2, 2, true).unwrap(), data);
    }

    #[test]
    fn bitstring_roundtrip() {
        let bits = [0b1011_0000u8];
        let mut buf = [0u8; 2];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_bitstring(&mut w, &bits, 4, 4, 4, true).unwrap();
        }
        let mut r = BitReader::new(&buf);
        let (decoded, n) = unpack_bitstring(&mut r, 4, 4, true).unwrap();
        assert_eq!(n, 4);
        assert_eq!(decoded[0] >> 4, 0b1011);
    }

    #[test]
    fn unconstrained_whole_number_roundtrip() {
        for n in [0i64, 1, -1, 127, 128, -129, 70_000, -70_000] {
            let mut buf = [0u8; 16];
            {
                let mut w = BitWriter::new(&mut buf);
                pack_unconstrained_whole_number(&mut w, n).unwrap();
            }
            let mut r = BitReader::new(&buf);
            assert_eq!(unpack_unconstrained_whole_number(&mut r).unwrap(), n);
        }
    }

    #[test]
    fn normally_small_non_negative_roundtrip() {
        for n in [0u64, 63, 64, 1000] {
            let mut buf = [0u8; 16];
            {
                let mut w = BitWriter::new(&mut buf);
                pack_normally_small_non_negative(&mut w, n).unwrap();
            }
            let mut r = BitReader::new(&buf);
            assert_eq!(unpack_normally_small_non_negative(&mut r).unwrap(), n);
        }
    }

    #[test]
    fn open_type_skips_residual_bits() {
        let mut buf = [0u8; 16];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_open_type(&mut w, |inner| pack_constrained_whole_number(inner, 3, 0, 7)).unwrap();
            // trailing junk that a real message would carry after the open-type field
            w.pack(0b101, 3).unwrap();
        }
        let mut r = BitReader::new(&buf);
        let v = unpack_open_type(&mut r, |inner| unpack_constrained_whole_number(inner, 0, 20)).unwrap();
        assert_eq!(v, 3);
        assert_eq!(r.unpack(3).unwrap(), 0b101);
    }

    #[test]
    fn length_determinant_fragment_form() {
        let mut buf = [0u8; 4];
        {
            let mut w = BitWriter::new(&mut buf);
            pack_length_determinant_unbounded(&mut w, 20_000).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(unpack_length_determinant_unbounded(&mut r).unwrap(), 20_000);
    }
}
