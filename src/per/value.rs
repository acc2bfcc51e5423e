//! Typed value templates over the primitive coders.
//!
//! Each template pairs a value with the constraints that were baked into it at construction time
//! (bounds, extensibility, alignment) so `pack`/`unpack` never need them passed back in
//! separately, and so a decoded value can describe itself through [`to_json`]. This crate ships
//! representative instances of every template named in the subsystem this module implements,
//! rather than a generated catalog of every ASN.1 type a real interface would define.

use super::bits::{BitReader, BitWriter};
use super::json::{JsonWriter, ToJson};
use super::primitives::*;
use crate::error::Result;

/// An integer constrained to `[lb, ub]`, optionally extensible beyond that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstrainedInt {
    pub value: i64,
    pub lb: i64,
    pub ub: i64,
    pub has_ext: bool,
}

impl ConstrainedInt {
    pub fn new(value: i64, lb: i64, ub: i64, has_ext: bool) -> Self {
        ConstrainedInt { value, lb, ub, has_ext }
    }

    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        let in_root = self.value >= self.lb && self.value <= self.ub;
        if self.has_ext {
            pack_extension_flag(w, !in_root)?;
            if in_root {
                pack_constrained_whole_number(w, self.value, self.lb, self.ub)
            } else {
                pack_open_type(w, |inner| pack_unconstrained_whole_number(inner, self.value))
            }
        } else {
            pack_constrained_whole_number(w, self.value, self.lb, self.ub)
        }
    }

    pub fn unpack(r: &mut BitReader, lb: i64, ub: i64, has_ext: bool) -> Result<Self> {
        let value = if has_ext {
            if unpack_extension_flag(r)? {
                unpack_open_type(r, |inner| unpack_unconstrained_whole_number(inner))?
            } else {
                unpack_constrained_whole_number(r, lb, ub)?
            }
        } else {
            unpack_constrained_whole_number(r, lb, ub)?
        };
        Ok(ConstrainedInt { value, lb, ub, has_ext })
    }

    pub fn to_json(&self, name: &str, w: &mut JsonWriter) {
        w.write_int(name, self.value);
    }
}

/// A value drawn from a fixed set of named alternatives, with an optional extension range for
/// alternatives added in a later release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerated {
    pub index: usize,
    pub labels: &'static [&'static str],
    pub nof_exts: usize,
    pub has_ext: bool,
}

impl Enumerated {
    pub fn new(index: usize, labels: &'static [&'static str], nof_exts: usize, has_ext: bool) -> Self {
        Enumerated { index, labels, nof_exts, has_ext }
    }

    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        pack_enumerated(w, self.index, self.labels.len(), self.nof_exts, self.has_ext)
    }

    pub fn unpack(
        r: &mut BitReader,
        labels: &'static [&'static str],
        nof_exts: usize,
        has_ext: bool,
    ) -> Result<Self> {
        let index = unpack_enumerated(r, labels.len(), nof_exts, has_ext)?;
        Ok(Enumerated { index, labels, nof_exts, has_ext })
    }

    pub fn label(&self) -> &'static str {
        self.labels.get(self.index).copied().unwrap_or("ext")
    }

    pub fn to_json(&self, name: &str, w: &mut JsonWriter) {
        w.write_str(name, self.label());
    }
}

/// An octetstring whose length may be fixed, bounded, or effectively unbounded, all through the
/// same `lb`/`ub` pair (`lb == ub` selects the fixed-length encoding at the primitive layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString {
    pub bytes: Vec<u8>,
    pub lb: usize,
    pub ub: usize,
    pub aligned: bool,
}

impl OctetString {
    pub fn fixed(bytes: Vec<u8>, n: usize) -> Self {
        OctetString { bytes, lb: n, ub: n, aligned: true }
    }

    pub fn bounded(bytes: Vec<u8>, lb: usize, ub: usize) -> Self {
        OctetString { bytes, lb, ub, aligned: true }
    }

    pub fn dynamic(bytes: Vec<u8>) -> Self {
        OctetString { bytes, lb: 0, ub: 65_535, aligned: true }
    }

    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        pack_octetstring(w, &self.bytes, self.lb, self.ub, self.aligned)
    }

    pub fn unpack(r: &mut BitReader, lb: usize, ub: usize, aligned: bool) -> Result<Self> {
        let bytes = unpack_octetstring(r, lb, ub, aligned)?;
        Ok(OctetString { bytes, lb, ub, aligned })
    }

    pub fn to_json(&self, name: &str, w: &mut JsonWriter) {
        let hex: String = self.bytes.iter().map(|b| format!("{:02x}", b)).collect();
        w.write_str(name, &hex);
    }
}

/// A bitstring of fixed or bounded length. `bits` is MSB-first packed bytes; `n_bits` is the
/// number of significant bits (may be fewer than `bits.len() * 8`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    pub bits: Vec<u8>,
    pub n_bits: usize,
    pub lb: usize,
    pub ub: usize,
    pub aligned: bool,
}

impl BitString {
    pub fn fixed(bits: Vec<u8>, n_bits: usize) -> Self {
        BitString { bits, n_bits, lb: n_bits, ub: n_bits, aligned: true }
    }

    pub fn bounded(bits: Vec<u8>, n_bits: usize, lb: usize, ub: usize) -> Self {
        BitString { bits, n_bits, lb, ub, aligned: true }
    }

    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        pack_bitstring(w, &self.bits, self.n_bits, self.lb, self.ub, self.aligned)
    }

    pub fn unpack(r: &mut BitReader, lb: usize, ub: usize, aligned: bool) -> Result<Self> {
        let (bits, n_bits) = unpack_bitstring(r, lb, ub, aligned)?;
        Ok(BitString { bits, n_bits, lb, ub, aligned })
    }

    pub fn to_json(&self, name: &str, w: &mut JsonWriter) {
        let mut s = String::with_capacity(self.n_bits);
        for i in 0..self.n_bits {
            let bit = (self.bits[i / 8] >> (7 - i % 8)) & 1;
            s.push(if bit == 1 { '1' } else { '0' });
        }
        w.write_str(name, &s);
    }
}

/// `SEQUENCE OF` with a `[lb, ub]` size constraint, each element packed by a caller-supplied
/// closure. Kept closure-driven rather than requiring elements to implement a shared trait, since
/// this crate's element types (headers, status PDUs) don't all share one packing signature.
pub struct SeqOf<T> {
    pub items: Vec<T>,
    pub lb: usize,
    pub ub: usize,
}

impl<T> SeqOf<T> {
    pub fn new(items: Vec<T>, lb: usize, ub: usize) -> Self {
        SeqOf { items, lb, ub }
    }

    pub fn pack(&self, w: &mut BitWriter, mut pack_elem: impl FnMut(&T, &mut BitWriter) -> Result<()>) -> Result<()> {
        pack_length_determinant(w, self.items.len(), self.lb, self.ub)?;
        for item in &self.items {
            pack_elem(item, w)?;
        }
        Ok(())
    }

    pub fn unpack(
        r: &mut BitReader,
        lb: usize,
        ub: usize,
        mut unpack_elem: impl FnMut(&mut BitReader) -> Result<T>,
    ) -> Result<Self> {
        let n = unpack_length_determinant(r, lb, ub)?;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(unpack_elem(r)?);
        }
        Ok(SeqOf { items, lb, ub })
    }
}

/// A representative `CHOICE` with two root alternatives and one extension alternative, enough to
/// exercise the discriminant-plus-payload template: root alternatives are coded like an
/// `ENUMERATED` discriminant directly followed by the payload, extension alternatives wrap their
/// payload in an open type so an unknown-future-variant receiver can skip over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Ack(ConstrainedInt),
    Status(BitString),
    ExtNack(ConstrainedInt),
}

impl Choice {
    const LABELS: &'static [&'static str] = &["ack", "status"];

    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        match self {
            Choice::Ack(v) => {
                pack_enumerated(w, 0, Self::LABELS.len(), 1, true)?;
                v.pack(w)
            }
            Choice::Status(v) => {
                pack_enumerated(w, 1, Self::LABELS.len(), 1, true)?;
                v.pack(w)
            }
            Choice::ExtNack(v) => {
                pack_enumerated(w, Self::LABELS.len(), Self::LABELS.len(), 1, true)?;
                pack_open_type(w, |inner| v.pack(inner))
            }
        }
    }

    pub fn unpack(r: &mut BitReader) -> Result<Self> {
        let tag = unpack_enumerated(r, Self::LABELS.len(), 1, true)?;
        match tag {
            0 => Ok(Choice::Ack(ConstrainedInt::unpack(r, 0, 1023, false)?)),
            1 => Ok(Choice::Status(BitString::unpack(r, 8, 8, true)?)),
            _ => {
                let v = unpack_open_type(r, |inner| ConstrainedInt::unpack(inner, 0, 1023, false))?;
                Ok(Choice::ExtNack(v))
            }
        }
    }

}

impl ToJson for Choice {
    fn to_json(&self, w: &mut JsonWriter) {
        w.start_obj("");
        match self {
            Choice::Ack(v) => v.to_json("ack", w),
            Choice::Status(v) => v.to_json("status", w),
            Choice::ExtNack(v) => v.to_json("ext_nack", w),
        }
        w.end_obj();
    }
}

/// A representative extensible `SEQUENCE`: one mandatory field, one optional field (presence bit
/// in the root bitmap), and one extension-addition field carried as an open type when the
/// extension bit is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub mandatory: ConstrainedInt,
    pub optional: Option<ConstrainedInt>,
    pub ext_field: Option<ConstrainedInt>,
}

impl Sequence {
    pub fn pack(&self, w: &mut BitWriter) -> Result<()> {
        let has_ext = self.ext_field.is_some();
        pack_extension_flag(w, has_ext)?;
        pack_extension_flag(w, self.optional.is_some())?;
        self.mandatory.pack(w)?;
        if let Some(opt) = &self.optional {
            opt.pack(w)?;
        }
        if let Some(ext) = &self.ext_field {
            pack_normally_small_non_negative(w, 1)?; // one extension addition group present
            pack_open_type(w, |inner| ext.pack(inner))?;
        }
        Ok(())
    }

    pub fn unpack(r: &mut BitReader) -> Result<Self> {
        let has_ext = unpack_extension_flag(r)?;
        let optional_present = unpack_extension_flag(r)?;
        let mandatory = ConstrainedInt::unpack(r, 0, 1023, false)?;
        let optional = if optional_present {
            Some(ConstrainedInt::unpack(r, 0, 1023, false)?)
        } else {
            None
        };
        let ext_field = if has_ext {
            let n_groups = unpack_normally_small_non_negative(r)?;
            if n_groups == 0 {
                None
            } else {
                Some(unpack_open_type(r, |inner| ConstrainedInt::unpack(inner, 0, 1023, false))?)
            }
        } else {
            None
        };
        Ok(Sequence { mandatory, optional, ext_field })
    }

}

impl ToJson for Sequence {
    fn to_json(&self, w: &mut JsonWriter) {
        w.start_obj("");
        self.mandatory.to_json("mandatory", w);
        if let Some(opt) = &self.optional {
            opt.to_json("optional", w);
        } else {
            w.write_null("optional");
        }
        if let Some(ext) = &self.ext_field {
            ext.to_json("ext_field", w);
        }
        w.end_obj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_choice(c: Choice) {
        let mut buf = [0u8; 32];
        {
            let mut w = BitWriter::new(&mut buf);
            c.pack(&mut w).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(Choice::unpack(&mut r).unwrap(), c);
    }

    #[test]
    fn choice_root_alternatives_roundtrip() {
        roundtrip_choice(Choice::Ack(ConstrainedInt::new(42, 0, 1023, false)));
        roundtrip_choice(Choice::Status(BitString::fixed(vec![0xaa], 8)));
    }

    #[test]
    fn choice_extension_alternative_roundtrips() {
        roundtrip_choice(Choice::ExtNack(ConstrainedInt::new(3, 0, 1023, false)));
    }

    #[test]
    fn sequence_without_optional_or_extension() {
        let seq = Sequence {
            mandatory: ConstrainedInt::new(5, 0, 1023, false),
            optional: None,
            ext_field: None,
        };
        let mut buf = [0u8; 16];
        {
            let mut w = BitWriter::new(&mut buf);
            seq.pack(&mut w).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(Sequence::unpack(&mut r).unwrap(), seq);
    }

    #[test]
    fn sequence_with_optional_and_extension() {
        let seq = Sequence {
            mandatory: ConstrainedInt::new(5, 0, 1023, false),
            optional: Some(ConstrainedInt::new(9, 0, 1023, false)),
            ext_field: Some(ConstrainedInt::new(100, 0, 1023, false)),
        };
        let mut buf = [0u8; 16];
        {
            let mut w = BitWriter::new(&mut buf);
            seq.pack(&mut w).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(Sequence::unpack(&mut r).unwrap(), seq);
    }

    #[test]
    fn seq_of_roundtrips_with_closure_elements() {
        let seq = SeqOf::new(vec![1i64, 2, 3], 0, 16);
        let mut buf = [0u8; 16];
        {
            let mut w = BitWriter::new(&mut buf);
            seq.pack(&mut w, |v, w| pack_constrained_whole_number(w, *v, 0, 255)).unwrap();
        }
        let mut r = BitReader::new(&buf);
        let decoded = SeqOf::unpack(&mut r, 0, 16, |r| unpack_constrained_whole_number(r, 0, 255)).unwrap();
        assert_eq!(decoded.items, seq.items);
    }

    #[test]
    fn octetstring_to_json_renders_hex() {
        let s = OctetString::fixed(vec![0xde, 0xad], 2);
        let mut w = JsonWriter::new();
        w.start_obj("");
        s.to_json("payload", &mut w);
        w.end_obj();
        assert!(w.to_string().contains("\"payload\": \"dead\""));
    }

    #[test]
    fn enumerated_label_roundtrip() {
        const LABELS: &[&str] = &["idle", "active", "suspended"];
        let e = Enumerated::new(1, LABELS, 0, false);
        let mut buf = [0u8; 4];
        {
            let mut w = BitWriter::new(&mut buf);
            e.pack(&mut w).unwrap();
        }
        let mut r = BitReader::new(&buf);
        let decoded = Enumerated::unpack(&mut r, LABELS, 0, false).unwrap();
        assert_eq!(decoded.label(), "active");
    }
}
