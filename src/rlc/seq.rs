//! Modular arithmetic over RLC UM sequence numbers.
//!
//! Generalizes the BLE link layer's single-bit `SeqNum` to an arbitrary modulus (32 for 5-bit SN
//! fields, 1024 for 10-bit ones), since RLC needs real distance comparisons rather than just XOR.

/// Forward distance from `from` to `to`, modulo `modulus`: how many increments of `from` it takes
/// to reach `to`.
pub fn mod_distance(from: u16, to: u16, modulus: u16) -> u16 {
    let from = from as i32;
    let to = to as i32;
    let modulus = modulus as i32;
    (((to - from) % modulus) + modulus) as u16 % modulus as u16
}

/// `a + b`, modulo `modulus`.
pub fn mod_add(a: u16, b: u16, modulus: u16) -> u16 {
    ((a as u32 + b as u32) % modulus as u32) as u16
}

/// `a - 1`, modulo `modulus`.
pub fn mod_prev(a: u16, modulus: u16) -> u16 {
    mod_add(a, modulus - 1, modulus)
}

/// `a - b`, modulo `modulus`.
pub fn mod_sub(a: u16, b: u16, modulus: u16) -> u16 {
    mod_add(a, modulus - (b % modulus), modulus)
}

/// Whether `sn` lies within `window_size` positions forward of `anchor`, i.e. `anchor` is the
/// window's lower edge. Used both for the RX reordering window (anchored at `VR(UR)`) and for
/// general "is `a` within `window_size` of `b`" checks on `VR(UX)`/`VR(UH)`.
pub fn is_inside_window(sn: u16, anchor: u16, window_size: u16, modulus: u16) -> bool {
    mod_distance(anchor, sn, modulus) < window_size
}
