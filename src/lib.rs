//! A PER codec, typed ASN.1 value library, and LTE RLC Unacknowledged-Mode entity.
//!
//! # Layers
//!
//! * [`per`] implements ITU-T X.691 aligned Packed Encoding Rules, plus a small library of typed
//!   value templates (`per::value`) that generated ASN.1 bindings would otherwise hand-roll per
//!   message type, and a diagnostic [`per::JsonWriter`] for dumping decoded values.
//! * [`buffer`] is the pooled byte-buffer layer the RLC entity and PER codec build PDUs and SDUs
//!   out of.
//! * [`rlc`] implements one RLC UM entity: SDU segmentation and PDU building on TX
//!   ([`rlc::RlcUmEntity::read_pdu`]), and reordering/reassembly with a loss timer on RX
//!   ([`rlc::RlcUmEntity::write_pdu`]).
//! * [`time`] provides the [`time::Clock`]/[`time::Timer`] abstractions the RLC entity's
//!   reordering timer is driven against, so tests can advance a [`time::FakeClock`] instead of
//!   sleeping.
//!
//! [`rlc`]: rlc/index.html
//! [`per`]: per/index.html

#[macro_use]
mod log;

pub mod buffer;
mod error;
pub mod per;
pub mod rlc;
pub mod time;

pub use self::error::{Result, RlcError};
