//! Upper-layer (PDCP) delivery interface.

use crate::buffer::ByteBuffer;

/// Receives SDUs reassembled by an RLC entity, across all the channel variants RLC can feed.
///
/// `write_pdu` (unicast) and `write_pdu_mch` (multicast, used when an entity is configured as an
/// MRB) are the two paths this crate's RLC UM entity actually drives. The broadcast/paging
/// variants exist so a real embedding's single `PdcpSink` implementation can satisfy every RLC
/// channel type, but default to a no-op so test doubles only implement what they exercise.
pub trait PdcpSink {
    fn write_pdu(&mut self, lcid: u32, sdu: ByteBuffer);

    fn write_pdu_mch(&mut self, lcid: u32, sdu: ByteBuffer) {
        let _ = (lcid, sdu);
    }

    fn write_pdu_bcch_bch(&mut self, sdu: ByteBuffer) {
        let _ = sdu;
    }

    fn write_pdu_bcch_dlsch(&mut self, sdu: ByteBuffer) {
        let _ = sdu;
    }

    fn write_pdu_pcch(&mut self, sdu: ByteBuffer) {
        let _ = sdu;
    }
}
