//! RLC UM transmit side: SDU queue, partial-SDU cursor, PDU builder. TS 36.322 §5.1.2.1.

use std::collections::VecDeque;

use super::header::{FramingInfo, RlcUmHeader};
use super::seq;
use crate::buffer::ByteBuffer;

fn ceil_div(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

/// Bytes of extension-part overhead for `n_li` length indicators: `ceil(n_li * 1.5)`.
fn li_overhead_bytes(n_li: usize) -> usize {
    ceil_div(n_li * 3, 2)
}

pub struct TxState {
    queue: VecDeque<ByteBuffer>,
    partial: Option<ByteBuffer>,
    queue_bytes: usize,
    queue_capacity: usize,
    vt_us: u16,
    enabled: bool,
    pub num_tx_pdus: u64,
    pub num_tx_sdus: u64,
    pub num_tx_bytes: u64,
}

impl TxState {
    pub fn new(queue_capacity: usize) -> Self {
        TxState {
            queue: VecDeque::new(),
            partial: None,
            queue_bytes: 0,
            queue_capacity,
            vt_us: 0,
            enabled: false,
            num_tx_pdus: 0,
            num_tx_sdus: 0,
            num_tx_bytes: 0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables TX and drops the queue and partial-SDU buffer, returning them to `pool`.
    pub fn reset(&mut self, pool: &crate::buffer::BufferPool) {
        self.enabled = false;
        self.vt_us = 0;
        self.queue_bytes = 0;
        if let Some(buf) = self.partial.take() {
            pool.release(buf);
        }
        while let Some(buf) = self.queue.pop_front() {
            pool.release(buf);
        }
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.queue_capacity
    }

    /// Enqueues `sdu` without blocking. Fails with `QueueFull` if the bound is reached; the
    /// caller decides whether that's a drop (logged) or a reason to wait.
    pub fn try_enqueue(&mut self, sdu: ByteBuffer) -> Result<(), ByteBuffer> {
        if self.is_full() {
            return Err(sdu);
        }
        self.queue_bytes += sdu.len();
        self.queue.push_back(sdu);
        Ok(())
    }

    /// Bytes of queued-but-unsent SDU data plus the header overhead required to ship it all,
    /// per §4.3.3. Zero when TX is disabled or nothing is queued.
    pub fn buffer_state(&self, sn_field_width: u8) -> u32 {
        if !self.enabled {
            return 0;
        }
        let partial_bytes = self.partial.as_ref().map(ByteBuffer::len).unwrap_or(0);
        let total_bytes = partial_bytes + self.queue_bytes;
        if total_bytes == 0 {
            return 0;
        }
        let n_sdus = self.queue.len() + if self.partial.is_some() { 1 } else { 0 };
        let fixed_header = if sn_field_width == 5 { 1 } else { 2 };
        let li_bytes = li_overhead_bytes(n_sdus.saturating_sub(1));
        (total_bytes + fixed_header + li_bytes) as u32
    }

    /// Builds at most one PDU of `payload_cap` bytes total (header + payload), per §4.3.3.
    /// Returns `None` when TX is disabled or there is nothing to send.
    pub fn build_pdu(&mut self, sn_field_width: u8, sn_mod: u16, payload_cap: usize) -> Option<(RlcUmHeader, Vec<u8>)> {
        if !self.enabled || (self.partial.is_none() && self.queue.is_empty()) {
            return None;
        }

        let fixed_header = if sn_field_width == 5 { 1 } else { 2 };
        let mut start_aligned = true;
        let mut end_aligned = true;
        let mut li: Vec<u16> = Vec::new();
        let mut payload: Vec<u8> = Vec::new();

        if let Some(partial) = self.partial.as_mut() {
            start_aligned = false;
            let header_len = fixed_header + li_overhead_bytes(li.len());
            let avail = payload_cap.saturating_sub(header_len);
            let take = partial.len().min(avail);
            payload.extend_from_slice(&partial.data()[..take]);
            partial.trim_front(take).ok()?;
            if partial.is_empty() {
                self.partial = None;
            } else {
                end_aligned = false;
                return Some(self.finish_pdu(sn_field_width, sn_mod, start_aligned, end_aligned, li, payload));
            }
        }

        let mut segment_start = payload.len();
        loop {
            // Popping another SDU costs a new LI entry once the payload already holds one
            // segment; project that cost before committing to it so a PDU never ends up
            // claiming an LI boundary for a segment that had no room to contribute any bytes.
            let projected_li_len = if payload.is_empty() { li.len() } else { li.len() + 1 };
            let header_len = fixed_header + li_overhead_bytes(projected_li_len);
            if header_len + payload.len() >= payload_cap {
                break;
            }
            let sdu = match self.queue.pop_front() {
                Some(sdu) => sdu,
                None => break,
            };
            self.queue_bytes -= sdu.len();
            if !payload.is_empty() {
                li.push((payload.len() - segment_start) as u16);
                segment_start = payload.len();
            }
            let header_len = fixed_header + li_overhead_bytes(li.len());
            let avail = payload_cap.saturating_sub(header_len).saturating_sub(payload.len());
            let mut sdu = sdu;
            let take = sdu.len().min(avail);
            payload.extend_from_slice(&sdu.data()[..take]);
            if take < sdu.len() {
                sdu.trim_front(take).ok()?;
                self.partial = Some(sdu);
                end_aligned = false;
                break;
            } else {
                self.num_tx_sdus += 1;
            }
        }

        Some(self.finish_pdu(sn_field_width, sn_mod, start_aligned, end_aligned, li, payload))
    }

    fn finish_pdu(
        &mut self,
        sn_field_width: u8,
        sn_mod: u16,
        start_aligned: bool,
        end_aligned: bool,
        li: Vec<u16>,
        payload: Vec<u8>,
    ) -> (RlcUmHeader, Vec<u8>) {
        let sn = self.vt_us;
        self.vt_us = seq::mod_add(self.vt_us, 1, sn_mod);
        self.num_tx_pdus += 1;
        self.num_tx_bytes += payload.len() as u64;
        let header = RlcUmHeader {
            fi: FramingInfo::from_bits(start_aligned, end_aligned),
            sn,
            sn_field_width,
            li,
        };
        (header, payload)
    }

    pub fn vt_us(&self) -> u16 {
        self.vt_us
    }
}
