//! RLC UM receive side: rx window, reordering timer interaction, reassembly. TS 36.322 §5.1.2.2.

use std::collections::HashMap;

use super::header::RlcUmHeader;
use super::seq;
use super::sink::PdcpSink;
use crate::buffer::{BufferPool, ByteBuffer};
use crate::error::{Result, RlcError};
use crate::time::{Clock, Instant, Timer};

pub struct RxState {
    enabled: bool,
    rx_window: HashMap<u16, (RlcUmHeader, ByteBuffer)>,
    accumulator: Option<ByteBuffer>,
    /// SN of the PDU that most recently contributed a segment to `accumulator`, used to detect a
    /// gap between consecutive contributing PDUs.
    accumulator_last_sn: Option<u16>,
    pdu_lost: bool,
    vr_ur: u16,
    vr_ux: u16,
    vr_uh: u16,
    pub num_rx_pdus: u64,
    pub num_rx_sdus: u64,
    pub num_rx_bytes: u64,
    pub num_lost_pdus: u64,
}

impl RxState {
    pub fn new() -> Self {
        RxState {
            enabled: false,
            rx_window: HashMap::new(),
            accumulator: None,
            accumulator_last_sn: None,
            pdu_lost: false,
            vr_ur: 0,
            vr_ux: 0,
            vr_uh: 0,
            num_rx_pdus: 0,
            num_rx_sdus: 0,
            num_rx_bytes: 0,
            num_lost_pdus: 0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn reset(&mut self, pool: &BufferPool, timer: &mut Timer) {
        self.enabled = false;
        self.vr_ur = 0;
        self.vr_ux = 0;
        self.vr_uh = 0;
        self.pdu_lost = false;
        self.accumulator_last_sn = None;
        if let Some(acc) = self.accumulator.take() {
            pool.release(acc);
        }
        for (_, (_, buf)) in self.rx_window.drain() {
            pool.release(buf);
        }
        timer.stop();
    }

    pub fn vr_ur(&self) -> u16 {
        self.vr_ur
    }
    pub fn vr_ux(&self) -> u16 {
        self.vr_ux
    }
    pub fn vr_uh(&self) -> u16 {
        self.vr_uh
    }
    pub fn window_len(&self) -> usize {
        self.rx_window.len()
    }

    /// The window of SNs considered "already known" relative to `VR(UH)`: `[VR(UH) -
    /// rx_window_size, VR(UH))`. Used to decide whether an arriving SN extends the frontier.
    fn inside_uh_window(&self, sn: u16, sn_mod: u16, rx_window_size: u16) -> bool {
        let anchor = seq::mod_sub(self.vr_uh, rx_window_size, sn_mod);
        seq::is_inside_window(sn, anchor, rx_window_size, sn_mod)
    }

    /// Handles one arriving PDU: header already parsed, `payload` holds only the payload bytes
    /// (the header has already been trimmed off the front by the caller).
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pdu<C: Clock, S: PdcpSink>(
        &mut self,
        header: RlcUmHeader,
        payload: ByteBuffer,
        sn_mod: u16,
        rx_window_size: u16,
        is_mrb: bool,
        lcid: u32,
        pool: &BufferPool,
        timer: &mut Timer,
        clock: &C,
        sink: &mut S,
    ) -> Result<()> {
        if !self.enabled {
            pool.release(payload);
            return Ok(());
        }
        let sn = header.sn;
        let li_sum: usize = header.li.iter().map(|&l| l as usize).sum();
        if li_sum > payload.len() {
            pool.release(payload);
            return Err(RlcError::ProtocolViolation("length indicator exceeds payload"));
        }
        if !seq::is_inside_window(sn, self.vr_ur, rx_window_size, sn_mod) {
            pool.release(payload);
            return Err(RlcError::ProtocolViolation("SN outside reordering window"));
        }
        if self.rx_window.contains_key(&sn) {
            pool.release(payload);
            return Err(RlcError::ProtocolViolation("duplicate SN in rx window"));
        }

        self.num_rx_pdus += 1;
        self.num_rx_bytes += payload.len() as u64;
        let extends_frontier = !self.inside_uh_window(sn, sn_mod, rx_window_size);
        self.rx_window.insert(sn, (header, payload));
        if extends_frontier {
            self.vr_uh = seq::mod_add(sn, 1, sn_mod);
        }

        self.reassemble(sn_mod, rx_window_size, is_mrb, lcid, pool, sink);

        let vr_ux_caught_up = seq::mod_distance(self.vr_ux, self.vr_ur, sn_mod) < rx_window_size;
        let vr_ux_stale = !seq::is_inside_window(self.vr_ux, self.vr_ur, rx_window_size, sn_mod) && self.vr_ux != self.vr_uh;
        if timer.is_running() && (vr_ux_caught_up || vr_ux_stale) {
            timer.stop();
        }
        if !timer.is_running() && self.vr_uh != self.vr_ur {
            timer.run(clock.now());
            self.vr_ux = self.vr_uh;
        }

        Ok(())
    }

    fn reassemble<S: PdcpSink>(
        &mut self,
        sn_mod: u16,
        rx_window_size: u16,
        is_mrb: bool,
        lcid: u32,
        pool: &BufferPool,
        sink: &mut S,
    ) {
        // Phase A: catch up to the lower edge of the reordering window.
        while !self.inside_uh_window(self.vr_ur, sn_mod, rx_window_size) && self.vr_ur != self.vr_uh {
            match self.rx_window.remove(&self.vr_ur) {
                None => {
                    self.accumulator_last_sn = None;
                    if let Some(acc) = self.accumulator.take() {
                        pool.release(acc);
                    }
                }
                Some((header, payload)) => self.process_segment(header, payload, pool, is_mrb, lcid, sink),
            }
            self.vr_ur = seq::mod_add(self.vr_ur, 1, sn_mod);
        }

        // Phase B: advance while contiguous PDUs are already present.
        while let Some((header, payload)) = self.rx_window.remove(&self.vr_ur) {
            self.process_segment(header, payload, pool, is_mrb, lcid, sink);
            self.vr_ur = seq::mod_add(self.vr_ur, 1, sn_mod);
        }
    }

    fn process_segment<S: PdcpSink>(
        &mut self,
        header: RlcUmHeader,
        payload: ByteBuffer,
        pool: &BufferPool,
        is_mrb: bool,
        lcid: u32,
        sink: &mut S,
    ) {
        let current_sn = header.sn;
        let bytes = payload.data().to_vec();
        pool.release(payload);
        let mut offset = 0usize;

        if self.accumulator.is_none() && !header.fi.starts_aligned() {
            let drop_len = header.li.first().copied().map(|l| l as usize).unwrap_or(bytes.len());
            offset += drop_len.min(bytes.len());
            self.pdu_lost = true;
        }

        for &li in &header.li {
            let li = li as usize;
            let end = (offset + li).min(bytes.len());
            let segment = &bytes[offset..end];
            offset = end;
            self.append_segment(segment, current_sn, pool);
            let complete = self.accumulator.take().expect("just appended into it");
            self.num_rx_sdus += 1;
            self.accumulator_last_sn = None;
            self.pdu_lost = false;
            deliver(is_mrb, lcid, complete, sink);
        }

        let trailing = &bytes[offset..];
        self.append_segment(trailing, current_sn, pool);
        self.accumulator_last_sn = Some(current_sn);

        if header.fi.ends_aligned() {
            // A PDU that starts its own accumulator run (no gap since the last contributor)
            // is deliverable even if `pdu_lost` is still set from an unrelated, already-closed
            // loss earlier in the window — `pdu_lost` only bears on a segment that depends on a
            // predecessor it doesn't have.
            if !self.pdu_lost || header.fi.starts_aligned() {
                let complete = self.accumulator.take().expect("just appended into it");
                self.num_rx_sdus += 1;
                deliver(is_mrb, lcid, complete, sink);
            } else if let Some(acc) = self.accumulator.take() {
                pool.release(acc);
            }
            self.pdu_lost = false;
            self.accumulator_last_sn = None;
        }
    }

    /// Appends `segment` to the in-progress accumulator, first discarding it if the previous
    /// contributing PDU wasn't `current_sn`'s immediate predecessor (a gap occurred).
    fn append_segment(&mut self, segment: &[u8], current_sn: u16, pool: &BufferPool) {
        if let Some(prev) = self.accumulator_last_sn {
            if prev.wrapping_add(1) != current_sn {
                if let Some(acc) = self.accumulator.take() {
                    pool.release(acc);
                }
            }
        }
        let acc = self.accumulator.get_or_insert_with(|| pool.acquire_blocking());
        let _ = acc.append(segment);
    }

    /// Called when the reordering timer fires: declares the lowest outstanding SN lost and
    /// catches reassembly up to `VR(UX)`. §4.3.5.
    #[allow(clippy::too_many_arguments)]
    pub fn on_timer_expired<S: PdcpSink>(
        &mut self,
        sn_mod: u16,
        rx_window_size: u16,
        is_mrb: bool,
        lcid: u32,
        pool: &BufferPool,
        timer: &mut Timer,
        now: Instant,
        sink: &mut S,
    ) {
        if !self.enabled {
            return;
        }
        warn!("lost PDU SN={}", self.vr_ur);
        self.num_lost_pdus += 1;
        self.pdu_lost = true;
        if let Some(acc) = self.accumulator.take() {
            pool.release(acc);
        }
        self.accumulator_last_sn = None;

        // `reassemble` below can itself carry `vr_ur` past `vr_ux` in one call (Phase B walks
        // every contiguous PDU already buffered), so track how far `vr_ur` has come from where
        // it started rather than looping on `!=` — otherwise an overshoot only terminates once
        // the SN counter wraps the full modulus back around to `vr_ux`.
        let start = self.vr_ur;
        let target = seq::mod_distance(start, self.vr_ux, sn_mod);
        while seq::mod_distance(start, self.vr_ur, sn_mod) < target {
            if let Some((header, payload)) = self.rx_window.remove(&self.vr_ur) {
                self.process_segment(header, payload, pool, is_mrb, lcid, sink);
            }
            self.vr_ur = seq::mod_add(self.vr_ur, 1, sn_mod);
            self.reassemble(sn_mod, rx_window_size, is_mrb, lcid, pool, sink);
        }

        if self.vr_uh != self.vr_ur {
            timer.run(now);
            self.vr_ux = self.vr_uh;
        } else {
            timer.stop();
        }
        debug!("timer expiry caught up to VR(UR)={}", self.vr_ur);
    }
}

fn deliver<S: PdcpSink>(is_mrb: bool, lcid: u32, sdu: ByteBuffer, sink: &mut S) {
    if is_mrb {
        sink.write_pdu_mch(lcid, sdu);
    } else {
        sink.write_pdu(lcid, sdu);
    }
}
