//! Top-level RLC UM entity: wires the TX and RX state machines together behind one lock and
//! exposes the interface the rest of the stack (MAC, PDCP, RRC) drives.

use std::sync::{Arc, Mutex};

use super::config::RlcUmConfig;
use super::header::RlcUmHeader;
use super::sink::PdcpSink;
use super::rx::RxState;
use super::tx::TxState;
use crate::buffer::{BufferPool, ByteBuffer};
use crate::error::{Result, RlcError};
use crate::per::bits::{BitReader, BitWriter};
use crate::time::{Clock, Timer, TimerService};

/// Depth of the SDU transmit queue, in number of SDUs. Chosen generously since the entity also
/// enforces a byte-based `get_buffer_state`; the queue bound mainly guards against a stalled MAC
/// never pulling PDUs at all.
const SDU_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlcMode {
    Um,
}

/// A snapshot of an entity's TX/RX counters, per §4.3.7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RlcMetrics {
    pub num_tx_pdus: u64,
    pub num_tx_sdus: u64,
    pub num_tx_bytes: u64,
    pub num_rx_pdus: u64,
    pub num_rx_sdus: u64,
    pub num_rx_bytes: u64,
    pub num_lost_pdus: u64,
}

struct Inner<S: PdcpSink> {
    tx: TxState,
    rx: RxState,
    timer: Timer,
    sink: S,
}

/// One RLC Unacknowledged-Mode entity, bound to a single logical channel.
///
/// TX and RX are coarse-grained: a single [`Mutex`] covers both state machines, matching
/// §5's "lock per entity" model rather than splitting TX/RX into independently lockable halves,
/// since the TX and RX buffer-state/metrics reads are cheap and never block on I/O.
pub struct RlcUmEntity<S: PdcpSink> {
    lcid: u32,
    config: RlcUmConfig,
    pool: Arc<BufferPool>,
    inner: Mutex<Inner<S>>,
}

impl<S: PdcpSink> RlcUmEntity<S> {
    pub fn new(lcid: u32, config: RlcUmConfig, pool: Arc<BufferPool>, timers: &mut TimerService, sink: S) -> Self {
        let (_, timer) = timers.timer_get(config.reordering_timer);
        let mut tx = TxState::new(SDU_QUEUE_CAPACITY);
        let mut rx = RxState::new();
        tx.enable();
        rx.enable();
        RlcUmEntity {
            lcid,
            config,
            pool,
            inner: Mutex::new(Inner { tx, rx, timer, sink }),
        }
    }

    pub fn get_mode(&self) -> RlcMode {
        RlcMode::Um
    }

    pub fn get_bearer(&self) -> u32 {
        self.lcid
    }

    pub fn configure(&mut self, config: RlcUmConfig) {
        self.config = config;
        let mut inner = self.inner.lock().unwrap();
        inner.timer.set(config.reordering_timer);
    }

    /// Queues `sdu` for transmission. Fails with `QueueFull` if the bounded queue is full; the
    /// caller decides whether to drop or retry, matching the non-blocking MAC-facing contract.
    pub fn write_sdu(&self, sdu: ByteBuffer) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.tx.try_enqueue(sdu).map_err(|rejected| {
            self.pool.release(rejected);
            RlcError::QueueFull
        })
    }

    pub fn get_buffer_state(&self) -> u32 {
        self.inner.lock().unwrap().tx.buffer_state(self.config.sn_field_width)
    }

    /// Same as [`RlcUmEntity::get_buffer_state`]: UM has no retransmission buffer to report
    /// separately, so "total" and "new" buffer state coincide.
    pub fn get_total_buffer_state(&self) -> u32 {
        self.get_buffer_state()
    }

    /// Builds at most one PDU into `out_buf`, returning the number of bytes written (0 if there
    /// was nothing to send).
    pub fn read_pdu(&self, out_buf: &mut [u8]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let nof_bytes = out_buf.len();
        let (header, payload) = match inner.tx.build_pdu(self.config.sn_field_width, self.config.sn_mod(), nof_bytes) {
            Some(built) => built,
            None => return 0,
        };
        let header_len = header.packed_len();
        let total = header_len + payload.len();
        assert!(total <= out_buf.len(), "build_pdu respected payload_cap");
        {
            let mut w = BitWriter::new(&mut out_buf[..header_len]);
            header.pack(&mut w).expect("header fits the length build_pdu sized it for");
        }
        out_buf[header_len..total].copy_from_slice(&payload);
        total
    }

    /// Hands a received PDU (header included) to the RX state machine.
    pub fn write_pdu<C: Clock>(&self, payload: &[u8], clock: &C) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let mut r = BitReader::new(payload);
        let header = RlcUmHeader::unpack(&mut r, self.config.sn_field_width)?;
        let header_len = r.distance_bytes();
        let mut buf = self.pool.acquire_blocking();
        buf.append(&payload[header_len..])?;

        let inner = &mut *guard;
        inner.rx.handle_pdu(
            header,
            buf,
            self.config.sn_mod(),
            self.config.rx_window_size(),
            self.config.is_mrb,
            self.lcid,
            &self.pool,
            &mut inner.timer,
            clock,
            &mut inner.sink,
        )
    }

    /// Checks the reordering timer and, if it has expired, runs the timer-expiry procedure.
    /// Callers drive this periodically (or right after arming the timer, against a scheduled
    /// wakeup) since nothing else polls the clock on their behalf.
    pub fn poll_timer<C: Clock>(&self, clock: &C) {
        let mut guard = self.inner.lock().unwrap();
        let now = clock.now();
        if !guard.timer.is_expired(now) {
            return;
        }
        let inner = &mut *guard;
        inner.rx.on_timer_expired(
            self.config.sn_mod(),
            self.config.rx_window_size(),
            self.config.is_mrb,
            self.lcid,
            &self.pool,
            &mut inner.timer,
            now,
            &mut inner.sink,
        );
    }

    /// Stops TX and RX and releases all buffers they hold, per §4.3.6. The entity stays
    /// configured and can be re-enabled with [`RlcUmEntity::reestablish`].
    pub fn stop(&self) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        inner.tx.reset(&self.pool);
        inner.rx.reset(&self.pool, &mut inner.timer);
        info!("rlc lcid={} stopped", self.lcid);
    }

    /// Drops all buffered state, exactly like `stop`, without re-enabling TX/RX.
    pub fn reset(&self) {
        self.stop();
    }

    /// Resets state then re-enables TX and RX, restarting VT(US)/VR(*) from zero. Used on an RRC
    /// reconfiguration that reestablishes the bearer.
    pub fn reestablish(&self) {
        self.stop();
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        inner.tx.enable();
        inner.rx.enable();
        info!("rlc lcid={} reestablished", self.lcid);
    }

    pub fn metrics(&self) -> RlcMetrics {
        let inner = self.inner.lock().unwrap();
        RlcMetrics {
            num_tx_pdus: inner.tx.num_tx_pdus,
            num_tx_sdus: inner.tx.num_tx_sdus,
            num_tx_bytes: inner.tx.num_tx_bytes,
            num_rx_pdus: inner.rx.num_rx_pdus,
            num_rx_sdus: inner.rx.num_rx_sdus,
            num_rx_bytes: inner.rx.num_rx_bytes,
            num_lost_pdus: inner.rx.num_lost_pdus,
        }
    }

    pub fn reset_metrics(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.tx.num_tx_pdus = 0;
        inner.tx.num_tx_sdus = 0;
        inner.tx.num_tx_bytes = 0;
        inner.rx.num_rx_pdus = 0;
        inner.rx.num_rx_sdus = 0;
        inner.rx.num_rx_bytes = 0;
        inner.rx.num_lost_pdus = 0;
    }

    pub fn debug_state(&self) {
        let inner = self.inner.lock().unwrap();
        debug!(
            "rlc lcid={} vt_us={} vr_ur={} vr_ux={} vr_uh={} rx_window_len={}",
            self.lcid,
            inner.tx.vt_us(),
            inner.rx.vr_ur(),
            inner.rx.vr_ux(),
            inner.rx.vr_uh(),
            inner.rx.window_len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Duration, FakeClock};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct CollectingSink {
        delivered: StdMutex<Vec<Vec<u8>>>,
    }

    impl PdcpSink for CollectingSink {
        fn write_pdu(&mut self, _lcid: u32, sdu: ByteBuffer) {
            self.delivered.lock().unwrap().push(sdu.data().to_vec());
        }
    }

    fn sdu(pool: &BufferPool, bytes: &[u8]) -> ByteBuffer {
        let mut b = pool.acquire().unwrap();
        b.append(bytes).unwrap();
        b
    }

    #[test]
    fn single_sdu_round_trips_through_build_and_parse() {
        let pool = Arc::new(BufferPool::new("test", 16));
        let mut timers = TimerService::new();
        let config = RlcUmConfig::new(10, Duration::from_millis(5));
        let entity = RlcUmEntity::new(1, config, Arc::clone(&pool), &mut timers, CollectingSink::default());

        entity.write_sdu(sdu(&pool, b"hello")).unwrap();
        let mut out = [0u8; 64];
        let n = entity.read_pdu(&mut out);
        assert!(n > 0);

        let clock = FakeClock::new();
        entity.write_pdu(&out[..n], &clock).unwrap();

        let inner = entity.inner.lock().unwrap();
        let delivered = inner.sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0], b"hello");
    }

    #[test]
    fn buffer_state_reflects_queued_sdus() {
        let pool = Arc::new(BufferPool::new("test", 16));
        let mut timers = TimerService::new();
        let config = RlcUmConfig::new(10, Duration::from_millis(5));
        let entity = RlcUmEntity::new(1, config, Arc::clone(&pool), &mut timers, CollectingSink::default());
        assert_eq!(entity.get_buffer_state(), 0);
        entity.write_sdu(sdu(&pool, &[1, 2, 3])).unwrap();
        assert_eq!(entity.get_buffer_state(), 3 + 2);
        assert_eq!(entity.get_total_buffer_state(), entity.get_buffer_state());
    }

    #[test]
    fn reset_drops_queued_sdus_and_stops_timer() {
        let pool = Arc::new(BufferPool::new("test", 16));
        let mut timers = TimerService::new();
        let config = RlcUmConfig::new(10, Duration::from_millis(5));
        let entity = RlcUmEntity::new(1, config, Arc::clone(&pool), &mut timers, CollectingSink::default());
        entity.write_sdu(sdu(&pool, &[1, 2, 3])).unwrap();
        entity.reset();
        assert_eq!(entity.get_buffer_state(), 0);
    }

    #[test]
    fn reestablish_restarts_sequence_numbers() {
        let pool = Arc::new(BufferPool::new("test", 16));
        let mut timers = TimerService::new();
        let config = RlcUmConfig::new(10, Duration::from_millis(5));
        let entity = RlcUmEntity::new(1, config, Arc::clone(&pool), &mut timers, CollectingSink::default());
        entity.write_sdu(sdu(&pool, &[9])).unwrap();
        let mut out = [0u8; 64];
        entity.read_pdu(&mut out);
        entity.reestablish();
        entity.write_sdu(sdu(&pool, &[9])).unwrap();
        let n = entity.read_pdu(&mut out);
        let mut r = BitReader::new(&out[..n]);
        let header = RlcUmHeader::unpack(&mut r, 10).unwrap();
        assert_eq!(header.sn, 0);
    }
}
