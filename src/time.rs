//! Time APIs for durations, points in time, and the reordering-timer service.
//!
//! These APIs have microsecond resolution. An [`Instant`] is only meaningful relative to other
//! `Instant`s produced by the same [`Clock`]; `Instant`s from different `Clock`s are not
//! compatible, and mixing them in operations produces unspecified results. This lets tests drive
//! the RLC reordering timer deterministically by advancing a fake clock instead of sleeping.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::atomic::{AtomicU64, Ordering};

const MICROS_PER_SEC: u32 = 1_000_000;

/// A span of time, split into whole seconds and a sub-second remainder in microseconds.
///
/// Splitting the representation (rather than keeping one flat microsecond count) is what
/// `std::time::Duration` does and keeps `as_micros` the only place overflow into `u64` can
/// happen, since every other accessor reads straight off one of the two fields.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    secs: u64,
    micros: u32,
}

impl Duration {
    pub const ZERO: Self = Duration { secs: 0, micros: 0 };

    /// Builds a `Duration` out of a raw microsecond count, carrying the excess into `secs`.
    pub fn from_micros(micros: u64) -> Self {
        Duration {
            secs: micros / u64::from(MICROS_PER_SEC),
            micros: (micros % u64::from(MICROS_PER_SEC)) as u32,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::from_micros(millis.saturating_mul(1_000))
    }

    pub fn from_secs(secs: u64) -> Self {
        Duration { secs, micros: 0 }
    }

    pub fn whole_secs(&self) -> u64 {
        self.secs
    }

    pub fn whole_millis(&self) -> u64 {
        self.secs * 1_000 + u64::from(self.micros / 1_000)
    }

    /// Flattens back into a single microsecond count. The inverse of [`Duration::from_micros`].
    pub fn as_micros(&self) -> u64 {
        self.secs * u64::from(MICROS_PER_SEC) + u64::from(self.micros)
    }

    /// The part of `self` smaller than one second.
    pub fn subsec_micros(&self) -> u64 {
        u64::from(self.micros)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut micros = self.micros + rhs.micros;
        let mut secs = self.secs.checked_add(rhs.secs).expect("duration overflow");
        if micros >= MICROS_PER_SEC {
            micros -= MICROS_PER_SEC;
            secs = secs.checked_add(1).expect("duration overflow");
        }
        Duration { secs, micros }
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (micros, borrow) = match self.micros.checked_sub(rhs.micros) {
            Some(m) => (m, 0),
            None => (self.micros + MICROS_PER_SEC - rhs.micros, 1),
        };
        let secs = self
            .secs
            .checked_sub(rhs.secs)
            .and_then(|s| s.checked_sub(borrow))
            .expect("duration underflow");
        Duration { secs, micros }
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secs > 0 {
            if self.micros == 0 {
                write!(f, "{}s", self.secs)
            } else {
                write!(f, "{}.{:06}s", self.secs, self.micros)
            }
        } else if self.micros >= 1_000 {
            let millis = self.micros / 1_000;
            let rem = self.micros % 1_000;
            if rem == 0 {
                write!(f, "{}ms", millis)
            } else {
                write!(f, "{}.{:03}ms", millis, rem)
            }
        } else {
            write!(f, "{}µs", self.micros)
        }
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

/// A point in time, relative to an unspecified epoch defined by whichever [`Clock`] produced it.
///
/// `Instant`s are obtained from an implementation of [`Clock`]. `Instant`s created from
/// different `Clock` instances (even when using the same implementation) are not compatible.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64);

impl Instant {
    /// Creates an `Instant` from raw microseconds since an arbitrary implementation-defined
    /// reference point.
    ///
    /// This should only be called from a [`Clock`] implementation.
    pub fn from_raw_micros(micros: u64) -> Self {
        Instant(micros)
    }

    /// Returns the raw value from which this `Instant` was created.
    pub fn raw_micros(&self) -> u64 {
        self.0
    }

    /// Calculates the duration of time that has passed between `earlier` and `self`.
    ///
    /// Both `self` and `earlier` must have been produced by the same [`Clock`], and `self` must
    /// not be before `earlier`, or this panics.
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_micros(
            self.0
                .checked_sub(earlier.0)
                .expect("instant is before `earlier`"),
        )
    }
}

/// [`Instant`]s can be subtracted, which computes the [`Duration`] between the rhs and lhs using
/// [`Instant::duration_since`].
impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.duration_since(rhs)
    }
}

/// A [`Duration`] can be added to an [`Instant`], moving the [`Instant`] forwards in time.
impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, d: Duration) -> Self {
        Instant(self.0 + d.as_micros())
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, d: Duration) {
        *self = *self + d;
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000 {
            let (secs, subsec_micros) = (self.0 / 1_000_000, self.0 % 1_000_000);
            if subsec_micros == 0 {
                write!(f, "{}s", secs)
            } else {
                write!(f, "{}.{:06}s", secs, subsec_micros)
            }
        } else if self.0 >= 1000 {
            let (millis, submilli_micros) = (self.0 / 1000, self.0 % 1000);
            if submilli_micros == 0 {
                write!(f, "{}ms", millis)
            } else {
                write!(f, "{}.{:03}ms", millis, submilli_micros)
            }
        } else {
            write!(f, "{}µs", self.0)
        }
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

/// Trait for time providers.
///
/// The embedding application provides an implementation of `Clock` to the RLC entity. This
/// trait can also be implemented by a mock clock for testing (see [`FakeClock`]).
pub trait Clock {
    /// Obtain the current time as an [`Instant`].
    fn now(&self) -> Instant;
}

/// A manually-advanced clock, for deterministic tests of the reordering timer.
#[derive(Debug, Default)]
pub struct FakeClock {
    micros: AtomicU64,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            micros: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.micros.fetch_add(d.as_micros(), Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        Instant::from_raw_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Opaque identifier for a timer handed out by a [`TimerService`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u32);

/// A single timer, armed with a duration and checked for expiry against a [`Clock`].
///
/// This models the reordering timer of the RLC UM entity: `set` reconfigures the duration,
/// `run` arms it against the current time, `is_expired` checks without mutating state, and
/// `stop`/`reset` disarm or rearm it.
#[derive(Debug)]
pub struct Timer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Timer {
            duration,
            deadline: None,
        }
    }

    /// Reconfigures the duration this timer runs for. Does not affect an already-running timer.
    pub fn set(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Arms the timer: it expires `duration` after `now`.
    pub fn run(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    /// Disarms the timer.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Disarms then immediately rearms the timer against `now`.
    pub fn reset(&mut self, now: Instant) {
        self.run(now);
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Hands out timers identified by opaque [`TimerId`]s.
///
/// The RLC UM entity requests exactly one timer (the reordering timer) per RX side.
#[derive(Debug, Default)]
pub struct TimerService {
    next_id: u32,
}

impl TimerService {
    pub fn new() -> Self {
        TimerService { next_id: 0 }
    }

    /// Allocates a fresh [`TimerId`] and a [`Timer`] configured with `duration`, not running.
    pub fn timer_get(&mut self, duration: Duration) -> (TimerId, Timer) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        (id, Timer::new(duration))
    }
}
