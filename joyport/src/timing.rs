//! Cycle-accurate time base.
//!
//! Every timed loop in the firmware is paced in *reference cycles*: one instruction cycle of
//! the reference 4 MHz part, i.e. 1 µs. A tick of the time base is one emulated horizontal
//! video line (64 µs), and one pass of the time base is 228 ticks.
//!
//! The loops never look at a hardware timer. Instead every code path through a loop body
//! spends the same, compile-time known number of cycles through a [`CycleClock`]. Branches
//! that depend on sampled data go through [`Poll`], whose two arms cost the same, so the
//! duration of a pass never depends on what the comparators report.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

/// Time base tick, 0..[`TICKS_PER_PASS`]
pub type Tick = u8;

/// Number of ticks in one pass
pub const TICKS_PER_PASS: Tick = 228;

/// Largest tick value observed within a pass
pub const LAST_TICK: Tick = TICKS_PER_PASS - 1;

/// Reference cycles per tick, one horizontal line of 64µs
pub const CYCLES_PER_TICK: u32 = 64;

/// Reference cycles of one complete pass
pub const PASS_CYCLES: u32 = TICKS_PER_PASS as u32 * CYCLES_PER_TICK;

/// Length of one reference cycle in nanoseconds
pub const CYCLE_NS: u32 = 1_000;

/// Loop bookkeeping at the start of every tick: counter increment, compare and jump
pub const TICK_OVERHEAD_CYCLES: u32 = 7;

/// Cost of one comparator poll, including the taken arm
pub const TRIPPED_ARM_CYCLES: u32 = 9;

/// Cost of one comparator poll when the untaken arm burns filler instead
pub const NOT_TRIPPED_ARM_CYCLES: u32 = 9;

/// Comparators polled per tick
pub const POLLS_PER_TICK: u32 = 2;

/// Filler spent at the end of every tick to complete the line period
pub const TICK_FILLER_CYCLES: u32 = CYCLES_PER_TICK - TICK_OVERHEAD_CYCLES - POLLS_PER_TICK * TRIPPED_ARM_CYCLES;

const _: () = assert!(TRIPPED_ARM_CYCLES == NOT_TRIPPED_ARM_CYCLES, "poll arms must cost the same");
const _: () = assert!(
    TICK_OVERHEAD_CYCLES + POLLS_PER_TICK * TRIPPED_ARM_CYCLES + TICK_FILLER_CYCLES == CYCLES_PER_TICK,
    "tick budget must add up to one line period"
);

/// Source of fixed-duration busy waits, measured in reference cycles.
///
/// Implementations must not return early or late depending on anything but `cycles`.
pub trait CycleClock {
    /// Anchor the clock at the current instant, called once before every timed loop.
    fn start(&mut self) {}

    /// Consume exactly `cycles` reference cycles
    fn spend(&mut self, cycles: u32);
}

impl<K: CycleClock + ?Sized> CycleClock for &mut K {
    fn start(&mut self) {
        (**self).start()
    }

    fn spend(&mut self, cycles: u32) {
        (**self).spend(cycles)
    }
}

/// [`CycleClock`] paced against `embassy_time` deadlines.
///
/// Every `spend` moves a deadline forward and waits until it has passed. Time taken outside
/// the clock (pin reads, bookkeeping, the delay calls themselves) is absorbed by the next
/// wait, so a timed loop started with [`CycleClock::start`] ends exactly its budget after
/// the start, as long as each step fits in its share.
pub struct DeadlineClock<D: DelayNs> {
    delay: D,
    deadline: Instant,
}

impl<D: DelayNs> DeadlineClock<D> {
    pub fn new(delay: D) -> Self {
        Self {
            delay,
            deadline: Instant::now(),
        }
    }

    /// Instant the last `spend` waited for
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn into_inner(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> CycleClock for DeadlineClock<D> {
    fn start(&mut self) {
        self.deadline = Instant::now();
    }

    fn spend(&mut self, cycles: u32) {
        self.deadline += Duration::from_nanos(cycles as u64 * CYCLE_NS as u64);
        // Already late: no wait, the following deadlines catch up
        if let Some(remaining) = self.deadline.checked_duration_since(Instant::now()) {
            self.delay.delay_us(u32::try_from(remaining.as_micros()).unwrap_or(u32::MAX));
        }
    }
}

/// Outcome of polling one comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Poll {
    /// The comparator output is high
    Tripped,
    /// The comparator output is low
    NotTripped,
}

impl Poll {
    pub fn from_level(high: bool) -> Self {
        if high { Poll::Tripped } else { Poll::NotTripped }
    }

    /// Cycles consumed by this arm of the poll.
    pub const fn cost(self) -> u32 {
        match self {
            Poll::Tripped => TRIPPED_ARM_CYCLES,
            Poll::NotTripped => NOT_TRIPPED_ARM_CYCLES,
        }
    }

    /// Select `tick` when tripped, `previous` otherwise, without branching on the outcome.
    pub fn latch(self, tick: Tick, previous: Tick) -> Tick {
        let mask = (self == Poll::Tripped) as u8;
        let mask = mask.wrapping_neg();
        (tick & mask) | (previous & !mask)
    }
}

/// The bounded tick counter that paces a sampling pass.
pub struct TimeBase;

impl TimeBase {
    /// Run one pass: ticks `0..TICKS_PER_PASS`, each lasting [`CYCLES_PER_TICK`].
    ///
    /// The loop overhead and the filler are spent here. `body` must spend exactly
    /// `POLLS_PER_TICK` poll arms through the clock it is handed. Tick `n` ends
    /// `(n + 1) * CYCLES_PER_TICK` cycles after the clock is started.
    pub fn pass<K, F>(clock: &mut K, mut body: F)
    where
        K: CycleClock,
        F: FnMut(Tick, &mut K),
    {
        clock.start();
        for tick in 0..TICKS_PER_PASS {
            clock.spend(TICK_OVERHEAD_CYCLES);
            body(tick, clock);
            clock.spend(TICK_FILLER_CYCLES);
        }
    }
}
