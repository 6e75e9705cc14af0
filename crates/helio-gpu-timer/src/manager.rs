//! Paired GPU timers and per-frame timing results

use crate::timer::{GpuTimer, TimestampDevice};
use crate::Result;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::Arc;

/// Timer shared between the manager and whoever issues its markers
pub type SharedTimer = Arc<Mutex<GpuTimer>>;

/// Begin/end timers spanning one block of GPU work
#[derive(Clone)]
pub struct TimerPair {
    pub begin: SharedTimer,
    pub end: SharedTimer,
}

struct ActivePair {
    name: String,
    begin: SharedTimer,
    end: SharedTimer,
}

/// Resolved duration of one named span
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTiming {
    pub name: String,
    pub ms: f32,
}

/// Hands out timer pairs and collects their results
///
/// Pairs are only handed out for the frame that is already being timed, or
/// once every outstanding pair has resolved. Resolved timers go back to a
/// spare pool.
#[derive(Default)]
pub struct GpuTimerManager {
    spare: Vec<SharedTimer>,
    active: Vec<ActivePair>,
    active_frame: u64,
    timings: Vec<GpuTiming>,
    results: String,
}

impl GpuTimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a begin/end pair for `name` in frame `frame`
    ///
    /// Returns `None` while an earlier frame's pairs are outstanding or when
    /// the device can't create queries.
    pub fn get_timers<D: TimestampDevice + ?Sized>(
        &mut self,
        device: &D,
        name: &str,
        frame: u64,
    ) -> Option<TimerPair> {
        if !self.active.is_empty() && frame != self.active_frame {
            log::trace!(
                "GPU timers for frame {} still outstanding, skipping '{}'",
                self.active_frame,
                name
            );
            return None;
        }
        self.active_frame = frame;

        let begin = match self.take_or_create(device) {
            Ok(timer) => timer,
            Err(e) => {
                log::warn!("No GPU timer for '{}': {}", name, e);
                return None;
            }
        };
        let end = match self.take_or_create(device) {
            Ok(timer) => timer,
            Err(e) => {
                self.spare.push(begin);
                log::warn!("No GPU timer for '{}': {}", name, e);
                return None;
            }
        };

        begin.lock().reset();
        end.lock().reset();
        self.active.push(ActivePair {
            name: name.to_string(),
            begin: begin.clone(),
            end: end.clone(),
        });
        Some(TimerPair { begin, end })
    }

    fn take_or_create<D: TimestampDevice + ?Sized>(&mut self, device: &D) -> Result<SharedTimer> {
        let Some(timer) = self.spare.pop() else {
            return Ok(Arc::new(Mutex::new(GpuTimer::new(device)?)));
        };

        // a pooled timer may still be invalid after a failed resurrect
        let revived = {
            let mut guard = timer.lock();
            if guard.is_valid() {
                Ok(())
            } else {
                guard.resurrect(device)
            }
        };
        match revived {
            Ok(()) => Ok(timer),
            Err(e) => {
                self.spare.push(timer);
                Err(e)
            }
        }
    }

    /// Collect results once every outstanding pair has resolved
    ///
    /// Call once a frame. Returns true when new timings were produced; the
    /// previous timings are kept otherwise.
    pub fn check_for_results<D: TimestampDevice + ?Sized>(&mut self, device: &D) -> bool {
        if self.active.is_empty() {
            return false;
        }

        let all_ready = self
            .active
            .iter()
            .all(|pair| pair.begin.lock().result_ready(device) && pair.end.lock().result_ready(device));
        if !all_ready {
            return false;
        }

        let frequency = device.timestamp_frequency();
        if frequency == 0 {
            log::warn!("Device reports a zero timestamp frequency");
        }

        self.timings.clear();
        self.results.clear();
        for pair in self.active.drain(..) {
            let start = pair.begin.lock().result();
            let end = pair.end.lock().result();
            let ms = if frequency == 0 {
                0.0
            } else {
                (end.saturating_sub(start) as f64 / frequency as f64 * 1000.0) as f32
            };

            let _ = write!(self.results, "\n {} {:.6}", pair.name, ms);
            self.timings.push(GpuTiming { name: pair.name, ms });
            self.spare.push(pair.begin);
            self.spare.push(pair.end);
        }

        log::debug!("GPU timings for frame {}:{}", self.active_frame, self.results);
        true
    }

    /// One `"\n name ms"` line per span of the last completed frame
    pub fn results_string(&self) -> &str {
        &self.results
    }

    pub fn timings(&self) -> &[GpuTiming] {
        &self.timings
    }

    pub fn active_frame(&self) -> u64 {
        self.active_frame
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn spare_count(&self) -> usize {
        self.spare.len()
    }

    /// Release every query after device loss
    pub fn zombify<D: TimestampDevice + ?Sized>(&mut self, device: &D) {
        for timer in self.all_timers() {
            timer.lock().zombify(device);
        }
    }

    /// Recreate queries and return outstanding pairs to the pool
    ///
    /// Pairs issued before the loss would never resolve and would block new
    /// frames forever. Every timer is attempted; the first failure is
    /// returned and the failed timers are retried when next handed out.
    pub fn resurrect<D: TimestampDevice + ?Sized>(&mut self, device: &D) -> Result<()> {
        self.release_active();
        let mut first_error = None;
        for timer in &self.spare {
            if let Err(e) = timer.lock().resurrect(device) {
                log::warn!("Failed to resurrect GPU timer: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release every query and empty the pool
    pub fn destroy_timers<D: TimestampDevice + ?Sized>(&mut self, device: &D) {
        self.release_active();
        for timer in self.spare.drain(..) {
            timer.lock().zombify(device);
        }
    }

    fn release_active(&mut self) {
        for pair in self.active.drain(..) {
            self.spare.push(pair.begin);
            self.spare.push(pair.end);
        }
    }

    fn all_timers(&self) -> impl Iterator<Item = &SharedTimer> + '_ {
        self.spare
            .iter()
            .chain(self.active.iter().flat_map(|pair| [&pair.begin, &pair.end]))
    }
}

/// Times the GPU work issued while it is alive
///
/// Issues the begin marker on creation and the end marker on drop. A missing
/// pair makes it do nothing.
pub struct ScopedGpuTimer<'d, D: TimestampDevice + ?Sized> {
    device: &'d D,
    pair: Option<TimerPair>,
}

impl<'d, D: TimestampDevice + ?Sized> ScopedGpuTimer<'d, D> {
    pub fn new(device: &'d D, pair: Option<TimerPair>) -> Self {
        if let Some(pair) = &pair {
            pair.begin.lock().issue_marker(device);
        }
        Self { device, pair }
    }

    /// Request a pair from `manager` and start timing
    pub fn start(manager: &mut GpuTimerManager, device: &'d D, name: &str, frame: u64) -> Self {
        let pair = manager.get_timers(device, name, frame);
        Self::new(device, pair)
    }

    pub fn is_timing(&self) -> bool {
        self.pair.is_some()
    }
}

impl<D: TimestampDevice + ?Sized> Drop for ScopedGpuTimer<'_, D> {
    fn drop(&mut self) {
        if let Some(pair) = &self.pair {
            pair.end.lock().issue_marker(self.device);
        }
    }
}
