//! Single timestamp query state machine

use crate::Result;

/// Device-side identity of a timestamp query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(pub u64);

/// What a timer needs from the graphics device
///
/// Methods take `&self`; the device synchronizes internally.
pub trait TimestampDevice {
    fn create_timestamp_query(&self) -> Result<QueryHandle>;

    fn release_timestamp_query(&self, query: QueryHandle);

    /// Write a timestamp once the GPU reaches this point
    fn issue_timestamp_query(&self, query: QueryHandle);

    /// Non-blocking check. True once the stamp is available.
    fn poll_timestamp_query(&self, query: QueryHandle) -> bool;

    /// The stamp, or 0 if it is not available
    fn timestamp_result(&self, query: QueryHandle) -> u64;

    /// Timestamp ticks per second
    fn timestamp_frequency(&self) -> u64;
}

/// Where a timer is in its issue/resolve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Ready to issue a marker
    Idle,
    /// Marker issued, stamp not back yet
    Pending,
    /// Stamp resolved
    Ready(u64),
    /// Query released after device loss
    Invalid,
}

/// One GPU timestamp
///
/// ```text
/// Idle --issue--> Pending --poll ok--> Ready
///   ^                                   |
///   +--------------reset----------------+
/// any --zombify--> Invalid --resurrect--> Idle
/// ```
#[derive(Debug)]
pub struct GpuTimer {
    query: Option<QueryHandle>,
    state: TimerState,
}

impl GpuTimer {
    pub fn new<D: TimestampDevice + ?Sized>(device: &D) -> Result<Self> {
        let query = device.create_timestamp_query()?;
        log::trace!("Created GPU timer {:?}", query);
        Ok(Self {
            query: Some(query),
            state: TimerState::Idle,
        })
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Issue the marker. Only an idle timer issues; otherwise a no-op.
    pub fn issue_marker<D: TimestampDevice + ?Sized>(&mut self, device: &D) {
        match (self.state, self.query) {
            (TimerState::Idle, Some(query)) => {
                device.issue_timestamp_query(query);
                self.state = TimerState::Pending;
            }
            (TimerState::Invalid, _) | (_, None) => {
                log::trace!("Ignoring marker on invalid GPU timer");
            }
            _ => {}
        }
    }

    /// Poll the device. Moves Pending to Ready only when the device says so.
    pub fn result_ready<D: TimestampDevice + ?Sized>(&mut self, device: &D) -> bool {
        if let (TimerState::Pending, Some(query)) = (self.state, self.query) {
            if device.poll_timestamp_query(query) {
                self.state = TimerState::Ready(device.timestamp_result(query));
            }
        }
        matches!(self.state, TimerState::Ready(_))
    }

    /// Resolved stamp, or 0 in any other state
    pub fn result(&self) -> u64 {
        match self.state {
            TimerState::Ready(stamp) => stamp,
            _ => 0,
        }
    }

    /// Drop any result so a new marker can be issued
    pub fn reset(&mut self) {
        if self.state != TimerState::Invalid {
            self.state = TimerState::Idle;
        }
    }

    /// Release the query after device loss
    pub fn zombify<D: TimestampDevice + ?Sized>(&mut self, device: &D) {
        if let Some(query) = self.query.take() {
            device.release_timestamp_query(query);
        }
        self.state = TimerState::Invalid;
    }

    /// Recreate the query against the current device
    pub fn resurrect<D: TimestampDevice + ?Sized>(&mut self, device: &D) -> Result<()> {
        if self.query.is_none() {
            self.query = Some(device.create_timestamp_query()?);
        }
        self.state = TimerState::Idle;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.query.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Device {
        next: Mutex<u64>,
        live: Mutex<HashSet<u64>>,
        signaled: Mutex<HashSet<u64>>,
        issued: Mutex<Vec<u64>>,
        lost: Mutex<bool>,
    }

    impl Device {
        fn signal(&self, query: QueryHandle) {
            self.signaled.lock().insert(query.0);
        }
    }

    impl TimestampDevice for Device {
        fn create_timestamp_query(&self) -> Result<QueryHandle> {
            if *self.lost.lock() {
                return Err(Error::QueryCreation("device lost".into()));
            }
            let mut next = self.next.lock();
            *next += 1;
            self.live.lock().insert(*next);
            Ok(QueryHandle(*next))
        }

        fn release_timestamp_query(&self, query: QueryHandle) {
            self.live.lock().remove(&query.0);
        }

        fn issue_timestamp_query(&self, query: QueryHandle) {
            self.issued.lock().push(query.0);
        }

        fn poll_timestamp_query(&self, query: QueryHandle) -> bool {
            self.signaled.lock().contains(&query.0)
        }

        fn timestamp_result(&self, query: QueryHandle) -> u64 {
            if self.signaled.lock().contains(&query.0) {
                1000 + query.0
            } else {
                0
            }
        }

        fn timestamp_frequency(&self) -> u64 {
            1_000_000
        }
    }

    #[test]
    fn issue_while_pending_is_a_noop() {
        let device = Device::default();
        let mut timer = GpuTimer::new(&device).unwrap();

        timer.issue_marker(&device);
        timer.issue_marker(&device);
        assert_eq!(timer.state(), TimerState::Pending);
        assert_eq!(device.issued.lock().len(), 1);
    }

    #[test]
    fn poll_waits_for_the_device() {
        let device = Device::default();
        let mut timer = GpuTimer::new(&device).unwrap();
        timer.issue_marker(&device);

        assert!(!timer.result_ready(&device));
        assert!(!timer.result_ready(&device));
        assert_eq!(timer.state(), TimerState::Pending);
        assert_eq!(timer.result(), 0);

        device.signal(QueryHandle(1));
        assert!(timer.result_ready(&device));
        assert!(timer.result_ready(&device));
        assert_eq!(timer.result(), 1001);

        // stable until reset, even if marked again
        timer.issue_marker(&device);
        assert_eq!(timer.result(), 1001);

        timer.reset();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.result(), 0);
    }

    #[test]
    fn idle_timer_is_never_ready() {
        let device = Device::default();
        let mut timer = GpuTimer::new(&device).unwrap();
        device.signal(QueryHandle(1));
        assert!(!timer.result_ready(&device));
    }

    #[test]
    fn zombify_and_resurrect() {
        let device = Device::default();
        let mut timer = GpuTimer::new(&device).unwrap();
        timer.issue_marker(&device);
        device.signal(QueryHandle(1));
        assert!(timer.result_ready(&device));

        timer.zombify(&device);
        assert_eq!(timer.state(), TimerState::Invalid);
        assert_eq!(timer.result(), 0);
        assert!(device.live.lock().is_empty());

        timer.issue_marker(&device);
        timer.reset();
        assert_eq!(timer.state(), TimerState::Invalid);
        assert!(!timer.result_ready(&device));

        timer.resurrect(&device).unwrap();
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.is_valid());
        assert_eq!(device.live.lock().len(), 1);
    }

    #[test]
    fn failed_resurrect_stays_invalid() {
        let device = Device::default();
        let mut timer = GpuTimer::new(&device).unwrap();
        timer.zombify(&device);

        *device.lost.lock() = true;
        assert!(timer.resurrect(&device).is_err());
        assert_eq!(timer.state(), TimerState::Invalid);
    }
}
