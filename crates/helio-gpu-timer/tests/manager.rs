use helio_gpu_timer::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Device whose timestamps are written when the test flushes the "GPU"
#[derive(Default)]
struct FakeDevice {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    next_query: u64,
    clock: u64,
    issued: Vec<u64>,
    stamps: HashMap<u64, u64>,
    released: Vec<u64>,
    fail_create: bool,
}

impl FakeDevice {
    /// Advance the GPU clock and resolve every issued query
    fn flush(&self, ticks: u64) {
        let mut state = self.state.lock();
        for query in std::mem::take(&mut state.issued) {
            state.clock += ticks;
            let clock = state.clock;
            state.stamps.insert(query, clock);
        }
    }

    fn set_fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }
}

impl TimestampDevice for FakeDevice {
    fn create_timestamp_query(&self) -> Result<QueryHandle> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(Error::QueryCreation("out of query slots".into()));
        }
        state.next_query += 1;
        Ok(QueryHandle(state.next_query))
    }

    fn release_timestamp_query(&self, query: QueryHandle) {
        self.state.lock().released.push(query.0);
    }

    fn issue_timestamp_query(&self, query: QueryHandle) {
        let mut state = self.state.lock();
        state.stamps.remove(&query.0);
        state.issued.push(query.0);
    }

    fn poll_timestamp_query(&self, query: QueryHandle) -> bool {
        self.state.lock().stamps.contains_key(&query.0)
    }

    fn timestamp_result(&self, query: QueryHandle) -> u64 {
        self.state.lock().stamps.get(&query.0).copied().unwrap_or(0)
    }

    fn timestamp_frequency(&self) -> u64 {
        // one tick per microsecond
        1_000_000
    }
}

#[test]
fn scoped_timer_produces_millisecond_results() {
    init_logger();
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();

    {
        let scope = ScopedGpuTimer::start(&mut manager, &device, "shadows", 1);
        assert!(scope.is_timing());
    }
    assert!(!manager.check_for_results(&device));

    // begin at 2000us, end at 4000us
    device.flush(2000);
    assert!(manager.check_for_results(&device));

    assert_eq!(manager.timings().len(), 1);
    assert_eq!(manager.timings()[0].name, "shadows");
    assert!((manager.timings()[0].ms - 2.0).abs() < 1e-4);
    assert_eq!(manager.results_string(), "\n shadows 2.000000");
    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.spare_count(), 2);
}

#[test]
fn later_frames_wait_for_outstanding_pairs() {
    init_logger();
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();

    drop(ScopedGpuTimer::start(&mut manager, &device, "gbuffer", 7));
    assert!(ScopedGpuTimer::start(&mut manager, &device, "lighting", 7).is_timing());
    assert!(manager.get_timers(&device, "gbuffer", 8).is_none());
    assert_eq!(manager.active_count(), 2);

    device.flush(10);
    assert!(manager.check_for_results(&device));
    assert_eq!(manager.timings().len(), 2);
    assert!(manager.results_string().starts_with("\n gbuffer "));

    // pool is reused once the frame resolved
    assert!(manager.get_timers(&device, "gbuffer", 8).is_some());
    assert_eq!(manager.spare_count(), 2);
}

#[test]
fn creation_failure_hands_out_no_pair() {
    init_logger();
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();

    drop(ScopedGpuTimer::start(&mut manager, &device, "warmup", 1));
    device.flush(1);
    assert!(manager.check_for_results(&device));
    assert!(manager.get_timers(&device, "one", 2).is_some());

    // pool is empty now; the next pair needs new queries
    device.set_fail_create(true);
    let scope = ScopedGpuTimer::start(&mut manager, &device, "two", 2);
    assert!(!scope.is_timing());
    drop(scope);
    assert_eq!(manager.spare_count(), 0);
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn device_loss_never_locks_the_manager() {
    init_logger();
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();

    drop(ScopedGpuTimer::start(&mut manager, &device, "sky", 3));
    manager.zombify(&device);
    assert_eq!(device.state.lock().released.len(), 2);

    // nothing resolves after the loss
    device.flush(5);
    assert!(!manager.check_for_results(&device));
    assert!(manager.get_timers(&device, "sky", 4).is_none());

    manager.resurrect(&device).unwrap();
    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.spare_count(), 2);
    assert!(manager.get_timers(&device, "sky", 4).is_some());
}

#[test]
fn failed_resurrect_recovers_once_the_device_does() {
    init_logger();
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();

    drop(ScopedGpuTimer::start(&mut manager, &device, "ssao", 1));
    device.flush(1);
    assert!(manager.check_for_results(&device));

    manager.zombify(&device);
    device.set_fail_create(true);
    assert!(manager.resurrect(&device).is_err());
    assert_eq!(manager.spare_count(), 2);

    // still lost: no pair, and nothing left outstanding
    assert!(manager.get_timers(&device, "ssao", 2).is_none());
    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.spare_count(), 2);

    device.set_fail_create(false);
    for frame in 3..10 {
        assert!(ScopedGpuTimer::start(&mut manager, &device, "ssao", frame).is_timing());
        device.flush(1000);
        assert!(manager.check_for_results(&device), "frame {} gave no results", frame);
        assert_eq!(manager.active_count(), 0);
    }
    assert!((manager.timings()[0].ms - 1.0).abs() < 1e-4);
}

#[test]
fn destroy_releases_every_query() {
    let device = FakeDevice::default();
    let mut manager = GpuTimerManager::new();
    drop(ScopedGpuTimer::start(&mut manager, &device, "a", 1));
    drop(ScopedGpuTimer::start(&mut manager, &device, "b", 1));

    manager.destroy_timers(&device);
    assert_eq!(manager.spare_count(), 0);
    assert_eq!(manager.active_count(), 0);
    assert_eq!(device.state.lock().released.len(), 4);
}

proptest! {
    #[test]
    fn result_is_zero_unless_ready(ops in prop::collection::vec(0u8..5, 0..40)) {
        let device = FakeDevice::default();
        let mut timer = GpuTimer::new(&device).unwrap();

        for op in ops {
            match op {
                0 => timer.issue_marker(&device),
                1 => { timer.result_ready(&device); }
                2 => timer.reset(),
                3 => device.flush(3),
                _ => timer.zombify(&device),
            }

            match timer.state() {
                TimerState::Ready(stamp) => prop_assert_eq!(timer.result(), stamp),
                _ => prop_assert_eq!(timer.result(), 0),
            }
            if timer.state() == TimerState::Invalid {
                prop_assert!(!timer.result_ready(&device));
            }
        }
    }
}
