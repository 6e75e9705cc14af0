//! GPU timer manager walkthrough
//!
//! Drives a [`GpuTimerManager`] against a simulated device whose timestamps
//! resolve two frames after they are issued, then loses and restores the
//! device mid-run.

use helio_gpu_timer::{
    Error, GpuTimerManager, QueryHandle, Result, ScopedGpuTimer, TimestampDevice,
};
use parking_lot::Mutex;
use std::collections::HashMap;

const LATENCY_FRAMES: u64 = 2;

#[derive(Default)]
struct SimState {
    frame: u64,
    clock: u64,
    next_query: u64,
    lost: bool,
    /// query -> (frame issued, stamp)
    issued: HashMap<u64, (u64, u64)>,
}

/// Timestamps tick at 1 MHz; each marker costs some simulated GPU time
#[derive(Default)]
struct SimDevice {
    state: Mutex<SimState>,
}

impl SimDevice {
    fn end_frame(&self) {
        self.state.lock().frame += 1;
    }

    fn spend(&self, micros: u64) {
        self.state.lock().clock += micros;
    }

    fn set_lost(&self, lost: bool) {
        let mut state = self.state.lock();
        state.lost = lost;
        if lost {
            state.issued.clear();
        }
    }
}

impl TimestampDevice for SimDevice {
    fn create_timestamp_query(&self) -> Result<QueryHandle> {
        let mut state = self.state.lock();
        if state.lost {
            return Err(Error::QueryCreation("device lost".into()));
        }
        state.next_query += 1;
        Ok(QueryHandle(state.next_query))
    }

    fn release_timestamp_query(&self, query: QueryHandle) {
        self.state.lock().issued.remove(&query.0);
    }

    fn issue_timestamp_query(&self, query: QueryHandle) {
        let mut state = self.state.lock();
        if !state.lost {
            let entry = (state.frame, state.clock);
            state.issued.insert(query.0, entry);
        }
    }

    fn poll_timestamp_query(&self, query: QueryHandle) -> bool {
        let state = self.state.lock();
        match state.issued.get(&query.0) {
            Some(&(frame, _)) => state.frame >= frame + LATENCY_FRAMES,
            None => false,
        }
    }

    fn timestamp_result(&self, query: QueryHandle) -> u64 {
        self.state.lock().issued.get(&query.0).map(|&(_, stamp)| stamp).unwrap_or(0)
    }

    fn timestamp_frequency(&self) -> u64 {
        1_000_000
    }
}

fn render_frame(manager: &mut GpuTimerManager, device: &SimDevice, frame: u64) {
    {
        let _shadows = ScopedGpuTimer::start(manager, device, "shadows", frame);
        device.spend(1_200);
    }
    {
        let _gbuffer = ScopedGpuTimer::start(manager, device, "gbuffer", frame);
        device.spend(2_500 + frame * 10);
    }
    {
        let _lighting = ScopedGpuTimer::start(manager, device, "lighting", frame);
        device.spend(900);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = SimDevice::default();
    let mut manager = GpuTimerManager::new();

    for frame in 0..12 {
        if frame == 6 {
            log::info!("frame {}: device lost", frame);
            manager.zombify(&device);
            device.set_lost(true);
        }
        if frame == 8 {
            device.set_lost(false);
            match manager.resurrect(&device) {
                Ok(()) => log::info!("frame {}: device restored", frame),
                Err(e) => log::error!("frame {}: {}", frame, e),
            }
        }

        render_frame(&mut manager, &device, frame);
        if manager.check_for_results(&device) {
            log::info!("frame {} GPU timings:{}", frame, manager.results_string());
        }
        device.end_frame();
    }

    log::info!(
        "{} spare timers, {} pairs outstanding",
        manager.spare_count(),
        manager.active_count()
    );
    manager.destroy_timers(&device);
}
