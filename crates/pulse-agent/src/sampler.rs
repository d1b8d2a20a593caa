use std::sync::Arc;

use pulse_core::{FREE_MEMORY, POLL_COUNT, RANDOM_VALUE, TOTAL_MEMORY};
use pulse_store::{Store, StoreError};
use rand::Rng;
use sysinfo::{Pid, System};
use tokio::sync::Mutex;
use tracing::warn;

use crate::alloc;

/// Periodic reader of process and host metrics. Everything lands in the
/// local store as gauges except `PollCount`, which counts ticks.
pub struct Sampler {
    store: Arc<dyn Store>,
    // Separate System handles so the two sub-samples of a tick never
    // contend with each other.
    runtime_sys: Mutex<System>,
    host_sys: Mutex<System>,
    pid: Pid,
}

impl Sampler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            runtime_sys: Mutex::new(System::new()),
            host_sys: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    /// One sampling tick. The runtime and host sub-samples run concurrently
    /// and both must finish before the tick is done; overlapping ticks are
    /// tolerated, not coalesced.
    pub async fn tick(&self) {
        let (runtime, host) = tokio::join!(self.sample_runtime(), self.sample_host());
        for result in [runtime, host] {
            if let Err(e) = result {
                warn!(error = %e, "metric sample failed");
            }
        }
    }

    async fn sample_runtime(&self) -> Result<(), StoreError> {
        let mut gauges: Vec<(&'static str, f64)> = Vec::with_capacity(24);

        let heap = alloc::snapshot();
        gauges.push(("AllocatedBytes", heap.allocated_bytes as f64));
        gauges.push(("PeakAllocatedBytes", heap.peak_bytes as f64));
        gauges.push(("TotalAllocatedBytes", heap.total_bytes as f64));
        gauges.push(("Allocations", heap.allocations as f64));
        gauges.push(("Deallocations", heap.deallocations as f64));
        gauges.push((
            "LiveAllocations",
            heap.allocations.saturating_sub(heap.deallocations) as f64,
        ));

        {
            let mut sys = self.runtime_sys.lock().await;
            sys.refresh_cpu_usage();
            gauges.push(("CpuCount", sys.cpus().len() as f64));
            gauges.push(("CpuUtilization", f64::from(sys.global_cpu_info().cpu_usage())));

            if sys.refresh_process(self.pid) {
                if let Some(process) = sys.process(self.pid) {
                    gauges.push(("ProcessMemory", process.memory() as f64));
                    gauges.push(("ProcessVirtualMemory", process.virtual_memory() as f64));
                    gauges.push(("ProcessCpuUsage", f64::from(process.cpu_usage())));
                    gauges.push(("ProcessRunTime", process.run_time() as f64));
                    gauges.push(("ProcessStartTime", process.start_time() as f64));
                    let disk = process.disk_usage();
                    gauges.push(("ProcessDiskReadBytes", disk.read_bytes as f64));
                    gauges.push(("ProcessDiskWrittenBytes", disk.written_bytes as f64));
                    gauges.push(("ProcessTotalDiskReadBytes", disk.total_read_bytes as f64));
                    gauges.push((
                        "ProcessTotalDiskWrittenBytes",
                        disk.total_written_bytes as f64,
                    ));
                }
            }
        }

        let load = System::load_average();
        gauges.push(("LoadAverage1", load.one));
        gauges.push(("LoadAverage5", load.five));
        gauges.push(("LoadAverage15", load.fifteen));
        gauges.push(("Uptime", System::uptime() as f64));
        gauges.push(("BootTime", System::boot_time() as f64));

        for (name, value) in gauges {
            self.store.store_gauge(name, value).await?;
        }
        self.store.store_counter(POLL_COUNT, 1).await?;
        let random_value = rand::thread_rng().r#gen();
        self.store.store_gauge(RANDOM_VALUE, random_value).await?;
        Ok(())
    }

    async fn sample_host(&self) -> Result<(), StoreError> {
        let gauges: Vec<(&'static str, f64)> = {
            let mut sys = self.host_sys.lock().await;
            sys.refresh_memory();
            vec![
                (TOTAL_MEMORY, sys.total_memory() as f64),
                (FREE_MEMORY, sys.free_memory() as f64),
                ("AvailableMemory", sys.available_memory() as f64),
                ("UsedMemory", sys.used_memory() as f64),
                ("TotalSwap", sys.total_swap() as f64),
                ("FreeSwap", sys.free_swap() as f64),
                ("UsedSwap", sys.used_swap() as f64),
            ]
        };
        for (name, value) in gauges {
            self.store.store_gauge(name, value).await?;
        }
        Ok(())
    }
}
