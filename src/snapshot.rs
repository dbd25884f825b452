use std::time::SystemTime;

/// One point-in-time reading of every monitored metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: SystemTime,
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub architecture: String,
    pub kernel_version: Option<String>,
    pub uptime_seconds: u64,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    pub network: Option<NetworkStats>,
    pub top_processes: Vec<ProcessStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuStats {
    pub percent_overall: f64,
    pub percent_per_core: Vec<f64>,
    pub core_count_physical: Option<usize>,
    pub load_avg_1_5_15: Option<[f64; 3]>,
}

impl CpuStats {
    pub fn core_count_logical(&self) -> usize {
        self.percent_per_core.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageStats {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
}

impl UsageStats {
    /// Clamps `used` to `total` so the pair stays consistent.
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let used_bytes = if total_bytes > 0 {
            used_bytes.min(total_bytes)
        } else {
            used_bytes
        };
        Self {
            used_bytes,
            total_bytes,
            percent: usage_percent(used_bytes, total_bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    pub ram: UsageStats,
    pub ram_available_bytes: u64,
    pub swap: UsageStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskStats {
    pub path: String,
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
}

impl DiskStats {
    pub fn new(path: impl Into<String>, used_bytes: u64, total_bytes: u64) -> Self {
        let usage = UsageStats::new(used_bytes, total_bytes);
        Self {
            path: path.into(),
            used_bytes: usage.used_bytes,
            total_bytes: usage.total_bytes,
            percent: usage.percent,
        }
    }

    pub fn free_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

/// Cumulative counters since boot. Wraparound is not corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStats {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: String,
}

pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}
