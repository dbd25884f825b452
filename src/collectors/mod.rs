pub mod system;

use crate::error::MonitorError;
use crate::snapshot::{
    CpuStats, DiskStats, MemoryStats, NetworkStats, ProcessStats, Snapshot, UsageStats,
};
use std::time::SystemTime;
use tracing::debug;

/// Raw readings supplied by the operating system.
///
/// CPU, memory and disk are mandatory and report failures as errors. Load
/// average and network counters are optional and return `None` when the
/// platform cannot provide them.
pub trait MetricsSource {
    fn cpu(&mut self) -> Result<RawCpu, MonitorError>;
    fn load_average(&mut self) -> Option<[f64; 3]>;
    fn memory(&mut self) -> Result<RawMemory, MonitorError>;
    fn disk_usage(&mut self, path: &str) -> Result<RawDisk, MonitorError>;
    fn network(&mut self) -> Option<NetworkStats>;
    fn uptime_seconds(&mut self) -> u64;
    fn host(&mut self) -> HostInfo;
    fn top_processes(&mut self) -> Vec<ProcessStats>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCpu {
    pub overall_percent: f64,
    pub per_core_percent: Vec<f64>,
    pub physical_cores: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMemory {
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub ram_available_bytes: u64,
    pub swap_used_bytes: u64,
    pub swap_total_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDisk {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub architecture: String,
    pub kernel_version: Option<String>,
}

/// Confirms once, before any tick, that `disk_path` resolves.
pub fn check_disk_path<S: MetricsSource + ?Sized>(
    source: &mut S,
    disk_path: &str,
) -> Result<(), MonitorError> {
    source.disk_usage(disk_path).map(|_| ())
}

pub fn build_snapshot<S: MetricsSource + ?Sized>(
    disk_path: &str,
    source: &mut S,
) -> Result<Snapshot, MonitorError> {
    let disk = read_disk(source, disk_path)?;
    let cpu = normalize_cpu(source.cpu()?, source.load_average())?;
    let memory = normalize_memory(source.memory()?)?;
    // CPU sampling may block for the whole window; stamp after it.
    let timestamp = SystemTime::now();
    let network = source.network();
    let uptime_seconds = source.uptime_seconds();
    let host = source.host();
    let top_processes = source.top_processes();

    debug!(
        cpu_percent = cpu.percent_overall,
        cores = cpu.core_count_logical(),
        ram_percent = memory.ram.percent,
        disk = %disk_path,
        network = network.is_some(),
        "snapshot sampled"
    );

    Ok(Snapshot {
        timestamp,
        hostname: host.hostname,
        os_name: host.os_name,
        os_version: host.os_version,
        architecture: host.architecture,
        kernel_version: host.kernel_version,
        uptime_seconds,
        cpu,
        memory,
        disk: DiskStats::new(disk_path, disk.used_bytes, disk.total_bytes),
        network,
        top_processes,
    })
}

/// Past the startup check a disk read failure only costs the current tick.
fn read_disk<S: MetricsSource + ?Sized>(
    source: &mut S,
    disk_path: &str,
) -> Result<RawDisk, MonitorError> {
    let disk = source.disk_usage(disk_path).map_err(|err| match err {
        MonitorError::UnresolvableDiskPath { path, reason } => {
            MonitorError::unavailable("disk", format!("{path}: {reason}"))
        }
        other => other,
    })?;
    if disk.total_bytes == 0 {
        return Err(MonitorError::unavailable(
            "disk",
            format!("{disk_path}: total size reported as 0 bytes"),
        ));
    }
    Ok(disk)
}

fn normalize_cpu(raw: RawCpu, load: Option<[f64; 3]>) -> Result<CpuStats, MonitorError> {
    if raw.per_core_percent.is_empty() {
        return Err(MonitorError::unavailable("cpu", "no CPU cores reported"));
    }
    if !raw.overall_percent.is_finite() {
        return Err(MonitorError::unavailable(
            "cpu",
            format!("overall usage is not a number ({})", raw.overall_percent),
        ));
    }

    let load_avg_1_5_15 = load.filter(|l| l.iter().all(|v| v.is_finite() && *v >= 0.0));

    Ok(CpuStats {
        percent_overall: clamp_percent(raw.overall_percent),
        percent_per_core: raw
            .per_core_percent
            .into_iter()
            .map(clamp_percent)
            .collect(),
        core_count_physical: raw.physical_cores,
        load_avg_1_5_15,
    })
}

fn normalize_memory(raw: RawMemory) -> Result<MemoryStats, MonitorError> {
    if raw.ram_total_bytes == 0 {
        return Err(MonitorError::unavailable(
            "memory",
            "total RAM reported as 0 bytes",
        ));
    }
    Ok(MemoryStats {
        ram: UsageStats::new(raw.ram_used_bytes, raw.ram_total_bytes),
        ram_available_bytes: raw.ram_available_bytes.min(raw.ram_total_bytes),
        swap: UsageStats::new(raw.swap_used_bytes, raw.swap_total_bytes),
    })
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSource;
    use super::*;

    #[test]
    fn builds_normalized_snapshot() {
        let mut source = FakeSource::default();
        let snap = build_snapshot("/", &mut source).expect("snapshot");

        assert_eq!(snap.hostname, "web-01");
        assert_eq!(snap.cpu.core_count_logical(), 2);
        assert_eq!(snap.cpu.load_avg_1_5_15, Some([0.52, 0.41, 0.30]));
        assert!((snap.memory.ram.percent - 54.25).abs() < 1e-9);
        assert_eq!(snap.disk.path, "/");
        assert!((snap.disk.percent - 37.8).abs() < 1e-9);
        assert_eq!(snap.network.map(|n| n.bytes_received), Some(2_000));
        assert_eq!(snap.uptime_seconds, 285_160);
    }

    #[test]
    fn missing_optional_capabilities_become_absent() {
        let mut source = FakeSource {
            load: None,
            network: None,
            ..FakeSource::default()
        };
        let snap = build_snapshot("/", &mut source).expect("snapshot");
        assert!(snap.cpu.load_avg_1_5_15.is_none());
        assert!(snap.network.is_none());
    }

    #[test]
    fn invalid_load_average_is_dropped() {
        let mut source = FakeSource {
            load: Some([f64::NAN, 0.1, 0.1]),
            ..FakeSource::default()
        };
        let snap = build_snapshot("/", &mut source).expect("snapshot");
        assert!(snap.cpu.load_avg_1_5_15.is_none());
    }

    #[test]
    fn cpu_failure_aborts_the_tick() {
        let mut source = FakeSource {
            cpu: Err("permission denied".to_string()),
            ..FakeSource::default()
        };
        let err = build_snapshot("/", &mut source).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MetricsUnavailable { metric: "cpu", .. }
        ));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn zero_cores_is_unavailable() {
        let mut source = FakeSource {
            cpu: Ok(RawCpu {
                overall_percent: 0.0,
                per_core_percent: vec![],
                physical_cores: None,
            }),
            ..FakeSource::default()
        };
        assert!(matches!(
            build_snapshot("/", &mut source),
            Err(MonitorError::MetricsUnavailable { metric: "cpu", .. })
        ));
    }

    #[test]
    fn zero_total_ram_is_unavailable() {
        let mut source = FakeSource {
            memory: Ok(RawMemory {
                ram_used_bytes: 0,
                ram_total_bytes: 0,
                ram_available_bytes: 0,
                swap_used_bytes: 0,
                swap_total_bytes: 0,
            }),
            ..FakeSource::default()
        };
        assert!(matches!(
            build_snapshot("/", &mut source),
            Err(MonitorError::MetricsUnavailable {
                metric: "memory",
                ..
            })
        ));
    }

    #[test]
    fn unknown_disk_path_is_unresolvable() {
        let mut source = FakeSource::default();
        let err = check_disk_path(&mut source, "/nope").unwrap_err();
        assert!(matches!(err, MonitorError::UnresolvableDiskPath { .. }));
        assert!(err.to_string().contains("/nope"));
    }

    #[test]
    fn disk_lost_after_startup_only_fails_the_tick() {
        let mut source = FakeSource::default();
        check_disk_path(&mut source, "/").unwrap();

        source.disks.clear();
        let err = build_snapshot("/", &mut source).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MetricsUnavailable { metric: "disk", .. }
        ));
        assert!(err.to_string().contains("not a known mount"));
    }

    #[test]
    fn zero_size_disk_is_unavailable() {
        let mut source = FakeSource {
            disks: vec![(
                "/".to_string(),
                RawDisk {
                    used_bytes: 0,
                    total_bytes: 0,
                },
            )],
            ..FakeSource::default()
        };
        assert!(matches!(
            build_snapshot("/", &mut source),
            Err(MonitorError::MetricsUnavailable { metric: "disk", .. })
        ));
    }

    #[test]
    fn timestamp_is_taken_after_sampling() {
        let before = SystemTime::now();
        let mut source = FakeSource::default();
        let snap = build_snapshot("/", &mut source).expect("snapshot");
        assert!(snap.timestamp >= before);
        assert!(snap.timestamp <= SystemTime::now());
    }

    #[test]
    fn out_of_range_percentages_are_clamped() {
        let mut source = FakeSource {
            cpu: Ok(RawCpu {
                overall_percent: 100.4,
                per_core_percent: vec![-0.1, 101.0],
                physical_cores: None,
            }),
            ..FakeSource::default()
        };
        let snap = build_snapshot("/", &mut source).expect("snapshot");
        assert_eq!(snap.cpu.percent_overall, 100.0);
        assert_eq!(snap.cpu.percent_per_core, vec![0.0, 100.0]);
    }
}
