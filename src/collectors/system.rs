use crate::collectors::{HostInfo, MetricsSource, RawCpu, RawDisk, RawMemory};
use crate::error::MonitorError;
use crate::snapshot::{NetworkStats, ProcessStats};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::{
    CpuExt, DiskExt, NetworkExt, NetworksExt, PidExt, ProcessExt, System, SystemExt,
};
use tracing::debug;

/// Live `MetricsSource` backed by `sysinfo`.
///
/// The `System` handle is kept across ticks: CPU usage is a delta between two
/// refreshes, so each read waits until at least `cpu_window` has passed since
/// the previous refresh.
pub struct SysinfoSource {
    system: System,
    cpu_window: Duration,
    last_cpu_refresh: Instant,
    top_processes: usize,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration, top_processes: usize) -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        if top_processes > 0 {
            system.refresh_processes();
        }
        Self {
            system,
            cpu_window: cpu_window.max(System::MINIMUM_CPU_UPDATE_INTERVAL),
            last_cpu_refresh: Instant::now(),
            top_processes,
        }
    }

    fn wait_for_cpu_window(&self) {
        let elapsed = self.last_cpu_refresh.elapsed();
        if elapsed < self.cpu_window {
            std::thread::sleep(self.cpu_window - elapsed);
        }
    }
}

impl MetricsSource for SysinfoSource {
    fn cpu(&mut self) -> Result<RawCpu, MonitorError> {
        if !System::IS_SUPPORTED {
            return Err(MonitorError::unavailable(
                "cpu",
                "this platform is not supported by the metrics backend",
            ));
        }
        self.wait_for_cpu_window();
        self.system.refresh_cpu();
        self.last_cpu_refresh = Instant::now();

        let per_core_percent: Vec<f64> = self
            .system
            .cpus()
            .iter()
            .map(|c| c.cpu_usage() as f64)
            .collect();
        let overall_percent = self.system.global_cpu_info().cpu_usage() as f64;

        Ok(RawCpu {
            overall_percent,
            per_core_percent,
            physical_cores: self.system.physical_core_count(),
        })
    }

    fn load_average(&mut self) -> Option<[f64; 3]> {
        if cfg!(target_os = "windows") {
            return None;
        }
        let load = self.system.load_average();
        Some([load.one, load.five, load.fifteen])
    }

    fn memory(&mut self) -> Result<RawMemory, MonitorError> {
        self.system.refresh_memory();
        let ram_total_bytes = self.system.total_memory();
        if ram_total_bytes == 0 {
            return Err(MonitorError::unavailable(
                "memory",
                "the operating system reported no physical memory",
            ));
        }
        Ok(RawMemory {
            ram_used_bytes: self.system.used_memory(),
            ram_total_bytes,
            ram_available_bytes: self.system.available_memory(),
            swap_used_bytes: self.system.used_swap(),
            swap_total_bytes: self.system.total_swap(),
        })
    }

    fn disk_usage(&mut self, path: &str) -> Result<RawDisk, MonitorError> {
        let canonical =
            std::fs::canonicalize(path).map_err(|err| MonitorError::UnresolvableDiskPath {
                path: path.to_string(),
                reason: err.to_string(),
            })?;

        self.system.refresh_disks_list();
        self.system.refresh_disks();
        let mounts: Vec<(PathBuf, RawDisk)> = self
            .system
            .disks()
            .iter()
            .map(|d| {
                let total = d.total_space();
                (
                    d.mount_point().to_path_buf(),
                    RawDisk {
                        used_bytes: total.saturating_sub(d.available_space()),
                        total_bytes: total,
                    },
                )
            })
            .collect();

        let (mount, disk) =
            find_mount(&canonical, &mounts).ok_or_else(|| MonitorError::UnresolvableDiskPath {
                path: path.to_string(),
                reason: format!("no mounted filesystem contains {}", canonical.display()),
            })?;
        // Pseudo filesystems (/proc, /sys, tmpfs) are not listed by sysinfo and
        // would otherwise borrow the numbers of the enclosing mount.
        if !same_filesystem(&canonical, mount) {
            return Err(MonitorError::UnresolvableDiskPath {
                path: path.to_string(),
                reason: format!(
                    "{} is on a filesystem that is not listed, nearest mount is {}",
                    canonical.display(),
                    mount.display()
                ),
            });
        }
        debug!(path = %path, mount = %mount.display(), "disk path resolved");
        Ok(*disk)
    }

    fn network(&mut self) -> Option<NetworkStats> {
        self.system.refresh_networks_list();
        self.system.refresh_networks();
        let mut ifaces = self.system.networks().iter().peekable();
        ifaces.peek()?;

        Some(ifaces.fold(NetworkStats::default(), |acc, (_, data)| NetworkStats {
            bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
            bytes_received: acc.bytes_received.saturating_add(data.total_received()),
            packets_sent: acc
                .packets_sent
                .saturating_add(data.total_packets_transmitted()),
            packets_received: acc
                .packets_received
                .saturating_add(data.total_packets_received()),
            errors_in: acc
                .errors_in
                .saturating_add(data.total_errors_on_received()),
            errors_out: acc
                .errors_out
                .saturating_add(data.total_errors_on_transmitted()),
        }))
    }

    fn uptime_seconds(&mut self) -> u64 {
        self.system.uptime()
    }

    fn host(&mut self) -> HostInfo {
        HostInfo {
            hostname: self.system.host_name().unwrap_or_else(|| "unknown".to_string()),
            os_name: self.system.name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: self.system.os_version().unwrap_or_default(),
            architecture: std::env::consts::ARCH.to_string(),
            kernel_version: self.system.kernel_version(),
        }
    }

    fn top_processes(&mut self) -> Vec<ProcessStats> {
        if self.top_processes == 0 {
            return Vec::new();
        }
        self.system.refresh_processes();
        let total_memory = self.system.total_memory();
        let mut procs: Vec<ProcessStats> = self
            .system
            .processes()
            .iter()
            .map(|(pid, p)| ProcessStats {
                pid: pid.as_u32(),
                name: p.name().to_string(),
                cpu_percent: p.cpu_usage() as f64,
                memory_percent: if total_memory > 0 {
                    (p.memory() as f64 / total_memory as f64) * 100.0
                } else {
                    0.0
                },
                status: p.status().to_string(),
            })
            .collect();
        procs.sort_by(|a, b| {
            b.cpu_percent
                .total_cmp(&a.cpu_percent)
                .then_with(|| a.pid.cmp(&b.pid))
        });
        procs.truncate(self.top_processes);
        procs
    }
}

/// Picks the mount point with the longest prefix of `path`.
fn find_mount<'a, T>(path: &Path, mounts: &'a [(PathBuf, T)]) -> Option<(&'a Path, &'a T)> {
    mounts
        .iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(mount, v)| (mount.as_path(), v))
}

#[cfg(unix)]
fn same_filesystem(path: &Path, mount: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(path), std::fs::metadata(mount)) {
        (Ok(p), Ok(m)) => p.dev() == m.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_filesystem(_path: &Path, _mount: &Path) -> bool {
    true
}
