mod collectors;
mod config;
mod error;
mod health;
mod render;
mod sink;
mod snapshot;

use clap::Parser;
use collectors::system::SysinfoSource;
use collectors::{build_snapshot, check_disk_path, MetricsSource};
use config::{Config, OutputFormat, Overrides};
use error::MonitorError;
use health::{evaluate, HealthVerdict, ThresholdPolicy};
use sink::OutputSink;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "syswatch")]
#[command(version, about = "Host health monitor: CPU, memory, disk and network snapshots")]
struct Cli {
    /// YAML config file; every key is optional.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    /// Poll interval in seconds (0 = run once).
    #[arg(long)]
    interval: Option<u64>,
    /// Disk path to monitor.
    #[arg(long)]
    disk: Option<String>,
    /// Output structured JSON instead of the text report.
    #[arg(long)]
    json: bool,
    /// Append JSON records to this file, one per line.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    cpu_threshold: Option<f64>,
    #[arg(long)]
    mem_threshold: Option<f64>,
    #[arg(long)]
    disk_threshold: Option<f64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            interval_secs: self.interval,
            disk_path: self.disk.clone(),
            json: self.json,
            output: self.output.clone(),
            cpu_threshold: self.cpu_threshold,
            mem_threshold: self.mem_threshold,
            disk_threshold: self.disk_threshold,
        }
    }
}

struct Pipeline {
    disk_path: String,
    policy: ThresholdPolicy,
    format: OutputFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    let policy = match cfg.thresholds.policy() {
        Ok(p) => p,
        Err(err) => {
            error!(error = %err, "invalid thresholds");
            std::process::exit(1);
        }
    };

    info!(
        disk = %cfg.disk_path,
        interval_secs = cfg.interval_secs,
        format = ?cfg.format,
        "syswatch starting"
    );

    let mut source = SysinfoSource::new(cfg.cpu_sample_window(), cfg.top_processes);
    if let Err(err) = check_disk_path(&mut source, &cfg.disk_path) {
        error!(error = %err, "disk path check failed");
        std::process::exit(2);
    }

    let mut sink = match OutputSink::open(std::io::stdout(), cfg.output.as_deref()) {
        Ok(sink) => sink,
        Err(err) => {
            error!(error = %err, "failed to open output");
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline {
        disk_path: cfg.disk_path.clone(),
        policy,
        format: cfg.format,
    };

    if cfg.interval_secs == 0 {
        if let Err(err) = run_tick(&pipeline, &mut source, &mut sink) {
            error!(error = %err, "snapshot failed");
            std::process::exit(1);
        }
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    error!(error = %err, "failed to listen for Ctrl+C");
                }
                info!("syswatch stopped by user");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = run_tick(&pipeline, &mut source, &mut sink) {
                    error!(error = %err, "snapshot failed, retrying next interval");
                }
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    cfg.apply_overrides(cli.overrides());
    cfg.validate()?;
    Ok(cfg)
}

fn run_tick<S, W>(
    pipeline: &Pipeline,
    source: &mut S,
    sink: &mut OutputSink<W>,
) -> Result<HealthVerdict, MonitorError>
where
    S: MetricsSource + ?Sized,
    W: Write,
{
    let snapshot = build_snapshot(&pipeline.disk_path, source)?;
    let verdict = evaluate(&snapshot, &pipeline.policy);

    match pipeline.format {
        OutputFormat::Text => {
            let report = render::render_text(&snapshot, &verdict, &snapshot.hostname);
            sink.emit_text(&report)?;
        }
        OutputFormat::Json => {
            let line = render::render_json(&snapshot, &verdict, &snapshot.hostname).to_json_line()?;
            sink.emit_json(&line)?;
        }
    }

    for alert in verdict.alerts() {
        warn!(
            metric = %alert.metric,
            severity = %alert.severity,
            "{}",
            alert.message()
        );
    }

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collectors::fake::FakeSource;
    use collectors::RawCpu;
    use health::Status;

    fn pipeline(format: OutputFormat) -> Pipeline {
        Pipeline {
            disk_path: "/".to_string(),
            policy: ThresholdPolicy::default(),
            format,
        }
    }

    #[test]
    fn text_tick_prints_ok_report() {
        let mut source = FakeSource::default();
        let mut sink = OutputSink::open(Vec::new(), None).unwrap();
        let verdict = run_tick(&pipeline(OutputFormat::Text), &mut source, &mut sink).unwrap();

        assert_eq!(verdict.status(), Status::Ok);
        let out = String::from_utf8(sink.into_console()).unwrap();
        assert!(out.contains("SysWatch  │  web-01"));
        assert!(out.contains("  Uptime   : 3d 7h 12m\n"));
        assert!(out.contains("All metrics within normal thresholds."));
    }

    #[test]
    fn json_tick_emits_one_parseable_line() {
        let mut source = FakeSource {
            cpu: Ok(RawCpu {
                overall_percent: 96.0,
                per_core_percent: vec![96.0],
                physical_cores: None,
            }),
            ..FakeSource::default()
        };
        let mut sink = OutputSink::open(Vec::new(), None).unwrap();
        let verdict = run_tick(&pipeline(OutputFormat::Json), &mut source, &mut sink).unwrap();
        assert_eq!(verdict.status(), Status::Critical);

        let out = String::from_utf8(sink.into_console()).unwrap();
        assert_eq!(out.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["status"], "CRITICAL");
        assert_eq!(value["hostname"], "web-01");
        assert_eq!(value["alerts"][0]["metric"], "CPU");
    }

    #[test]
    fn failed_tick_writes_nothing() {
        let mut source = FakeSource {
            memory: Err("sysctl failed".to_string()),
            ..FakeSource::default()
        };
        let mut sink = OutputSink::open(Vec::new(), None).unwrap();
        let err = run_tick(&pipeline(OutputFormat::Json), &mut source, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MetricsUnavailable {
                metric: "memory",
                ..
            }
        ));
        assert!(sink.into_console().is_empty());
    }

    #[test]
    fn cli_flags_map_to_overrides() {
        let cli = Cli::parse_from([
            "syswatch",
            "--interval",
            "30",
            "--json",
            "--output",
            "logs/metrics.jsonl",
            "--disk",
            "/var",
            "--cpu-threshold",
            "70",
        ]);
        let cfg = load_config(&cli).unwrap();
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.disk_path, "/var");
        assert_eq!(cfg.thresholds.cpu_percent, 70.0);
        assert_eq!(cfg.output, Some(PathBuf::from("logs/metrics.jsonl")));
    }

    fn config_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn file_output_is_accepted_when_cli_selects_json() {
        let file = config_file("output: logs/metrics.jsonl\n");
        let path = file.path().display().to_string();
        let cli = Cli::parse_from(["syswatch", "--config", path.as_str(), "--json"]);

        let cfg = load_config(&cli).unwrap();
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.output, Some(PathBuf::from("logs/metrics.jsonl")));
    }

    #[test]
    fn cli_threshold_replaces_invalid_file_value() {
        let file = config_file("thresholds:\n  cpu_percent: 150\n");
        let path = file.path().display().to_string();

        let without = Cli::parse_from(["syswatch", "--config", path.as_str()]);
        assert!(load_config(&without).is_err());

        let with = Cli::parse_from([
            "syswatch",
            "--config",
            path.as_str(),
            "--cpu-threshold",
            "80",
        ]);
        let cfg = load_config(&with).unwrap();
        assert_eq!(cfg.thresholds.cpu_percent, 80.0);
    }

    #[test]
    fn cli_rejects_bad_threshold() {
        let cli = Cli::parse_from(["syswatch", "--disk-threshold", "0"]);
        assert!(load_config(&cli).is_err());
    }
}
