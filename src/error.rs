use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("disk path {path} cannot be resolved to a mounted filesystem: {reason}")]
    UnresolvableDiskPath { path: String, reason: String },
    #[error("{metric} metrics unavailable: {detail}")]
    MetricsUnavailable { metric: &'static str, detail: String },
    #[error("failed to render report: {0}")]
    Render(String),
    #[error("failed to write output to {path}: {source}")]
    Output {
        path: String,
        source: std::io::Error,
    },
}

impl MonitorError {
    pub fn unavailable(metric: &'static str, detail: impl Into<String>) -> Self {
        Self::MetricsUnavailable {
            metric,
            detail: detail.into(),
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}
