use crate::error::MonitorError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes rendered reports to the console and, for JSON records, appends them
/// to an optional log file.
pub struct OutputSink<W: Write> {
    console: W,
    append: Option<(PathBuf, File)>,
}

impl<W: Write> OutputSink<W> {
    pub fn open(console: W, append_path: Option<&Path>) -> Result<Self, MonitorError> {
        let append = match append_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|source| MonitorError::Output {
                        path: parent.display().to_string(),
                        source,
                    })?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| MonitorError::Output {
                        path: path.display().to_string(),
                        source,
                    })?;
                Some((path.to_path_buf(), file))
            }
            None => None,
        };
        Ok(Self { console, append })
    }

    pub fn emit_text(&mut self, report: &str) -> Result<(), MonitorError> {
        writeln!(self.console, "{report}")
            .and_then(|_| self.console.flush())
            .map_err(|source| MonitorError::Output {
                path: "<stdout>".to_string(),
                source,
            })
    }

    pub fn emit_json(&mut self, line: &str) -> Result<(), MonitorError> {
        writeln!(self.console, "{line}")
            .and_then(|_| self.console.flush())
            .map_err(|source| MonitorError::Output {
                path: "<stdout>".to_string(),
                source,
            })?;
        if let Some((path, file)) = self.append.as_mut() {
            writeln!(file, "{line}").map_err(|source| MonitorError::Output {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn into_console(self) -> W {
        self.console
    }
}
