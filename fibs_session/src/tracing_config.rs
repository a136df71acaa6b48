//! Logging setup: a layered `tracing` subscriber built from the logging
//! section of the configuration, with optional daily-rolled file targets.

use std::collections::HashMap;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_core::LevelFilter;
use tracing_subscriber::{filter::filter_fn, prelude::*, registry::LookupSpan, Layer};

use crate::config::ClientConfig;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(arg: LogLevel) -> LevelFilter {
        match arg {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinLogTarget {
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LogTarget {
    File { filename: PathBuf },
    Builtin(BuiltinLogTarget),
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LogEntry {
    pub target: LogTarget,
    #[serde(default)]
    pub modules: Vec<String>,
    pub level: Option<LogLevel>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub default_level: Option<LogLevel>,
    #[serde(default)]
    pub module_levels: HashMap<String, LogLevel>,
    #[serde(default)]
    pub targets: Vec<LogEntry>,
}

impl LoggingConfig {
    pub fn prefix_file(&self, filename: impl AsRef<Path>) -> PathBuf {
        let mut path = self.dir.clone();
        path.push(filename);
        path
    }

    /// Derive the targets from the client settings: stderr always, plus a
    /// daily-rolled file when `logfile` is set. The wire-traffic trace
    /// lines only pass the global filter with `server-communication` on.
    pub fn for_client(config: &ClientConfig) -> Self {
        let default_level = if config.server_communication {
            LogLevel::Trace
        } else {
            LogLevel::Info
        };
        let mut dir = PathBuf::from(".");
        let mut targets = vec![LogEntry {
            target: LogTarget::Builtin(BuiltinLogTarget::Stderr),
            modules: Vec::new(),
            level: None,
        }];
        if let Some(logfile) = &config.logfile {
            if let Some(parent) = logfile.parent() {
                if !parent.as_os_str().is_empty() {
                    dir = parent.to_path_buf();
                }
            }
            let filename = logfile
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("gammonet.log"));
            targets.push(LogEntry {
                target: LogTarget::File { filename },
                modules: Vec::new(),
                level: None,
            });
        }
        Self {
            dir,
            default_level: Some(default_level),
            module_levels: HashMap::new(),
            targets,
        }
    }
}

fn build_target<S>(
    conf: LogEntry,
    dir: impl AsRef<Path>,
) -> Result<Box<dyn Layer<S> + Send + Sync + 'static>, IoError>
where
    S: Subscriber + Send + Sync,
    for<'span> S: LookupSpan<'span>,
{
    let layer = match &conf.target {
        LogTarget::File { filename } => tracing_subscriber::fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, filename))
            .with_ansi(false)
            .boxed(),
        LogTarget::Builtin(BuiltinLogTarget::Stdout) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .boxed(),
        LogTarget::Builtin(BuiltinLogTarget::Stderr) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let filter = filter_fn(move |metadata| {
        let level: LevelFilter = if let Some(level) = conf.level {
            level.into()
        } else {
            LevelFilter::TRACE
        };
        metadata.level() <= &level
            && (conf.modules.is_empty()
                || if let Some(module) = metadata.module_path() {
                    conf.modules.iter().any(|m| module.starts_with(m))
                } else {
                    true
                })
    });

    Ok(layer.with_filter(filter).boxed())
}

pub fn build_subscriber(conf: LoggingConfig) -> Result<impl Subscriber, IoError> {
    let mut layers = Vec::new();

    for target in conf.targets {
        layers.push(build_target(target, &conf.dir)?);
    }

    // The global filter needs a permissive default so that individual
    // targets can filter as they need to.
    let filter = tracing_subscriber::filter::Targets::new()
        .with_default(conf.default_level.unwrap_or(LogLevel::Trace))
        .with_targets(conf.module_levels);

    Ok(tracing_subscriber::registry().with(filter).with(layers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_logfile_becomes_a_file_target() {
        let dir = std::env::temp_dir();
        let config = ClientConfig {
            logfile: Some(dir.join("session.log")),
            server_communication: true,
            ..ClientConfig::default()
        };
        let logging = LoggingConfig::for_client(&config);
        assert_eq!(logging.dir, dir);
        assert!(matches!(logging.default_level, Some(LogLevel::Trace)));
        assert!(logging.targets.iter().any(|t| matches!(
            &t.target,
            LogTarget::File { filename } if filename == &PathBuf::from("session.log")
        )));
        assert!(build_subscriber(logging).is_ok());
    }

    #[test]
    fn quiet_client_logs_to_stderr_only() {
        let logging = LoggingConfig::for_client(&ClientConfig::default());
        assert!(matches!(logging.default_level, Some(LogLevel::Info)));
        assert_eq!(logging.targets.len(), 1);
        assert!(matches!(
            logging.targets[0].target,
            LogTarget::Builtin(BuiltinLogTarget::Stderr)
        ));
    }
}
