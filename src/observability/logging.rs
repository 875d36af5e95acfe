//! Logging configuration and redaction.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable read for the log filter before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "FINTRACK_LOG";

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl From<LogLevel> for tracing::level_filters::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Level used when neither `FINTRACK_LOG` nor `RUST_LOG` is set.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Include the module target in each line.
    pub include_target: bool,
}

impl LogConfig {
    /// Creates a new log configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether to include the module target.
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    fn filter(&self) -> EnvFilter {
        let from_env = std::env::var(LOG_ENV_VAR)
            .ok()
            .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok())
            .and_then(|directives| EnvFilter::try_new(directives).ok());

        from_env.unwrap_or_else(|| {
            EnvFilter::default()
                .add_directive(tracing::level_filters::LevelFilter::from(self.level).into())
        })
    }
}

/// Installs a global `tracing` subscriber.
///
/// Intended for binaries and examples embedding the client; libraries should
/// leave subscriber setup to the application.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(config.filter());

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(config.include_target))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.include_target))
            .try_init()?,
    }

    Ok(())
}

fn patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)bearer\s+[A-Za-z0-9._~+/=-]+", "Bearer ***"),
            (
                r#"(?i)"(password|token)"\s*:\s*"[^"]*""#,
                r#""$1":"***""#,
            ),
            (r"(?i)\b(password|token)=[^\s&,}]+", "$1=***"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Masks bearer tokens, passwords and token fields in `text`.
pub fn redact(text: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(text);
    for (re, replacement) in patterns() {
        if re.is_match(&result) {
            let replaced = re.replace_all(&result, *replacement).into_owned();
            result = Cow::Owned(replaced);
        }
    }
    result
}
