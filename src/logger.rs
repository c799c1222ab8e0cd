//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after the effective level is resolved.
//!
//! The HTTP stack underneath the LLM and Neo4j clients is capped at `warn`
//! unless the filter names those crates itself.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, ParseError};

use crate::error::AppError;

/// Initialise the global tracing subscriber.
///
/// `level` accepts standard level strings: `"error"`, `"warn"`, `"info"`,
/// `"debug"`, `"trace"`, or any `EnvFilter` directive such as
/// `"paysoko_assistant=debug,reqwest=warn"`.
///
/// If `prefer_level` is `true` (CLI `-v` flags), `level` takes precedence and
/// `RUST_LOG` is only used as a fallback when `level` is invalid. If
/// `prefer_level` is `false`, `RUST_LOG` takes precedence and `level` is the
/// fallback.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let from_env = || std::env::var(EnvFilter::DEFAULT_ENV).ok().map(|v| service_filter(&v));

    let filter = if prefer_level {
        match service_filter(level) {
            Ok(filter) => filter,
            Err(level_err) => match from_env() {
                Some(Ok(filter)) => filter,
                Some(Err(env_err)) => {
                    return Err(AppError::Logger(format!(
                        "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                    )));
                }
                None => return Err(AppError::Logger(format!("invalid log level '{level}': {level_err}"))),
            },
        }
    } else {
        match from_env() {
            Some(Ok(filter)) => filter,
            _ => service_filter(level)
                .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Crates whose debug output drowns the pipeline's own events.
const QUIET_CRATES: [&str; 4] = ["hyper", "hyper_util", "reqwest", "h2"];

/// Build an [`EnvFilter`] from `spec`, capping [`QUIET_CRATES`] at `warn`
/// when `spec` leaves them unmentioned.
pub fn service_filter(spec: &str) -> Result<EnvFilter, ParseError> {
    let mut filter = EnvFilter::try_new(spec)?;
    for name in QUIET_CRATES {
        let mentioned = spec
            .split(',')
            .any(|d| d.trim().split(['=', '[']).next() == Some(name));
        if !mentioned {
            filter = filter.add_directive(format!("{name}=warn").parse::<Directive>()?);
        }
    }
    Ok(filter)
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
