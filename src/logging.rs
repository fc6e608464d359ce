//! Provides logging utilities, used by application.
//!
//! Library code logs through the [`log`] facade. Applications embedding this
//! crate may call [`init`] to route those records into a structured JSON
//! logger.

use std::io;

use chrono::Local;
use slog::{
    o, Drain, Duplicate, FnValue, Fuse, Level, Logger, PushFnValue, Record,
};
use slog_async::Async;
use slog_json::Json;
use slog_scope::GlobalLoggerGuard;

use crate::conf;

/// Builds JSON [`Logger`] which prints all its log records to `w_out` writer,
/// but WARN level (and higher) to `w_err` writer. Records less severe than
/// the provided `level` are dropped. At most `buffer` records wait for the
/// writing thread.
///
/// Created [`Logger`] produces log records with `fqn`, `lvl`, `time` and `msg`
/// fields by default.
pub fn new_dual_logger<W1, W2>(
    w_out: W1,
    w_err: W2,
    level: Level,
    buffer: usize,
) -> Logger
where
    W1: io::Write + Send + 'static,
    W2: io::Write + Send + 'static,
{
    let drain_out = Json::new(w_out).build();
    let drain_err = Json::new(w_err).build();
    let drain = Duplicate(
        drain_out.filter(|r| !r.level().is_at_least(Level::Warning)),
        drain_err.filter_level(Level::Warning),
    )
    .map(Fuse);
    let drain = drain.filter_level(level).fuse();
    let drain = Async::new(drain).chan_size(buffer).build().fuse();
    add_default_keys(&Logger::root(drain, o!()))
}

/// Adds default log record data (key-value pairs) to specified [`Logger`]:
/// - `msg`: log record message.
/// - `fqn`: path to code line that called log function.
/// - `time`: creation date and time of log record in [RFC 3339] format.
/// - `lvl`: logging level of log record.
///
/// [RFC 3339]: https://www.ietf.org/rfc/rfc3339.txt
fn add_default_keys(logger: &Logger) -> Logger {
    logger.new(o!(
        "msg" => PushFnValue(move |record : &Record, ser| {
            ser.emit(record.msg())
        }),
        "fqn" => PushFnValue(move |record : &Record, ser| {
             ser.emit(format_args!("{}:{}", record.module(), record.line()))
        }),
        "time" => PushFnValue(move |_ : &Record, ser| {
            ser.emit(Local::now().to_rfc3339())
        }),
        "lvl" => FnValue(move |rinfo : &Record| {
            rinfo.level().as_str()
        }),
    ))
}

/// Installs the dual JSON logger configured by `conf` as the global one and
/// redirects [`log`] records into it.
///
/// [`LogLevel::Off`] disables logging.
///
/// The returned [`GlobalLoggerGuard`] must be held for as long as logging is
/// needed.
///
/// # Errors
///
/// If the [`log`] facade has a logger installed already.
///
/// [`LogLevel::Off`]: crate::conf::log::LogLevel::Off
pub fn init(
    conf: &conf::Log,
) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let logger = match conf.level() {
        Some(level) => {
            new_dual_logger(io::stdout(), io::stderr(), level, conf.buffer)
        }
        None => Logger::root(slog::Discard, o!()),
    };
    let guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init()?;
    Ok(guard)
}
