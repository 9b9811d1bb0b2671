use std::{fs, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. With a logs directory the output goes to
/// a daily rolling `bracket.log` there, otherwise to stderr.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_tracing(logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  match logs_dir {
    Some(dir) => {
      fs::create_dir_all(dir).map_err(|e| format!("create logs dir {}: {e}", dir.display()))?;
      let file_appender = tracing_appender::rolling::daily(dir, "bracket.log");
      let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| e.to_string())?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| e.to_string())?;
      Ok(None)
    }
  }
}
