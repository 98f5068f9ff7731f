use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. The level is `info` unless `debug` is set, in which
/// case it is `debug` and may be overridden via the `RUST_LOG` environment
/// variable. With `log_file` set, output is appended to that file through a
/// non-blocking writer instead of stderr.
///
/// Only the first call installs a subscriber; later calls are ignored.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let filter = filter_for(debug);

    match log_file.as_deref().and_then(|path| {
        let dir = path.parent()?;
        let name = path.file_name()?;
        Some((dir.to_path_buf(), name.to_owned()))
    }) {
        Some((dir, name)) => {
            if let Err(err) = std::fs::create_dir_all(&dir) {
                eprintln!("failed to create log directory {}: {err}", dir.display());
            }
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let installed = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .is_ok();
            if installed {
                let _ = FILE_GUARD.set(guard);
            }
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
    }
}

fn filter_for(debug: bool) -> EnvFilter {
    // Without debug logging `RUST_LOG` is ignored so a stray environment
    // variable cannot turn on verbose output.
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}
