use std::path::Path;
use std::sync::{mpsc, LazyLock, Mutex};

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use log::Log;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Where the front end's console listens, if it has subscribed.
static CONSOLE: LazyLock<Mutex<Option<mpsc::Sender<String>>>> = LazyLock::new(|| Mutex::new(None));

struct ViewerLogger {
    write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>,
}

impl Log for ViewerLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.write_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        self.write_logger.log(record);
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut console) = CONSOLE.lock() {
            let message = format!("{}:{} -- {}", record.level(), record.target(), record.args());
            // a dropped receiver unsubscribes
            if console.as_ref().is_some_and(|tx| tx.send(message).is_err()) {
                *console = None;
            }
        }
    }

    fn flush(&self) {
        self.write_logger.flush();
    }
}

/// Sends `log` records to `<log_dir>/logs/viewer.log`, rotated every 1000
/// lines and keeping the 3 most recent files. Fails if a logger is already
/// installed.
pub fn init(log_dir: &str) -> Result<()> {
    let path = Path::new(log_dir).join("logs/viewer.log");
    let log = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let write_logger = WriteLogger::new(LevelFilter::Info, config, log);
    log::set_boxed_logger(Box::new(ViewerLogger { write_logger }))?;
    log::set_max_level(LevelFilter::Info);
    info!("logging to {}", log_dir);
    Ok(())
}

/// Also delivers every logged line to the returned receiver, replacing any
/// earlier subscriber.
pub fn subscribe() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Ok(mut console) = CONSOLE.lock() {
        *console = Some(tx);
    }
    rx
}
