use std::thread;

use chrono::{format::DelayedFormat, DateTime, Local};
use concat_string::concat_string;
use once_cell::sync::Lazy;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 累積到這個長度才寫檔，通道清空時也會寫出
const FLUSH_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn name(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug)]
struct LogMessage {
    created_at: DateTime<Local>,
    msg: String,
}

/// 非同步檔案日誌，每個等級各自一個寫檔線程
pub struct Logger {
    info_writer: UnboundedSender<LogMessage>,
    warn_writer: UnboundedSender<LogMessage>,
    error_writer: UnboundedSender<LogMessage>,
    debug_writer: UnboundedSender<LogMessage>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(log_name, Level::Info),
            warn_writer: Self::create_writer(log_name, Level::Warn),
            error_writer: Self::create_writer(log_name, Level::Error),
            debug_writer: Self::create_writer(log_name, Level::Debug),
        }
    }

    pub fn info(&self, log: String) {
        Self::send(log, &self.info_writer);
    }

    pub fn warn(&self, log: String) {
        Self::send(log, &self.warn_writer);
    }

    pub fn error(&self, log: String) {
        Self::send(log, &self.error_writer);
    }

    pub fn debug(&self, log: String) {
        Self::send(log, &self.debug_writer);
    }

    fn send(msg: String, writer: &UnboundedSender<LogMessage>) {
        let message = LogMessage {
            created_at: Local::now(),
            msg,
        };

        if let Err(why) = writer.send(message) {
            error_console(format!("Failed to send log message because {:?}", why));
        }
    }

    fn create_writer(log_name: &str, level: Level) -> UnboundedSender<LogMessage> {
        let (tx, mut rx) = unbounded_channel::<LogMessage>();
        let pattern = format!("log/%Y-%m-%d_{}_{}.log", log_name, level.name());

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut together = String::with_capacity(FLUSH_THRESHOLD);

            while let Some(received) = rx.blocking_recv() {
                together.push_str(&concat_string!(
                    received.created_at.format("%F %X%.6f").to_string(),
                    " ",
                    received.msg,
                    "\r\n"
                ));

                if rx.is_empty() || together.len() >= FLUSH_THRESHOLD {
                    if let Err(why) = rotate.write_msg(Local::now(), together.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, together
                        ));
                    }

                    together.clear();
                }
            }
        });

        tx
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
