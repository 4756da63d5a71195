// src/logging/runtime_logger.rs

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;

const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const RETENTION_HOURS: u64 = 72;

struct LogEntry {
    level: String,
    content: String,
}

/// 运行日志管理器：按日志级别分流到不同的滚动日志文件。
///
/// Entries are queued over an mpsc channel and written by one
/// background task in batches (size- or interval-triggered), so request
/// handling never blocks on file IO. A second task deletes log files
/// older than the retention window.
pub struct RuntimeLogger {
    sender: Sender<LogEntry>,
    flush_interval: u64,
}

impl RuntimeLogger {
    /// - `log_dir`: 日志目录
    /// - `file_prefix`: 文件前缀（最终文件形如 runtime_info.json）
    /// - `buffer_size`: 通道缓冲区大小
    /// - `batch_size`: 每级别批量写入条数
    /// - `flush_interval`: 定时刷盘间隔（毫秒）
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);

        let mut appenders = HashMap::new();
        for level in LEVELS {
            let file_name = format!("{}_{}.json", file_prefix, level.to_lowercase());
            appenders.insert(
                level.to_string(),
                Arc::new(rolling::hourly(log_dir, &file_name)),
            );
        }

        tokio::spawn(Self::background_writer(
            appenders,
            receiver,
            batch_size,
            flush_interval,
        ));

        {
            let log_dir = log_dir.to_string();
            tokio::spawn(async move {
                loop {
                    Self::cleanup_old_logs(&log_dir, RETENTION_HOURS).await;
                    time::sleep(Duration::from_secs(3600)).await;
                }
            });
        }

        Arc::new(Self {
            sender,
            flush_interval,
        })
    }

    pub async fn log(&self, level: &str, message: &str) {
        let entry = LogEntry {
            level: level.to_string(),
            content: json!({
                "timestamp": Utc::now().to_rfc3339(),
                "level": level,
                "message": message,
            })
            .to_string(),
        };
        if let Err(e) = self.sender.send(entry).await {
            eprintln!("Failed to queue runtime log message: {}", e);
        }
    }

    async fn background_writer(
        appenders: HashMap<String, Arc<RollingFileAppender>>,
        mut receiver: Receiver<LogEntry>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<String, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                entry = receiver.recv() => {
                    let Some(entry) = entry else { break };
                    let buffer = buffers.entry(entry.level.clone()).or_default();
                    buffer.push(entry.content);
                    if buffer.len() >= batch_size {
                        if let Some(appender) = appenders.get(&entry.level) {
                            Self::flush(Arc::clone(appender), buffer).await;
                        }
                    }
                }
                _ = interval.tick() => {
                    for (level, buffer) in buffers.iter_mut() {
                        if !buffer.is_empty() {
                            if let Some(appender) = appenders.get(level) {
                                Self::flush(Arc::clone(appender), buffer).await;
                            }
                        }
                    }
                }
            }
        }
        // Channel closed: flush whatever is left.
        for (level, buffer) in buffers.iter_mut() {
            if !buffer.is_empty() {
                if let Some(appender) = appenders.get(level) {
                    Self::flush(Arc::clone(appender), buffer).await;
                }
            }
        }
    }

    async fn flush(appender: Arc<RollingFileAppender>, buffer: &mut Vec<String>) {
        let content = buffer.join("\n") + "\n";
        buffer.clear();
        let result = task::spawn_blocking(move || {
            let mut writer = appender.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
        let retention = std::time::Duration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        let Ok(mut dir) = tokio::fs::read_dir(log_dir).await else {
            return;
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > retention {
                if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                    eprintln!("Failed to delete old log file {:?}: {}", entry.path(), e);
                }
            }
        }
    }

    /// 等待后台任务把队列中的日志刷盘。
    pub async fn shutdown(&self) {
        time::sleep(Duration::from_millis(self.flush_interval * 2)).await;
    }
}
