use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::{LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;

use crate::datasource::file_path::LOG_LEVEL_PATH;

// Custom logger implementation - 只输出到控制台
struct CustomLogger;

impl log::Log for CustomLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        // 实际的过滤由log库根据设置的max_level完成
        true
    }

    fn log(&self, record: &Record) {
        let now = Local::now();
        let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let level_str = record.level().to_string();
        let log_message = format!("[{}][{}]: {}\n", timestamp, level_str, record.args());

        print!("{}", log_message);
    }

    fn flush(&self) {}
}

// Global logger instance
static LOGGER: Lazy<CustomLogger> = Lazy::new(|| CustomLogger);

pub fn init_logger() -> Result<()> {
    let log_level = read_log_level_config()?;

    log::set_logger(&*LOGGER)
        .map(|()| log::set_max_level(log_level))
        .with_context(|| "Failed to set logger")?;

    log::info!("Logger initialized with level: {}", log_level);
    log::info!("Log level config path: {}", LOG_LEVEL_PATH);

    Ok(())
}

// 读取日志等级配置文件
pub fn read_log_level_config() -> Result<LevelFilter> {
    // 默认日志等级为Info
    let default_level = LevelFilter::Info;

    if !Path::new(LOG_LEVEL_PATH).exists() {
        return Ok(default_level);
    }

    let content = match std::fs::read_to_string(LOG_LEVEL_PATH) {
        Ok(content) => content,
        Err(_) => return Ok(default_level),
    };

    let level_str = content.trim().to_lowercase();
    match level_str.as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        _ => Ok(default_level),
    }
}

// 更新日志等级
pub fn update_log_level() -> Result<()> {
    let new_level = read_log_level_config()?;

    log::set_max_level(new_level);

    log::info!("Log level updated to: {}", new_level);

    Ok(())
}
