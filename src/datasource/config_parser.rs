use std::fs;

use anyhow::Result;
use log::{error, info, warn};
use serde::Deserialize;

use crate::model::thresholds::{ThresholdEntry, ThresholdTable};

#[derive(Deserialize)]
struct ThresholdTableEntry {
    up_threshold: u64,
    down_threshold: u64,
}

#[derive(Deserialize)]
struct GovernorConfig {
    /// 采样窗口长度（微秒），缺省时保持编译内置值
    sample_interval: Option<u64>,
    #[serde(default)]
    threshold_table: Vec<ThresholdTableEntry>,
}

/// 配置文件读取结果
pub struct LoadedConfig {
    pub sample_interval: Option<u64>,
    pub thresholds: ThresholdTable,
}

fn entry_is_valid(entry: &ThresholdTableEntry) -> bool {
    entry.down_threshold <= entry.up_threshold
}

pub fn config_read(config_file: &str) -> Result<LoadedConfig> {
    let file = fs::read_to_string(config_file)?;
    let toml: GovernorConfig = toml::from_str(&file)?;

    let had_entries = !toml.threshold_table.is_empty();
    let mut entries = Vec::new();

    for entry in toml.threshold_table {
        let up = entry.up_threshold;
        let down = entry.down_threshold;

        if !entry_is_valid(&entry) {
            error!(
                "Entry up_threshold={up}, down_threshold={down} is invalid: down must not exceed up"
            );
            continue;
        }

        entries.push(ThresholdEntry {
            up_threshold: up,
            down_threshold: down,
        });
    }

    let thresholds = if entries.is_empty() {
        if had_entries {
            error!("Reload threshold table FAILED, using built-in Adreno defaults");
        } else {
            info!("No threshold table in config file, using built-in Adreno defaults");
        }
        ThresholdTable::adreno_defaults()
    } else {
        info!("Loaded {} threshold entries from config file", entries.len());
        ThresholdTable::from_entries(entries)
    };

    // Log the configuration
    for (level, entry) in thresholds.entries().iter().enumerate() {
        info!(
            "Level={}, Up={}%, Down={}%",
            level, entry.up_threshold, entry.down_threshold
        );
    }

    if let Some(interval) = toml.sample_interval {
        info!("Config sample interval: {interval}us");
    } else {
        warn!("No sample interval in config file, keeping default");
    }

    info!("Load config succeed");

    Ok(LoadedConfig {
        sample_interval: toml.sample_interval,
        thresholds,
    })
}
