mod datasource;
mod model;
mod utils;

use std::{env, path::Path, sync::Arc, thread};

use anyhow::Result;
use log::{error, info, warn};

use crate::{
    datasource::{
        config_parser::config_read,
        file_path::*,
        node_monitor::monitor_sample_interval,
    },
    model::{
        device::{KgslDevice, PowerControl},
        governor::ConservativeGovernor,
        pwrscale_engine::PwrscaleEngine,
        thresholds::ThresholdTable,
        tuning::SamplingTuning,
    },
    utils::{
        constants::{
            NOTES, VERSION,
            sampling::{DEFAULT_SAMPLE_INTERVAL, MAX_SAMPLE_INTERVAL, MIN_SAMPLE_INTERVAL},
        },
        log_monitor::monitor_log_level,
        logger::init_logger,
    },
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 {
        let i = 1;
        match args[i].as_str() {
            "-h" => {
                println!("{}", NOTES);
                println!("Usage:");
                println!("\t-v show version");
                println!("\t-h show help");
                return Ok(());
            }
            "-v" => {
                println!("{}", NOTES);
                println!("{}", VERSION);
                return Ok(());
            }
            _ => {
                println!("Unknown argument: {}", args[i]);
                println!("Use -h for help");
                return Ok(());
            }
        }
    }

    init_logger()?;

    info!("{}", NOTES);
    info!("{}", VERSION);

    info!("Loading");

    // 配置文件可选：缺失时使用编译内置的阈值表和默认采样间隔
    let mut thresholds = ThresholdTable::adreno_defaults();
    let mut initial_interval = DEFAULT_SAMPLE_INTERVAL;
    if Path::new(CONFIG_FILE).exists() {
        info!("Reading config file: {}", CONFIG_FILE);
        match config_read(CONFIG_FILE) {
            Ok(loaded) => {
                thresholds = loaded.thresholds;
                if let Some(interval) = loaded.sample_interval {
                    initial_interval = interval;
                }
            }
            Err(e) => {
                error!("Failed to read config file, using built-in defaults: {}", e);
            }
        }
    } else {
        info!("Config file not found, using built-in defaults: {}", CONFIG_FILE);
    }

    // 探测KGSL设备节点
    let device = KgslDevice::probe()?;

    let tuning = SamplingTuning::new(initial_interval);
    let governor = Arc::new(ConservativeGovernor::new(device, thresholds, tuning));

    // Start monitoring threads
    let governor_clone1 = governor.clone();
    thread::spawn(move || {
        if let Err(e) = monitor_sample_interval(governor_clone1) {
            error!("Sample interval monitor error: {}", e);
        }
    });

    thread::spawn(move || {
        if let Err(e) = monitor_log_level() {
            error!("Log level monitor error: {}", e);
        }
    });

    info!("Monitor Inited");

    // Bootstrap information
    info!("Power levels: {}", governor.device().num_power_levels());
    info!(
        "Default power level: {}",
        governor.device().default_power_level()
    );
    info!(
        "Current power level: {}",
        governor.device().current_power_level()
    );
    info!(
        "Sample interval: {}us (min {}us, max {}us)",
        governor.tuning().interval_us(),
        MIN_SAMPLE_INTERVAL,
        MAX_SAMPLE_INTERVAL
    );
    info!("Sample interval node: {}", SAMPLE_INTERVAL_PATH);
    info!("Log level file path: {}", LOG_LEVEL_PATH);

    for (level, entry) in governor.thresholds().entries().iter().enumerate() {
        info!(
            "Threshold level {}: up={}%, down={}%",
            level, entry.up_threshold, entry.down_threshold
        );
    }

    if governor.thresholds().len() as i64 != governor.device().num_power_levels() {
        warn!(
            "Threshold table covers {} levels, device reports {}",
            governor.thresholds().len(),
            governor.device().num_power_levels()
        );
    }

    info!("Conservative Governor Started");

    // Run the governor
    PwrscaleEngine::run_polling_loop(&governor)
}
