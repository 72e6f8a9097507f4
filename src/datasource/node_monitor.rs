use std::sync::Arc;

use anyhow::Result;
use inotify::WatchMask;
use log::{error, info, warn};

use crate::{
    datasource::file_path::{SAMPLE_INTERVAL_PATH, TUNABLE_THREAD},
    model::{device::KgslDevice, governor::ConservativeGovernor, tuning::SamplingTuning},
    utils::{
        file_operate::{check_read_simple, read_file, write_file_safe},
        inotify::InotifyWatcher,
    },
};

/// 采样间隔调节节点监控
///
/// 原方案里这是sysfs attribute的store回调；这里用inotify监控
/// 一个普通文件节点：写入被解析、钳制、应用，随后把实际生效值
/// 回写到节点，操作者读回即可确认结果。
pub fn monitor_sample_interval(governor: Arc<ConservativeGovernor<KgslDevice>>) -> Result<()> {
    info!("{TUNABLE_THREAD} Start");

    if !check_read_simple(SAMPLE_INTERVAL_PATH) {
        // 节点还不存在：创建并写入当前生效值
        let current = governor.tuning().interval_us();
        if write_file_safe(SAMPLE_INTERVAL_PATH, &current.to_string()) {
            info!("Created sample interval node: {SAMPLE_INTERVAL_PATH} = {current}us");
        } else {
            warn!("Failed to create sample interval node: {SAMPLE_INTERVAL_PATH}");
        }
    } else {
        // 启动时应用节点里已有的值
        apply_node_content(governor.tuning(), SAMPLE_INTERVAL_PATH);
    }

    let mut inotify = InotifyWatcher::new()?;
    inotify.add(
        SAMPLE_INTERVAL_PATH,
        WatchMask::CLOSE_WRITE | WatchMask::MODIFY,
    )?;

    loop {
        inotify.wait_and_handle()?;

        if !check_read_simple(SAMPLE_INTERVAL_PATH) {
            continue;
        }

        apply_node_content(governor.tuning(), SAMPLE_INTERVAL_PATH);
    }
}

/// 读取节点内容并应用到配置面。无论写入是否合法，
/// 节点最终都回到当前生效值，读回节点即等价于原方案的show
fn apply_node_content(tuning: &SamplingTuning, node: &str) {
    let content = match read_file(node, 32) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read sample interval node: {e}");
            return;
        }
    };

    let effective = match tuning.set_interval_from_text(&content) {
        Ok(effective) => {
            info!("Sample interval updated to {effective}us");
            effective
        }
        Err(e) => {
            // 无法解析的写入被拒绝，旧值保持不变
            error!("Invalid sample interval write ignored: {e}");
            tuning.interval_us()
        }
    };

    // 回写生效值；内容已经一致时不再回写，避免事件循环
    if content.trim() != effective.to_string() {
        write_file_safe(node, &effective.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn temp_node(name: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("adrenogovernor_test_{name}_{}", std::process::id()));
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn valid_write_is_applied_and_clamped_value_echoed() {
        let node = temp_node("valid");
        fs::write(&node, "999999\n").unwrap();

        let tuning = SamplingTuning::new(100_000);
        apply_node_content(&tuning, &node);

        assert_eq!(tuning.interval_us(), 250_000);
        assert_eq!(fs::read_to_string(&node).unwrap(), "250000");
        fs::remove_file(&node).unwrap();
    }

    #[test]
    fn garbage_write_echoes_retained_prior_value() {
        let node = temp_node("garbage");
        fs::write(&node, "not-a-number\n").unwrap();

        let tuning = SamplingTuning::new(100_000);
        tuning.set_interval_us(42_000);
        apply_node_content(&tuning, &node);

        // 旧值保持不变，并且节点读回的是旧值而不是垃圾文本
        assert_eq!(tuning.interval_us(), 42_000);
        assert_eq!(fs::read_to_string(&node).unwrap(), "42000");
        fs::remove_file(&node).unwrap();
    }

    #[test]
    fn in_range_write_is_not_rewritten() {
        let node = temp_node("inrange");
        fs::write(&node, "150000").unwrap();

        let tuning = SamplingTuning::new(100_000);
        apply_node_content(&tuning, &node);

        assert_eq!(tuning.interval_us(), 150_000);
        assert_eq!(fs::read_to_string(&node).unwrap(), "150000");
        fs::remove_file(&node).unwrap();
    }
}
