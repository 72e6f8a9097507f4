use std::{thread, time::Duration};

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::{
    datasource::file_path::MAIN_THREAD,
    model::{
        device::{DeviceState, KgslDevice},
        governor::ConservativeGovernor,
    },
    utils::constants::engine::{IDLE_POLL_PERIOD_MS, NAP_TICKS, POLL_PERIOD_MS, SLEEP_TICKS},
};

/// 轮询引擎 - 内核事件钩子在用户态的替身
///
/// 固定节拍驱动governor的idle回调，从返回的统计里检测
/// busy/idle切换，推动设备经由NAP进入SLEEP，活动恢复时
/// 触发wake和busy事件。
pub struct PwrscaleEngine;

impl PwrscaleEngine {
    pub fn run_polling_loop(governor: &ConservativeGovernor<KgslDevice>) -> Result<()> {
        info!("{MAIN_THREAD} Start");

        // 连续零负载采样计数，用于NAP/SLEEP判定
        let mut zero_busy_ticks: u64 = 0;
        // 唤醒后的第一个采样点跳过评估，等时钟稳定
        let mut ignore_next = false;

        loop {
            let ignore_idle = std::mem::take(&mut ignore_next);

            match governor.on_idle(ignore_idle) {
                Ok(tick) => {
                    if tick.total_time > 0 && tick.busy_time == 0 {
                        zero_busy_ticks += 1;
                        match governor.device().state() {
                            DeviceState::Active if zero_busy_ticks >= NAP_TICKS => {
                                debug!("GPU idle for {zero_busy_ticks} ticks, napping");
                                governor.device().enter_nap();
                            }
                            DeviceState::Nap if zero_busy_ticks >= SLEEP_TICKS => {
                                governor.device().enter_sleep();
                                governor.on_sleep();
                            }
                            _ => {}
                        }
                    } else if tick.busy_time > 0 {
                        if governor.device().state() != DeviceState::Active {
                            governor.device().wake();
                            if let Err(e) = governor.on_wake() {
                                warn!("Wake handling failed: {e}");
                            }
                            governor.on_busy();
                            ignore_next = true;
                        }
                        zero_busy_ticks = 0;
                    }

                    if let Some(eval) = tick.evaluation
                        && let Some(level) = eval.requested_level
                    {
                        debug!(
                            "Requested power level {level} at load {}%",
                            eval.load_pct
                        );
                    }
                }
                Err(e) => {
                    // 本轮跳过，不重试，下个采样点自愈
                    error!("Power stats read failed, skipping this tick: {e}");
                }
            }

            let sleep_ms = if governor.device().state() == DeviceState::Active {
                POLL_PERIOD_MS
            } else {
                IDLE_POLL_PERIOD_MS
            };
            thread::sleep(Duration::from_millis(sleep_ms));
        }
    }
}
