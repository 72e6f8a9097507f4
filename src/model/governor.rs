use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use log::{debug, info, warn};

use crate::model::{
    device::{DeviceState, PowerControl},
    sampling_window::SamplingWindow,
    thresholds::ThresholdTable,
    tuning::SamplingTuning,
};

/// 一次决策评估的结果
#[derive(Debug, Clone, Copy)]
pub struct LoadEvaluation {
    pub load_pct: u64,
    /// 请求切换到的绝对档位；滞后带内保持现状时为None
    pub requested_level: Option<i64>,
}

/// 一次idle回调的结果，供轮询方做空闲检测
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleTick {
    pub busy_time: u64,
    pub total_time: u64,
    pub evaluation: Option<LoadEvaluation>,
}

/// Conservative调频器 - 基于滞后阈值的档位步进状态机
///
/// 除采样窗口外自身无状态；设备状态归电源控制协作者所有。
/// 窗口由互斥锁保护：accumulate、超限判断和reset在同一次
/// 加锁内完成，设备调用一律在临界区之外进行。
pub struct ConservativeGovernor<D: PowerControl> {
    device: D,
    thresholds: ThresholdTable,
    window: Mutex<SamplingWindow>,
    tuning: SamplingTuning,
}

fn epoch_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

impl<D: PowerControl> ConservativeGovernor<D> {
    pub fn new(device: D, thresholds: ThresholdTable, tuning: SamplingTuning) -> Self {
        Self {
            device,
            thresholds,
            window: Mutex::new(SamplingWindow::new()),
            tuning,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn tuning(&self) -> &SamplingTuning {
        &self.tuning
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// busy事件：只记录活动开始时间戳，不做任何决策
    pub fn on_busy(&self) {
        self.device.mark_busy_start(epoch_us());
    }

    /// idle事件：核心决策点
    ///
    /// 累积本轮统计；窗口超过采样间隔时计算负载百分比、清零窗口、
    /// 按当前档位的阈值对做单步决策。total_time为0的采样视为
    /// "本轮无事发生"直接跳过，统计读取失败则跳过本轮评估，不重试。
    pub fn on_idle(&self, ignore_idle: bool) -> Result<IdleTick> {
        if ignore_idle {
            return Ok(IdleTick::default());
        }

        let stats = self.device.read_power_stats()?;

        // accumulate+超限判断+reset必须是一个原子单元，
        // 负载计算严格先于reset（此时walltime必然为正）
        let mut pending_load = None;
        {
            let mut window = self.window.lock().unwrap();
            window.accumulate(stats.busy_time, stats.total_time);
            if window.walltime_total() > self.tuning.interval_us() {
                debug!(
                    "walltime_total = {}, busytime_total = {}",
                    window.walltime_total(),
                    window.busytime_total()
                );
                pending_load = Some(window.load_pct());
                window.reset();
            }
        }

        let evaluation = match pending_load {
            Some(load_pct) => Some(self.evaluate(load_pct)?),
            None => None,
        };

        Ok(IdleTick {
            busy_time: stats.busy_time,
            total_time: stats.total_time,
            evaluation,
        })
    }

    /// 阈值决策：低于down_threshold降一档性能（档位号+1），
    /// 高于up_threshold升一档性能（档位号-1），带内保持。
    /// 每次评估最多移动一档，钳制由设备协作者负责
    fn evaluate(&self, load_pct: u64) -> Result<LoadEvaluation> {
        debug!("loadpct = {load_pct}");

        let level = self.device.current_power_level();
        let Some(entry) = self.thresholds.lookup(level) else {
            warn!("No threshold entry for power level {level}, skipping evaluation");
            return Ok(LoadEvaluation {
                load_pct,
                requested_level: None,
            });
        };

        let change: i64 = if load_pct < entry.down_threshold {
            1
        } else if load_pct > entry.up_threshold {
            -1
        } else {
            0
        };

        debug!("active_pwrlevel = {level}, change = {change}");

        if change == 0 {
            return Ok(LoadEvaluation {
                load_pct,
                requested_level: None,
            });
        }

        let requested = level + change;
        self.device.set_power_level(requested)?;

        Ok(LoadEvaluation {
            load_pct,
            requested_level: Some(requested),
        })
    }

    /// wake事件：非NAP唤醒时回到默认档位并丢弃设备侧陈旧统计；
    /// 窗口无条件清零——设备睡过之后窗口里的负载历史已经失真
    pub fn on_wake(&self) -> Result<()> {
        info!("GPU waking up");

        if self.device.prior_state() != DeviceState::Nap {
            self.device
                .set_power_level(self.device.default_power_level())?;
            // 读一次统计把设备侧计数器清掉
            let _ = self.device.read_power_stats();
        }

        self.window.lock().unwrap().reset();
        Ok(())
    }

    /// sleep事件：纯通知，不改任何状态
    pub fn on_sleep(&self) {
        info!("GPU going to sleep");
    }

    #[cfg(test)]
    fn window_totals(&self) -> (u64, u64) {
        let window = self.window.lock().unwrap();
        (window.walltime_total(), window.busytime_total())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;
    use crate::model::{device::PowerStats, thresholds::ThresholdEntry};

    struct MockDevice {
        stats: Mutex<VecDeque<PowerStats>>,
        requested: Mutex<Vec<i64>>,
        level: i64,
        default_level: i64,
        prior: DeviceState,
        busy_marks: Mutex<Vec<u64>>,
    }

    impl MockDevice {
        fn new(level: i64) -> Self {
            Self {
                stats: Mutex::new(VecDeque::new()),
                requested: Mutex::new(Vec::new()),
                level,
                default_level: 2,
                prior: DeviceState::Active,
                busy_marks: Mutex::new(Vec::new()),
            }
        }

        fn push_stats(&self, busy: u64, total: u64) {
            self.stats.lock().unwrap().push_back(PowerStats {
                busy_time: busy,
                total_time: total,
            });
        }

        fn requested_levels(&self) -> Vec<i64> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PowerControl for MockDevice {
        fn read_power_stats(&self) -> Result<PowerStats> {
            Ok(self
                .stats
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        fn set_power_level(&self, level: i64) -> Result<()> {
            self.requested.lock().unwrap().push(level);
            Ok(())
        }

        fn current_power_level(&self) -> i64 {
            self.level
        }

        fn default_power_level(&self) -> i64 {
            self.default_level
        }

        fn prior_state(&self) -> DeviceState {
            self.prior
        }

        fn mark_busy_start(&self, at_us: u64) {
            self.busy_marks.lock().unwrap().push(at_us);
        }
    }

    // 档位2的阈值对: up=80, down=45
    fn test_table() -> ThresholdTable {
        ThresholdTable::from_entries(vec![
            ThresholdEntry { up_threshold: 110, down_threshold: 60 },
            ThresholdEntry { up_threshold: 90, down_threshold: 45 },
            ThresholdEntry { up_threshold: 80, down_threshold: 45 },
            ThresholdEntry { up_threshold: 50, down_threshold: 0 },
        ])
    }

    fn governor_at_level(level: i64) -> ConservativeGovernor<MockDevice> {
        ConservativeGovernor::new(
            MockDevice::new(level),
            test_table(),
            SamplingTuning::new(100_000),
        )
    }

    #[test]
    fn low_load_steps_down_one_level() {
        let governor = governor_at_level(2);
        // load = floor(100*33/110) = 30 < down(45)
        governor.device().push_stats(33_000, 110_000);

        let tick = governor.on_idle(false).unwrap();
        let eval = tick.evaluation.unwrap();
        assert_eq!(eval.load_pct, 30);
        assert_eq!(eval.requested_level, Some(3));
        assert_eq!(governor.device().requested_levels(), vec![3]);
    }

    #[test]
    fn high_load_steps_up_one_level() {
        let governor = governor_at_level(2);
        // load = 90 > up(80)
        governor.device().push_stats(99_000, 110_000);

        let tick = governor.on_idle(false).unwrap();
        let eval = tick.evaluation.unwrap();
        assert_eq!(eval.load_pct, 90);
        assert_eq!(eval.requested_level, Some(1));
    }

    #[test]
    fn in_band_load_holds_level() {
        let governor = governor_at_level(2);
        // load = 60, 处于[45, 80]带内
        governor.device().push_stats(66_000, 110_000);

        let tick = governor.on_idle(false).unwrap();
        let eval = tick.evaluation.unwrap();
        assert_eq!(eval.load_pct, 60);
        assert_eq!(eval.requested_level, None);
        assert!(governor.device().requested_levels().is_empty());
    }

    #[test]
    fn window_is_zeroed_after_any_decision() {
        let governor = governor_at_level(2);
        governor.device().push_stats(66_000, 110_000);

        governor.on_idle(false).unwrap();
        assert_eq!(governor.window_totals(), (0, 0));
    }

    #[test]
    fn accumulation_below_interval_defers_evaluation() {
        let governor = governor_at_level(2);
        governor.device().push_stats(40_000, 50_000);

        let tick = governor.on_idle(false).unwrap();
        assert!(tick.evaluation.is_none());
        assert_eq!(governor.window_totals(), (50_000, 40_000));
    }

    #[test]
    fn two_sample_sequence_evaluates_at_63_percent() {
        let governor = governor_at_level(2);
        governor.device().push_stats(40_000, 50_000);
        governor.device().push_stats(30_000, 60_000);

        assert!(governor.on_idle(false).unwrap().evaluation.is_none());

        // wall=110000 > 100000, load = floor(100*70/110) = 63
        let tick = governor.on_idle(false).unwrap();
        let eval = tick.evaluation.unwrap();
        assert_eq!(eval.load_pct, 63);
        assert_eq!(eval.requested_level, None);
        assert_eq!(governor.window_totals(), (0, 0));
    }

    #[test]
    fn zero_total_time_sample_is_skipped() {
        let governor = governor_at_level(2);
        governor.device().push_stats(40_000, 50_000);
        governor.device().push_stats(999, 0);

        governor.on_idle(false).unwrap();
        let tick = governor.on_idle(false).unwrap();
        assert!(tick.evaluation.is_none());
        assert_eq!(governor.window_totals(), (50_000, 40_000));
    }

    #[test]
    fn ignore_idle_is_a_no_op() {
        let governor = governor_at_level(2);
        governor.device().push_stats(99_000, 110_000);

        let tick = governor.on_idle(true).unwrap();
        assert!(tick.evaluation.is_none());
        assert_eq!(tick.total_time, 0);
        // 统计根本没被读取
        assert_eq!(governor.device().stats.lock().unwrap().len(), 1);
    }

    #[test]
    fn level_outside_table_skips_decision() {
        let governor = governor_at_level(9);
        governor.device().push_stats(99_000, 110_000);

        let tick = governor.on_idle(false).unwrap();
        let eval = tick.evaluation.unwrap();
        assert_eq!(eval.requested_level, None);
        assert!(governor.device().requested_levels().is_empty());
        assert_eq!(governor.window_totals(), (0, 0));
    }

    #[test]
    fn wake_from_sleep_restores_default_level_and_resets() {
        let mut device = MockDevice::new(0);
        device.prior = DeviceState::Sleep;
        let governor =
            ConservativeGovernor::new(device, test_table(), SamplingTuning::new(100_000));
        governor.device().push_stats(40_000, 50_000);
        governor.on_idle(false).unwrap();

        governor.on_wake().unwrap();
        assert_eq!(governor.device().requested_levels(), vec![2]);
        assert_eq!(governor.window_totals(), (0, 0));
    }

    #[test]
    fn wake_from_nap_resets_without_level_change() {
        let mut device = MockDevice::new(0);
        device.prior = DeviceState::Nap;
        let governor =
            ConservativeGovernor::new(device, test_table(), SamplingTuning::new(100_000));
        governor.device().push_stats(40_000, 50_000);
        governor.on_idle(false).unwrap();

        governor.on_wake().unwrap();
        assert!(governor.device().requested_levels().is_empty());
        // 即便没有待决评估，窗口也必须清零
        assert_eq!(governor.window_totals(), (0, 0));
    }

    #[test]
    fn on_busy_marks_activity_start() {
        let governor = governor_at_level(2);
        governor.on_busy();
        assert_eq!(governor.device().busy_marks.lock().unwrap().len(), 1);
    }
}
