use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use log::debug;

use crate::utils::constants::sampling::{MAX_SAMPLE_INTERVAL, MIN_SAMPLE_INTERVAL};

/// 配置面错误。越界不是错误（静默钳制），只有无法解析的输入才报错
#[derive(Debug, PartialEq, Eq)]
pub enum TuningError {
    InvalidInput(String),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::InvalidInput(input) => {
                write!(f, "not a valid sample interval: {input:?}")
            }
        }
    }
}

impl std::error::Error for TuningError {}

/// 采样间隔配置面 - 单个原子槽位，配置线程写、决策算法读
///
/// 原决策方案里这是一个sysfs attribute的show/store动态分发；
/// 这里换成带类型的getter/setter，只有一个可调参数不需要按名分发。
pub struct SamplingTuning {
    interval_us: AtomicU64,
}

fn clamp_interval(requested: u64) -> u64 {
    requested.clamp(MIN_SAMPLE_INTERVAL, MAX_SAMPLE_INTERVAL)
}

impl SamplingTuning {
    pub fn new(initial_us: u64) -> Self {
        Self {
            interval_us: AtomicU64::new(clamp_interval(initial_us)),
        }
    }

    /// 当前生效的采样间隔（微秒）
    pub fn interval_us(&self) -> u64 {
        self.interval_us.load(Ordering::Acquire)
    }

    /// 写入采样间隔：静默钳制到[MIN, MAX]后存储，返回实际生效值
    pub fn set_interval_us(&self, requested: u64) -> u64 {
        let effective = clamp_interval(requested);
        self.interval_us.store(effective, Ordering::Release);
        debug!("Sample interval set to {effective}us (requested {requested}us)");
        effective
    }

    /// 解析文本形式的写入。非数字输入报InvalidInput且保持旧值不变
    pub fn set_interval_from_text(&self, text: &str) -> Result<u64, TuningError> {
        let trimmed = text.trim();
        let requested: u64 = trimmed
            .parse()
            .map_err(|_| TuningError::InvalidInput(trimmed.to_string()))?;
        Ok(self.set_interval_us(requested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::sampling::DEFAULT_SAMPLE_INTERVAL;

    #[test]
    fn set_then_get_returns_clamped_value() {
        let tuning = SamplingTuning::new(DEFAULT_SAMPLE_INTERVAL);
        assert_eq!(tuning.set_interval_us(120_000), 120_000);
        assert_eq!(tuning.interval_us(), 120_000);

        // 低于下界和高于上界都被静默钳制
        assert_eq!(tuning.set_interval_us(5), MIN_SAMPLE_INTERVAL);
        assert_eq!(tuning.interval_us(), MIN_SAMPLE_INTERVAL);
        assert_eq!(tuning.set_interval_us(9_000_000), MAX_SAMPLE_INTERVAL);
        assert_eq!(tuning.interval_us(), MAX_SAMPLE_INTERVAL);
    }

    #[test]
    fn clamping_is_idempotent() {
        let tuning = SamplingTuning::new(DEFAULT_SAMPLE_INTERVAL);
        let first = tuning.set_interval_us(1);
        let second = tuning.set_interval_us(first);
        assert_eq!(first, second);
    }

    #[test]
    fn textual_writes_are_trimmed_and_clamped() {
        let tuning = SamplingTuning::new(DEFAULT_SAMPLE_INTERVAL);
        assert_eq!(tuning.set_interval_from_text("150000\n"), Ok(150_000));
        assert_eq!(tuning.set_interval_from_text(" 300000 "), Ok(MAX_SAMPLE_INTERVAL));
    }

    #[test]
    fn invalid_input_keeps_prior_value() {
        let tuning = SamplingTuning::new(DEFAULT_SAMPLE_INTERVAL);
        tuning.set_interval_us(42_000);

        let err = tuning.set_interval_from_text("fast").unwrap_err();
        assert_eq!(err, TuningError::InvalidInput("fast".to_string()));
        assert_eq!(tuning.interval_us(), 42_000);

        assert!(tuning.set_interval_from_text("").is_err());
        assert!(tuning.set_interval_from_text("-5").is_err());
        assert_eq!(tuning.interval_us(), 42_000);
    }
}
