/// Adreno Governor 常量定义
/// 将分散的常量集中管理，提高代码可维护性
pub const NOTES: &str = "Qualcomm Adreno KGSL Conservative Governor";
pub const VERSION: &str = "Version: v1.4";

/// 采样窗口常量（微秒）
/// 250ms max interval, 10ms min
pub mod sampling {
    pub const MIN_SAMPLE_INTERVAL: u64 = 10_000;
    pub const MAX_SAMPLE_INTERVAL: u64 = 250_000;
    pub const DEFAULT_SAMPLE_INTERVAL: u64 = 100_000;
}

/// 轮询引擎常量
pub mod engine {
    /// 活跃状态下的轮询周期（毫秒）
    pub const POLL_PERIOD_MS: u64 = 8;
    /// NAP/SLEEP状态下的轮询周期（毫秒）
    pub const IDLE_POLL_PERIOD_MS: u64 = 100;
    /// 连续多少个零负载采样后进入NAP
    pub const NAP_TICKS: u64 = 25;
    /// 连续多少个零负载采样后进入SLEEP
    pub const SLEEP_TICKS: u64 = 250;
}
