/// 采样窗口累加器 - 累积busy/wall时间直到超过采样间隔（微秒）
///
/// 由governor实例独占持有，不再是模块级全局变量；
/// 并发保护由governor的互斥锁统一负责。
#[derive(Debug, Default)]
pub struct SamplingWindow {
    walltime_total: u64,
    busytime_total: u64,
}

impl SamplingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一次统计采样。total_time为0时视为"本轮无事发生"，不做任何累加
    pub fn accumulate(&mut self, busy_time: u64, total_time: u64) {
        if total_time == 0 {
            return;
        }
        self.walltime_total += total_time;
        self.busytime_total += busy_time;
    }

    /// 清零窗口。每次决策后以及设备唤醒时调用
    pub fn reset(&mut self) {
        self.walltime_total = 0;
        self.busytime_total = 0;
    }

    pub fn walltime_total(&self) -> u64 {
        self.walltime_total
    }

    pub fn busytime_total(&self) -> u64 {
        self.busytime_total
    }

    /// 窗口内负载百分比，向下取整。
    /// 调用方保证先做过窗口超限判断，walltime_total此时必然为正
    pub fn load_pct(&self) -> u64 {
        if self.walltime_total == 0 {
            return 0;
        }
        100 * self.busytime_total / self.walltime_total
    }
}
