use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};

use crate::{
    datasource::file_path::*,
    utils::{
        file_operate::{check_read, read_file, write_file_safe},
        file_status::get_status,
    },
};

/// 设备级电源状态，由设备协作者持有，governor只读
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Active,
    Nap,
    Sleep,
}

/// 一次统计读取的结果：自上次读取以来的busy/总耗时（微秒）
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerStats {
    pub busy_time: u64,
    pub total_time: u64,
}

/// 设备/电源控制协作者抽象。档位如何映射到时钟电压、
/// 硬件怎样进入nap/sleep，都是实现者的事，governor不关心
pub trait PowerControl {
    /// 读取自上次读取以来的busy/总耗时。必须可高频调用
    fn read_power_stats(&self) -> Result<PowerStats>;
    /// 请求切换到绝对档位。被调方负责钳制到合法范围并实际执行切换
    fn set_power_level(&self, level: i64) -> Result<()>;
    fn current_power_level(&self) -> i64;
    fn default_power_level(&self) -> i64;
    /// 最近一次状态切换之前的设备状态
    fn prior_state(&self) -> DeviceState;
    /// 记录活动开始时间戳（微秒），仅供设备侧统计使用
    fn mark_busy_start(&self, at_us: u64);
}

struct KgslDeviceState {
    cur_pwrlevel: i64,
    state: DeviceState,
    prior_state: DeviceState,
    busy_start_us: u64,
}

/// KGSL sysfs后端的设备实现
///
/// gpubusy节点每次读取返回"busy total"并随读清零，天然就是增量语义。
/// 档位切换通过把max_pwrlevel和min_pwrlevel钉到同一档实现。
pub struct KgslDevice {
    num_pwrlevels: i64,
    default_pwrlevel: i64,
    /// 可用频率表，降序排列，下标即档位号（0 = 最高性能）
    freq_table: Vec<i64>,
    inner: Mutex<KgslDeviceState>,
}

fn clamp_level(num_pwrlevels: i64, level: i64) -> i64 {
    if level < 0 {
        return 0;
    }
    if level >= num_pwrlevels {
        return num_pwrlevels - 1;
    }
    level
}

fn read_node_i64(path: &str) -> Result<i64> {
    let buf = read_file(path, 32)?;
    buf.trim()
        .parse::<i64>()
        .with_context(|| format!("Failed to parse integer from {path}"))
}

impl KgslDevice {
    pub fn probe() -> Result<Self> {
        let mut is_good = false;
        info!("Probing KGSL device nodes...");

        // gpubusy是governor的生命线，没有它就无法评估负载
        info!("{}: {}", KGSL_GPUBUSY, check_read(KGSL_GPUBUSY, &mut is_good));
        if !is_good {
            error!("Can't read GPU busy statistics!");
            return Err(anyhow!("Can't read GPU busy statistics!"));
        }

        // 其余节点缺失时降级运行
        let mut optional = false;
        for node in [
            KGSL_NUM_PWRLEVELS,
            KGSL_DEFAULT_PWRLEVEL,
            KGSL_MAX_PWRLEVEL,
            KGSL_MIN_PWRLEVEL,
            KGSL_GPUCLK,
            KGSL_AVAILABLE_FREQS,
        ] {
            info!("{}: {}", node, check_read(node, &mut optional));
        }

        let num_pwrlevels = match read_node_i64(KGSL_NUM_PWRLEVELS) {
            Ok(n) if n > 0 => n,
            Ok(n) => {
                warn!("Bogus num_pwrlevels {n}, assuming 5 levels");
                5
            }
            Err(e) => {
                warn!("Failed to read num_pwrlevels, assuming 5 levels: {e}");
                5
            }
        };

        let default_pwrlevel = match read_node_i64(KGSL_DEFAULT_PWRLEVEL) {
            Ok(level) => clamp_level(num_pwrlevels, level),
            Err(e) => {
                let fallback = num_pwrlevels / 2;
                warn!("Failed to read default_pwrlevel, using level {fallback}: {e}");
                fallback
            }
        };

        let mut freq_table = Vec::new();
        if get_status(KGSL_AVAILABLE_FREQS)
            && let Ok(buf) = read_file(KGSL_AVAILABLE_FREQS, 256)
        {
            freq_table = buf
                .split_whitespace()
                .filter_map(|s| s.parse::<i64>().ok())
                .collect();
            // 降序：下标0对应最高频率，即最高性能档
            freq_table.sort_by(|a, b| b.cmp(a));
        }
        if !freq_table.is_empty() && freq_table.len() as i64 != num_pwrlevels {
            warn!(
                "Frequency table has {} entries but num_pwrlevels is {}",
                freq_table.len(),
                num_pwrlevels
            );
        }

        Ok(Self {
            num_pwrlevels,
            default_pwrlevel,
            freq_table,
            inner: Mutex::new(KgslDeviceState {
                cur_pwrlevel: default_pwrlevel,
                state: DeviceState::Active,
                prior_state: DeviceState::Active,
                busy_start_us: 0,
            }),
        })
    }

    pub fn num_power_levels(&self) -> i64 {
        self.num_pwrlevels
    }

    pub fn state(&self) -> DeviceState {
        self.inner.lock().unwrap().state
    }

    /// 进入NAP（短时空闲）
    pub fn enter_nap(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != DeviceState::Nap {
            inner.prior_state = inner.state;
            inner.state = DeviceState::Nap;
            debug!(
                "Device napping, last activity started at {}us",
                inner.busy_start_us
            );
        }
    }

    /// 进入SLEEP（长时空闲）
    pub fn enter_sleep(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != DeviceState::Sleep {
            inner.prior_state = inner.state;
            inner.state = DeviceState::Sleep;
            debug!("Device sleeping");
        }
    }

    /// 回到ACTIVE，保留切换前状态供on_wake查询
    pub fn wake(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != DeviceState::Active {
            inner.prior_state = inner.state;
            inner.state = DeviceState::Active;
            debug!("Device active (was {:?})", inner.prior_state);
        }
    }
}

impl PowerControl for KgslDevice {
    fn read_power_stats(&self) -> Result<PowerStats> {
        let buf = read_file(KGSL_GPUBUSY, 64)?;
        let mut parts = buf.split_whitespace();
        let busy = parts.next().and_then(|s| s.parse::<u64>().ok());
        let total = parts.next().and_then(|s| s.parse::<u64>().ok());

        match (busy, total) {
            (Some(busy_time), Some(total_time)) => Ok(PowerStats {
                busy_time,
                total_time,
            }),
            _ => Err(anyhow!("Malformed gpubusy content: {}", buf.trim())),
        }
    }

    fn set_power_level(&self, level: i64) -> Result<()> {
        let target = clamp_level(self.num_pwrlevels, level);
        let mut inner = self.inner.lock().unwrap();

        debug!(
            "Power level change: {} -> {} (requested {})",
            inner.cur_pwrlevel, target, level
        );

        // 驱动要求max_pwrlevel <= min_pwrlevel（数值上），
        // 按移动方向决定写入顺序以保持中间状态合法
        let content = target.to_string();
        if target >= inner.cur_pwrlevel {
            write_file_safe(KGSL_MIN_PWRLEVEL, &content);
            write_file_safe(KGSL_MAX_PWRLEVEL, &content);
        } else {
            write_file_safe(KGSL_MAX_PWRLEVEL, &content);
            write_file_safe(KGSL_MIN_PWRLEVEL, &content);
        }

        inner.cur_pwrlevel = target;
        Ok(())
    }

    fn current_power_level(&self) -> i64 {
        let mut inner = self.inner.lock().unwrap();

        // 热管理可能在背后改档，优先从gpuclk恢复真实档位
        if get_status(KGSL_GPUCLK)
            && !self.freq_table.is_empty()
            && let Ok(buf) = read_file(KGSL_GPUCLK, 32)
            && let Ok(clk) = buf.trim().parse::<i64>()
            && let Some(idx) = self.freq_table.iter().position(|&f| f == clk)
        {
            inner.cur_pwrlevel = idx as i64;
        }

        inner.cur_pwrlevel
    }

    fn default_power_level(&self) -> i64 {
        self.default_pwrlevel
    }

    fn prior_state(&self) -> DeviceState {
        self.inner.lock().unwrap().prior_state
    }

    fn mark_busy_start(&self, at_us: u64) {
        self.inner.lock().unwrap().busy_start_us = at_us;
    }
}
