// Thread names
#![allow(dead_code)]
pub const MAIN_THREAD: &str = "PwrscaleEngine";
pub const TUNABLE_THREAD: &str = "SampleIntervalWatcher";
pub const LOG_THREAD: &str = "LogLevelMonitor";

// KGSL sysfs节点 - Adreno驱动的对外接口
pub const KGSL_GPUBUSY: &str = "/sys/class/kgsl/kgsl-3d0/gpubusy";
pub const KGSL_NUM_PWRLEVELS: &str = "/sys/class/kgsl/kgsl-3d0/num_pwrlevels";
pub const KGSL_DEFAULT_PWRLEVEL: &str = "/sys/class/kgsl/kgsl-3d0/default_pwrlevel";
pub const KGSL_MAX_PWRLEVEL: &str = "/sys/class/kgsl/kgsl-3d0/max_pwrlevel";
pub const KGSL_MIN_PWRLEVEL: &str = "/sys/class/kgsl/kgsl-3d0/min_pwrlevel";
pub const KGSL_GPUCLK: &str = "/sys/class/kgsl/kgsl-3d0/gpuclk";
pub const KGSL_AVAILABLE_FREQS: &str = "/sys/class/kgsl/kgsl-3d0/gpu_available_frequencies";

// 守护进程自身的文件
pub const CONFIG_FILE: &str = "/data/adb/adreno_governor/governor.toml";
pub const SAMPLE_INTERVAL_PATH: &str = "/data/adb/adreno_governor/sample_interval";
pub const LOG_LEVEL_PATH: &str = "/data/adb/adreno_governor/log/log_level";
