pub mod device;
pub mod governor;
pub mod pwrscale_engine;
pub mod sampling_window;
pub mod thresholds;
pub mod tuning;
