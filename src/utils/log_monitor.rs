use anyhow::Result;
use inotify::WatchMask;
use log::{debug, info, warn};

use crate::{
    datasource::file_path::{LOG_LEVEL_PATH, LOG_THREAD},
    utils::{file_operate::check_read_simple, inotify::InotifyWatcher, logger::update_log_level},
};

pub fn monitor_log_level() -> Result<()> {
    info!("{LOG_THREAD} Start");

    if !check_read_simple(LOG_LEVEL_PATH) {
        info!("Log level file does not exist: {LOG_LEVEL_PATH}");
    } else {
        info!("Using log level path: {LOG_LEVEL_PATH}");
    }

    let mut inotify = InotifyWatcher::new()?;
    inotify.add(LOG_LEVEL_PATH, WatchMask::CLOSE_WRITE | WatchMask::MODIFY)?;

    loop {
        inotify.wait_and_handle()?;

        if !check_read_simple(LOG_LEVEL_PATH) {
            debug!("Log level file no longer exists");
            continue;
        }

        match update_log_level() {
            Ok(_) => debug!("Log level updated successfully"),
            Err(e) => warn!("Failed to update log level: {e}"),
        }
    }
}
