use std::{
    collections::HashMap,
    ffi::CString,
    path::Path,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};

const WAIT_MOVE_US: u64 = 500 * 1000;
const RECREATE_DEFAULT_PERM: u32 = 0o666;

/// inotify封装 - 监控单个文件节点的变化，节点被删除/移动后自动重建监控
pub struct InotifyWatcher {
    inotify: Inotify,
    watches: HashMap<WatchDescriptor, String>,
}

impl InotifyWatcher {
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init().with_context(|| "Failed to initialize inotify")?;

        Ok(Self {
            inotify,
            watches: HashMap::new(),
        })
    }

    pub fn add<P: AsRef<Path>>(&mut self, path: P, mask: WatchMask) -> Result<()> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .with_context(|| format!("Invalid path: {}", path_ref.display()))?;

        // 将 DELETE_SELF 和 MOVE_SELF 添加到监控掩码中
        let mask = mask | WatchMask::DELETE_SELF | WatchMask::MOVE_SELF;

        let wd = self
            .inotify
            .watches()
            .add(path_ref, mask)
            .with_context(|| format!("Failed to add watch for: {}", path_ref.display()))?;

        self.watches.insert(wd, path_str.to_string());

        Ok(())
    }

    /// 阻塞等待下一批事件，并在监控失效时自动重建
    pub fn wait_and_handle(&mut self) -> Result<()> {
        let mut buffer = [0; 4096];
        let events = self
            .inotify
            .read_events_blocking(&mut buffer)
            .with_context(|| "Failed to read inotify events")?;

        // 收集所有需要重建的监控项
        let mut watches_to_update = Vec::new();
        for event in events {
            if let Some(path) = self.watches.get(&event.wd)
                && (event.mask.contains(EventMask::IGNORED)
                    || event.mask.contains(EventMask::DELETE_SELF)
                    || event.mask.contains(EventMask::MOVE_SELF))
            {
                watches_to_update.push((event.wd.clone(), path.clone()));
            }
        }

        for (wd, path) in watches_to_update {
            // 如果文件还不存在，稍作等待并修正权限
            try_path(&path);

            let mask = WatchMask::MODIFY
                | WatchMask::CLOSE_WRITE
                | WatchMask::DELETE_SELF
                | WatchMask::MOVE_SELF;

            let new_wd = self
                .inotify
                .watches()
                .add(&path, mask)
                .with_context(|| format!("Failed to re-add watch for: {path}"))?;

            self.watches.remove(&wd);
            self.watches.insert(new_wd, path);
        }

        Ok(())
    }
}

fn try_path(path: &str) {
    if !Path::new(path).exists() {
        // 稍作等待，让文件系统操作完成
        thread::sleep(Duration::from_micros(WAIT_MOVE_US));

        if let Ok(c_path) = CString::new(path) {
            unsafe {
                libc::chmod(c_path.as_ptr(), RECREATE_DEFAULT_PERM);
            }
        }
    }
}
