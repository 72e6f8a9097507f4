use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use log::debug;

use crate::utils::file_status::write_status;

pub fn check_read<P: AsRef<Path>>(path: P, status: &mut bool) -> String {
    let path_ref = path.as_ref();
    if path_ref.exists() && path_ref.is_file() {
        *status = true;
        write_status(path_ref.to_str().unwrap_or(""), true);
        "OK".to_string()
    } else {
        write_status(path_ref.to_str().unwrap_or(""), false);
        format!("Failed: {}", std::io::Error::last_os_error())
    }
}

pub fn check_read_simple<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

pub fn read_file<P: AsRef<Path>>(path: P, max_len: usize) -> Result<String> {
    let path_ref = path.as_ref();
    let mut file = File::open(path_ref)
        .with_context(|| format!("Failed to open file for reading: {}", path_ref.display()))?;

    let mut content = String::with_capacity(max_len);
    let bytes_read = file
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read from file: {}", path_ref.display()))?;

    content.truncate(bytes_read);
    Ok(content)
}

/// 尝试写入文件，失败时只记录调试信息，不终止程序
pub fn write_file_safe<P: AsRef<Path>>(path: P, content: &str) -> bool {
    let path_ref = path.as_ref();
    match std::fs::write(path_ref, content) {
        Ok(_) => true,
        Err(e) => {
            debug!(
                "Failed to write file: {} - Error: {} (continuing execution)",
                path_ref.display(),
                e
            );
            false
        }
    }
}
