/// 单个功耗档位的滞后阈值对（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdEntry {
    pub up_threshold: u64,
    pub down_threshold: u64,
}

/// 阈值表 - 每个功耗档位一条记录，按档位编号索引，初始化后不可变
///
/// 档位0是最高性能档（KGSL约定），档位号+1表示降一档性能。
/// 第0条的up_threshold=110故意不可达：最高档之上没有档位。
/// 最后一条的down_threshold=0把最低档钉死在底部。
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    entries: Vec<ThresholdEntry>,
}

impl ThresholdTable {
    /// Adreno内置默认表，5档
    pub fn adreno_defaults() -> Self {
        Self {
            entries: vec![
                ThresholdEntry { up_threshold: 110, down_threshold: 60 },
                ThresholdEntry { up_threshold: 90, down_threshold: 45 },
                ThresholdEntry { up_threshold: 80, down_threshold: 45 },
                ThresholdEntry { up_threshold: 50, down_threshold: 0 },
                ThresholdEntry { up_threshold: 100, down_threshold: 0 },
            ],
        }
    }

    pub fn from_entries(entries: Vec<ThresholdEntry>) -> Self {
        Self { entries }
    }

    /// 查找档位对应的阈值对，越界返回None
    pub fn lookup(&self, level: i64) -> Option<ThresholdEntry> {
        if level < 0 {
            return None;
        }
        self.entries.get(level as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ThresholdEntry] {
        &self.entries
    }
}
