use chrono::{DateTime, Local, NaiveDate};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 默认日期推断、报表时间戳等逻辑都必须通过此接口获取当前时间。
pub trait TimeProvider: Send + Sync {
    /// 获取当前本地时间
    fn now(&self) -> DateTime<Local>;

    /// 获取当前本地日期
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// # Summary
/// 普通运行使用的真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// # Summary
/// 测试专用虚拟时钟，允许主动拨动时间。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 提供多线程读写。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Local>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建虚拟时钟
    pub fn new(initial_time: DateTime<Local>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<Local>) {
        let mut time = self.current_time.write().unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Local> {
        *self.current_time.read().unwrap_or_else(|e| e.into_inner())
    }
}
