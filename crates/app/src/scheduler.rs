//! # 周报定时任务

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Weekday};
use fintrack_core::config::{ConfigError, ScheduleConfig};
use fintrack_manager::ReportManager;
use tokio::sync::watch;
use tracing::{error, info};

/// 每周固定星期、固定时刻触发一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    hour: u32,
    minute: u32,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            weekday,
            hour,
            minute,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.weekday()?, config.hour, config.minute))
    }

    /// # Summary
    /// 计算严格晚于 `now` 的下一次触发时刻。
    ///
    /// # Logic
    /// 1. 从 `now` 所在日期向后找到最近的目标星期。
    /// 2. 若当天的触发时刻已过 (或恰好等于 `now`)，顺延一周。
    /// 3. 触发时刻落在夏令时跳变的空档内时，推迟一小时。
    pub fn next_run<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let today = now.date_naive();
        let ahead = (7 + self.weekday.num_days_from_monday()
            - today.weekday().num_days_from_monday())
            % 7;

        for offset in [ahead, ahead + 7] {
            let day = today + Duration::days(i64::from(offset));
            let Some(at) = day.and_hms_opt(self.hour, self.minute, 0) else {
                break;
            };
            if let Some(candidate) = resolve_local(&now.timezone(), at) {
                if candidate > *now {
                    return candidate;
                }
            }
        }
        now.clone() + Duration::weeks(1)
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, at: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&at)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(at + Duration::hours(1))).earliest())
}

/// # Summary
/// 定时发送周报，直到收到关闭信号。
///
/// # Logic
/// 1. 根据管理器的时钟计算下一次触发时刻并等待。
/// 2. 到点后发送周报，失败只记录日志，不终止循环。
pub async fn run(
    schedule: WeeklySchedule,
    reports: Arc<ReportManager>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = reports.clock().now();
        let next = schedule.next_run(&now);
        let wait = next.signed_duration_since(now).to_std().unwrap_or_default();
        info!("Next weekly report at {}", next);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                info!("Weekly scheduler stopped");
                return;
            }
        }

        match reports.send_weekly_report().await {
            Ok(summary) => info!(
                "Weekly report {} sent to {} recipients ({} records)",
                summary.filename,
                summary.recipients.len(),
                summary.results.len()
            ),
            Err(e) => error!("Weekly report failed: {}", e),
        }
    }
}
