//! 播放性能指标
//!
//! 计数器全部为原子量，调度线程只做 `fetch_add(Relaxed)`，
//! 查询方通过 [`PlaybackMetrics::snapshot`] 获取一致性要求不高的快照。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 播放计数器（跨会话累计）
#[derive(Debug, Default)]
pub struct PlaybackMetrics {
    /// 成功投递的帧数
    pub frames_delivered: AtomicU64,
    /// 被丢弃的过期 tick（状态已变化或已被重新调度）
    pub ticks_skipped: AtomicU64,
    /// 漂移超过日志阈值的 tick 数
    pub drift_exceeded: AtomicU64,
    /// 回调失败（返回错误或 panic）次数
    pub callback_errors: AtomicU64,
    /// 急停次数
    pub emergency_stops: AtomicU64,
    /// 自然播放完成次数
    pub completions: AtomicU64,
    /// 加载/解码失败次数
    pub load_failures: AtomicU64,
}

impl PlaybackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            drift_exceeded: self.drift_exceeded.load(Ordering::Relaxed),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
            emergency_stops: self.emergency_stops.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }

    /// 计数器加一
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_delivered: u64,
    pub ticks_skipped: u64,
    pub drift_exceeded: u64,
    pub callback_errors: u64,
    pub emergency_stops: u64,
    pub completions: u64,
    pub load_failures: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frames={} skipped={} drift_exceeded={} callback_errors={} e-stops={} completions={} load_failures={}",
            self.frames_delivered,
            self.ticks_skipped,
            self.drift_exceeded,
            self.callback_errors,
            self.emergency_stops,
            self.completions,
            self.load_failures
        )
    }
}

/// 单次播放的帧间隔统计
///
/// 每次投递记录与上一帧的间隔；`play()` 时清零。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalStats {
    /// 样本数（间隔数 = 投递帧数 - 1）
    pub samples: u64,
    pub total: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl IntervalStats {
    /// 记录一个间隔
    pub fn record(&mut self, interval: Duration) {
        self.samples += 1;
        self.total += interval;
        self.min = Some(self.min.map_or(interval, |m| m.min(interval)));
        self.max = Some(self.max.map_or(interval, |m| m.max(interval)));
    }

    /// 平均间隔
    pub fn average(&self) -> Option<Duration> {
        if self.samples == 0 {
            return None;
        }
        Some(self.total / self.samples as u32)
    }

    /// 实际频率（Hz）
    pub fn realized_frequency_hz(&self) -> Option<f64> {
        let avg = self.average()?.as_secs_f64();
        if avg > 0.0 { Some(1.0 / avg) } else { None }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for IntervalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.average(), self.min, self.max) {
            (Some(avg), Some(min), Some(max)) => write!(
                f,
                "intervals={} avg={:.2}ms min={:.2}ms max={:.2}ms freq={:.2}Hz",
                self.samples,
                avg.as_secs_f64() * 1000.0,
                min.as_secs_f64() * 1000.0,
                max.as_secs_f64() * 1000.0,
                self.realized_frequency_hz().unwrap_or(0.0)
            ),
            _ => write!(f, "intervals=0"),
        }
    }
}
