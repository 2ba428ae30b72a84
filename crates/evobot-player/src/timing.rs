//! 帧间隔与漂移补偿
//!
//! # 补偿公式
//!
//! ```text
//! nominal   = round(1000 / f)                    (f ∈ [1, 100])
//! drift     = actual - nominal
//! nextDelay = clamp(nominal - drift, nominal / 2, nominal * 1.5)
//! ```
//!
//! 所有量以整毫秒计算。钳位保证单次异常的 tick 不会导致
//! 后续帧失控加速或停顿。

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// 最低播放频率（Hz）
pub const MIN_FREQUENCY_HZ: u32 = 1;

/// 最高播放频率（Hz）
pub const MAX_FREQUENCY_HZ: u32 = 100;

/// 频率是否在允许范围内
pub fn is_valid_frequency(frequency_hz: u32) -> bool {
    (MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz)
}

/// 名义帧间隔（毫秒）：`round(1000 / f)`
///
/// # 示例
///
/// ```rust
/// use evobot_player::timing::nominal_interval_ms;
///
/// assert_eq!(nominal_interval_ms(40), 25);
/// assert_eq!(nominal_interval_ms(30), 33);
/// assert_eq!(nominal_interval_ms(3), 333);
/// assert_eq!(nominal_interval_ms(6), 167);
/// ```
pub fn nominal_interval_ms(frequency_hz: u32) -> u64 {
    let f = frequency_hz.max(MIN_FREQUENCY_HZ) as u64;
    (1000 + f / 2) / f
}

/// 根据实际间隔计算下一次延迟（毫秒）
pub fn compensated_delay_ms(nominal_ms: u64, actual_ms: u64) -> u64 {
    let nominal = nominal_ms as i64;
    let drift = actual_ms.min(i64::MAX as u64) as i64 - nominal;
    let adjusted = nominal.saturating_sub(drift);
    adjusted.clamp(nominal / 2, nominal * 3 / 2) as u64
}

/// 漂移补偿器
///
/// 记录上一次投递时刻，每次投递后给出下一帧的延迟。
/// 进入 PLAYING（开始、恢复、跳转）后的第一帧没有可比较的上一帧，
/// 使用名义间隔。
#[derive(Debug, Clone)]
pub struct DriftCompensator {
    nominal_ms: u64,
    log_threshold_ms: u64,
    last_delivery: Option<Instant>,
    last_interval: Option<Duration>,
    last_drift_ms: i64,
}

impl DriftCompensator {
    /// 创建补偿器
    ///
    /// # 参数
    ///
    /// - `nominal_ms`: 名义间隔
    /// - `log_threshold_ms`: 漂移超过该值时输出调试日志
    pub fn new(nominal_ms: u64, log_threshold_ms: u64) -> Self {
        Self {
            nominal_ms,
            log_threshold_ms,
            last_delivery: None,
            last_interval: None,
            last_drift_ms: 0,
        }
    }

    /// 名义间隔
    pub fn nominal(&self) -> Duration {
        Duration::from_millis(self.nominal_ms)
    }

    /// 忘记上一次投递时刻（暂停/跳转/停止后调用）
    pub fn reset(&mut self) {
        self.last_delivery = None;
        self.last_interval = None;
        self.last_drift_ms = 0;
    }

    /// 记录一次投递，返回到下一帧的延迟
    pub fn mark_delivery(&mut self, now: Instant) -> Duration {
        let delay_ms = match self.last_delivery {
            Some(last) => {
                let actual = now.saturating_duration_since(last);
                let actual_ms = actual.as_millis() as u64;
                let next = compensated_delay_ms(self.nominal_ms, actual_ms);

                self.last_interval = Some(actual);
                self.last_drift_ms = actual_ms as i64 - self.nominal_ms as i64;

                if self.last_drift_ms.unsigned_abs() > self.log_threshold_ms {
                    debug!(
                        "Timer compensation: actual={}ms, expected={}ms, adjusted={}ms, drift={}ms",
                        actual_ms, self.nominal_ms, next, self.last_drift_ms
                    );
                }
                next
            },
            None => self.nominal_ms,
        };

        self.last_delivery = Some(now);
        Duration::from_millis(delay_ms)
    }

    /// 上一次测得的实际间隔
    pub fn last_interval(&self) -> Option<Duration> {
        self.last_interval
    }

    /// 上一次测得的漂移（毫秒，正数表示迟到）
    pub fn last_drift_ms(&self) -> i64 {
        self.last_drift_ms
    }

    /// 上一次漂移是否超过日志阈值
    pub fn last_drift_exceeded(&self) -> bool {
        self.last_drift_ms.unsigned_abs() > self.log_threshold_ms
    }
}

/// 调度线程的等待方式
///
/// - `Standard`: 通道超时等待到截止时刻
/// - `Spin`: 通道等待到截止前 `spin_margin`，剩余时间用 `spin_sleep` 精确睡眠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStrategy {
    #[default]
    Standard,
    Spin,
}

impl std::fmt::Display for SleepStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SleepStrategy::Standard => write!(f, "standard"),
            SleepStrategy::Spin => write!(f, "spin"),
        }
    }
}
