//! 播放会话与共享核心
//!
//! `PlayerCore` 由公开 API、调度线程和加载线程共享。
//!
//! # 锁顺序
//!
//! `delivery`（可重入投递锁）→ `session`（会话互斥锁）。
//! 监听器回调只会在持有 `delivery`、且**不**持有 `session` 时调用，
//! 因此回调内部可以再次调用播放器的任意方法。

use crate::config::PlayerConfig;
use crate::fill::FrameReconstructor;
use crate::listener::SequenceListener;
use crate::metrics::{IntervalStats, PlaybackMetrics};
use crate::state::{AtomicPlayerState, PlayerState};
use crate::timing::{DriftCompensator, nominal_interval_ms};
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Sender, TrySendError};
use evobot_protocol::SequenceData;
use parking_lot::{Mutex, ReentrantMutex};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, warn};

/// 调度线程命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerCommand {
    /// 截止时刻变化，重新读取
    Wake,
    /// 退出线程
    Shutdown,
}

/// 一次状态迁移 `(旧, 新)`
pub(crate) type StateChange = (PlayerState, PlayerState);

/// 会话数据（受 `PlayerCore::session` 保护）
pub(crate) struct Session {
    /// 权威状态
    pub state: PlayerState,
    /// 会话代数：play/stop/急停/跳转/release 时递增，用于识别过期的加载结果和回调
    pub generation: u64,
    pub action_name: Option<String>,
    pub current_frame: u32,
    pub frequency_hz: u32,
    pub compensator: DriftCompensator,
    pub reconstructor: FrameReconstructor,
    /// 下一次 tick 的截止时刻；`None` 表示没有待执行的 tick
    pub next_tick_at: Option<Instant>,
    pub listener: Option<Arc<dyn SequenceListener>>,
    pub interval_stats: IntervalStats,
}

impl Session {
    fn new(config: &PlayerConfig) -> Self {
        let frequency_hz = config.default_frequency_hz;
        Self {
            state: PlayerState::Idle,
            generation: 0,
            action_name: None,
            current_frame: 0,
            frequency_hz,
            compensator: DriftCompensator::new(
                nominal_interval_ms(frequency_hz),
                config.drift_log_threshold_ms,
            ),
            reconstructor: FrameReconstructor::new(),
            next_tick_at: None,
            listener: None,
            interval_stats: IntervalStats::default(),
        }
    }

    /// 回到第 0 帧：清空填充缓存，取消待执行的 tick
    pub fn reset_cursor(&mut self) {
        self.current_frame = 0;
        self.reconstructor.reset();
        self.compensator.reset();
        self.next_tick_at = None;
    }

    /// 使所有在途的加载结果和回调后续处理失效
    pub fn invalidate(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// 安排一次立即执行的 tick
    pub fn schedule_now(&mut self) {
        self.compensator.reset();
        self.next_tick_at = Some(Instant::now());
    }
}

/// 播放器共享核心
pub(crate) struct PlayerCore {
    pub session: Mutex<Session>,
    /// `session.state` 的无锁镜像
    pub state: AtomicPlayerState,
    /// 当前序列（加载完成后整体替换，不可变）
    pub sequence: ArcSwapOption<SequenceData>,
    /// 投递锁：持有期间才会调用 `on_frame_data`
    pub delivery: ReentrantMutex<()>,
    pub metrics: PlaybackMetrics,
    pub config: PlayerConfig,
    /// 调度线程退出标志
    shutting_down: AtomicBool,
    wake_tx: Sender<SchedulerCommand>,
}

impl PlayerCore {
    pub fn new(config: PlayerConfig, wake_tx: Sender<SchedulerCommand>) -> Self {
        Self {
            session: Mutex::new(Session::new(&config)),
            state: AtomicPlayerState::new(PlayerState::Idle),
            sequence: ArcSwapOption::empty(),
            delivery: ReentrantMutex::new(()),
            metrics: PlaybackMetrics::new(),
            config,
            shutting_down: AtomicBool::new(false),
            wake_tx,
        }
    }

    /// 状态迁移（调用方持有会话锁）
    ///
    /// 非法迁移被拒绝并记录警告；状态未变化时返回 `None`。
    pub fn transition(&self, session: &mut Session, next: PlayerState) -> Option<StateChange> {
        let old = session.state;
        if old == next {
            return None;
        }
        if !old.can_transition_to(next) {
            warn!("Rejected state change: {} -> {}", old, next);
            return None;
        }

        session.state = next;
        self.state.set(next, Ordering::Release);
        debug!("State change: {} -> {}", old, next);
        Some((old, next))
    }

    /// 唤醒调度线程重新读取截止时刻
    pub fn wake(&self) {
        match self.wake_tx.try_send(SchedulerCommand::Wake) {
            // 队列满说明已经有未处理的唤醒
            Ok(()) | Err(TrySendError::Full(_)) => {},
            Err(TrySendError::Disconnected(_)) => {
                warn!("Scheduler thread is gone, wake-up dropped");
            },
        }
    }

    /// 请求调度线程退出
    ///
    /// 不阻塞：可能在调度线程自身上调用（监听器持有最后一个播放器引用）。
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let _ = self.wake_tx.try_send(SchedulerCommand::Shutdown);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}

/// 调用监听器，吞掉 panic（记录日志）
///
/// 返回 `None` 表示回调 panic。
pub(crate) fn invoke<R>(what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!("Listener panicked in {}: {}", what, panic_message(&*payload));
            None
        },
    }
}

/// 通知状态变化
pub(crate) fn notify_state_changes(
    listener: Option<&Arc<dyn SequenceListener>>,
    changes: &[Option<StateChange>],
) {
    let Some(listener) = listener else {
        return;
    };
    for &(old, new) in changes.iter().flatten() {
        invoke("on_state_changed", || listener.on_state_changed(old, new));
    }
}

/// 从 panic 负载中取出消息
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
