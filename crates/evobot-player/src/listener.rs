//! 播放监听器
//!
//! 播放器通过 [`SequenceListener`] 把帧数据和生命周期事件交给下游
//! （舵机驱动、录制、UI 等）。
//!
//! # 调用约定
//!
//! - 所有回调都在调度线程（或调用 `emergency_stop()` 的线程）上执行
//! - 回调期间不持有会话锁，可以在回调内调用 `pause()`/`stop()`/`emergency_stop()`/`seek()`
//! - `on_frame_data` 返回 `Err` 或 panic 时，播放进入 ERROR 并触发一次 `on_error`
//! - `emergency_stop()` 返回后不会再有任何 `on_frame_data`
//!
//! # 示例
//!
//! ```rust
//! use evobot_player::{ListenerError, SequenceListener};
//! use evobot_protocol::JointFrame;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct ServoBridge {
//!     frames: AtomicU32,
//! }
//!
//! impl SequenceListener for ServoBridge {
//!     fn on_frame_data(
//!         &self,
//!         _left: &JointFrame,
//!         _right: &JointFrame,
//!         _frame_index: u32,
//!     ) -> Result<(), ListenerError> {
//!         self.frames.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//!
//!     fn on_complete(&self) {}
//!
//!     fn on_error(&self, message: &str) {
//!         eprintln!("playback failed: {}", message);
//!     }
//! }
//! ```

use crate::state::PlayerState;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use evobot_protocol::JointFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// 监听器拒绝帧数据时返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// 播放监听器 Trait
pub trait SequenceListener: Send + Sync {
    /// 每投递一帧调用一次（帧已完成前向填充）
    ///
    /// # 参数
    ///
    /// - `left`/`right`: 左右臂 10 个关节的位置值
    /// - `frame_index`: 帧号（从 0 开始）
    fn on_frame_data(
        &self,
        left: &JointFrame,
        right: &JointFrame,
        frame_index: u32,
    ) -> Result<(), ListenerError>;

    /// 自然播放完成（最后一帧之后的下一个 tick）
    fn on_complete(&self);

    /// 加载、解码或回调失败
    fn on_error(&self, message: &str);

    /// 急停完成（每次 `emergency_stop()` 恰好一次）
    fn on_emergency_stop(&self) {}

    /// 状态变化（可选）
    fn on_state_changed(&self, old: PlayerState, new: PlayerState) {
        let _ = (old, new);
    }
}

/// 播放事件（[`ChannelListener`] 转发的内容）
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Frame {
        index: u32,
        left: JointFrame,
        right: JointFrame,
    },
    Complete,
    Error(String),
    EmergencyStop,
    StateChanged {
        old: PlayerState,
        new: PlayerState,
    },
}

/// 基于 Channel 的监听器
///
/// 把所有事件转发到有界通道，由另一个线程消费。回调本身只做 `try_send`，
/// 队列满时丢弃帧事件并计数，不阻塞调度线程。
///
/// # 示例
///
/// ```rust
/// use evobot_player::{ChannelListener, SequenceListener};
/// use std::sync::Arc;
///
/// let (listener, rx) = ChannelListener::new();
/// let dropped = listener.dropped_events().clone();
/// let listener: Arc<dyn SequenceListener> = Arc::new(listener);
///
/// // player.play("wave", 40, listener)?;
/// // while let Ok(event) = rx.recv() { ... }
/// # drop(rx);
/// # assert_eq!(dropped.load(std::sync::atomic::Ordering::Relaxed), 0);
/// ```
pub struct ChannelListener {
    tx: Sender<PlaybackEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ChannelListener {
    /// 默认容量：100,000 个事件（约 40 分钟 @ 40Hz）
    pub const DEFAULT_CAPACITY: usize = 100_000;

    /// 创建监听器和接收端
    pub fn new() -> (Self, Receiver<PlaybackEvent>) {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// 指定队列容量
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<PlaybackEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// 丢弃事件计数器
    pub fn dropped_events(&self) -> &Arc<AtomicU64> {
        &self.dropped_events
    }

    fn forward(&self, event: PlaybackEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

impl SequenceListener for ChannelListener {
    fn on_frame_data(
        &self,
        left: &JointFrame,
        right: &JointFrame,
        frame_index: u32,
    ) -> Result<(), ListenerError> {
        self.forward(PlaybackEvent::Frame {
            index: frame_index,
            left: *left,
            right: *right,
        });
        Ok(())
    }

    fn on_complete(&self) {
        self.forward(PlaybackEvent::Complete);
    }

    fn on_error(&self, message: &str) {
        self.forward(PlaybackEvent::Error(message.to_string()));
    }

    fn on_emergency_stop(&self) {
        self.forward(PlaybackEvent::EmergencyStop);
    }

    fn on_state_changed(&self, old: PlayerState, new: PlayerState) {
        self.forward(PlaybackEvent::StateChanged { old, new });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_listener_forwards_events() {
        let (listener, rx) = ChannelListener::new();
        listener.on_frame_data(&[1; 10], &[2; 10], 7).unwrap();
        listener.on_state_changed(PlayerState::Playing, PlayerState::Stopped);
        listener.on_complete();

        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::Frame {
                index: 7,
                left: [1; 10],
                right: [2; 10]
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::StateChanged {
                old: PlayerState::Playing,
                new: PlayerState::Stopped
            }
        );
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Complete);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_listener_counts_dropped() {
        let (listener, _rx) = ChannelListener::with_capacity(2);
        for i in 0..5 {
            listener.on_frame_data(&[0; 10], &[0; 10], i).unwrap();
        }
        assert_eq!(listener.dropped_events().load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_channel_listener_ignores_disconnected() {
        let (listener, rx) = ChannelListener::with_capacity(1);
        drop(rx);
        listener.on_error("boom");
        assert_eq!(listener.dropped_events().load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_listener_error_display() {
        let err: ListenerError = "servo bus offline".into();
        assert_eq!(err.to_string(), "servo bus offline");
    }
}
