//! 播放器状态机
//!
//! ```text
//!            play()              加载完成           开始播放
//!   IDLE ───────────▶ LOADING ───────────▶ READY ───────────▶ PLAYING ◀──┐
//!                        │                                    │   ▲     │
//!                        │ 加载/解码失败          pause()      │   │     │ seek()
//!                        ▼                                    ▼   │     │
//!                      ERROR ◀──── 回调失败 ──────────── PAUSED ─┘resume()
//!
//!   stop() / emergency_stop() / 播放完成 ───▶ STOPPED
//!   release() ───▶ IDLE
//!   任意状态 play() ───▶ LOADING（隐式停止）
//! ```
//!
//! ERROR 和 STOPPED 不是终态：可以再次 `play()`。

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::sync::atomic::{AtomicU8, Ordering};

/// 播放器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PlayerState {
    /// 空闲：没有加载序列
    #[default]
    Idle = 0,
    /// 正在获取并解码序列
    Loading = 1,
    /// 序列已就绪，尚未开始播放
    Ready = 2,
    /// 正在播放
    Playing = 3,
    /// 已暂停（可恢复）
    Paused = 4,
    /// 已停止（播放完成、主动停止或急停）
    Stopped = 5,
    /// 出错（加载、解码或回调失败）
    Error = 6,
}

impl PlayerState {
    /// 是否可以暂停
    pub fn can_pause(self) -> bool {
        self == Self::Playing
    }

    /// 是否可以恢复
    pub fn can_resume(self) -> bool {
        self == Self::Paused
    }

    /// 是否需要执行停止（IDLE/STOPPED 下 `stop()` 是空操作）
    pub fn can_stop(self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped)
    }

    /// 是否可以跳转
    pub fn can_seek(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }

    /// 是否处于一次播放的结束态（STOPPED/ERROR）
    ///
    /// 注意：结束态仍然可以通过 `play()` 重新开始。
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// 是否持有一个活动的播放会话（正在加载、就绪、播放或暂停）
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Ready | Self::Playing | Self::Paused
        )
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(self, next: PlayerState) -> bool {
        use PlayerState::*;
        match next {
            // play() 与 release() 可从任意状态进入
            Loading | Idle => true,
            // emergency_stop() 可从任意状态进入
            Stopped => true,
            Ready => self == Loading,
            Playing => matches!(self, Ready | Paused),
            Paused => self == Playing,
            Error => matches!(self, Loading | Ready | Playing | Paused),
        }
    }

    /// 状态描述
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "idle, no sequence loaded",
            Self::Loading => "fetching and decoding sequence",
            Self::Ready => "sequence loaded, not started",
            Self::Playing => "delivering frames",
            Self::Paused => "paused, resumable",
            Self::Stopped => "stopped",
            Self::Error => "failed, see on_error",
        }
    }

    /// 状态名（大写）
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Loading => "LOADING",
            Self::Ready => "READY",
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 播放器状态（原子版本，用于无锁读取）
///
/// 权威状态保存在会话锁内，这里只是镜像，供 `state()` 查询
/// 与等待循环在不加锁的情况下读取。
#[derive(Debug)]
pub struct AtomicPlayerState {
    inner: AtomicU8,
}

impl AtomicPlayerState {
    /// 创建新的原子状态
    pub fn new(state: PlayerState) -> Self {
        Self {
            inner: AtomicU8::new(state.into()),
        }
    }

    /// 获取当前状态
    pub fn get(&self, ordering: Ordering) -> PlayerState {
        PlayerState::try_from(self.inner.load(ordering)).unwrap_or_default()
    }

    /// 设置状态
    pub fn set(&self, state: PlayerState, ordering: Ordering) {
        self.inner.store(state.into(), ordering);
    }
}

impl Default for AtomicPlayerState {
    fn default() -> Self {
        Self::new(PlayerState::Idle)
    }
}
