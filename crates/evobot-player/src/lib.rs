//! # EvoBot Player
//!
//! 双臂动作序列的实时播放引擎。
//!
//! ## 模块
//!
//! - `player`: 对外 API（`SequencePlayer`）
//! - `scheduler`: 调度线程与漂移补偿的帧投递
//! - `estop`: 停止与急停互锁
//! - `fill`: 保持值前向填充
//! - `timing`: 帧间隔与漂移补偿公式
//! - `state`: 播放器状态机
//! - `listener`: 监听器接口
//! - `source`/`decoder`: 加载后端（字节源 + 解码器）
//! - `config`: TOML 配置
//! - `metrics`: 播放指标
//!
//! ## 快速开始
//!
//! ```rust
//! use evobot_player::{ChannelListener, MemorySource, PlaybackEvent, SequencePlayer};
//! use evobot_protocol::{HOLD, SequenceBuilder, encode};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sequence = SequenceBuilder::new("nod")
//!     .push_frame([2048; 10], [2048; 10])
//!     .push_frame([HOLD; 10], [2100; 10])
//!     .build()
//!     .unwrap();
//! let source = MemorySource::new().with("nod", encode(&sequence).unwrap());
//!
//! let player = SequencePlayer::new(Arc::new(source)).unwrap();
//! let (listener, events) = ChannelListener::new();
//! player.play("nod", 100, Arc::new(listener)).unwrap();
//!
//! assert!(player.wait_until_finished(Duration::from_secs(5)));
//! let frames: Vec<_> = events
//!     .try_iter()
//!     .filter_map(|event| match event {
//!         PlaybackEvent::Frame { left, .. } => Some(left),
//!         _ => None,
//!     })
//!     .collect();
//! // 第 1 帧的左臂保持值被填充为 2048
//! assert_eq!(frames, vec![[2048; 10], [2048; 10]]);
//! ```

pub mod config;
pub mod decoder;
pub mod error;
mod estop;
pub mod fill;
pub mod listener;
pub mod metrics;
pub mod player;
mod scheduler;
mod session;
pub mod source;
pub mod state;
pub mod timing;

pub use config::{ConfigError, PlayerConfig};
pub use decoder::{EbsDecoder, SequenceDecoder};
pub use error::PlayerError;
pub use fill::FrameReconstructor;
pub use listener::{ChannelListener, ListenerError, PlaybackEvent, SequenceListener};
pub use metrics::{IntervalStats, MetricsSnapshot};
pub use player::{PlayerBuilder, SequencePlayer};
pub use source::{ByteSource, DirectorySource, MemorySource, SourceError};
pub use state::PlayerState;
pub use timing::{SleepStrategy, nominal_interval_ms};
