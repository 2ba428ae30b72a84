//! 序列播放器
//!
//! 对外提供 `play`/`pause`/`resume`/`stop`/`emergency_stop`/`seek` 等操作。
//! 构造时启动一个调度线程，`Drop` 时关闭并等待其退出。

use crate::config::PlayerConfig;
use crate::decoder::{EbsDecoder, SequenceDecoder};
use crate::error::PlayerError;
use crate::listener::SequenceListener;
use crate::metrics::{IntervalStats, MetricsSnapshot, PlaybackMetrics};
use crate::scheduler::scheduler_loop;
use crate::session::{PlayerCore, invoke, notify_state_changes};
use crate::source::ByteSource;
use crate::state::PlayerState;
use crate::timing::{
    DriftCompensator, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, is_valid_frequency, nominal_interval_ms,
};
use crossbeam_channel::{RecvTimeoutError, bounded};
use evobot_protocol::{SequenceData, SequenceHeader};
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 调度线程唤醒队列容量
const WAKE_QUEUE_CAPACITY: usize = 16;

/// `Drop` 时等待调度线程退出的上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = bounded(1);
        // 由辅助线程阻塞 join，超时后将其分离
        std::thread::spawn(move || {
            let result = self.join().map(|_| ());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(RecvTimeoutError::Timeout) => Err(Box::new(io::Error::new(
                io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 序列播放器
///
/// # 示例
///
/// ```rust,no_run
/// use evobot_player::{ChannelListener, DirectorySource, PlaybackEvent, SequencePlayer};
/// use std::sync::Arc;
///
/// let player = SequencePlayer::new(Arc::new(DirectorySource::new("/data/actions")))?;
/// let (listener, events) = ChannelListener::new();
///
/// player.play("左臂挥手右臂掐腰抱胸", 40, Arc::new(listener))?;
///
/// while let Ok(event) = events.recv() {
///     match event {
///         PlaybackEvent::Frame { index, left, right } => {
///             // 发送到舵机总线
///             let _ = (index, left, right);
///         },
///         PlaybackEvent::Complete | PlaybackEvent::Error(_) => break,
///         _ => {},
///     }
/// }
/// # Ok::<(), evobot_player::PlayerError>(())
/// ```
pub struct SequencePlayer {
    core: Arc<PlayerCore>,
    source: Arc<dyn ByteSource>,
    decoder: Arc<dyn SequenceDecoder>,
    scheduler_thread: Option<JoinHandle<()>>,
}

impl SequencePlayer {
    /// 使用默认配置创建播放器
    pub fn new(source: Arc<dyn ByteSource>) -> Result<Self, PlayerError> {
        Self::with_config(source, PlayerConfig::default())
    }

    /// 使用指定配置创建播放器
    pub fn with_config(
        source: Arc<dyn ByteSource>,
        config: PlayerConfig,
    ) -> Result<Self, PlayerError> {
        Self::builder().source(source).config(config).build()
    }

    /// 创建 Builder
    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::new()
    }

    fn spawn(
        source: Arc<dyn ByteSource>,
        decoder: Arc<dyn SequenceDecoder>,
        config: PlayerConfig,
    ) -> Result<Self, PlayerError> {
        config.validate()?;

        let (wake_tx, wake_rx) = bounded(WAKE_QUEUE_CAPACITY);
        let thread_name = config.scheduler_thread_name.clone();
        let core = Arc::new(PlayerCore::new(config, wake_tx));

        let core_for_thread = core.clone();
        let scheduler_thread = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || scheduler_loop(core_for_thread, wake_rx))
            .map_err(|e| PlayerError::ThreadSpawn(e.to_string()))?;

        debug!("Sequence player created (decoder={})", decoder.name());

        Ok(Self {
            core,
            source,
            decoder,
            scheduler_thread: Some(scheduler_thread),
        })
    }

    /// 播放动作
    ///
    /// 参数校验失败时同步返回 [`PlayerError::InvalidArgument`]，不改变状态。
    /// 否则隐式停止当前会话，进入 LOADING，在加载线程上获取并解码，
    /// 成功后 READY → PLAYING 并立即投递第 0 帧；失败则进入 ERROR 并调用 `on_error`。
    ///
    /// # 参数
    ///
    /// - `action_name`: 动作名（交给字节源解析）
    /// - `frequency_hz`: 播放频率，1..=100
    /// - `listener`: 监听器
    pub fn play(
        &self,
        action_name: &str,
        frequency_hz: u32,
        listener: Arc<dyn SequenceListener>,
    ) -> Result<(), PlayerError> {
        let action_name = validate_action_name(action_name)?;
        validate_frequency(frequency_hz)?;

        let generation = self.begin_session(Some(action_name.clone()), frequency_hz, listener);
        info!(
            "Loading sequence: {} at {}Hz ({}ms interval)",
            action_name,
            frequency_hz,
            nominal_interval_ms(frequency_hz)
        );

        let core = self.core.clone();
        let source = self.source.clone();
        let decoder = self.decoder.clone();
        let name = action_name.clone();
        let spawned = std::thread::Builder::new()
            .name(self.core.config.loader_thread_name.clone())
            .spawn(move || {
                let result = source
                    .fetch(&name)
                    .map_err(PlayerError::from)
                    .and_then(|bytes| decoder.decode(&bytes).map_err(PlayerError::from));
                core.finish_load(generation, result);
            });

        if let Err(e) = spawned {
            let message = e.to_string();
            self.core
                .finish_load(generation, Err(PlayerError::ThreadSpawn(message.clone())));
            return Err(PlayerError::ThreadSpawn(message));
        }
        Ok(())
    }

    /// 使用配置中的默认频率播放
    pub fn play_default(
        &self,
        action_name: &str,
        listener: Arc<dyn SequenceListener>,
    ) -> Result<(), PlayerError> {
        self.play(action_name, self.core.config.default_frequency_hz, listener)
    }

    /// 播放已解码的序列（跳过字节源）
    ///
    /// 结构校验失败时同步返回错误，不改变状态。成功时同步完成加载，
    /// 返回时已处于 PLAYING。
    pub fn play_sequence(
        &self,
        sequence: SequenceData,
        frequency_hz: u32,
        listener: Arc<dyn SequenceListener>,
    ) -> Result<(), PlayerError> {
        validate_frequency(frequency_hz)?;
        sequence.validate()?;

        let generation = self.begin_session(Some(sequence.name.clone()), frequency_hz, listener);
        self.core.finish_load(generation, Ok(sequence));
        Ok(())
    }

    /// 开始新会话：隐式停止当前会话，重置进度，进入 LOADING
    fn begin_session(
        &self,
        action_name: Option<String>,
        frequency_hz: u32,
        listener: Arc<dyn SequenceListener>,
    ) -> u64 {
        let core = &self.core;
        let _delivery = core.delivery.lock();

        let (generation, change) = {
            let mut session = core.session.lock();
            if session.state.is_active() {
                debug!("Implicitly stopping {} session", session.state);
            }

            let generation = session.invalidate();
            session.reset_cursor();
            session.interval_stats.reset();
            session.frequency_hz = frequency_hz;
            session.compensator = DriftCompensator::new(
                nominal_interval_ms(frequency_hz),
                core.config.drift_log_threshold_ms,
            );
            session.action_name = action_name;
            session.listener = Some(listener.clone());
            core.sequence.store(None);

            let change = core.transition(&mut session, PlayerState::Loading);
            (generation, change)
        };

        core.wake();
        notify_state_changes(Some(&listener), &[change]);
        generation
    }

    /// 暂停（仅 PLAYING 下有效），返回是否生效
    pub fn pause(&self) -> bool {
        let core = &self.core;
        let _delivery = core.delivery.lock();

        let (listener, change) = {
            let mut session = core.session.lock();
            if !session.state.can_pause() {
                debug!("pause() ignored in state {}", session.state);
                return false;
            }
            let change = core.transition(&mut session, PlayerState::Paused);
            session.next_tick_at = None;
            info!("Playback paused at frame {}", session.current_frame);
            (session.listener.clone(), change)
        };

        core.wake();
        notify_state_changes(listener.as_ref(), &[change]);
        true
    }

    /// 恢复（仅 PAUSED 下有效），立即投递当前帧，返回是否生效
    pub fn resume(&self) -> bool {
        let core = &self.core;

        let (listener, change) = {
            let mut session = core.session.lock();
            if !session.state.can_resume() {
                debug!("resume() ignored in state {}", session.state);
                return false;
            }
            let change = core.transition(&mut session, PlayerState::Playing);
            session.schedule_now();
            info!("Playback resumed at frame {}", session.current_frame);
            (session.listener.clone(), change)
        };

        core.wake();
        notify_state_changes(listener.as_ref(), &[change]);
        true
    }

    /// 停止（幂等）：帧号归零并清空填充缓存，不触发任何回调
    pub fn stop(&self) -> bool {
        let stopped = self.core.stop();
        if stopped {
            info!("Playback stopped");
        }
        stopped
    }

    /// 急停
    ///
    /// 返回时保证：状态为 STOPPED，已调用一次 `on_emergency_stop`，
    /// 且之后不会再有任何 `on_frame_data`。可在任意线程、任意状态、
    /// 包括监听器回调内部调用。
    pub fn emergency_stop(&self) {
        self.core.emergency_stop();
    }

    /// 跳转到指定帧
    ///
    /// 仅在 READY/PLAYING/PAUSED 下有效，越界为空操作。PLAYING 时立即投递目标帧。
    /// 前向填充缓存保留（跳转后仍可能输出跳转前的保持值）。
    pub fn seek(&self, frame_index: u32) -> bool {
        let core = &self.core;
        let _delivery = core.delivery.lock();

        let mut session = core.session.lock();
        if !session.state.can_seek() {
            debug!("seek({}) ignored in state {}", frame_index, session.state);
            return false;
        }

        let total_frames = core
            .sequence
            .load_full()
            .map_or(0, |sequence| sequence.total_frames);
        if frame_index >= total_frames {
            warn!(
                "seek({}) out of range, total frames {}",
                frame_index, total_frames
            );
            return false;
        }

        session.current_frame = frame_index;
        session.invalidate();
        if session.state == PlayerState::Playing {
            session.schedule_now();
            drop(session);
            core.wake();
        }
        info!("Seek to frame {}", frame_index);
        true
    }

    /// 释放：停止播放，丢弃序列和监听器，回到 IDLE
    pub fn release(&self) {
        let core = &self.core;
        let _delivery = core.delivery.lock();

        let (listener, change) = {
            let mut session = core.session.lock();
            session.invalidate();
            session.reset_cursor();
            session.interval_stats.reset();
            session.action_name = None;
            let change = core.transition(&mut session, PlayerState::Idle);
            (session.listener.take(), change)
        };
        core.sequence.store(None);

        core.wake();
        notify_state_changes(listener.as_ref(), &[change]);
        info!("Player released");
    }

    /// 当前状态（无锁）
    pub fn state(&self) -> PlayerState {
        self.core.state.get(Ordering::Acquire)
    }

    /// 下一帧要投递的帧号
    pub fn current_frame(&self) -> u32 {
        self.core.session.lock().current_frame
    }

    /// 当前序列的总帧数（未加载时为 0）
    pub fn total_frames(&self) -> u32 {
        self.core
            .sequence
            .load_full()
            .map_or(0, |sequence| sequence.total_frames)
    }

    /// 播放进度 `current_frame / total_frames`（0.0..=1.0）
    pub fn progress(&self) -> f32 {
        let total = self.total_frames();
        if total == 0 {
            return 0.0;
        }
        self.current_frame() as f32 / total as f32
    }

    /// 当前序列的头部信息
    pub fn sequence_header(&self) -> Option<SequenceHeader> {
        self.core.sequence.load_full().map(|sequence| sequence.header())
    }

    /// 当前序列的摘要字符串
    pub fn sequence_info(&self) -> Option<String> {
        self.core.sequence.load_full().map(|sequence| sequence.info())
    }

    /// 当前会话的动作名
    pub fn action_name(&self) -> Option<String> {
        self.core.session.lock().action_name.clone()
    }

    /// 当前会话的播放频率（Hz）
    pub fn frequency_hz(&self) -> u32 {
        self.core.session.lock().frequency_hz
    }

    /// 当前会话的名义帧间隔
    pub fn nominal_interval(&self) -> Duration {
        self.core.session.lock().compensator.nominal()
    }

    /// 播放器配置
    pub fn config(&self) -> &PlayerConfig {
        &self.core.config
    }

    /// 累计指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics.snapshot()
    }

    /// 当前会话的帧间隔统计
    pub fn interval_stats(&self) -> IntervalStats {
        self.core.session.lock().interval_stats
    }

    /// 等待状态满足条件
    ///
    /// 返回 `false` 表示超时。返回 `true` 时，进入该状态时触发的回调
    /// （`on_complete`/`on_error` 等）已经执行完毕。
    pub fn wait_for_state<F>(&self, predicate: F, timeout: Duration) -> bool
    where
        F: Fn(PlayerState) -> bool,
    {
        let start = Instant::now();
        loop {
            if predicate(self.state()) {
                // 状态切换后的通知在投递锁内完成
                drop(self.core.delivery.lock());
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 等待本次播放结束（STOPPED/ERROR/IDLE）
    pub fn wait_until_finished(&self, timeout: Duration) -> bool {
        self.wait_for_state(
            |state| state.is_terminal() || state == PlayerState::Idle,
            timeout,
        )
    }

    /// 调度线程是否存活
    pub fn is_healthy(&self) -> bool {
        self.scheduler_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl PlayerCore {
    /// 加载线程完成后调用
    ///
    /// 过期结果（期间发生了 stop/急停/新的 play）被丢弃。
    pub(crate) fn finish_load(&self, generation: u64, result: Result<SequenceData, PlayerError>) {
        let _delivery = self.delivery.lock();
        let mut session = self.session.lock();

        if session.generation != generation || session.state != PlayerState::Loading {
            debug!("Discarding stale load result (generation {})", generation);
            return;
        }
        let listener = session.listener.clone();

        match result {
            Ok(sequence) => {
                info!("Sequence loaded: {}", sequence.info());
                self.sequence.store(Some(Arc::new(sequence)));
                session.reset_cursor();

                let ready = self.transition(&mut session, PlayerState::Ready);
                let playing = self.transition(&mut session, PlayerState::Playing);
                session.schedule_now();
                drop(session);

                self.wake();
                notify_state_changes(listener.as_ref(), &[ready, playing]);
            },
            Err(err) => {
                PlaybackMetrics::bump(&self.metrics.load_failures);
                error!("Failed to load sequence: {}", err);

                let change = self.transition(&mut session, PlayerState::Error);
                drop(session);

                notify_state_changes(listener.as_ref(), &[change]);
                if let Some(listener) = listener {
                    let message = err.to_string();
                    invoke("on_error", || listener.on_error(&message));
                }
            },
        }
    }
}

impl Drop for SequencePlayer {
    fn drop(&mut self) {
        // 先停掉会话，保证不再有回调
        self.core.stop();
        self.core.shutdown();

        let Some(handle) = self.scheduler_thread.take() else {
            return;
        };
        // 在调度线程自身上析构（监听器持有播放器）时不能 join 自己
        if handle.thread().id() == std::thread::current().id() {
            return;
        }

        if let Err(e) = handle.join_timeout(JOIN_TIMEOUT) {
            match e.downcast_ref::<io::Error>() {
                Some(err) if err.kind() == io::ErrorKind::TimedOut => error!(
                    "Scheduler thread failed to shut down within {:?}",
                    JOIN_TIMEOUT
                ),
                _ => error!("Scheduler thread panicked"),
            }
        }
    }
}

/// 播放器 Builder
///
/// # 示例
///
/// ```rust
/// use evobot_player::{MemorySource, PlayerConfig, SequencePlayer, SleepStrategy};
/// use std::sync::Arc;
///
/// let player = SequencePlayer::builder()
///     .source(Arc::new(MemorySource::new()))
///     .config(PlayerConfig {
///         sleep_strategy: SleepStrategy::Spin,
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
/// assert_eq!(player.total_frames(), 0);
/// ```
pub struct PlayerBuilder {
    source: Option<Arc<dyn ByteSource>>,
    decoder: Option<Arc<dyn SequenceDecoder>>,
    config: Option<PlayerConfig>,
}

impl PlayerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            decoder: None,
            config: None,
        }
    }

    /// 设置字节源（必需）
    pub fn source(mut self, source: Arc<dyn ByteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// 设置解码器（可选，默认 [`EbsDecoder`]）
    pub fn decoder(mut self, decoder: Arc<dyn SequenceDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// 设置配置（可选，默认 [`PlayerConfig::default`]）
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 构建播放器并启动调度线程
    pub fn build(self) -> Result<SequencePlayer, PlayerError> {
        let source = self.source.ok_or_else(|| {
            PlayerError::InvalidArgument("a byte source is required".to_string())
        })?;
        let decoder = self.decoder.unwrap_or_else(|| Arc::new(EbsDecoder));
        SequencePlayer::spawn(source, decoder, self.config.unwrap_or_default())
    }
}

impl Default for PlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_action_name(action_name: &str) -> Result<String, PlayerError> {
    let trimmed = action_name.trim();
    if trimmed.is_empty() {
        return Err(PlayerError::InvalidArgument(
            "action name must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_frequency(frequency_hz: u32) -> Result<(), PlayerError> {
    if !is_valid_frequency(frequency_hz) {
        return Err(PlayerError::InvalidArgument(format!(
            "frequency {}Hz out of range {}..={}",
            frequency_hz, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ
        )));
    }
    Ok(())
}
