//! 播放调度
//!
//! 每个播放器一个专用调度线程，所有帧投递都发生在这条时间线上，
//! 不存在并行的帧生产。
//!
//! 线程在 `next_tick_at` 截止时刻醒来执行一次 tick；`play()`/`resume()`/`seek()`
//! 把截止时刻设为"现在"并发送 `Wake`，使下一帧立即投递。
//!
//! # Tick
//!
//! 1. 状态不是 PLAYING：空操作（已被暂停/停止/急停取代）
//! 2. `current_frame >= total_frames`：进入 STOPPED，调用 `on_complete`
//! 3. 否则取原始帧 → 前向填充 → `on_frame_data` → 帧号加一 → 按补偿后的延迟安排下一次 tick
//!
//! 回调返回错误或 panic 时进入 ERROR 并停止调度。

use crate::listener::SequenceListener;
use crate::metrics::PlaybackMetrics;
use crate::session::{
    PlayerCore, SchedulerCommand, Session, invoke, notify_state_changes, panic_message,
};
use crate::state::PlayerState;
use crate::timing::SleepStrategy;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use evobot_protocol::JointFrame;
use parking_lot::MutexGuard;
use spin_sleep::SpinSleeper;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// 一次等待的结果
enum Wakeup {
    Command(SchedulerCommand),
    Deadline,
    Disconnected,
}

/// 调度线程主循环
pub(crate) fn scheduler_loop(core: Arc<PlayerCore>, commands: Receiver<SchedulerCommand>) {
    let sleeper = SpinSleeper::default();
    debug!(
        "Scheduler thread started (strategy={})",
        core.config.sleep_strategy
    );

    while !core.is_shutting_down() {
        let deadline = core.session.lock().next_tick_at;

        let wakeup = match deadline {
            Some(deadline) => wait_until(&core, &commands, deadline, &sleeper),
            None => match commands.recv() {
                Ok(command) => Wakeup::Command(command),
                Err(_) => Wakeup::Disconnected,
            },
        };

        match wakeup {
            Wakeup::Command(SchedulerCommand::Wake) => continue,
            Wakeup::Command(SchedulerCommand::Shutdown) | Wakeup::Disconnected => break,
            Wakeup::Deadline => core.tick(),
        }
    }

    debug!("Scheduler thread exited");
}

fn wait_until(
    core: &PlayerCore,
    commands: &Receiver<SchedulerCommand>,
    deadline: Instant,
    sleeper: &SpinSleeper,
) -> Wakeup {
    let wake_at = match core.config.sleep_strategy {
        SleepStrategy::Standard => deadline,
        SleepStrategy::Spin => deadline
            .checked_sub(core.config.spin_margin())
            .unwrap_or(deadline),
    };

    match commands.recv_deadline(wake_at) {
        Ok(command) => Wakeup::Command(command),
        Err(RecvTimeoutError::Disconnected) => Wakeup::Disconnected,
        Err(RecvTimeoutError::Timeout) => {
            if core.config.sleep_strategy == SleepStrategy::Spin {
                let now = Instant::now();
                if deadline > now {
                    sleeper.sleep(deadline - now);
                }
            }
            Wakeup::Deadline
        },
    }
}

/// 一帧投递所需的全部数据（在会话锁内准备好）
struct PendingFrame {
    listener: Arc<dyn SequenceListener>,
    generation: u64,
    index: u32,
    left: JointFrame,
    right: JointFrame,
}

impl PlayerCore {
    /// 执行一次 tick
    pub(crate) fn tick(&self) {
        let _delivery = self.delivery.lock();

        let Some(frame) = self.prepare_frame() else {
            return;
        };

        // 回调期间不持有会话锁
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            frame
                .listener
                .on_frame_data(&frame.left, &frame.right, frame.index)
        }));

        let mut session = self.session.lock();
        if session.generation != frame.generation {
            // 回调内部调用了 stop/emergency_stop/seek/play
            debug!("Frame {} superseded during delivery", frame.index);
            return;
        }

        match outcome {
            Ok(Ok(())) => self.finish_delivery(&mut session, frame.index),
            Ok(Err(err)) => self.fail_delivery(
                session,
                &frame.listener,
                format!("Frame callback failed at frame {}: {}", frame.index, err),
            ),
            Err(payload) => self.fail_delivery(
                session,
                &frame.listener,
                format!(
                    "Frame callback panicked at frame {}: {}",
                    frame.index,
                    panic_message(&*payload)
                ),
            ),
        }
    }

    /// 检查 tick 是否到期并准备下一帧；播放完成时在这里处理
    fn prepare_frame(&self) -> Option<PendingFrame> {
        let mut session = self.session.lock();

        let due = matches!(session.next_tick_at, Some(at) if at <= Instant::now());
        if !due {
            return None;
        }
        session.next_tick_at = None;

        if session.state != PlayerState::Playing {
            PlaybackMetrics::bump(&self.metrics.ticks_skipped);
            trace!("Tick skipped in state {}", session.state);
            return None;
        }

        let sequence = self.sequence.load_full()?;
        let listener = session.listener.clone()?;

        if session.current_frame >= sequence.total_frames {
            let change = self.transition(&mut session, PlayerState::Stopped);
            drop(session);

            PlaybackMetrics::bump(&self.metrics.completions);
            info!(
                "Playback complete: {} ({} frames)",
                sequence.name, sequence.total_frames
            );
            notify_state_changes(Some(&listener), &[change]);
            invoke("on_complete", || listener.on_complete());
            return None;
        }

        let index = session.current_frame;
        let (raw_left, raw_right) = sequence.frame(index as usize)?;
        let (left, right) = session.reconstructor.reconstruct(raw_left, raw_right);
        trace!("Frame {}: left={:?}, right={:?}", index, left, right);

        Some(PendingFrame {
            listener,
            generation: session.generation,
            index,
            left,
            right,
        })
    }

    /// 回调成功：推进帧号，安排下一次 tick
    fn finish_delivery(&self, session: &mut Session, index: u32) {
        PlaybackMetrics::bump(&self.metrics.frames_delivered);
        session.current_frame = index + 1;

        let now = Instant::now();
        let delay = session.compensator.mark_delivery(now);
        if let Some(interval) = session.compensator.last_interval() {
            session.interval_stats.record(interval);
        }
        if session.compensator.last_drift_exceeded() {
            PlaybackMetrics::bump(&self.metrics.drift_exceeded);
        }

        // 回调内暂停时只记录进度，不再调度
        if session.state == PlayerState::Playing {
            session.next_tick_at = Some(now + delay);
        }
    }

    /// 回调失败：进入 ERROR，停止调度，通知 `on_error`
    fn fail_delivery(
        &self,
        mut session: MutexGuard<'_, Session>,
        listener: &Arc<dyn SequenceListener>,
        message: String,
    ) {
        PlaybackMetrics::bump(&self.metrics.callback_errors);
        error!("{}", message);

        session.next_tick_at = None;
        let change = self.transition(&mut session, PlayerState::Error);
        drop(session);

        notify_state_changes(Some(listener), &[change]);
        invoke("on_error", || listener.on_error(&message));
    }
}
