//! play 命令
//!
//! 从目录加载动作序列并实时播放，帧数据打印到标准输出。
//! Ctrl-C 触发急停。

use super::config::load_player_config;
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::Receiver;
use evobot_player::{ChannelListener, DirectorySource, PlaybackEvent, SequencePlayer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::debug;

/// 播放命令参数
#[derive(Args, Debug)]
pub struct PlayCommand {
    /// 动作名（对应 `<dir>/<name>.ebs`）
    pub name: String,

    /// 动作文件目录
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// 播放频率（Hz，1..=100，默认取配置）
    #[arg(short, long)]
    pub frequency: Option<u32>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 不打印每帧数据
    #[arg(short, long)]
    pub quiet: bool,
}

/// 一次播放的结局
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Completed { frames: u64 },
    EmergencyStopped { frames: u64 },
    Failed(String),
}

impl PlayCommand {
    /// 执行播放
    pub async fn execute(&self) -> Result<()> {
        let config = load_player_config(self.config.as_deref())?;
        let frequency = self.frequency.unwrap_or(config.default_frequency_hz);

        let source = Arc::new(DirectorySource::new(&self.dir));
        let player = Arc::new(
            SequencePlayer::with_config(source, config).context("创建播放器失败")?,
        );

        let (listener, events) = ChannelListener::new();
        let dropped = listener.dropped_events().clone();

        println!("🔄 播放: {} @ {}Hz ({})", self.name, frequency, self.dir.display());
        println!("💡 提示: 按 Ctrl-C 触发急停");
        player
            .play(&self.name, frequency, Arc::new(listener))
            .context("启动播放失败")?;

        // 🚨 Ctrl-C → 急停
        let estop_player = player.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!();
                println!("🛑 收到停止信号，触发急停...");
                estop_player.emergency_stop();
            }
        });

        let quiet = self.quiet;
        let outcome = spawn_blocking(move || drain_events(&events, quiet))
            .await
            .map_err(|e| anyhow::anyhow!("任务执行失败: {}", e))?;
        signal_task.abort();

        println!();
        if let Some(info) = player.sequence_info() {
            println!("   {}", info);
        }
        let state = player.state();
        println!("   状态: {} ({})", state, state.description());
        println!("   间隔统计: {}", player.interval_stats());
        println!("   指标: {}", player.metrics());
        let dropped = dropped.load(std::sync::atomic::Ordering::Relaxed);
        if dropped > 0 {
            println!("⚠️  丢弃事件: {}", dropped);
        }

        match outcome {
            Outcome::Completed { frames } => {
                println!("✅ 播放完成（{} 帧）", frames);
                Ok(())
            },
            Outcome::EmergencyStopped { frames } => {
                println!("🛑 已急停（已投递 {} 帧）", frames);
                Ok(())
            },
            Outcome::Failed(message) => anyhow::bail!("❌ 播放失败: {}", message),
        }
    }
}

/// 消费事件直到播放结束（在阻塞线程上运行）
fn drain_events(events: &Receiver<PlaybackEvent>, quiet: bool) -> Outcome {
    let mut frames = 0u64;

    while let Ok(event) = events.recv() {
        match event {
            PlaybackEvent::Frame { index, left, right } => {
                frames += 1;
                if !quiet {
                    println!("[{:>5}] L={:?} R={:?}", index, left, right);
                }
            },
            PlaybackEvent::Complete => return Outcome::Completed { frames },
            PlaybackEvent::EmergencyStop => return Outcome::EmergencyStopped { frames },
            PlaybackEvent::Error(message) => return Outcome::Failed(message),
            PlaybackEvent::StateChanged { old, new } => {
                debug!("State: {} -> {}", old, new);
            },
        }
    }

    Outcome::Failed("event channel closed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evobot_player::SequenceListener;

    #[test]
    fn test_drain_until_complete() {
        let (listener, events) = ChannelListener::new();
        listener.on_frame_data(&[1; 10], &[2; 10], 0).unwrap();
        listener.on_frame_data(&[1; 10], &[2; 10], 1).unwrap();
        listener.on_complete();

        assert_eq!(
            drain_events(&events, true),
            Outcome::Completed { frames: 2 }
        );
    }

    #[test]
    fn test_drain_emergency_stop() {
        let (listener, events) = ChannelListener::new();
        listener.on_frame_data(&[1; 10], &[2; 10], 0).unwrap();
        listener.on_emergency_stop();

        assert_eq!(
            drain_events(&events, true),
            Outcome::EmergencyStopped { frames: 1 }
        );
    }

    #[test]
    fn test_drain_error() {
        let (listener, events) = ChannelListener::new();
        listener.on_error("Sequence not found: wave");

        assert_eq!(
            drain_events(&events, true),
            Outcome::Failed("Sequence not found: wave".to_string())
        );
    }

    #[test]
    fn test_drain_closed_channel() {
        let (listener, events) = ChannelListener::new();
        drop(listener);

        assert!(matches!(drain_events(&events, true), Outcome::Failed(_)));
    }
}
