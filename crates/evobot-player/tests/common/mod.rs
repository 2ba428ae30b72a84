//! 集成测试公共工具

#![allow(dead_code)]

use evobot_player::{ListenerError, MemorySource, PlayerState, SequenceListener, SequencePlayer};
use evobot_protocol::{HOLD_FRAME, JointFrame, SequenceBuilder, SequenceData, encode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 记录到的回调
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Frame {
        index: u32,
        left: JointFrame,
        right: JointFrame,
        at: Instant,
    },
    Complete,
    Error(String),
    EmergencyStop,
    State(PlayerState, PlayerState),
}

type FrameHook = Box<dyn Fn(u32) + Send + Sync>;

/// 记录所有回调的监听器
///
/// 可配置在指定帧返回错误或 panic，或在每帧之后执行钩子（用于在回调内部操作播放器）。
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
    fail_at: Option<u32>,
    panic_at: Option<u32>,
    hook: Option<FrameHook>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_at: None,
            panic_at: None,
            hook: None,
        }
    }

    pub fn fail_at(mut self, frame: u32) -> Self {
        self.fail_at = Some(frame);
        self
    }

    pub fn panic_at(mut self, frame: u32) -> Self {
        self.panic_at = Some(frame);
        self
    }

    pub fn with_hook(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn frame_indices(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Frame { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<(u32, JointFrame, JointFrame)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Frame {
                    index, left, right, ..
                } => Some((*index, *left, *right)),
                _ => None,
            })
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_indices().len()
    }

    pub fn completions(&self) -> usize {
        self.count(|event| matches!(event, Event::Complete))
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn emergency_stops(&self) -> usize {
        self.count(|event| matches!(event, Event::EmergencyStop))
    }

    pub fn state_changes(&self) -> Vec<(PlayerState, PlayerState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::State(old, new) => Some((*old, *new)),
                _ => None,
            })
            .collect()
    }

    /// 等待至少 `count` 帧
    pub fn wait_for_frames(&self, count: usize, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.frame_count() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.frame_count() >= count
    }

    fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl SequenceListener for RecordingListener {
    fn on_frame_data(
        &self,
        left: &JointFrame,
        right: &JointFrame,
        frame_index: u32,
    ) -> Result<(), ListenerError> {
        self.push(Event::Frame {
            index: frame_index,
            left: *left,
            right: *right,
            at: Instant::now(),
        });

        if self.panic_at == Some(frame_index) {
            panic!("servo driver crashed at frame {}", frame_index);
        }
        if self.fail_at == Some(frame_index) {
            return Err(ListenerError::new(format!(
                "servo bus rejected frame {}",
                frame_index
            )));
        }
        // 钩子在释放事件锁之后执行，可以重入播放器
        if let Some(hook) = &self.hook {
            hook(frame_index);
        }
        Ok(())
    }

    fn on_complete(&self) {
        self.push(Event::Complete);
    }

    fn on_error(&self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }

    fn on_emergency_stop(&self) {
        self.push(Event::EmergencyStop);
    }

    fn on_state_changed(&self, old: PlayerState, new: PlayerState) {
        self.push(Event::State(old, new));
    }
}

/// 每帧每个关节都有确定值的序列：`left[j] = (i * 7 + j) % 4096`
pub fn ramp_sequence(frames: u32) -> SequenceData {
    let mut builder = SequenceBuilder::new("ramp");
    for i in 0..frames as i32 {
        let mut left = HOLD_FRAME;
        let mut right = HOLD_FRAME;
        for j in 0..10 {
            left[j] = (i * 7 + j as i32) % 4096;
            right[j] = (i * 11 + j as i32) % 4096;
        }
        builder = builder.push_frame(left, right);
    }
    builder.build().unwrap()
}

/// 内存字节源中放入一个已编码的序列
pub fn source_with(name: &str, sequence: &SequenceData) -> Arc<MemorySource> {
    Arc::new(MemorySource::new().with(name, encode(sequence).unwrap()))
}

/// 基于 `source_with` 的播放器
pub fn player_with(name: &str, sequence: &SequenceData) -> SequencePlayer {
    SequencePlayer::new(source_with(name, sequence)).unwrap()
}

/// 空字节源播放器（配合 `play_sequence` 使用）
pub fn empty_player() -> SequencePlayer {
    SequencePlayer::new(Arc::new(MemorySource::new())).unwrap()
}

/// 帧号是否为从 `start` 开始的连续递增序列
pub fn is_contiguous(indices: &[u32], start: u32) -> bool {
    indices
        .iter()
        .enumerate()
        .all(|(offset, &index)| index == start + offset as u32)
}
