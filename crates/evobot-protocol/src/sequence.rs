//! 序列数据模型
//!
//! 存储从 `.ebs` 二进制文件解析出来的完整动作序列。解码完成后不可变，
//! 由一个播放会话独占，加载新序列时整体替换。

use crate::constants::*;
use crate::error::{Arm, FormatError};

/// 单臂一帧的关节值（10 个关节）
///
/// 每个值为 0..=4095 的位置，或 [`HOLD`]（-1）表示保持上一位置。
pub type JointFrame = [i32; JOINTS_PER_ARM];

/// 全部为保持哨兵的一帧
pub const HOLD_FRAME: JointFrame = [HOLD; JOINTS_PER_ARM];

/// 文件头字段
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceHeader {
    /// 帧数（1..=100000）
    pub frame_count: u32,
    /// 采样率（Hz）
    pub sample_rate: f32,
    /// 总时长（秒）
    pub total_duration: f32,
    /// 编译时间（Unix 时间戳，不校验）
    pub compiled_at: u32,
    /// 序列名称
    pub name: String,
}

impl SequenceHeader {
    /// 完整文件应有的字节数（文件头 + 数据区）
    pub fn expected_len(&self) -> usize {
        HEADER_SIZE + self.frame_count as usize * FRAME_SIZE
    }
}

/// 动作序列
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceData {
    /// 序列名称（仅用于显示/调试）
    pub name: String,
    /// 编写时的目标采样率（Hz）
    pub sample_rate: f32,
    /// 总时长（秒）
    pub total_duration: f32,
    /// 总帧数
    pub total_frames: u32,
    /// 编译时间（Unix 时间戳）
    pub compiled_at: u32,
    /// 左臂序列 `[帧号][关节号]`
    pub left_arm: Vec<JointFrame>,
    /// 右臂序列 `[帧号][关节号]`
    pub right_arm: Vec<JointFrame>,
}

impl SequenceData {
    /// 获取指定帧的左右臂原始数据（可能含保持哨兵）
    pub fn frame(&self, index: usize) -> Option<(&JointFrame, &JointFrame)> {
        Some((self.left_arm.get(index)?, self.right_arm.get(index)?))
    }

    /// 帧数（`usize`）
    pub fn len(&self) -> usize {
        self.total_frames as usize
    }

    /// 是否为空序列（合法序列永远不为空）
    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    /// 文件头部分
    pub fn header(&self) -> SequenceHeader {
        SequenceHeader {
            frame_count: self.total_frames,
            sample_rate: self.sample_rate,
            total_duration: self.total_duration,
            compiled_at: self.compiled_at,
            name: self.name.clone(),
        }
    }

    /// 结构性校验
    ///
    /// 检查头部字段范围、两臂序列长度与 `total_frames` 一致，
    /// 以及每个关节值为 -1 或在 0..=4095 内。
    pub fn validate(&self) -> Result<(), FormatError> {
        validate_frame_count(self.total_frames)?;
        validate_sample_rate(self.sample_rate)?;
        validate_duration(self.total_duration)?;

        let expected = self.total_frames as usize;
        if self.left_arm.len() != expected {
            return Err(FormatError::Inconsistent(format!(
                "left arm sequence length mismatch: expected {}, got {}",
                expected,
                self.left_arm.len()
            )));
        }
        if self.right_arm.len() != expected {
            return Err(FormatError::Inconsistent(format!(
                "right arm sequence length mismatch: expected {}, got {}",
                expected,
                self.right_arm.len()
            )));
        }

        validate_joint_values(&self.left_arm, Arm::Left)?;
        validate_joint_values(&self.right_arm, Arm::Right)?;
        Ok(())
    }

    /// 统计保持哨兵的数量（左臂, 右臂）
    pub fn hold_counts(&self) -> (usize, usize) {
        let count = |frames: &[JointFrame]| {
            frames
                .iter()
                .flat_map(|frame| frame.iter())
                .filter(|&&v| v == HOLD)
                .count()
        };
        (count(&self.left_arm), count(&self.right_arm))
    }

    /// 序列信息摘要
    pub fn info(&self) -> String {
        format!(
            "Sequence[name={}, frames={}, rate={:.1}Hz, duration={:.3}s]",
            self.name, self.total_frames, self.sample_rate, self.total_duration
        )
    }
}

impl std::fmt::Display for SequenceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.info())
    }
}

pub(crate) fn validate_frame_count(frame_count: u32) -> Result<(), FormatError> {
    if frame_count == 0 || frame_count > MAX_FRAME_COUNT {
        return Err(FormatError::InvalidFrameCount(frame_count));
    }
    Ok(())
}

pub(crate) fn validate_sample_rate(sample_rate: f32) -> Result<(), FormatError> {
    // NaN 不满足任何比较，需要显式排除
    if sample_rate.is_nan() || sample_rate <= 0.0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(FormatError::InvalidSampleRate(sample_rate));
    }
    Ok(())
}

pub(crate) fn validate_duration(duration: f32) -> Result<(), FormatError> {
    if duration.is_nan() || duration <= 0.0 || duration > MAX_DURATION_SECS {
        return Err(FormatError::InvalidDuration(duration));
    }
    Ok(())
}

fn validate_joint_values(frames: &[JointFrame], arm: Arm) -> Result<(), FormatError> {
    for (frame_idx, frame) in frames.iter().enumerate() {
        for (joint_idx, &value) in frame.iter().enumerate() {
            if !is_valid_joint_value(value) {
                return Err(FormatError::JointOutOfRange {
                    arm,
                    frame: frame_idx,
                    joint: joint_idx,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// 序列构建器
///
/// 用于在内存中构造序列（测试夹具、工具链）。
///
/// # 示例
///
/// ```rust
/// use evobot_protocol::{HOLD, SequenceBuilder};
///
/// let sequence = SequenceBuilder::new("wave")
///     .sample_rate(40.0)
///     .push_frame([1000; 10], [HOLD; 10])
///     .push_frame([HOLD; 10], [2000; 10])
///     .build()
///     .unwrap();
///
/// assert_eq!(sequence.total_frames, 2);
/// assert_eq!(sequence.total_duration, 0.05);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    name: String,
    sample_rate: f32,
    total_duration: Option<f32>,
    compiled_at: u32,
    left_arm: Vec<JointFrame>,
    right_arm: Vec<JointFrame>,
}

impl SequenceBuilder {
    /// 创建构建器（默认 40Hz）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample_rate: 40.0,
            total_duration: None,
            compiled_at: 0,
            left_arm: Vec::new(),
            right_arm: Vec::new(),
        }
    }

    /// 设置采样率
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// 设置总时长（默认 `帧数 / 采样率`）
    pub fn total_duration(mut self, seconds: f32) -> Self {
        self.total_duration = Some(seconds);
        self
    }

    /// 设置编译时间戳
    pub fn compiled_at(mut self, timestamp: u32) -> Self {
        self.compiled_at = timestamp;
        self
    }

    /// 追加一帧
    pub fn push_frame(mut self, left: JointFrame, right: JointFrame) -> Self {
        self.left_arm.push(left);
        self.right_arm.push(right);
        self
    }

    /// 批量追加帧
    pub fn frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = (JointFrame, JointFrame)>,
    {
        for (left, right) in frames {
            self.left_arm.push(left);
            self.right_arm.push(right);
        }
        self
    }

    /// 构建并校验
    pub fn build(self) -> Result<SequenceData, FormatError> {
        let total_frames = u32::try_from(self.left_arm.len())
            .map_err(|_| FormatError::Inconsistent("too many frames".to_string()))?;
        let total_duration = self
            .total_duration
            .unwrap_or(total_frames as f32 / self.sample_rate);

        let sequence = SequenceData {
            name: self.name,
            sample_rate: self.sample_rate,
            total_duration,
            total_frames,
            compiled_at: self.compiled_at,
            left_arm: self.left_arm,
            right_arm: self.right_arm,
        };
        sequence.validate()?;
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SequenceData {
        SequenceBuilder::new("sample")
            .push_frame([0; 10], HOLD_FRAME)
            .push_frame([4095; 10], [1; 10])
            .build()
            .unwrap()
    }

    #[test]
    fn test_frame_access() {
        let seq = sample();
        let (left, right) = seq.frame(1).unwrap();
        assert_eq!(left, &[4095; 10]);
        assert_eq!(right, &[1; 10]);
        assert!(seq.frame(2).is_none());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut seq = sample();
        seq.right_arm.pop();
        assert!(matches!(seq.validate(), Err(FormatError::Inconsistent(_))));
    }

    #[test]
    fn test_validate_joint_range() {
        let mut seq = sample();
        seq.left_arm[0][3] = 4096;
        match seq.validate() {
            Err(FormatError::JointOutOfRange {
                arm, frame, joint, ..
            }) => {
                assert_eq!(arm, Arm::Left);
                assert_eq!(frame, 0);
                assert_eq!(joint, 3);
            },
            other => panic!("Expected JointOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_nan_rate() {
        let mut seq = sample();
        seq.sample_rate = f32::NAN;
        assert!(matches!(
            seq.validate(),
            Err(FormatError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_builder_rejects_empty() {
        let result = SequenceBuilder::new("empty").build();
        assert_eq!(result, Err(FormatError::InvalidFrameCount(0)));
    }

    #[test]
    fn test_hold_counts() {
        let seq = sample();
        assert_eq!(seq.hold_counts(), (0, 10));
    }

    #[test]
    fn test_info() {
        let seq = sample();
        assert_eq!(
            seq.info(),
            "Sequence[name=sample, frames=2, rate=40.0Hz, duration=0.050s]"
        );
        assert_eq!(seq.to_string(), seq.info());
    }
}
