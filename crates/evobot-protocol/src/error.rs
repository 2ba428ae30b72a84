//! 格式错误类型定义

use thiserror::Error;

/// 机械臂标识（用于错误定位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arm {
    Left,
    Right,
}

impl std::fmt::Display for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arm::Left => write!(f, "left arm"),
            Arm::Right => write!(f, "right arm"),
        }
    }
}

/// `.ebs` 解码/编码错误
///
/// 解码失败时不会产生任何部分结果。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// 缓冲区不足以容纳文件头
    #[error("Buffer too short for header: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// 魔数不匹配
    #[error("Invalid magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// 帧数超出 1..=100000
    #[error("Invalid frame count: {0}")]
    InvalidFrameCount(u32),

    /// 采样率超出 (0, 1000]
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// 总时长超出 (0, 3600]
    #[error("Invalid duration: {0}")]
    InvalidDuration(f32),

    /// 数据区不完整
    #[error("Incomplete frame data: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// 关节值既不是保持哨兵也不在 0..=4095 内
    #[error("{arm} frame {frame} joint {joint} has invalid value: {value} (must be -1 or 0-4095)")]
    JointOutOfRange {
        arm: Arm,
        frame: usize,
        joint: usize,
        value: i32,
    },

    /// 结构性不一致（帧数与数组长度不符等）
    #[error("Inconsistent sequence: {0}")]
    Inconsistent(String),
}
