//! `.ebs` 二进制解码
//!
//! # 文件布局（小端）
//!
//! ```text
//! offset  size  field
//! 0       4     魔数 "EBS1"
//! 4       4     帧数 u32，1..=100000
//! 8       4     采样率 f32，(0, 1000]
//! 12      4     总时长（秒）f32，(0, 3600]
//! 16      4     编译时间 u32（不校验）
//! 20      12    保留
//! 32      64    名称 UTF-8（NUL 填充）
//! 96      N*40  帧数据：N 帧 × 20 × u16（前 10 个左臂，后 10 个右臂）
//! ```
//!
//! `0xFFFF` 解码为保持哨兵 -1，其余值必须在 0..=4095 内。

use crate::constants::*;
use crate::error::{Arm, FormatError};
use crate::sequence::{
    JointFrame, SequenceData, SequenceHeader, validate_duration, validate_frame_count,
    validate_sample_rate,
};
use bytes::Buf;
use tracing::debug;

/// 解析文件头
///
/// 只读取前 96 字节，不检查数据区长度。用于工具在数据区损坏时仍能显示元数据。
pub fn decode_header(data: &[u8]) -> Result<SequenceHeader, FormatError> {
    if data.len() < HEADER_SIZE {
        return Err(FormatError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut buf = &data[..HEADER_SIZE];

    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(FormatError::InvalidMagic(magic));
    }

    let frame_count = buf.get_u32_le();
    validate_frame_count(frame_count)?;

    let sample_rate = buf.get_f32_le();
    validate_sample_rate(sample_rate)?;

    let total_duration = buf.get_f32_le();
    validate_duration(total_duration)?;

    let compiled_at = buf.get_u32_le();

    buf.advance(RESERVED_SIZE);

    let name = decode_name(&buf[..NAME_SIZE]);

    debug!(
        "Header parsed: name={}, frames={}, rate={:.1}Hz, duration={:.3}s",
        name, frame_count, sample_rate, total_duration
    );

    Ok(SequenceHeader {
        frame_count,
        sample_rate,
        total_duration,
        compiled_at,
        name,
    })
}

/// 解码完整序列
///
/// 失败时返回 [`FormatError`]，不产生任何部分结果。数据区之后的多余字节被忽略。
///
/// # 示例
///
/// ```rust
/// use evobot_protocol::{SequenceBuilder, decode, encode};
///
/// let original = SequenceBuilder::new("nod")
///     .push_frame([2048; 10], [2048; 10])
///     .build()
///     .unwrap();
/// let bytes = encode(&original).unwrap();
///
/// let decoded = decode(&bytes).unwrap();
/// assert_eq!(decoded, original);
/// ```
pub fn decode(data: &[u8]) -> Result<SequenceData, FormatError> {
    let header = decode_header(data)?;

    let frame_count = header.frame_count as usize;
    let expected_data = frame_count * FRAME_SIZE;
    let remaining = data.len() - HEADER_SIZE;
    if remaining < expected_data {
        return Err(FormatError::Truncated {
            expected: expected_data,
            actual: remaining,
        });
    }

    let mut buf = &data[HEADER_SIZE..HEADER_SIZE + expected_data];
    let mut left_arm = Vec::with_capacity(frame_count);
    let mut right_arm = Vec::with_capacity(frame_count);

    for frame in 0..frame_count {
        left_arm.push(read_arm(&mut buf, frame, Arm::Left)?);
        right_arm.push(read_arm(&mut buf, frame, Arm::Right)?);
    }

    let sequence = SequenceData {
        name: header.name,
        sample_rate: header.sample_rate,
        total_duration: header.total_duration,
        total_frames: header.frame_count,
        compiled_at: header.compiled_at,
        left_arm,
        right_arm,
    };

    // 全量解析后再次检查结构不变量
    sequence.validate()?;

    debug!("Parsed {} frames successfully", frame_count);
    Ok(sequence)
}

fn read_arm(buf: &mut &[u8], frame: usize, arm: Arm) -> Result<JointFrame, FormatError> {
    let mut joints = [HOLD; JOINTS_PER_ARM];
    for (joint, slot) in joints.iter_mut().enumerate() {
        let raw = buf.get_u16_le();
        *slot = decode_joint(raw).ok_or_else(|| FormatError::JointOutOfRange {
            arm,
            frame,
            joint,
            value: raw as i32,
        })?;
    }
    Ok(joints)
}

/// 单个线上值转内存值；越界返回 `None`
#[inline]
pub fn decode_joint(raw: u16) -> Option<i32> {
    if raw == HOLD_SENTINEL_RAW {
        Some(HOLD)
    } else if raw as i32 <= POSITION_MAX {
        Some(raw as i32)
    } else {
        None
    }
}

fn decode_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
