//! `.ebs` 二进制编码
//!
//! 解码的逆过程：保持哨兵写为 `0xFFFF`，名称按字符边界截断到 64 字节。

use crate::constants::*;
use crate::error::FormatError;
use crate::sequence::{JointFrame, SequenceData};
use bytes::BufMut;

/// 编码序列
///
/// 写入前先做结构校验，非法序列不会被编码。
pub fn encode(sequence: &SequenceData) -> Result<Vec<u8>, FormatError> {
    sequence.validate()?;

    let mut out = Vec::with_capacity(HEADER_SIZE + sequence.len() * FRAME_SIZE);

    out.put_slice(MAGIC);
    out.put_u32_le(sequence.total_frames);
    out.put_f32_le(sequence.sample_rate);
    out.put_f32_le(sequence.total_duration);
    out.put_u32_le(sequence.compiled_at);
    out.put_bytes(0, RESERVED_SIZE);

    let name = truncate_utf8(&sequence.name, NAME_SIZE);
    out.put_slice(name.as_bytes());
    out.put_bytes(0, NAME_SIZE - name.len());

    for (left, right) in sequence.left_arm.iter().zip(&sequence.right_arm) {
        put_arm(&mut out, left);
        put_arm(&mut out, right);
    }

    Ok(out)
}

fn put_arm(out: &mut Vec<u8>, joints: &JointFrame) {
    for &value in joints {
        out.put_u16_le(encode_joint(value));
    }
}

/// 单个内存值转线上值（调用前已校验范围）
#[inline]
pub fn encode_joint(value: i32) -> u16 {
    if value == HOLD {
        HOLD_SENTINEL_RAW
    } else {
        value as u16
    }
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::sequence::SequenceBuilder;

    #[test]
    fn test_encode_layout() {
        let seq = SequenceBuilder::new("abc")
            .sample_rate(50.0)
            .compiled_at(42)
            .push_frame([HOLD; 10], [7; 10])
            .build()
            .unwrap();

        let bytes = encode(&seq).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + FRAME_SIZE);
        assert_eq!(&bytes[0..4], b"EBS1");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 50.0);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 42);
        assert!(bytes[20..32].iter().all(|&b| b == 0));
        assert_eq!(&bytes[32..35], b"abc");
        assert!(bytes[35..96].iter().all(|&b| b == 0));
        assert_eq!(&bytes[96..98], &[0xFF, 0xFF]);
        assert_eq!(&bytes[116..118], &[7, 0]);
    }

    #[test]
    fn test_encode_rejects_invalid() {
        let mut seq = SequenceBuilder::new("x")
            .push_frame([0; 10], [0; 10])
            .build()
            .unwrap();
        seq.left_arm[0][0] = 9999;
        assert!(encode(&seq).is_err());
    }

    #[test]
    fn test_long_name_truncated_on_char_boundary() {
        // 每个汉字 3 字节，22 个汉字 = 66 字节
        let name = "挥".repeat(22);
        let seq = SequenceBuilder::new(name)
            .push_frame([0; 10], [0; 10])
            .build()
            .unwrap();

        let decoded = decode(&encode(&seq).unwrap()).unwrap();
        assert_eq!(decoded.name, "挥".repeat(21));
    }
}
