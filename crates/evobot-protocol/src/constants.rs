//! `.ebs` 格式常量定义
//!
//! 集中定义所有格式相关的常量，避免在代码中散落"魔法数"。

/// 文件魔数（offset 0..4）
pub const MAGIC: &[u8; 4] = b"EBS1";

/// 文件头大小（字节）
pub const HEADER_SIZE: usize = 96;

/// 保留字段大小（offset 20..32）
pub const RESERVED_SIZE: usize = 12;

/// 名称字段大小（offset 32..96，UTF-8，不足部分以 NUL 填充）
pub const NAME_SIZE: usize = 64;

/// 每臂关节数
pub const JOINTS_PER_ARM: usize = 10;

/// 每帧关节数（左臂 10 + 右臂 10）
pub const JOINTS_PER_FRAME: usize = JOINTS_PER_ARM * 2;

/// 单帧字节数（20 × u16）
pub const FRAME_SIZE: usize = JOINTS_PER_FRAME * 2;

/// 线上的保持哨兵值
pub const HOLD_SENTINEL_RAW: u16 = 0xFFFF;

/// 内存中的保持哨兵值（"保持上一位置"）
pub const HOLD: i32 = -1;

/// 关节位置下限
pub const POSITION_MIN: i32 = 0;

/// 关节位置上限
pub const POSITION_MAX: i32 = 4095;

/// 最大帧数
pub const MAX_FRAME_COUNT: u32 = 100_000;

/// 最大采样率（Hz）
pub const MAX_SAMPLE_RATE: f32 = 1000.0;

/// 最大总时长（秒）
pub const MAX_DURATION_SECS: f32 = 3600.0;

/// 判断内存值是否为合法关节值（保持哨兵或 0..=4095）
#[inline]
pub fn is_valid_joint_value(value: i32) -> bool {
    value == HOLD || (POSITION_MIN..=POSITION_MAX).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        // 4 + 4 + 4 + 4 + 4 + 12 + 64 = 96
        assert_eq!(4 * 5 + RESERVED_SIZE + NAME_SIZE, HEADER_SIZE);
        assert_eq!(FRAME_SIZE, 40);
        assert_eq!(JOINTS_PER_FRAME, 20);
    }

    #[test]
    fn test_joint_value_range() {
        assert!(is_valid_joint_value(HOLD));
        assert!(is_valid_joint_value(0));
        assert!(is_valid_joint_value(4095));
        assert!(!is_valid_joint_value(4096));
        assert!(!is_valid_joint_value(-2));
    }
}
