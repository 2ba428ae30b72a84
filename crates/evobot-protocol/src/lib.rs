//! # EvoBot Protocol
//!
//! `.ebs` 动作序列二进制格式定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 格式常量定义
//! - `sequence`: 序列数据模型与构建器
//! - `decoder`: 二进制解码（严格校验）
//! - `encoder`: 二进制编码
//! - `error`: 格式错误
//!
//! ## 字节序
//!
//! 所有多字节字段均为小端（Little-Endian）。

pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod sequence;

// 重新导出常用类型
pub use constants::*;
pub use decoder::{decode, decode_header, decode_joint};
pub use encoder::{encode, encode_joint};
pub use error::{Arm, FormatError};
pub use sequence::{HOLD_FRAME, JointFrame, SequenceBuilder, SequenceData, SequenceHeader};
