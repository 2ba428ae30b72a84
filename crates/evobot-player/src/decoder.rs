//! 解码策略
//!
//! 字节源负责"取字节"，解码器负责"字节 → 序列"。两者合起来就是
//! 播放器的加载后端，可以分别替换（例如带缓存的解码器）。

use evobot_protocol::{FormatError, SequenceData};

/// 序列解码器 Trait
pub trait SequenceDecoder: Send + Sync {
    /// 解码完整序列
    fn decode(&self, bytes: &[u8]) -> Result<SequenceData, FormatError>;

    /// 解码器名称（日志用）
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// 默认 `.ebs` 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct EbsDecoder;

impl SequenceDecoder for EbsDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SequenceData, FormatError> {
        evobot_protocol::decode(bytes)
    }

    fn name(&self) -> &'static str {
        "ebs"
    }
}
