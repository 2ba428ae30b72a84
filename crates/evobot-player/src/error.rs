//! 播放器错误类型定义

use crate::config::ConfigError;
use crate::source::SourceError;
use evobot_protocol::FormatError;
use thiserror::Error;

/// 播放器错误类型
///
/// 只有同步可判定的错误（参数、线程创建）会从 API 直接返回；
/// 加载、解码和回调失败是异步发生的，通过 `SequenceListener::on_error` 上报。
#[derive(Error, Debug)]
pub enum PlayerError {
    /// 参数非法（空名称、频率越界等）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `.ebs` 格式错误
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// 字节源错误（文件缺失、读取失败）
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_error_display() {
        let err = PlayerError::InvalidArgument("frequency 0 out of range 1..=100".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid argument: frequency 0 out of range 1..=100"
        );

        let err: PlayerError = FormatError::InvalidFrameCount(0).into();
        assert!(format!("{}", err).starts_with("Format error:"));

        let err: PlayerError = SourceError::NotFound("wave".to_string()).into();
        assert_eq!(format!("{}", err), "Source error: Sequence not found: wave");
    }
}
