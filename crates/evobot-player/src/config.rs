//! 播放器配置
//!
//! 以 TOML 文件保存，例如：
//!
//! ```toml
//! default_frequency_hz = 40
//! sleep_strategy = "spin"
//! spin_margin_us = 1000
//! drift_log_threshold_ms = 5
//! loader_thread_name = "evobot-loader"
//! scheduler_thread_name = "evobot-scheduler"
//! ```
//!
//! 缺省字段取默认值。

use crate::timing::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, SleepStrategy, is_valid_frequency};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// 播放器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// `play_default()` 使用的频率（Hz，1..=100）
    pub default_frequency_hz: u32,

    /// 调度线程等待方式
    pub sleep_strategy: SleepStrategy,

    /// `Spin` 模式下提前醒来的余量（微秒）
    pub spin_margin_us: u64,

    /// 漂移超过该值（毫秒）时记录日志并计入 `drift_exceeded`
    pub drift_log_threshold_ms: u64,

    /// 加载线程名
    pub loader_thread_name: String,

    /// 调度线程名
    pub scheduler_thread_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_frequency_hz: 40,
            sleep_strategy: SleepStrategy::Standard,
            spin_margin_us: 1000,
            drift_log_threshold_ms: 5,
            loader_thread_name: "evobot-loader".to_string(),
            scheduler_thread_name: "evobot-scheduler".to_string(),
        }
    }
}

impl PlayerConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(io_err)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_frequency(self.default_frequency_hz) {
            return Err(ConfigError::Invalid(format!(
                "default_frequency_hz {} out of range {}..={}",
                self.default_frequency_hz, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ
            )));
        }
        // 余量超过最短帧间隔（10ms）就等于一直自旋
        if self.spin_margin_us > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "spin_margin_us {} exceeds 10000",
                self.spin_margin_us
            )));
        }
        if self.loader_thread_name.trim().is_empty() || self.scheduler_thread_name.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "thread names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn spin_margin(&self) -> Duration {
        Duration::from_micros(self.spin_margin_us)
    }
}
