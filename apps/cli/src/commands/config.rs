//! 配置管理命令
//!
//! 管理播放器配置文件（默认位于 `<config_dir>/evobot/player.toml`）

use anyhow::{Context, Result};
use clap::Subcommand;
use evobot_player::PlayerConfig;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("evobot");
    path.push("player.toml");
    Ok(path)
}

/// 加载播放器配置
///
/// 显式指定的文件必须存在；默认路径不存在时使用默认配置。
pub fn load_player_config(explicit: Option<&Path>) -> Result<PlayerConfig> {
    if let Some(path) = explicit {
        return PlayerConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()));
    }

    let path = default_config_path()?;
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(PlayerConfig::default());
    }
    PlayerConfig::load(&path).with_context(|| format!("加载配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置（TOML）
    Show {
        /// 配置文件路径（默认使用用户配置目录）
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 写入默认配置
    Init {
        /// 配置文件路径（默认使用用户配置目录）
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },

    /// 打印默认配置文件路径
    Path,
}

impl ConfigCommand {
    pub async fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { path } => Self::show_(path).await,

            ConfigCommand::Init { path, force } => Self::init_(path, force).await,

            ConfigCommand::Path => Self::path_().await,
        }
    }

    async fn show_(path: Option<PathBuf>) -> Result<()> {
        let config = load_player_config(path.as_deref())?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    async fn init_(path: Option<PathBuf>, force: bool) -> Result<()> {
        let path = match path {
            Some(path) => path,
            None => default_config_path()?,
        };

        if path.exists() && !force {
            anyhow::bail!(
                "❌ 配置文件已存在: {}（使用 --force 覆盖）",
                path.display()
            );
        }

        PlayerConfig::default()
            .save(&path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    async fn path_() -> Result<()> {
        println!("{}", default_config_path()?.display());
        Ok(())
    }
}
