//! 序列字节源
//!
//! 播放器只依赖"按动作名取回原始字节"这一接口。缓存、网络下载、
//! 重试退避都属于字节源自己的事情，播放器内部不做任何重试。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 动作文件扩展名
pub const SEQUENCE_EXTENSION: &str = "ebs";

/// 字节源错误
#[derive(Error, Debug)]
pub enum SourceError {
    /// 找不到对应的动作
    #[error("Sequence not found: {0}")]
    NotFound(String),

    /// 动作名不能映射为合法路径（含路径分隔符、`..` 等）
    #[error("Invalid sequence name: {0:?}")]
    InvalidName(String),

    /// 读取失败
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 字节源 Trait
///
/// 实现必须线程安全：`fetch` 在加载线程上调用。
pub trait ByteSource: Send + Sync {
    /// 按动作名取回 `.ebs` 原始字节
    fn fetch(&self, action_name: &str) -> Result<Vec<u8>, SourceError>;
}

/// 内存字节源
///
/// 主要用于测试和嵌入式资源。
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加（或替换）一个动作
    pub fn insert(&self, action_name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.write().insert(action_name.into(), bytes);
    }

    /// 链式添加
    pub fn with(self, action_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(action_name, bytes);
        self
    }

    /// 删除一个动作
    pub fn remove(&self, action_name: &str) -> Option<Vec<u8>> {
        self.entries.write().remove(action_name)
    }

    /// 已注册的动作名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, action_name: &str) -> Result<Vec<u8>, SourceError> {
        self.entries
            .read()
            .get(action_name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(action_name.to_string()))
    }
}

/// 本地目录字节源：`<root>/<name>.ebs`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 动作名对应的文件路径
    ///
    /// 动作名只能是单个文件名（不含路径分隔符，不能是 `.`/`..`）。
    pub fn path_for(&self, action_name: &str) -> Result<PathBuf, SourceError> {
        let is_plain = !action_name.is_empty()
            && action_name != "."
            && action_name != ".."
            && !action_name.contains(['/', '\\', '\0']);
        if !is_plain {
            return Err(SourceError::InvalidName(action_name.to_string()));
        }
        Ok(self
            .root
            .join(format!("{}.{}", action_name, SEQUENCE_EXTENSION)))
    }

    /// 列出目录中所有动作名（排序后）
    pub fn list(&self) -> Result<Vec<String>, SourceError> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| SourceError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == SEQUENCE_EXTENSION))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

impl ByteSource for DirectorySource {
    fn fetch(&self, action_name: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.path_for(action_name)?;
        debug!("Reading sequence file: {}", path.display());

        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(action_name.to_string())
            } else {
                SourceError::Io { path, source }
            }
        })
    }
}
