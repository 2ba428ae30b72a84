//! 命令定义和实现

pub mod config;
pub mod inspect;
pub mod play;

pub use config::ConfigCommand;
pub use inspect::InspectCommand;
pub use play::PlayCommand;
