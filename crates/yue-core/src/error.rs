//! 统一错误类型定义.
//!
//! 所有 Yue crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Yue 框架统一错误类型
#[derive(Debug, Error)]
pub enum YueError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的元数据或容器特性
    #[error("不支持: {0}")]
    Unsupported(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// 在当前层级未找到指定的 atom
    #[error("未找到 {0} atom")]
    AtomNotFound(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

/// Yue 框架统一 Result 类型
pub type YueResult<T> = Result<T, YueError>;
