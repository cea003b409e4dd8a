//! # yue-core
//!
//! Yue 音频元数据框架核心库, 提供基础类型定义和错误处理.
//!
//! 本 crate 为整个 Yue 框架提供底层基础设施: 统一错误类型、
//! 音频流技术描述符以及 ID3v1 流派表等共享数据.

pub mod error;
pub mod genre;
pub mod properties;

// 重导出常用类型
pub use error::{YueError, YueResult};
pub use properties::{AacProfile, BitRateMode, HeaderKind, MpegVersion, StreamProperties};
