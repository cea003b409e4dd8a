//! # Yue (乐)
//!
//! 纯 Rust 实现的 AAC/MP4 音频元数据引擎.
//!
//! Yue 读取 `.aac` / `.mp4` / `.m4a` 文件并产出:
//! - **技术描述符**: 编码档次、声道数、采样率、码率、时长、CBR/VBR
//! - **标签记录**: 标题、艺术家、专辑、音轨号、封面图片等
//!   (ISO-BMFF `moov/udta/meta/ilst` 约定)
//!
//! 同时支持改写 `ilst` 标签区, 并把大小变化级联写回所有外层 Box.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use yue::meta::{AacFile, IoContext, ReadOptions, SizeInfo};
//!
//! let mut io = IoContext::open_read("music.m4a").unwrap();
//! let id3v2_size = yue::meta::probe::id3v2_region_size(&mut io).unwrap();
//! let info = SizeInfo { file_size: io.size().unwrap_or(0), id3v2_size };
//!
//! let mut file = AacFile::new();
//! file.read(&mut io, &info, &mut ReadOptions::new()).unwrap();
//! println!("采样率: {} Hz", file.properties.sample_rate);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yue-core` | 核心类型: 错误、技术描述符、流派表 |
//! | `yue-meta` | 元数据引擎: I/O、流分析、Box 遍历、标签读写 |

/// 核心类型与错误
pub use yue_core as core;

/// 元数据引擎
pub use yue_meta as meta;

/// 获取 Yue 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
