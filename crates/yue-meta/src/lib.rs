//! # yue-meta
//!
//! Yue AAC/MP4 音频元数据引擎.
//!
//! 负责 AAC 裸流 (ADIF/ADTS) 的头部分析, 以及 MP4/ISO-BMFF 容器的
//! Box 树遍历、`ilst` 标签读取与改写.
//!
//! 使用流程:
//! 1. 打开 [`io::IoContext`] (文件或内存)
//! 2. 用 [`probe`] 计算 ID3v2 前缀大小, 填充 [`SizeInfo`]
//! 3. 构造 [`AacFile`] 并调用 `read()` 得到技术描述符与标签记录
//! 4. 如需改写标签: 以写入模式重新读取, 调用 `write_tag()` 生成新的
//!    `ilst` 负载, 拼接后用 `rewrite_file_size_in_header()` 级联修正
//!    各外层 atom 的大小字段

pub mod aac;
pub mod io;
pub mod mp4;
pub mod options;
pub mod picture;
pub mod probe;
pub mod tag;

// 重导出常用类型
pub use aac::AacFile;
pub use io::IoContext;
pub use options::{ReadOptions, SizeInfo};
pub use picture::{Picture, PictureData, PictureFormat, PictureKind};
pub use tag::{AdditionalField, TagField, TagRecord, TagStandard};
