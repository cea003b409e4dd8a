//! 内嵌图片类型.
//!
//! `ilst` 的 `covr` atom 承载封面图片, 负载格式由字节内容嗅探:
//! JPEG 以 `FF D8 FF` 开头, 其余按 PNG 处理.

use bytes::Bytes;

use crate::tag::TagStandard;

/// JPEG 文件头魔数
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// 图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureFormat {
    /// JPEG
    Jpeg,
    /// PNG
    Png,
}

impl PictureFormat {
    /// 从负载字节嗅探格式
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&JPEG_MAGIC) {
            Self::Jpeg
        } else {
            Self::Png
        }
    }
}

/// 图片语义类型
///
/// MP4 的 `covr` atom 本身不携带类型信息, 读取到的图片归为通用类型.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureKind {
    /// 通用 / 未指明
    #[default]
    Generic,
    /// 封面
    FrontCover,
}

/// 待写入标签的图片
#[derive(Debug, Clone)]
pub struct Picture {
    /// 原始图片字节
    pub data: Bytes,
    /// 图片格式
    pub format: PictureFormat,
    /// 语义类型
    pub kind: PictureKind,
}

/// 读取时交付给 picture sink 的图片事件
///
/// 负载所有权随事件转移给接收方; 接收方不得持有底层读取器.
#[derive(Debug, Clone)]
pub struct PictureData {
    /// 原始图片字节
    pub data: Bytes,
    /// 语义类型
    pub kind: PictureKind,
    /// 嗅探出的格式
    pub format: PictureFormat,
    /// 来源标签体系
    pub source: TagStandard,
    /// `data` atom 中的原始类别码 (13 = JPEG, 14 = PNG)
    pub data_class: u8,
    /// 在标签中的出现序号 (0 起)
    pub position: usize,
}
