//! 标签记录与字段映射.
//!
//! iTunes 风格的 `ilst` 元数据把每个标签存为一个原生 atom
//! (如 `©nam`, `trkn`); 本模块定义语义字段集合、原生 atom 名到
//! 语义字段的映射表, 以及承载读取结果/写入输入的 [`TagRecord`].

use std::collections::HashMap;

use crate::picture::Picture;

/// 标签体系标识
///
/// 本引擎原生处理 MP4 `ilst`; ID3v1/ID3v2/APE 由同族的兄弟引擎负责,
/// 但对 AAC 文件它们同样是受支持的标签体系.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStandard {
    /// MP4 ilst (本引擎原生)
    Native,
    /// ID3v1
    Id3v1,
    /// ID3v2
    Id3v2,
    /// APEtag
    Ape,
}

/// 语义标签字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    /// 标题
    Title,
    /// 专辑
    Album,
    /// 艺术家
    Artist,
    /// 注释
    Comment,
    /// 录制年份
    RecordingYear,
    /// 流派
    Genre,
    /// 音轨号
    TrackNumber,
    /// 碟号
    DiscNumber,
    /// 评分
    Rating,
    /// 作曲
    Composer,
    /// 描述
    GeneralDescription,
    /// 版权
    Copyright,
    /// 专辑艺术家
    AlbumArtist,
}

/// 原生 atom 名 → 语义字段 (读取方向, 含别名)
const FIELD_MAPPING: &[(&str, TagField)] = &[
    ("©nam", TagField::Title),
    ("titl", TagField::Title),
    ("©alb", TagField::Album),
    ("©art", TagField::Artist),
    ("©cmt", TagField::Comment),
    ("©day", TagField::RecordingYear),
    ("©gen", TagField::Genre),
    ("gnre", TagField::Genre),
    ("trkn", TagField::TrackNumber),
    ("disk", TagField::DiscNumber),
    ("rtng", TagField::Rating),
    ("©wrt", TagField::Composer),
    ("desc", TagField::GeneralDescription),
    ("cprt", TagField::Copyright),
    ("aart", TagField::AlbumArtist),
];

/// 语义字段 → 主原生 atom 名 (写入方向, 决定输出帧顺序)
///
/// 读取时接受别名 (`titl`, `gnre`), 写入时只生成主 atom,
/// 这样用主 atom 命名的文件可以逐字节往返.
pub const WRITE_MAPPING: &[(TagField, &str)] = &[
    (TagField::Title, "©nam"),
    (TagField::Album, "©alb"),
    (TagField::Artist, "©art"),
    (TagField::Comment, "©cmt"),
    (TagField::RecordingYear, "©day"),
    (TagField::Genre, "©gen"),
    (TagField::TrackNumber, "trkn"),
    (TagField::DiscNumber, "disk"),
    (TagField::Rating, "rtng"),
    (TagField::Composer, "©wrt"),
    (TagField::GeneralDescription, "desc"),
    (TagField::Copyright, "cprt"),
    (TagField::AlbumArtist, "aart"),
];

/// 按原生 atom 名查语义字段
pub fn field_for_code(code: &str) -> Option<TagField> {
    FIELD_MAPPING
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, f)| *f)
}

/// 原生 atom 的声明数据类别
///
/// `ilst` 的 `data` 子 atom 带 1 字节类别码: 0 = 二进制打包数,
/// 1 = UTF-8 文本, 21 = 无符号 8 位整数. 未列出的 atom 一律按文本写出.
pub fn declared_class(code: &str) -> u8 {
    match code {
        "gnre" | "trkn" | "disk" | "purl" | "egid" => 0,
        "rtng" | "tmpo" | "cpil" | "stik" | "pcst" | "tvsn" | "tves" | "pgap" => 21,
        _ => 1,
    }
}

/// 未映射到语义字段的原生标签
#[derive(Debug, Clone)]
pub struct AdditionalField {
    /// 所属标签体系
    pub standard: TagStandard,
    /// 原生 atom 名 (4 字符)
    pub native_code: String,
    /// 字段值 (文本形式)
    pub value: String,
    /// 写回时是否删除
    pub marked_for_deletion: bool,
}

/// 标签记录
///
/// 语义字段映射 + 未映射的附加字段 + 待写入的图片列表.
/// 每次读取构造全新的记录; 读取到的图片经由 picture sink 交付,
/// 记录上只保留位置序号.
#[derive(Debug, Clone, Default)]
pub struct TagRecord {
    /// 语义字段值
    fields: HashMap<TagField, String>,
    /// 未映射的原生标签 (read_all_meta_frames 时收集)
    pub additional_fields: Vec<AdditionalField>,
    /// 待写入的图片 (写入方向)
    pub pictures: Vec<Picture>,
    /// 读取时遇到的图片位置序号
    pub picture_positions: Vec<usize>,
}

impl TagRecord {
    /// 创建空记录
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取语义字段值
    pub fn get(&self, field: TagField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// 设置语义字段值
    pub fn set(&mut self, field: TagField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// 记录一个附加字段, 同名 atom 覆盖先前的值
    pub fn set_additional(&mut self, code: impl Into<String>, value: impl Into<String>) {
        let code = code.into();
        let value = value.into();
        if let Some(existing) = self
            .additional_fields
            .iter_mut()
            .find(|f| f.native_code == code)
        {
            existing.value = value;
        } else {
            self.additional_fields.push(AdditionalField {
                standard: TagStandard::Native,
                native_code: code,
                value,
                marked_for_deletion: false,
            });
        }
    }

    /// 是否不含任何字段、附加字段和图片
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.additional_fields.is_empty() && self.pictures.is_empty()
    }
}
