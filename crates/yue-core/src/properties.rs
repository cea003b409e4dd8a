//! 音频流技术描述符.
//!
//! 描述一个 AAC/MP4 音频流的物理参数: 头部类型、MPEG 版本、
//! 编码档次、声道数、采样率、码率模式等. 由流分析器在读取时填充.

use std::fmt;

/// AAC 采样率索引表 (ISO 14496-3, 4-bit 索引)
///
/// 索引 12-15 为保留值, 映射为 0 表示无效.
pub const SAMPLE_RATES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 0, 0, 0, 0,
];

/// 音频头部类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderKind {
    /// 无法识别
    #[default]
    Unknown,
    /// ADIF (单一文件头)
    Adif,
    /// ADTS (逐帧同步头)
    Adts,
    /// MP4 / ISO-BMFF 容器
    Mp4,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Adif => "ADIF",
            Self::Adts => "ADTS",
            Self::Mp4 => "MP4",
        };
        write!(f, "{s}")
    }
}

/// MPEG 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MpegVersion {
    /// 未知
    #[default]
    Unknown,
    /// MPEG-2 (ISO 13818-7)
    Mpeg2,
    /// MPEG-4 (ISO 14496-3)
    Mpeg4,
}

impl fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Mpeg2 => "MPEG-2",
            Self::Mpeg4 => "MPEG-4",
        };
        write!(f, "{s}")
    }
}

/// AAC 编码档次 (profile)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AacProfile {
    /// 未知
    #[default]
    Unknown,
    /// Main
    Main,
    /// Low Complexity
    Lc,
    /// Scalable Sample Rate
    Ssr,
    /// Long Term Prediction
    Ltp,
}

impl AacProfile {
    /// 从档次编号创建 (码流中的 2-bit 编码 + 1)
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Main,
            2 => Self::Lc,
            3 => Self::Ssr,
            4 => Self::Ltp,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AacProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Main => "AAC Main",
            Self::Lc => "AAC LC",
            Self::Ssr => "AAC SSR",
            Self::Ltp => "AAC LTP",
        };
        write!(f, "{s}")
    }
}

/// 码率模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitRateMode {
    /// 未知
    #[default]
    Unknown,
    /// 固定码率
    Cbr,
    /// 可变码率
    Vbr,
}

impl fmt::Display for BitRateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Cbr => "CBR",
            Self::Vbr => "VBR",
        };
        write!(f, "{s}")
    }
}

/// 音频流技术描述符
///
/// 每次读取都会构造一个全新的描述符; 读取成功后各字段有效.
#[derive(Debug, Clone, Default)]
pub struct StreamProperties {
    /// 头部类型
    pub header_kind: HeaderKind,
    /// MPEG 版本
    pub mpeg_version: MpegVersion,
    /// AAC 编码档次
    pub profile: AacProfile,
    /// 声道数 (有效时 > 0)
    pub channels: u8,
    /// 采样率 (Hz, 来自 4-bit 索引表)
    pub sample_rate: u32,
    /// 码率模式
    pub bit_rate_mode: BitRateMode,
    /// 码率 (bps, 派生值)
    pub bit_rate: f64,
    /// 时长 (秒, 派生值)
    pub duration: f64,
    /// 帧总数 (仅 ADTS)
    pub total_frames: u32,
}

impl StreamProperties {
    /// 描述符是否有效
    ///
    /// 要求: 头部类型已识别, 且声道数、采样率、码率均为正.
    pub fn is_valid(&self) -> bool {
        self.header_kind != HeaderKind::Unknown
            && self.channels > 0
            && self.sample_rate > 0
            && self.bit_rate > 0.0
    }
}
