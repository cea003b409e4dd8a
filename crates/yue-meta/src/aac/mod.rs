//! AAC 流分析器.
//!
//! 识别 ADIF / ADTS / MP4 三种头部形态并分派解码:
//! - ADIF: 文件头单一头部, 位级解析一次
//! - ADTS: 逐帧同步头, 迭代累计帧数与总大小
//! - MP4: 交给 [`crate::mp4::Mp4Meta`] 做 Box 树解析
//!
//! # ADTS 帧头位布局 (ISO 13818-7 / 14496-3)
//! ```text
//! sync word        12 bits (0xFFF)
//! ID                1 bit  (0=MPEG-4, 1=MPEG-2)
//! layer             2 bits
//! protection        1 bit
//! profile           2 bits
//! sampling index    4 bits
//! private           1 bit
//! channel config    3 bits
//! original + home   2 bits
//! copyright id      2 bits (仅 MPEG-4)
//! frame length     13 bits (含头部)
//! buffer fullness  11 bits (全 1 表示 VBR)
//! raw data blocks   2 bits
//! ```

use log::debug;
use yue_core::{
    AacProfile, BitRateMode, HeaderKind, MpegVersion, StreamProperties, YueError, YueResult,
    properties::SAMPLE_RATES,
};

use crate::io::IoContext;
use crate::mp4::Mp4Meta;
use crate::options::{ReadOptions, SizeInfo};
use crate::tag::{TagRecord, TagStandard};

/// 单个 ADTS 帧头的解码结果
struct AdtsFrame {
    /// MPEG 版本位 (0=MPEG-4, 1=MPEG-2)
    mpeg2: bool,
    /// 档次编号 (2-bit 编码 + 1)
    profile_id: u8,
    /// 采样率索引
    sample_rate_index: usize,
    /// 声道配置
    channels: u8,
    /// 帧总字节数 (含头部)
    frame_length: u64,
    /// buffer fullness 全 1, VBR 标记
    vbr_marker: bool,
}

/// AAC/MP4 文件分析器
///
/// 每次 `read()` 构造全新的描述符和标签记录; 写入模式下读取后,
/// 实例保存的偏移信息供随后的一次标签改写使用.
#[derive(Debug, Default)]
pub struct AacFile {
    /// 技术描述符
    pub properties: StreamProperties,
    /// 标签记录
    pub tag: TagRecord,
    /// MP4 标签引擎 (MP4 头部时填充)
    mp4: Mp4Meta,
}

impl AacFile {
    /// 创建分析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定标签体系是否受支持
    ///
    /// 原生 MP4 标签由本引擎处理; ID3v1/ID3v2/APE 对 AAC 文件同样
    /// 有效, 由同族的兄弟引擎负责.
    pub fn is_meta_supported(standard: TagStandard) -> bool {
        matches!(
            standard,
            TagStandard::Native | TagStandard::Id3v1 | TagStandard::Id3v2 | TagStandard::Ape,
        )
    }

    /// 是否有原生标签体系
    pub fn has_native_meta() -> bool {
        true
    }

    /// 是否存在非空 `ilst` 标签 (仅 MP4 头部有意义)
    pub fn tag_exists(&self) -> bool {
        self.mp4.tag_exists()
    }

    /// `ilst` 的绝对偏移 (写回拼接点)
    pub fn ilst_offset(&self) -> u64 {
        self.mp4.ilst_offset()
    }

    /// `ilst` 总大小 (含头部)
    pub fn ilst_size(&self) -> u32 {
        self.mp4.ilst_size()
    }

    /// 写入模式读取时记录的外层 atom 偏移表
    pub fn upper_atoms(&self) -> &[(u64, u32)] {
        self.mp4.upper_atoms()
    }

    /// 写出完整的 `ilst` 负载 (见 [`Mp4Meta::write_tag`])
    pub fn write_tag(&self, io: &mut IoContext, tag: &TagRecord) -> YueResult<u32> {
        self.mp4.write_tag(io, tag)
    }

    /// 把标签区大小变化量级联写回外层 atom
    /// (见 [`Mp4Meta::rewrite_file_size_in_header`])
    pub fn rewrite_file_size_in_header(&self, io: &mut IoContext, delta: i64) -> YueResult<()> {
        self.mp4.rewrite_file_size_in_header(io, delta)
    }

    /// 读取文件, 填充描述符与标签记录
    ///
    /// 头部无法识别不是错误: 返回 `Ok(true)` 且描述符 `is_valid()`
    /// 为假. 容器损坏或元数据处理器不受支持时返回错误.
    pub fn read(
        &mut self,
        io: &mut IoContext,
        size_info: &SizeInfo,
        opts: &mut ReadOptions<'_>,
    ) -> YueResult<bool> {
        self.properties = StreamProperties::default();
        self.tag = TagRecord::new();
        self.mp4 = Mp4Meta::new();

        let kind = recognize(io, size_info.id3v2_size)?;
        self.properties.header_kind = kind;
        debug!("AAC: 头部类型 {kind}");

        match kind {
            HeaderKind::Adif => self.read_adif(io, size_info)?,
            HeaderKind::Adts => self.read_adts(io, size_info)?,
            HeaderKind::Mp4 => {
                self.mp4
                    .read(io, size_info, opts, &mut self.properties, &mut self.tag)?;
            }
            HeaderKind::Unknown => return Ok(true),
        }

        // 裸流时长: 码率已知时由文件大小推算
        if matches!(kind, HeaderKind::Adif | HeaderKind::Adts) && self.properties.bit_rate > 0.0 {
            let stream_bytes = size_info.file_size.saturating_sub(size_info.id3v2_size);
            self.properties.duration = 8.0 * stream_bytes as f64 / self.properties.bit_rate;
        }

        Ok(true)
    }

    /// 解码 ADIF 头部 (位级)
    ///
    /// 起始位 = ID3v2 区域之后 32 位 ("ADIF" 魔数).
    fn read_adif(&mut self, io: &mut IoContext, size_info: &SizeInfo) -> YueResult<()> {
        let props = &mut self.properties;
        let mut p = size_info.id3v2_size * 8 + 32;

        // copyright id 存在时多占 72 位
        if io.read_bits_at(p, 1)? == 0 {
            p += 3;
        } else {
            p += 75;
        }

        props.bit_rate_mode = if io.read_bits_at(p, 1)? == 0 {
            BitRateMode::Cbr
        } else {
            BitRateMode::Vbr
        };
        p += 1;

        props.bit_rate = f64::from(io.read_bits_at(p, 23)?);
        // 码率字段之后 CBR 与 VBR 的头部长度不同
        p += if props.bit_rate_mode == BitRateMode::Cbr {
            51
        } else {
            31
        };

        props.mpeg_version = MpegVersion::Mpeg4;
        props.profile = AacProfile::from_id(io.read_bits_at(p, 2)? as u8 + 1);
        p += 2;

        let sample_rate_index = io.read_bits_at(p, 4)? as usize;
        p += 4;
        props.sample_rate = SAMPLE_RATES[sample_rate_index];

        // 前端/侧面/后端/LFE 四组 4 位声道数与末尾 2 位逐项累加
        let mut channels = 0u32;
        for _ in 0..4 {
            channels += io.read_bits_at(p, 4)?;
            p += 4;
        }
        channels += io.read_bits_at(p, 2)?;
        props.channels = channels as u8;

        debug!(
            "ADIF: {} {} 声道={} 采样率={} 码率={}",
            props.profile, props.bit_rate_mode, props.channels, props.sample_rate, props.bit_rate,
        );
        Ok(())
    }

    /// 解码 ADTS 帧序列
    ///
    /// 从 ID3v2 区域之后逐帧扫描: 累计帧数与帧长, 直到文件结束或
    /// 同步字丢失; buffer fullness 非全 1 (CBR) 时首帧即可停止.
    fn read_adts(&mut self, io: &mut IoContext, size_info: &SizeInfo) -> YueResult<()> {
        let props = &mut self.properties;
        let mut frames = 0u32;
        let mut total_size = 0u64;

        loop {
            let frame = match read_adts_frame(io, (size_info.id3v2_size + total_size) * 8) {
                Ok(Some(frame)) => frame,
                // 同步字丢失或流在帧中途结束: 停止扫描
                Ok(None) | Err(YueError::Eof) => break,
                Err(e) => return Err(e),
            };

            if frame.frame_length == 0 {
                // 零长度帧意味着码流损坏, 终止扫描
                break;
            }

            props.mpeg_version = if frame.mpeg2 {
                MpegVersion::Mpeg2
            } else {
                MpegVersion::Mpeg4
            };
            props.profile = AacProfile::from_id(frame.profile_id);
            props.sample_rate = SAMPLE_RATES[frame.sample_rate_index];
            props.channels = frame.channels;

            total_size += frame.frame_length;
            frames += 1;

            props.bit_rate_mode = if frame.vbr_marker {
                BitRateMode::Vbr
            } else {
                BitRateMode::Cbr
            };
            if props.bit_rate_mode == BitRateMode::Cbr {
                break;
            }
            if size_info.file_size <= size_info.id3v2_size + total_size {
                break;
            }
        }

        props.total_frames = frames;
        if frames > 0 && props.sample_rate > 0 {
            props.bit_rate = (8.0 * total_size as f64 / 1024.0 / f64::from(frames)
                * f64::from(props.sample_rate))
            .round();
        }

        debug!(
            "ADTS: {} 帧, 总大小={} 字节, {} 码率={}",
            frames, total_size, props.bit_rate_mode, props.bit_rate,
        );
        Ok(())
    }
}

/// 识别头部类型
///
/// 定位到 ID3v2 区域之后: `ADIF` 魔数为 ADIF; 首字节 0xFF (ADTS
/// 同步字的高 8 位) 为 ADTS; 再读 4 字节为 `ftyp` 则是 MP4 容器.
pub fn recognize(io: &mut IoContext, id3v2_size: u64) -> YueResult<HeaderKind> {
    io.seek(std::io::SeekFrom::Start(id3v2_size))?;
    let h0 = match io.read_tag() {
        Ok(v) => v,
        Err(YueError::Eof) => return Ok(HeaderKind::Unknown),
        Err(e) => return Err(e),
    };

    if &h0 == b"ADIF" {
        return Ok(HeaderKind::Adif);
    }
    // ADTS 同步字以 0xFF 开头
    if h0[0] == 0xFF {
        return Ok(HeaderKind::Adts);
    }

    let h1 = match io.read_tag() {
        Ok(v) => v,
        Err(YueError::Eof) => return Ok(HeaderKind::Unknown),
        Err(e) => return Err(e),
    };
    if &h1 == b"ftyp" {
        return Ok(HeaderKind::Mp4);
    }

    Ok(HeaderKind::Unknown)
}

/// 解码一个 ADTS 帧头
///
/// 返回 `Ok(None)` 表示当前位置不是同步字.
fn read_adts_frame(io: &mut IoContext, frame_start: u64) -> YueResult<Option<AdtsFrame>> {
    if io.read_bits_at(frame_start, 12)? != 0xFFF {
        return Ok(None);
    }
    let mut p = frame_start + 12;

    let mpeg2 = io.read_bits_at(p, 1)? != 0;
    p += 4; // ID + layer + protection

    let profile_id = io.read_bits_at(p, 2)? as u8 + 1;
    p += 2;

    let sample_rate_index = io.read_bits_at(p, 4)? as usize;
    p += 4;
    p += 1; // private

    let channels = io.read_bits_at(p, 3)? as u8;
    p += 3;
    // original/copy + home, MPEG-4 再加 2 位 copyright id
    p += if mpeg2 { 2 } else { 4 };

    let frame_length = u64::from(io.read_bits_at(p, 13)?);
    p += 13;

    let vbr_marker = io.read_bits_at(p, 11)? == 0x7FF;

    Ok(Some(AdtsFrame {
        mpeg2,
        profile_id,
        sample_rate_index,
        channels,
        frame_length,
        vbr_marker,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    fn memory_io(data: Vec<u8>) -> IoContext {
        IoContext::new(Box::new(MemoryBackend::from_data(data)))
    }

    /// 构造一个 ADTS 帧
    /// profile=1(LC), sr_index=4(44100), 声道与 fullness 可调
    fn build_adts_frame(payload: &[u8], channels: u8, fullness: u16) -> Vec<u8> {
        let frame_length = 7 + payload.len() as u16;
        let mut frame = vec![0u8; 7];

        // sync word (0xFFF) + ID(0=MPEG-4) + layer(00) + protection_absent(1)
        frame[0] = 0xFF;
        frame[1] = 0xF1;

        // profile(01=LC) + sr_index(0100=44.1kHz) + private(0) + ch_config 高 1 位
        frame[2] = 0b0101_0000 | ((channels >> 2) & 0x01);

        // ch_config 低 2 位 + original/home/copyright(0000) + frame_length 高 2 位
        frame[3] = ((channels & 0x03) << 6) | ((frame_length >> 11) as u8 & 0x03);

        // frame_length 中间 8 位
        frame[4] = (frame_length >> 3) as u8;

        // frame_length 低 3 位 + fullness 高 5 位
        frame[5] = (((frame_length & 0x07) as u8) << 5) | ((fullness >> 6) as u8 & 0x1F);

        // fullness 低 6 位 + raw data blocks(00)
        frame[6] = ((fullness & 0x3F) as u8) << 2;

        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_recognize_kinds() {
        let mut io = memory_io(b"ADIF\x00\x00\x00\x00".to_vec());
        assert_eq!(recognize(&mut io, 0).unwrap(), HeaderKind::Adif);

        let mut io = memory_io(vec![0xFF, 0xF1, 0x50, 0x80]);
        assert_eq!(recognize(&mut io, 0).unwrap(), HeaderKind::Adts);

        let mut io = memory_io(b"\x00\x00\x00\x20ftypM4A ".to_vec());
        assert_eq!(recognize(&mut io, 0).unwrap(), HeaderKind::Mp4);

        let mut io = memory_io(b"RIFF\x00\x00\x00\x00WAVE".to_vec());
        assert_eq!(recognize(&mut io, 0).unwrap(), HeaderKind::Unknown);

        // 文件过短按无法识别处理
        let mut io = memory_io(vec![0x00, 0x01]);
        assert_eq!(recognize(&mut io, 0).unwrap(), HeaderKind::Unknown);
    }

    #[test]
    fn test_recognize_after_id3v2() {
        let mut data = vec![0xAA; 64]; // 假装是 ID3v2 区域
        data.extend_from_slice(b"ADIF");
        data.extend_from_slice(&[0; 16]);
        let mut io = memory_io(data);
        assert_eq!(recognize(&mut io, 64).unwrap(), HeaderKind::Adif);
    }

    #[test]
    fn test_adts_frame_header_decode() {
        let frame = build_adts_frame(&[0xAA; 10], 2, 0x100);
        let mut io = memory_io(frame);
        let header = read_adts_frame(&mut io, 0).unwrap().expect("应该解析成功");
        assert!(!header.mpeg2);
        assert_eq!(header.profile_id, 2); // LC
        assert_eq!(header.sample_rate_index, 4); // 44.1 kHz
        assert_eq!(header.channels, 2);
        assert_eq!(header.frame_length, 17);
        assert!(!header.vbr_marker);
    }

    #[test]
    fn test_adts_frame_bad_sync() {
        let mut io = memory_io(vec![0x00; 16]);
        assert!(read_adts_frame(&mut io, 0).unwrap().is_none());
    }

    #[test]
    fn test_adts_mono_cbr_single_scan() {
        // CBR (fullness 非全 1): 首帧即可判定
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&build_adts_frame(&[0xAA; 100], 1, 0x123));
        }
        let file_size = data.len() as u64;
        let mut io = memory_io(data);

        let mut file = AacFile::new();
        let info = SizeInfo {
            file_size,
            id3v2_size: 0,
        };
        file.read(&mut io, &info, &mut ReadOptions::new()).unwrap();

        let props = &file.properties;
        assert_eq!(props.header_kind, HeaderKind::Adts);
        assert_eq!(props.mpeg_version, MpegVersion::Mpeg4);
        assert_eq!(props.profile, AacProfile::Lc);
        assert_eq!(props.channels, 1);
        assert_eq!(props.sample_rate, 44100);
        assert_eq!(props.bit_rate_mode, BitRateMode::Cbr);
        assert_eq!(props.total_frames, 1);
        // 码率 = 8 · 总大小 / 1024 / 帧数 · 采样率
        let expected = (8.0f64 * 107.0 / 1024.0 / 1.0 * 44100.0).round();
        assert_eq!(props.bit_rate, expected);
        assert!(props.is_valid());
        assert!(props.duration > 0.0);
    }

    #[test]
    fn test_adts_vbr_scans_all_frames() {
        let mut data = Vec::new();
        for len in [80usize, 120, 100] {
            data.extend_from_slice(&build_adts_frame(&vec![0xBB; len], 2, 0x7FF));
        }
        let file_size = data.len() as u64;
        let mut io = memory_io(data);

        let mut file = AacFile::new();
        let info = SizeInfo {
            file_size,
            id3v2_size: 0,
        };
        file.read(&mut io, &info, &mut ReadOptions::new()).unwrap();

        let props = &file.properties;
        assert_eq!(props.bit_rate_mode, BitRateMode::Vbr);
        assert_eq!(props.total_frames, 3);
        assert_eq!(props.channels, 2);
        let total = (80 + 120 + 100 + 3 * 7) as f64;
        let expected = (8.0 * total / 1024.0 / 3.0 * 44100.0).round();
        assert_eq!(props.bit_rate, expected);
    }

    #[test]
    fn test_unknown_header_reports_invalid() {
        let mut io = memory_io(b"OggS\x00\x00\x00\x00\x00\x00\x00\x00".to_vec());
        let mut file = AacFile::new();
        let info = SizeInfo {
            file_size: 12,
            id3v2_size: 0,
        };
        let ok = file.read(&mut io, &info, &mut ReadOptions::new()).unwrap();
        assert!(ok);
        assert!(!file.properties.is_valid());
        assert_eq!(file.properties.header_kind, HeaderKind::Unknown);
    }

    #[test]
    fn test_meta_support_queries() {
        assert!(AacFile::is_meta_supported(TagStandard::Native));
        assert!(AacFile::is_meta_supported(TagStandard::Id3v1));
        assert!(AacFile::is_meta_supported(TagStandard::Id3v2));
        assert!(AacFile::is_meta_supported(TagStandard::Ape));
        assert!(AacFile::has_native_meta());
    }
}
