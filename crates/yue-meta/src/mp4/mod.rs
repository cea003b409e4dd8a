//! MP4/ISO-BMFF 标签引擎.
//!
//! 负责 `.m4a`/`.mp4` 文件的物理参数读取与 `ilst` 标签的读写.
//!
//! # Box 树结构 (本引擎访问的部分)
//! ```text
//! ftyp                  文件类型 (跳过)
//! moov                  影片元数据
//! ├── mvhd              影片头部 (时间刻度, 时长)
//! ├── trak              轨道 (仅解析第一个)
//! │   └── mdia
//! │       └── minf
//! │           └── stbl  采样表
//! │               ├── stsd  采样描述 (声道数, 采样率)
//! │               └── stsz  采样大小 (CBR/VBR 判定)
//! └── udta              用户数据
//!     └── meta          元数据 (FullBox)
//!         ├── hdlr      处理器引用 (必须为 mdir)
//!         └── ilst      标签条目列表
//! mdat                  媒体数据 (码率推算)
//! ```
//!
//! 遍历方式: 线性读取器 + 记录的绝对偏移, 多趟定位
//! (moov 负载起点、stbl 负载起点在多个阶段间复用).
//! 写入模式下沿途记录各外层 atom 大小字段的偏移, 供改写后级联修正.

pub mod boxes;

use bytes::Bytes;
use log::{debug, warn};
use yue_core::{genre, BitRateMode, HeaderKind, MpegVersion, StreamProperties, YueError, YueResult};

use crate::io::IoContext;
use crate::options::{ReadOptions, SizeInfo};
use crate::picture::{Picture, PictureData, PictureFormat, PictureKind};
use crate::tag::{declared_class, field_for_code, TagRecord, TagStandard, WRITE_MAPPING};

use self::boxes::look_for;

/// 受支持的音频采样描述格式码
const AUDIO_FORMATS: [&[u8; 4]; 4] = [b"mp4a", b"enca", b"samr", b"sawb"];

/// `data` atom 负载的类型化解码结果
///
/// 每个 `ilst` 条目的 `data` 子 atom 带 1 字节类别码;
/// 解码为带标签的和类型, 避免散落的类别整数分派.
enum ItemData {
    /// UTF-8 文本 (类别 1)
    Utf8(String),
    /// 无符号 8 位整数 (类别 21)
    UInt8(u8),
    /// 打包数对中的序号 (类别 0, trkn/disk; 总数读过即弃)
    NumberPair(u16),
    /// 流派索引 (类别 0, gnre)
    GenreIndex(u16),
    /// 图片负载 (类别 13/14)
    Picture(Vec<u8>),
    /// 未处理的类别 (静默跳过, 对未来类别保持前向兼容)
    Unknown,
}

/// 按类别码解码一个 `data` atom 的负载
fn read_item_data(
    io: &mut IoContext,
    entry_code: &str,
    data_class: u8,
    payload_len: usize,
) -> YueResult<ItemData> {
    match data_class {
        1 => {
            let bytes = io.read_bytes(payload_len)?;
            Ok(ItemData::Utf8(String::from_utf8_lossy(&bytes).into_owned()))
        }
        21 => Ok(ItemData::UInt8(io.read_u8()?)),
        13 | 14 => Ok(ItemData::Picture(io.read_bytes(payload_len)?)),
        0 if entry_code == "trkn" || entry_code == "disk" => {
            io.skip(2)?;
            let number = io.read_u16_be()?;
            io.skip(2)?; // 总数
            Ok(ItemData::NumberPair(number))
        }
        0 if entry_code == "gnre" => Ok(ItemData::GenreIndex(io.read_u16_be()?)),
        _ => Ok(ItemData::Unknown),
    }
}

/// MP4 标签引擎
///
/// 一次读取填充一个实例; 写入模式下记录的偏移表在随后的一次写入中消费.
#[derive(Debug, Default)]
pub struct Mp4Meta {
    /// moov 大小字段的绝对偏移
    moov_offset: u64,
    /// stbl 负载起点
    stbl_pos: u64,
    /// ilst 大小字段的绝对偏移 (标签偏移)
    ilst_offset: u64,
    /// ilst 总大小 (含头部)
    ilst_size: u32,
    /// 是否存在非空标签
    tag_exists: bool,
    /// 外层 atom 偏移表: (大小字段偏移, 当前大小)
    ///
    /// 仅写入模式填充, 顺序为 moov → udta → meta; 追加写入, 改写时一次消费.
    upper_atoms: Vec<(u64, u32)>,
}

impl Mp4Meta {
    /// 创建空引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否存在非空 `ilst` 标签
    pub fn tag_exists(&self) -> bool {
        self.tag_exists
    }

    /// `ilst` 大小字段的绝对偏移 (写回时的拼接点)
    pub fn ilst_offset(&self) -> u64 {
        self.ilst_offset
    }

    /// `ilst` 总大小 (含 8 字节头部)
    pub fn ilst_size(&self) -> u32 {
        self.ilst_size
    }

    /// 外层 atom 偏移表
    pub fn upper_atoms(&self) -> &[(u64, u32)] {
        &self.upper_atoms
    }

    /// 读取 MP4 文件的物理参数与标签
    pub fn read(
        &mut self,
        io: &mut IoContext,
        size_info: &SizeInfo,
        opts: &mut ReadOptions<'_>,
        props: &mut StreamProperties,
        tag: &mut TagRecord,
    ) -> YueResult<()> {
        props.header_kind = HeaderKind::Mp4;
        props.mpeg_version = MpegVersion::Mpeg4;

        // 阶段 1: 跳过 ftyp
        io.seek(std::io::SeekFrom::Start(size_info.id3v2_size))?;
        let ftyp_size = io.read_u32_be()?;
        io.seek(std::io::SeekFrom::Start(
            size_info.id3v2_size + u64::from(ftyp_size),
        ))?;

        // 阶段 2: 进入 moov, 记住其位置
        let moov_size = look_for(io, b"moov")?;
        let moov_payload = io.position()?;
        self.moov_offset = moov_payload - 8;
        if opts.prepare_for_writing {
            self.upper_atoms.push((self.moov_offset, moov_size));
        }

        // 阶段 3: mvhd (时长)
        look_for(io, b"mvhd")?;
        let version = io.read_u8()?;
        io.skip(3)?;
        // version 1 的创建/修改时间为 64 位
        io.skip(if version == 1 { 16 } else { 8 })?;
        let time_scale = io.read_i32_be()?;
        let duration_units = if version == 1 {
            io.read_u64_be()?
        } else {
            u64::from(io.read_u32_be()?)
        };
        if time_scale > 0 {
            props.duration = duration_units as f64 / f64::from(time_scale);
        }
        debug!(
            "MP4: mvhd version={version} time_scale={time_scale} duration_units={duration_units}",
        );

        // 阶段 4: trak → mdia → minf → stbl 顺序下潜
        io.seek(std::io::SeekFrom::Start(moov_payload))?;
        let trak_size = look_for(io, b"trak")?;
        let trak_end = io.position()? - 8 + u64::from(trak_size);
        look_for(io, b"mdia")?;
        look_for(io, b"minf")?;
        look_for(io, b"stbl")?;
        self.stbl_pos = io.position()?;

        // 阶段 5: stsd (声道数, 采样率)
        self.read_stsd(io, props)?;

        // 阶段 6: stsz (CBR/VBR 判定)
        io.seek(std::io::SeekFrom::Start(self.stbl_pos))?;
        self.read_stsz(io, props)?;

        // 多 trak 文件只取第一个
        io.seek(std::io::SeekFrom::Start(trak_end))?;
        if look_for(io, b"trak").is_ok() {
            warn!("MP4: 文件包含多个 trak, 仅解析第一个");
        }

        // 阶段 7-10: 标签区
        if opts.read_tag || opts.prepare_for_writing {
            self.read_tag_region(io, moov_payload, opts, tag)?;
        }

        // 阶段 11: mdat (码率推算)
        io.seek(std::io::SeekFrom::Start(size_info.id3v2_size))?;
        let mdat_size = look_for(io, b"mdat")?;
        if props.duration > 0.0 {
            props.bit_rate = (f64::from(mdat_size) * 8.0 / props.duration).round();
        }
        debug!(
            "MP4: mdat={} 字节, 码率={} bps, {}",
            mdat_size, props.bit_rate, props.bit_rate_mode,
        );

        Ok(())
    }

    /// 阶段 5: 解析 stsd 采样描述
    fn read_stsd(&mut self, io: &mut IoContext, props: &mut StreamProperties) -> YueResult<()> {
        look_for(io, b"stsd")?;
        io.skip(4)?; // version + flags
        let n_descriptions = io.read_u32_be()?;

        for _ in 0..n_descriptions {
            let desc_len = io.read_u32_be()?;
            let format = io.read_tag()?;
            if desc_len < 8 {
                break;
            }
            let entry_end = io.position()? - 8 + u64::from(desc_len);

            if AUDIO_FORMATS.contains(&&format) {
                // AudioSampleEntry: 6 字节保留 + 2 字节数据引用索引,
                // 8 字节版本/修订/厂商, 然后是声道数与 16.16 定点采样率
                io.skip(6)?;
                io.skip(10)?;
                props.channels = io.read_u16_be()? as u8;
                io.skip(2)?;
                io.skip(4)?;
                let sr_fixed = io.read_u32_be()?;
                props.sample_rate = sr_fixed >> 16;
                debug!(
                    "MP4: stsd {} 声道={} 采样率={}",
                    boxes::fourcc_str(&format),
                    props.channels,
                    props.sample_rate,
                );
            }

            io.seek(std::io::SeekFrom::Start(entry_end))?;
        }
        Ok(())
    }

    /// 阶段 6: 解析 stsz, 判定码率模式
    ///
    /// 统一采样大小非零即为 CBR; 否则扫描逐样本大小表,
    /// 最小值放大 1% 仍小于最大值时判为 VBR.
    fn read_stsz(&mut self, io: &mut IoContext, props: &mut StreamProperties) -> YueResult<()> {
        look_for(io, b"stsz")?;
        io.skip(4)?; // version + flags
        let common_sample_size = io.read_i32_be()?;

        if common_sample_size != 0 {
            props.bit_rate_mode = BitRateMode::Cbr;
            return Ok(());
        }

        let n_sizes = io.read_u32_be()?;
        let mut min = 0u32;
        let mut max = 0u32;
        for i in 0..n_sizes {
            let size = io.read_u32_be()?;
            if i == 0 {
                min = size;
                max = size;
            } else {
                min = min.min(size);
                max = max.max(size);
            }
        }

        props.bit_rate_mode = if f64::from(min) * 1.01 < f64::from(max) {
            BitRateMode::Vbr
        } else {
            BitRateMode::Cbr
        };
        Ok(())
    }

    /// 阶段 7-10: udta → meta → hdlr 校验 → ilst 逐条读取
    fn read_tag_region(
        &mut self,
        io: &mut IoContext,
        moov_payload: u64,
        opts: &mut ReadOptions<'_>,
        tag: &mut TagRecord,
    ) -> YueResult<()> {
        io.seek(std::io::SeekFrom::Start(moov_payload))?;
        let udta_size = look_for(io, b"udta")?;
        if opts.prepare_for_writing {
            self.upper_atoms.push((io.position()? - 8, udta_size));
        }
        let meta_size = look_for(io, b"meta")?;
        if opts.prepare_for_writing {
            self.upper_atoms.push((io.position()? - 8, meta_size));
        }
        io.skip(4)?; // meta 是 FullBox

        // 阶段 8: hdlr 元数据处理器校验
        let hdlr_size = look_for(io, b"hdlr")?;
        let hdlr_payload = io.position()?;
        io.skip(4)?; // version + flags
        io.skip(4)?; // QuickTime 类型
        let handler = io.read_latin1(4)?;
        match handler.as_str() {
            "mdir" => {}
            "mp7t" => {
                return Err(YueError::Unsupported("MPEG-7 XML 元数据".into()));
            }
            "mp7b" => {
                return Err(YueError::Unsupported("MPEG-7 二进制 XML 元数据".into()));
            }
            other => {
                return Err(YueError::Unsupported(format!(
                    "无法识别的元数据格式: {other}",
                )));
            }
        }
        io.seek(std::io::SeekFrom::Start(
            hdlr_payload - 8 + u64::from(hdlr_size),
        ))?;

        // 阶段 9: ilst 定位
        let ilst_size = look_for(io, b"ilst")?;
        self.ilst_offset = io.position()? - 8;
        self.ilst_size = ilst_size;
        self.tag_exists = ilst_size > 8;
        debug!(
            "MP4: ilst 偏移={} 大小={} 有标签={}",
            self.ilst_offset, self.ilst_size, self.tag_exists,
        );

        // 阶段 10: 逐条读取标签条目
        let ilst_end = self.ilst_offset + u64::from(ilst_size);
        let mut cursor = io.position()?;
        let mut picture_index = 0usize;

        while cursor + 8 <= ilst_end {
            io.seek(std::io::SeekFrom::Start(cursor))?;
            let entry_size = io.read_u32_be()?;
            let entry_code = io.read_latin1(4)?;
            if entry_size < 8 {
                break;
            }
            let entry_end = cursor + u64::from(entry_size);

            let data_size = look_for(io, b"data")?;
            let data_offset = io.position()? - 8;
            io.skip(3)?; // 标志字节
            let data_class = io.read_u8()?;
            io.skip(4)?; // NULL 字节
            let payload_len = data_size.saturating_sub(16) as usize;

            let value = match read_item_data(io, &entry_code, data_class, payload_len)? {
                ItemData::Utf8(text) => Some(text),
                ItemData::UInt8(v) => Some(v.to_string()),
                ItemData::NumberPair(number) => Some(number.to_string()),
                // 1-based ID3v1 流派表, 越界按空字符串
                ItemData::GenreIndex(index) => {
                    Some(genre::from_mp4_index(index).unwrap_or("").to_string())
                }
                ItemData::Picture(bytes) => {
                    deliver_picture(bytes, data_class, opts, tag, &mut picture_index);
                    // covr 条目内可能有多张图片 (多个 data 子 atom)
                    self.read_extra_pictures(
                        io,
                        data_offset + u64::from(data_size),
                        entry_end,
                        opts,
                        tag,
                        &mut picture_index,
                    )?;
                    None
                }
                ItemData::Unknown => None,
            };

            if let Some(value) = value {
                match field_for_code(&entry_code) {
                    Some(field) => tag.set(field, value),
                    None if opts.read_all_meta_frames => {
                        tag.set_additional(entry_code, value);
                    }
                    None => {}
                }
            }

            io.seek(std::io::SeekFrom::Start(data_offset + u64::from(data_size)))?;
            cursor = entry_end;
        }

        Ok(())
    }

    /// 读取 covr 条目中第一个之后的 data 子 atom
    fn read_extra_pictures(
        &mut self,
        io: &mut IoContext,
        mut pos: u64,
        entry_end: u64,
        opts: &mut ReadOptions<'_>,
        tag: &mut TagRecord,
        picture_index: &mut usize,
    ) -> YueResult<()> {
        while pos + 16 <= entry_end {
            io.seek(std::io::SeekFrom::Start(pos))?;
            let sub_size = io.read_u32_be()?;
            let sub_tag = io.read_tag()?;
            if &sub_tag != b"data" || sub_size < 16 {
                break;
            }
            io.skip(3)?;
            let sub_class = io.read_u8()?;
            io.skip(4)?;
            if !matches!(sub_class, 13 | 14) {
                break;
            }
            let sub_len = (sub_size - 16) as usize;
            if let ItemData::Picture(bytes) = read_item_data(io, "covr", sub_class, sub_len)? {
                deliver_picture(bytes, sub_class, opts, tag, picture_index);
            }
            pos += u64::from(sub_size);
        }
        Ok(())
    }

    /// 写出完整的 `ilst` 负载 (含自身的大小头部)
    ///
    /// 只产出 `ilst` 本身; 由调用方负责拼接到原文件的 `ilst` 位置,
    /// 再调用 [`Self::rewrite_file_size_in_header`] 级联修正外层大小.
    /// 返回写出的总字节数.
    pub fn write_tag(&self, io: &mut IoContext, tag: &TagRecord) -> YueResult<u32> {
        let tag_size_pos = io.position()?;
        io.write_u32_be(0)?; // 占位, 结尾回填
        io.write_tag(b"ilst")?;
        let data_start = io.position()?;

        // 文本帧: 按固定映射顺序, 只写主 atom 名
        for (field, code) in WRITE_MAPPING {
            if let Some(value) = tag.get(*field) {
                if !value.is_empty() {
                    write_text_frame(io, code, value)?;
                }
            }
        }

        // 附加字段
        for field in &tag.additional_fields {
            if field.standard == TagStandard::Native && !field.marked_for_deletion {
                write_text_frame(io, &field.native_code, &field.value)?;
            }
        }

        // 图片
        write_picture_frames(io, &tag.pictures)?;

        let final_pos = io.position()?;
        io.seek(std::io::SeekFrom::Start(tag_size_pos))?;
        io.write_u32_be((final_pos - data_start + 8) as u32)?;
        io.seek(std::io::SeekFrom::Start(final_pos))?;

        Ok((final_pos - tag_size_pos) as u32)
    }

    /// 把标签区大小变化量级联写回所有外层 atom
    ///
    /// 对偏移表中的每一项, 定位到其大小字段并覆写为原值加 `delta`.
    pub fn rewrite_file_size_in_header(&self, io: &mut IoContext, delta: i64) -> YueResult<()> {
        for (offset, size) in &self.upper_atoms {
            let new_size = i64::from(*size) + delta;
            if new_size < 8 || new_size > i64::from(u32::MAX) {
                return Err(YueError::InvalidArgument(format!(
                    "atom 大小修正越界: {size} {delta:+}",
                )));
            }
            io.seek(std::io::SeekFrom::Start(*offset))?;
            io.write_u32_be(new_size as u32)?;
        }
        Ok(())
    }
}

/// 把一张图片交付给 picture sink, 并在记录上留下位置序号
fn deliver_picture(
    bytes: Vec<u8>,
    data_class: u8,
    opts: &mut ReadOptions<'_>,
    tag: &mut TagRecord,
    picture_index: &mut usize,
) {
    let format = PictureFormat::sniff(&bytes);
    tag.picture_positions.push(*picture_index);
    if let Some(sink) = opts.picture_sink.as_mut() {
        sink(PictureData {
            data: Bytes::from(bytes),
            kind: PictureKind::Generic,
            format,
            source: TagStandard::Native,
            data_class,
            position: *picture_index,
        });
    }
    *picture_index += 1;
}

/// 写出一个文本帧
///
/// 结构: `[外层大小][atom 名][内层大小]["data"][类别 i32][4 字节零][负载]`,
/// 两个大小占位符在帧写完后按实测距离回填.
fn write_text_frame(io: &mut IoContext, code: &str, value: &str) -> YueResult<()> {
    let frame_start = io.position()?;
    io.write_u32_be(0)?;
    io.write_latin1(code)?;
    let inner_start = io.position()?;
    io.write_u32_be(0)?;
    io.write_tag(b"data")?;
    let class = declared_class(code);
    io.write_i32_be(i32::from(class))?;
    io.write_u32_be(0)?;

    match class {
        0 if code == "trkn" || code == "disk" => {
            let number = value.parse::<u16>().unwrap_or(0);
            io.write_u16_be(0)?;
            io.write_u16_be(number)?;
            io.write_u16_be(0)?; // 总数未知, 写零
            if code == "trkn" {
                // trkn 比 disk 多一组 16 位尾部
                io.write_u16_be(0)?;
            }
        }
        0 if code == "gnre" => {
            let index = value.parse::<u16>().unwrap_or(0);
            io.write_u16_be(index)?;
        }
        // 其余打包类 atom (purl, egid) 无文本负载
        0 => {}
        21 => {
            io.write_u8(value.parse::<u8>().unwrap_or(0))?;
        }
        _ => {
            io.write_all(value.as_bytes())?;
        }
    }

    let end = io.position()?;
    io.seek(std::io::SeekFrom::Start(inner_start))?;
    io.write_u32_be((end - inner_start) as u32)?;
    io.seek(std::io::SeekFrom::Start(frame_start))?;
    io.write_u32_be((end - frame_start) as u32)?;
    io.seek(std::io::SeekFrom::Start(end))?;
    Ok(())
}

/// 写出图片帧
///
/// 第一张图片产生 `covr` 外层帧, 后续图片复用该外层, 只追加 `data` 子 atom.
fn write_picture_frames(io: &mut IoContext, pictures: &[Picture]) -> YueResult<()> {
    if pictures.is_empty() {
        return Ok(());
    }

    let covr_start = io.position()?;
    io.write_u32_be(0)?;
    io.write_tag(b"covr")?;

    for picture in pictures {
        let data_start = io.position()?;
        io.write_u32_be(0)?;
        io.write_tag(b"data")?;
        let class: i32 = match picture.format {
            PictureFormat::Png => 14,
            PictureFormat::Jpeg => 13,
        };
        io.write_i32_be(class)?;
        io.write_u32_be(0)?;
        io.write_all(&picture.data)?;

        let end = io.position()?;
        io.seek(std::io::SeekFrom::Start(data_start))?;
        io.write_u32_be((end - data_start) as u32)?;
        io.seek(std::io::SeekFrom::Start(end))?;
    }

    let covr_end = io.position()?;
    io.seek(std::io::SeekFrom::Start(covr_start))?;
    io.write_u32_be((covr_end - covr_start) as u32)?;
    io.seek(std::io::SeekFrom::Start(covr_end))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;
    use crate::tag::TagField;

    fn writer_io() -> IoContext {
        IoContext::new(Box::new(MemoryBackend::new()))
    }

    fn read_back(io: &mut IoContext, len: usize) -> Vec<u8> {
        io.seek(std::io::SeekFrom::Start(0)).unwrap();
        io.read_bytes(len).unwrap()
    }

    #[test]
    fn test_write_text_frame_layout() {
        let mut io = writer_io();
        write_text_frame(&mut io, "©nam", "abc").unwrap();
        let len = io.position().unwrap() as usize;
        let bytes = read_back(&mut io, len);

        // 外层: 大小 + atom 名
        assert_eq!(&bytes[0..4], &27u32.to_be_bytes()); // 8 + 16 + 3
        assert_eq!(bytes[4], 0xA9);
        assert_eq!(&bytes[5..8], b"nam");
        // 内层: 大小 + "data" + 类别 + 标志
        assert_eq!(&bytes[8..12], &19u32.to_be_bytes());
        assert_eq!(&bytes[12..16], b"data");
        assert_eq!(&bytes[16..20], &1u32.to_be_bytes()); // class 1 = UTF-8
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(&bytes[24..27], b"abc");
    }

    #[test]
    fn test_write_trkn_frame_packed() {
        let mut io = writer_io();
        write_text_frame(&mut io, "trkn", "3").unwrap();
        let len = io.position().unwrap() as usize;
        let bytes = read_back(&mut io, len);

        // trkn 负载: [0][3][0][0] 四组 u16
        assert_eq!(len, 32);
        assert_eq!(&bytes[16..20], &0u32.to_be_bytes()); // class 0
        assert_eq!(&bytes[24..32], &[0, 0, 0, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_write_disk_frame_shorter_than_trkn() {
        let mut io = writer_io();
        write_text_frame(&mut io, "disk", "2").unwrap();
        // disk 负载只有三组 u16
        assert_eq!(io.position().unwrap(), 30);
    }

    #[test]
    fn test_write_gnre_value_present() {
        let mut io = writer_io();
        write_text_frame(&mut io, "gnre", "18").unwrap();
        let len = io.position().unwrap() as usize;
        let bytes = read_back(&mut io, len);
        // 计算出的 u16 索引必须落盘
        assert_eq!(&bytes[24..26], &18u16.to_be_bytes());
    }

    #[test]
    fn test_write_tag_size_header() {
        let mut io = writer_io();
        let mut tag = TagRecord::new();
        tag.set(TagField::Title, "t");

        let engine = Mp4Meta::new();
        let written = engine.write_tag(&mut io, &tag).unwrap();
        let bytes = read_back(&mut io, written as usize);

        assert_eq!(&bytes[0..4], &written.to_be_bytes());
        assert_eq!(&bytes[4..8], b"ilst");
    }

    #[test]
    fn test_write_empty_tag_is_bare_ilst() {
        let mut io = writer_io();
        let engine = Mp4Meta::new();
        let written = engine.write_tag(&mut io, &TagRecord::new()).unwrap();
        assert_eq!(written, 8);
    }

    #[test]
    fn test_picture_frames_share_covr() {
        let mut io = writer_io();
        let pictures = vec![
            Picture {
                data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0x00]),
                format: PictureFormat::Jpeg,
                kind: PictureKind::Generic,
            },
            Picture {
                data: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
                format: PictureFormat::Png,
                kind: PictureKind::Generic,
            },
        ];
        write_picture_frames(&mut io, &pictures).unwrap();
        let len = io.position().unwrap() as usize;
        let bytes = read_back(&mut io, len);

        // 单个 covr 外层, 两个 data 子 atom
        assert_eq!(&bytes[4..8], b"covr");
        assert_eq!(&bytes[0..4], &(8u32 + 20 + 20).to_be_bytes());
        assert_eq!(&bytes[12..16], b"data");
        assert_eq!(&bytes[16..20], &13u32.to_be_bytes()); // JPEG
        assert_eq!(&bytes[32..36], b"data");
        assert_eq!(&bytes[36..40], &14u32.to_be_bytes()); // PNG
    }

    #[test]
    fn test_rewrite_sizes_cascade() {
        // 三个外层 atom, 大小字段分别位于 0/20/40
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(&1000u32.to_be_bytes());
        data[20..24].copy_from_slice(&500u32.to_be_bytes());
        data[40..44].copy_from_slice(&100u32.to_be_bytes());
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));

        let engine = Mp4Meta {
            upper_atoms: vec![(0, 1000), (20, 500), (40, 100)],
            ..Default::default()
        };
        engine.rewrite_file_size_in_header(&mut io, 40).unwrap();

        io.seek(std::io::SeekFrom::Start(0)).unwrap();
        assert_eq!(io.read_u32_be().unwrap(), 1040);
        io.seek(std::io::SeekFrom::Start(20)).unwrap();
        assert_eq!(io.read_u32_be().unwrap(), 540);
        io.seek(std::io::SeekFrom::Start(40)).unwrap();
        assert_eq!(io.read_u32_be().unwrap(), 140);
    }

    #[test]
    fn test_rewrite_sizes_negative_delta() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&1000u32.to_be_bytes());
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));

        let engine = Mp4Meta {
            upper_atoms: vec![(0, 1000)],
            ..Default::default()
        };
        engine.rewrite_file_size_in_header(&mut io, -100).unwrap();
        io.seek(std::io::SeekFrom::Start(0)).unwrap();
        assert_eq!(io.read_u32_be().unwrap(), 900);

        // 修正到头部以下越界
        assert!(engine.rewrite_file_size_in_header(&mut io, -1000).is_err());
    }
}
