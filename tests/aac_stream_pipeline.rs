//! AAC 裸流 (ADIF/ADTS) 分析集成测试.
//!
//! 通过在内存中按位构造 ADIF 头部和逐帧构造 ADTS 流,
//! 验证流分析器的头部识别、位级解码和码率/时长推算.

use yue::core::{AacProfile, BitRateMode, HeaderKind, MpegVersion};
use yue::meta::io::{IoContext, MemoryBackend};
use yue::meta::{probe, AacFile, ReadOptions, SizeInfo};

// ========================
// 辅助函数
// ========================

/// 在缓冲区的绝对位偏移处写入 value 的低 count 位 (MSB-first)
fn set_bits(buf: &mut Vec<u8>, bit_pos: usize, count: u32, value: u32) {
    for i in 0..count {
        let bit = (value >> (count - 1 - i)) & 1;
        let pos = bit_pos + i as usize;
        let byte_index = pos / 8;
        if byte_index >= buf.len() {
            buf.resize(byte_index + 1, 0);
        }
        if bit != 0 {
            buf[byte_index] |= 1 << (7 - pos % 8);
        }
    }
}

/// 构造 ADIF 文件 (CBR)
///
/// 布局: "ADIF" 魔数后从第 32 位起依次为 copyright 标志、
/// 码率模式、23 位码率、(CBR 头部余下 28 位)、档次、采样率索引、
/// 四组 4 位声道数与末尾 2 位.
fn build_adif_cbr(bit_rate: u32, profile_code: u32, sr_index: u32, front_channels: u32) -> Vec<u8> {
    let mut buf = b"ADIF".to_vec();
    set_bits(&mut buf, 32, 1, 0); // copyright id 不存在
    set_bits(&mut buf, 35, 1, 0); // CBR
    set_bits(&mut buf, 36, 23, bit_rate);
    set_bits(&mut buf, 87, 2, profile_code);
    set_bits(&mut buf, 89, 4, sr_index);
    set_bits(&mut buf, 93, 4, front_channels);
    // 侧面/后端/LFE 声道数与末尾 2 位保持 0
    buf.resize(64, 0);
    buf
}

/// 构造 ADIF 文件 (VBR, copyright id 存在)
fn build_adif_vbr(peak_bit_rate: u32, profile_code: u32, sr_index: u32, channels: u32) -> Vec<u8> {
    let mut buf = b"ADIF".to_vec();
    set_bits(&mut buf, 32, 1, 1); // copyright id 存在, 头部多 72 位
    set_bits(&mut buf, 107, 1, 1); // VBR
    set_bits(&mut buf, 108, 23, peak_bit_rate);
    set_bits(&mut buf, 139, 2, profile_code);
    set_bits(&mut buf, 141, 4, sr_index);
    set_bits(&mut buf, 145, 4, channels);
    buf.resize(64, 0);
    buf
}

/// 构造一个 ADTS 帧 (MPEG-4, LC, 44.1 kHz)
fn build_adts_frame(payload: &[u8], channels: u8, fullness: u16) -> Vec<u8> {
    let frame_length = 7 + payload.len() as u16;
    let mut frame = vec![0u8; 7];

    frame[0] = 0xFF;
    frame[1] = 0xF1; // sync + ID(0) + layer(00) + protection_absent(1)
    frame[2] = 0b0101_0000 | ((channels >> 2) & 0x01); // profile LC + sr_index 4
    frame[3] = ((channels & 0x03) << 6) | ((frame_length >> 11) as u8 & 0x03);
    frame[4] = (frame_length >> 3) as u8;
    frame[5] = (((frame_length & 0x07) as u8) << 5) | ((fullness >> 6) as u8 & 0x1F);
    frame[6] = ((fullness & 0x3F) as u8) << 2;

    frame.extend_from_slice(payload);
    frame
}

fn analyze(data: Vec<u8>, id3v2_size: u64) -> AacFile {
    let file_size = data.len() as u64;
    let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
    let mut file = AacFile::new();
    let info = SizeInfo {
        file_size,
        id3v2_size,
    };
    file.read(&mut io, &info, &mut ReadOptions::new())
        .expect("分析不应失败");
    file
}

// ========================
// ADIF
// ========================

#[test]
fn test_adif_cbr_stereo() {
    let file = analyze(build_adif_cbr(128_000, 1, 4, 2), 0);
    let props = &file.properties;

    assert_eq!(props.header_kind, HeaderKind::Adif);
    assert_eq!(props.mpeg_version, MpegVersion::Mpeg4);
    assert_eq!(props.profile, AacProfile::Lc);
    assert_eq!(props.bit_rate_mode, BitRateMode::Cbr);
    assert_eq!(props.bit_rate, 128_000.0);
    assert_eq!(props.sample_rate, 44100);
    assert_eq!(props.channels, 2);
    assert!(props.is_valid());

    // 时长 = 8 · 流字节数 / 码率
    let expected = 8.0 * 64.0 / 128_000.0;
    assert!((props.duration - expected).abs() < 1e-9);
}

#[test]
fn test_adif_vbr_with_copyright_id() {
    let file = analyze(build_adif_vbr(96_000, 0, 3, 1), 0);
    let props = &file.properties;

    assert_eq!(props.header_kind, HeaderKind::Adif);
    assert_eq!(props.bit_rate_mode, BitRateMode::Vbr);
    assert_eq!(props.bit_rate, 96_000.0);
    assert_eq!(props.profile, AacProfile::Main);
    assert_eq!(props.sample_rate, 48000);
    assert_eq!(props.channels, 1);
}

#[test]
fn test_adif_mpeg_version_always_mpeg4() {
    // ADIF 头部没有版本字段, 恒为 MPEG-4
    for data in [build_adif_cbr(64_000, 1, 4, 2), build_adif_vbr(1, 3, 0, 8)] {
        let file = analyze(data, 0);
        assert_eq!(file.properties.mpeg_version, MpegVersion::Mpeg4);
    }
}

// ========================
// ADTS
// ========================

#[test]
fn test_adts_mono_44100_from_byte_zero() {
    let mut data = Vec::new();
    for _ in 0..5 {
        data.extend_from_slice(&build_adts_frame(&[0xAA; 200], 1, 0x7FF));
    }
    let total = data.len() as f64;
    let file = analyze(data, 0);
    let props = &file.properties;

    assert_eq!(props.header_kind, HeaderKind::Adts);
    assert_eq!(props.channels, 1);
    assert_eq!(props.sample_rate, 44100);
    assert_eq!(props.bit_rate_mode, BitRateMode::Vbr);
    assert_eq!(props.total_frames, 5);
    let expected = (8.0 * total / 1024.0 / 5.0 * 44100.0).round();
    assert_eq!(props.bit_rate, expected);
    assert!(props.is_valid());
}

#[test]
fn test_adts_cbr_stops_at_first_frame() {
    let mut data = Vec::new();
    for _ in 0..10 {
        data.extend_from_slice(&build_adts_frame(&[0x55; 150], 2, 0x2AA));
    }
    let file = analyze(data, 0);
    let props = &file.properties;

    assert_eq!(props.bit_rate_mode, BitRateMode::Cbr);
    assert_eq!(props.total_frames, 1);
    assert_eq!(props.channels, 2);
}

#[test]
fn test_adts_after_id3v2_prefix() {
    // ID3v2 头部: syncsafe 大小 118 → 区域总长 128
    let mut data = Vec::new();
    data.extend_from_slice(b"ID3");
    data.push(4);
    data.push(0);
    data.push(0);
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x76]);
    data.extend_from_slice(&[0u8; 118]);
    for _ in 0..3 {
        data.extend_from_slice(&build_adts_frame(&[0xCC; 90], 2, 0x7FF));
    }

    let file_size = data.len() as u64;
    let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));

    // 引擎信任调用方提供的 ID3v2 偏移
    let id3v2_size = probe::id3v2_region_size(&mut io).unwrap();
    assert_eq!(id3v2_size, 128);

    let mut file = AacFile::new();
    let info = SizeInfo {
        file_size,
        id3v2_size,
    };
    file.read(&mut io, &info, &mut ReadOptions::new()).unwrap();

    let props = &file.properties;
    assert_eq!(props.header_kind, HeaderKind::Adts);
    assert_eq!(props.total_frames, 3);
    assert_eq!(props.channels, 2);
    assert_eq!(props.sample_rate, 44100);
}

#[test]
fn test_adts_truncated_tail_frame() {
    // 最后一帧在中途截断: 扫描应停在完整帧处, 不报错
    let mut data = Vec::new();
    data.extend_from_slice(&build_adts_frame(&[0xAA; 100], 2, 0x7FF));
    data.extend_from_slice(&build_adts_frame(&[0xBB; 100], 2, 0x7FF));
    data.truncate(data.len() - 104);

    let file = analyze(data, 0);
    assert_eq!(file.properties.total_frames, 1);
}

// ========================
// 无法识别的头部
// ========================

#[test]
fn test_unknown_header_invalid_descriptor() {
    let file = analyze(b"fLaC\x00\x00\x00\x22padpadpad".to_vec(), 0);
    assert_eq!(file.properties.header_kind, HeaderKind::Unknown);
    assert!(!file.properties.is_valid());
    assert_eq!(file.properties.channels, 0);
}

#[test]
fn test_two_reads_are_idempotent() {
    let data = build_adif_cbr(128_000, 1, 4, 2);
    let first = analyze(data.clone(), 0);
    let second = analyze(data, 0);

    let (a, b) = (&first.properties, &second.properties);
    assert_eq!(a.header_kind, b.header_kind);
    assert_eq!(a.channels, b.channels);
    assert_eq!(a.sample_rate, b.sample_rate);
    assert_eq!(a.bit_rate, b.bit_rate);
    assert_eq!(a.duration, b.duration);
}
