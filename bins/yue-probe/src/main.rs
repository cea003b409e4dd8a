//! yue-probe - 音频元数据探测工具
//!
//! 分析 AAC/MP4 音频文件, 打印技术描述符与标签信息.

use clap::Parser;
use serde::Serialize;
use std::process;

use yue_core::HeaderKind;
use yue_meta::{probe, AacFile, IoContext, PictureData, ReadOptions, SizeInfo, TagField};

/// Yue 音频元数据探测工具
#[derive(Parser, Debug)]
#[command(name = "yue-probe", version, about = "纯 Rust AAC/MP4 元数据探测工具")]
struct Cli {
    /// 输入文件路径
    input: Option<String>,

    /// 显示标签信息
    #[arg(long, default_value_t = true)]
    show_tag: bool,

    /// 收集未映射的原生标签
    #[arg(long)]
    all_frames: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    format: FormatInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<TagInfo>,
}

/// 技术描述符信息
#[derive(Serialize)]
struct FormatInfo {
    filename: String,
    header_kind: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpeg_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    channels: u8,
    sample_rate: u32,
    bit_rate_mode: String,
    bit_rate: f64,
    duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_frames: Option<u32>,
    id3v2_size: u64,
}

/// 标签信息
#[derive(Serialize)]
struct TagInfo {
    fields: Vec<(String, String)>,
    additional_fields: Vec<(String, String)>,
    picture_count: usize,
}

/// 文本输出时的语义字段显示顺序
const DISPLAY_FIELDS: &[(TagField, &str)] = &[
    (TagField::Title, "标题"),
    (TagField::Artist, "艺术家"),
    (TagField::Album, "专辑"),
    (TagField::AlbumArtist, "专辑艺术家"),
    (TagField::Composer, "作曲"),
    (TagField::Genre, "流派"),
    (TagField::RecordingYear, "年份"),
    (TagField::TrackNumber, "音轨号"),
    (TagField::DiscNumber, "碟号"),
    (TagField::Rating, "评分"),
    (TagField::Comment, "注释"),
    (TagField::GeneralDescription, "描述"),
    (TagField::Copyright, "版权"),
];

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(input_path) = cli.input.as_ref() else {
        print_banner();
        return;
    };

    if !cli.quiet {
        eprintln!(
            "yue-probe 版本 {} -- 纯 Rust 音频元数据探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {input_path}");
    }

    // 打开文件并计算大小摘要
    let mut io = match IoContext::open_read(input_path) {
        Ok(io) => io,
        Err(e) => {
            eprintln!("错误: 无法打开文件 '{input_path}': {e}");
            process::exit(1);
        }
    };

    let id3v2_size = match probe::id3v2_region_size(&mut io) {
        Ok(size) => size,
        Err(e) => {
            eprintln!("错误: 读取文件头失败: {e}");
            process::exit(1);
        }
    };
    let size_info = SizeInfo {
        file_size: io.size().unwrap_or(0),
        id3v2_size,
    };

    // 读取描述符与标签, 统计图片
    let mut picture_count = 0usize;
    let mut sink = |_pic: PictureData| {
        picture_count += 1;
    };
    let mut opts = ReadOptions {
        read_tag: cli.show_tag,
        read_all_meta_frames: cli.all_frames,
        prepare_for_writing: false,
        picture_sink: Some(&mut sink),
    };

    let mut file = AacFile::new();
    if let Err(e) = file.read(&mut io, &size_info, &mut opts) {
        eprintln!("错误: 解析失败: {e}");
        process::exit(1);
    }
    drop(opts);

    // 收集输出
    let props = &file.properties;
    let format_info = FormatInfo {
        filename: input_path.clone(),
        header_kind: props.header_kind.to_string(),
        valid: props.is_valid(),
        mpeg_version: (props.header_kind != HeaderKind::Unknown)
            .then(|| props.mpeg_version.to_string()),
        profile: (props.header_kind != HeaderKind::Unknown).then(|| props.profile.to_string()),
        channels: props.channels,
        sample_rate: props.sample_rate,
        bit_rate_mode: props.bit_rate_mode.to_string(),
        bit_rate: props.bit_rate,
        duration: props.duration,
        total_frames: (props.header_kind == HeaderKind::Adts).then_some(props.total_frames),
        id3v2_size,
    };

    let tag_info = cli.show_tag.then(|| TagInfo {
        fields: DISPLAY_FIELDS
            .iter()
            .filter_map(|(field, _)| {
                file.tag
                    .get(*field)
                    .map(|v| (format!("{field:?}"), v.to_string()))
            })
            .collect(),
        additional_fields: file
            .tag
            .additional_fields
            .iter()
            .map(|f| (f.native_code.clone(), f.value.clone()))
            .collect(),
        picture_count,
    });

    if cli.json {
        let output = ProbeOutput {
            format: format_info,
            tag: tag_info,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_format_text(&format_info);
        if cli.show_tag {
            print_tag_text(&file, picture_count);
        }
    }
}

/// 文本输出: 技术描述符
fn print_format_text(info: &FormatInfo) {
    println!("[FORMAT]");
    println!("  文件名       : {}", info.filename);
    println!("  头部类型     : {}", info.header_kind);
    println!("  描述符有效   : {}", if info.valid { "是" } else { "否" });
    if let Some(ref version) = info.mpeg_version {
        println!("  MPEG 版本    : {version}");
    }
    if let Some(ref profile) = info.profile {
        println!("  编码档次     : {profile}");
    }
    if info.channels > 0 {
        println!("  声道数       : {}", info.channels);
    }
    if info.sample_rate > 0 {
        println!("  采样率       : {} Hz", info.sample_rate);
    }
    println!("  码率模式     : {}", info.bit_rate_mode);
    if info.bit_rate > 0.0 {
        println!("  码率         : {:.0} kbps", info.bit_rate / 1000.0);
    }
    if info.duration > 0.0 {
        println!("  时长         : {:.3} 秒", info.duration);
    }
    if let Some(frames) = info.total_frames {
        println!("  帧数         : {frames}");
    }
    if info.id3v2_size > 0 {
        println!("  ID3v2 前缀   : {} 字节", info.id3v2_size);
    }
    println!("[/FORMAT]");
    println!();
}

/// 文本输出: 标签
fn print_tag_text(file: &AacFile, picture_count: usize) {
    println!("[TAG]");
    for (field, label) in DISPLAY_FIELDS {
        if let Some(value) = file.tag.get(*field) {
            println!("  {label:　<6}: {value}");
        }
    }
    for extra in &file.tag.additional_fields {
        println!("  {:　<6}: {}", extra.native_code, extra.value);
    }
    if picture_count > 0 {
        println!("  图片数量     : {picture_count}");
    }
    println!("[/TAG]");
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "yue-probe 版本 {} -- 纯 Rust 音频元数据探测工具",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("用法: yue-probe [选项] <输入文件>");
    println!();
    println!("选项:");
    println!("  --show-tag        显示标签信息 (默认开启)");
    println!("  --all-frames      收集未映射的原生标签");
    println!("  --json            以 JSON 格式输出");
    println!("  -q, --quiet       静默模式");
    println!();
    println!("使用 --help 查看完整用法.");
}
