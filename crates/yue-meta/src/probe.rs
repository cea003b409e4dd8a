//! 格式探测与 ID3v2 前缀测量.
//!
//! 引擎本身不解析 ID3v2, 只信任调用方提供的偏移;
//! 本模块提供计算该偏移的辅助函数, 以及基于头部字节/扩展名的
//! 头部类型探测 (供命令行工具等调用方使用).

use yue_core::{HeaderKind, YueError, YueResult};

use crate::io::IoContext;

/// 根据头部数据和文件名探测头部类型
///
/// # 参数
/// - `data`: 文件开头的若干字节 (ID3v2 区域之后)
/// - `filename`: 文件名 (可选, 用于扩展名匹配)
pub fn probe(data: &[u8], filename: Option<&str>) -> HeaderKind {
    if data.len() >= 4 {
        if &data[..4] == b"ADIF" {
            return HeaderKind::Adif;
        }
        // ADTS 同步字: 0xFFF
        if data[0] == 0xFF && (data[1] & 0xF0) == 0xF0 {
            return HeaderKind::Adts;
        }
    }
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        return HeaderKind::Mp4;
    }

    // 扩展名兜底
    if let Some(name) = filename {
        if let Some(ext) = name.rsplit('.').next() {
            let ext = ext.to_lowercase();
            match ext.as_str() {
                "aac" => return HeaderKind::Adts,
                "mp4" | "m4a" | "m4b" => return HeaderKind::Mp4,
                _ => {}
            }
        }
    }

    HeaderKind::Unknown
}

/// 测量文件开头 ID3v2 区域的总长度 (含 10 字节头部)
///
/// 无 ID3v2 时返回 0; 返回后读取器回到文件开头.
pub fn id3v2_region_size(io: &mut IoContext) -> YueResult<u64> {
    io.seek(std::io::SeekFrom::Start(0))?;
    let header = match io.read_bytes(10) {
        Ok(h) => h,
        Err(YueError::Eof) => {
            io.seek(std::io::SeekFrom::Start(0))?;
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let size = if &header[..3] == b"ID3" {
        // Syncsafe integer (4 × 7 bits)
        let body = (u64::from(header[6]) << 21)
            | (u64::from(header[7]) << 14)
            | (u64::from(header[8]) << 7)
            | u64::from(header[9]);
        body + 10
    } else {
        0
    };

    io.seek(std::io::SeekFrom::Start(0))?;
    Ok(size)
}
