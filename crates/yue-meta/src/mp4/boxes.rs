//! MP4 Box (Atom) 定位.
//!
//! ISO 14496-12 定义的 Box 结构:
//! ```text
//! Size:  4 bytes (big-endian, 含头部本身)
//! Type:  4 bytes (FourCC)
//! ```
//!
//! 特殊大小值 (本引擎显式拒绝, 不会误读):
//! - 0: Box 延伸到文件末尾
//! - 1: 使用 64-bit 扩展大小
//!
//! 标签引擎采用线性遍历 + 记录绝对偏移的方式访问 Box 树,
//! 不在内存中构建递归结构 (避免在不可信输入上构建所有权树).

use yue_core::{YueError, YueResult};

use crate::io::IoContext;

/// 同层兄弟 Box 扫描上限
///
/// 防止损坏文件导致无界扫描.
pub const MAX_SIBLING_SCAN: u32 = 100;

/// 把 FourCC 转成可读字符串 (ISO-8859-1)
pub fn fourcc_str(tag: &[u8; 4]) -> String {
    tag.iter().map(|&b| char::from(b)).collect()
}

fn atom_not_found(key: &[u8; 4]) -> YueError {
    YueError::AtomNotFound(fourcc_str(key))
}

/// 在当前层级中查找指定类型的 Box
///
/// 从读取器当前位置开始, 逐个跳过不匹配的兄弟 Box (每个跳过
/// `size - 8` 字节, 头部 8 字节已被消耗), 直到类型匹配.
///
/// 成功时返回匹配 Box 的总大小 (含头部), 读取器停在其负载首字节;
/// 扫描越过文件末尾或超过 [`MAX_SIBLING_SCAN`] 次仍未命中则报
/// `AtomNotFound`.
pub fn look_for(io: &mut IoContext, key: &[u8; 4]) -> YueResult<u32> {
    let file_size = io.size().unwrap_or(u64::MAX);

    for _ in 0..MAX_SIBLING_SCAN {
        let size = match io.read_u32_be() {
            Ok(v) => v,
            Err(YueError::Eof) => return Err(atom_not_found(key)),
            Err(e) => return Err(e),
        };
        let tag = match io.read_tag() {
            Ok(v) => v,
            Err(YueError::Eof) => return Err(atom_not_found(key)),
            Err(e) => return Err(e),
        };

        // 扩展大小形式: 无法在 32 位大小语义下安全跳过/改写, 明确拒绝
        if size == 1 {
            return Err(YueError::Unsupported(format!(
                "{} atom 使用 64-bit 扩展大小",
                fourcc_str(&tag),
            )));
        }
        if size == 0 {
            return Err(YueError::Unsupported(format!(
                "{} atom 延伸到文件末尾 (size=0)",
                fourcc_str(&tag),
            )));
        }
        if size < 8 {
            return Err(YueError::InvalidData(format!(
                "{} atom 大小 {} 小于头部长度",
                fourcc_str(&tag),
                size,
            )));
        }

        if &tag == key {
            return Ok(size);
        }

        let next = io.position()? + u64::from(size - 8);
        if next > file_size {
            return Err(atom_not_found(key));
        }
        io.seek(std::io::SeekFrom::Start(next))?;
    }

    Err(atom_not_found(key))
}
