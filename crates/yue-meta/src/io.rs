//! I/O 抽象层.
//!
//! 为元数据引擎提供统一的随机访问读写接口, 支持文件与内存缓冲区后端.
//!
//! 音频容器格式 (MP4 Box, ADIF/ADTS 头部) 中的多字节整数一律为大端序,
//! 所有字节序转换集中在本模块; 位级读取按 MSB-first 位序进行.

use std::io::{self, Read, Seek, Write};

use yue_core::{YueError, YueResult};

/// 位级读取的单次上限
///
/// 位读取基于 4 字节窗口实现, 起始位在字节内偏移最多 7 位,
/// 因此单次最多安全读出 25 位.
pub const MAX_BIT_READ: u32 = 25;

/// 默认读缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的 I/O 来源 (文件、内存等).
pub trait IoBackend: Send {
    /// 读取数据到缓冲区
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 全部写入
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// 定位 (seek)
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
}

/// I/O 上下文
///
/// 封装底层 I/O 操作, 为流分析器和标签引擎提供统一的数据读写接口.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: &str) -> YueResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从文件路径打开 (读写, 不截断)
    ///
    /// 标签改写需要就地覆盖外层 atom 的大小字段, 因此不能截断原文件.
    pub fn open_read_write(path: &str) -> YueResult<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    // ========================
    // 读取方法
    // ========================

    /// 读取指定字节数填满缓冲区
    pub fn read_exact(&mut self, buf: &mut [u8]) -> YueResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(YueError::Eof);
                }
            }
        }
        Ok(())
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> YueResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u16 大端
    pub fn read_u16_be(&mut self) -> YueResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// 读取 u32 大端
    pub fn read_u32_be(&mut self) -> YueResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// 读取 u64 大端
    pub fn read_u64_be(&mut self) -> YueResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// 读取 i32 大端
    pub fn read_i32_be(&mut self) -> YueResult<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    /// 读取 i64 大端
    pub fn read_i64_be(&mut self) -> YueResult<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    /// 读取 4 字节标签 (FourCC)
    pub fn read_tag(&mut self) -> YueResult<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取 n 字节并按 ISO-8859-1 解码为字符串
    ///
    /// Box 类型标签和短标识符使用此编码 (单字节直接映射到
    /// Unicode 前 256 个码点, 如 `©nam` 的 0xA9 → '©').
    pub fn read_latin1(&mut self, n: usize) -> YueResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> YueResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> YueResult<()> {
        // 先消耗缓冲区中的数据
        let buffered = self.buf_len - self.buf_pos;
        if count <= buffered {
            self.buf_pos += count;
            return Ok(());
        }

        let remaining = count - buffered;
        self.buf_pos = self.buf_len;
        self.inner.seek(io::SeekFrom::Current(remaining as i64))?;
        Ok(())
    }

    /// 从绝对位偏移读取 N 个位 (1 ≤ N ≤ 25)
    ///
    /// 算法: 定位到 `bit_position / 8`, 读 4 字节组成大端 32 位窗口,
    /// 左移 `bit_position % 8` 丢弃字节内前导位, 再右移 `32 - count`
    /// 取出高 N 位. ADIF/ADTS 头部的位域按 MSB-first 排列.
    pub fn read_bits_at(&mut self, bit_position: u64, count: u32) -> YueResult<u32> {
        if count == 0 || count > MAX_BIT_READ {
            return Err(YueError::InvalidArgument(format!(
                "read_bits_at: count={count} 超出 1..={MAX_BIT_READ}",
            )));
        }

        self.seek(io::SeekFrom::Start(bit_position / 8))?;
        let window = self.read_u32_be()?;
        let value = (window << (bit_position % 8)) >> (32 - count);
        Ok(value)
    }

    // ========================
    // 写入方法
    // ========================

    /// 写入全部数据
    pub fn write_all(&mut self, buf: &[u8]) -> YueResult<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// 写入 u8
    pub fn write_u8(&mut self, v: u8) -> YueResult<()> {
        self.write_all(&[v])
    }

    /// 写入 u16 大端
    pub fn write_u16_be(&mut self, v: u16) -> YueResult<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// 写入 u32 大端
    pub fn write_u32_be(&mut self, v: u32) -> YueResult<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// 写入 i32 大端
    pub fn write_i32_be(&mut self, v: i32) -> YueResult<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// 写入 4 字节标签 (FourCC)
    pub fn write_tag(&mut self, tag: &[u8; 4]) -> YueResult<()> {
        self.write_all(tag)
    }

    /// 按 ISO-8859-1 编码写入字符串
    ///
    /// 256 以上的码点无法表示, 视为无效参数.
    pub fn write_latin1(&mut self, s: &str) -> YueResult<()> {
        let mut bytes = Vec::with_capacity(s.len());
        for c in s.chars() {
            let code = u32::from(c);
            if code > 0xFF {
                return Err(YueError::InvalidArgument(format!(
                    "write_latin1: 字符 {c:?} 超出 ISO-8859-1 范围",
                )));
            }
            bytes.push(code as u8);
        }
        self.write_all(&bytes)
    }

    // ========================
    // 定位方法
    // ========================

    /// 定位 (seek)
    ///
    /// 注意: seek 会清空读缓冲区.
    pub fn seek(&mut self, pos: io::SeekFrom) -> YueResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 获取当前位置
    ///
    /// 考虑读缓冲区中尚未消耗的数据量.
    pub fn position(&mut self) -> YueResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件 I/O 后端
struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建 (用于读取)
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// 创建空缓冲区 (用于写入)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// 获取内部数据的引用
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 消耗自身, 返回内部数据
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // 位置在末尾则追加, 否则覆盖已有数据
        if self.pos >= self.data.len() {
            self.data.extend_from_slice(buf);
        } else {
            let overlap = (self.data.len() - self.pos).min(buf.len());
            self.data[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
            if buf.len() > overlap {
                self.data.extend_from_slice(&buf[overlap..]);
            }
        }
        self.pos += buf.len();
        Ok(())
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => self.data.len() as i64 + offset,
            io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}
