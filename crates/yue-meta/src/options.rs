//! 读取参数.
//!
//! 引擎不自行解析 ID3v2 前缀, 由调用方通过 [`SizeInfo`] 提供其长度;
//! [`ReadOptions`] 控制一次读取的行为并携带可选的 picture sink.

use crate::picture::PictureData;

/// 文件大小摘要
///
/// 由调用方预先计算 (见 [`crate::probe::id3v2_region_size`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeInfo {
    /// 文件总大小 (字节)
    pub file_size: u64,
    /// 文件开头 ID3v2 区域的长度 (无则为 0)
    pub id3v2_size: u64,
}

/// picture sink 回调
///
/// 读取过程中同步调用, 每张图片一次; 图片字节的所有权交给接收方.
pub type PictureSink<'a> = dyn FnMut(PictureData) + 'a;

/// 一次读取的配置
pub struct ReadOptions<'a> {
    /// 是否读取元数据标签
    pub read_tag: bool,
    /// 是否收集未映射的原生标签到附加字段
    pub read_all_meta_frames: bool,
    /// 是否为后续写入做准备 (记录外层 atom 偏移表)
    pub prepare_for_writing: bool,
    /// 图片接收回调
    pub picture_sink: Option<&'a mut PictureSink<'a>>,
}

impl<'a> ReadOptions<'a> {
    /// 默认配置: 读取标签, 不收集附加字段, 不准备写入
    pub fn new() -> Self {
        Self {
            read_tag: true,
            read_all_meta_frames: false,
            prepare_for_writing: false,
            picture_sink: None,
        }
    }
}

impl Default for ReadOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}
