//! 页面处理上下文
//!
//! 封装"我正在处理哪个文档的第几页"这一信息

use std::fmt::Display;

/// 页面处理上下文
#[derive(Debug, Clone, Copy)]
pub struct PageCtx {
    /// 文档索引（仅用于日志显示）
    pub document_index: usize,

    /// 页面索引（从0开始）
    pub page_index: usize,

    /// 文档总页数
    pub page_count: usize,
}

impl PageCtx {
    pub fn new(document_index: usize, page_index: usize, page_count: usize) -> Self {
        Self {
            document_index,
            page_index,
            page_count,
        }
    }

    /// 是否为文档的第一页（开启新会话）
    pub fn is_first(&self) -> bool {
        self.page_index == 0
    }
}

impl Display for PageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {} 第 {}/{} 页]",
            self.document_index,
            self.page_index + 1,
            self.page_count
        )
    }
}
