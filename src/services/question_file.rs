//! 题目文件读写 - 业务能力层
//!
//! 文件格式：UTF-8 文本，每行一条，页与页之间用一个空行分隔，
//! 最后一页之后同样有一个空行。
//!
//! 答案单独占一行写在题目之后。重新读取时所有行都作为普通题目，
//! 答案与题目的对应关系会丢失；需要恢复时使用 [`decode_pairing_answers`]。

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::question::{count_answers, DocumentQuestionSet, QuestionRecord};
use crate::services::response_structurer::assemble_records;

/// 把整个文档的题目编码成文本
pub fn encode(document: &DocumentQuestionSet) -> String {
    let mut out = String::new();
    for page in document {
        for record in page {
            out.push_str(&record.question);
            out.push('\n');
            if let Some(answer) = &record.answer {
                out.push_str(answer);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

/// 把文本解码成整个文档的题目
///
/// 空行结束当前页；文件末尾没有空行时最后一页同样保留；空页会被丢弃。
/// 所有行都按普通题目读取。
pub fn decode(text: &str) -> DocumentQuestionSet {
    split_pages(text)
        .into_iter()
        .map(|lines| lines.into_iter().map(QuestionRecord::question).collect())
        .collect()
}

/// 与 [`decode`] 相同的分页，但把 `Answer:` 行重新挂到前一道题目上
pub fn decode_pairing_answers(text: &str) -> DocumentQuestionSet {
    split_pages(text).into_iter().map(assemble_records).collect()
}

fn split_pages(text: &str) -> Vec<Vec<String>> {
    let mut pages = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            pages.push(std::mem::take(&mut current));
        } else {
            current.push(line.to_string());
        }
    }
    pages.push(current);

    pages.retain(|page| !page.is_empty());
    pages
}

/// 题目文件编解码器，负责与磁盘交互
///
/// 写入不是原子操作，同一个文件的并发读写需要由调用方串行化
#[derive(Debug, Default, Clone, Copy)]
pub struct QuestionFileCodec;

impl QuestionFileCodec {
    /// 读取题目文件
    ///
    /// 文件不存在时返回 `FileError::NotFound`，调用方可用
    /// [`AppError::is_file_unavailable`] 判断并按空题目集处理
    pub async fn load(&self, path: &Path) -> AppResult<DocumentQuestionSet> {
        let text = read_question_file(path).await?;
        let document = decode(&text);
        debug!("读取题目文件 {}: {} 页", path.display(), document.len());
        Ok(document)
    }

    /// 读取题目文件，不存在时返回空题目集
    pub async fn load_or_default(&self, path: &Path) -> AppResult<DocumentQuestionSet> {
        match self.load(path).await {
            Err(e) if e.is_file_unavailable() => {
                debug!("题目文件不存在，使用空题目集: {}", path.display());
                Ok(DocumentQuestionSet::new())
            }
            other => other,
        }
    }

    /// 覆盖写入题目文件
    pub async fn save(&self, path: &Path, document: &DocumentQuestionSet) -> AppResult<()> {
        let answers = count_answers(document);
        if answers > 0 {
            warn!(
                "⚠️ {} 条答案将作为独立行写入 {}，重新读取时不会再与题目关联",
                answers,
                path.display()
            );
        }
        let empty_pages = empty_page_numbers(document);
        if !empty_pages.is_empty() {
            warn!(
                "⚠️ 第 {:?} 页没有题目，写入后只留下空行，重新读取时后续页面会前移，与文档页码不再对齐: {}",
                empty_pages,
                path.display()
            );
        }
        write_question_file(path, &encode(document)).await
    }
}

/// 没有任何题目的页码（从 1 开始）
pub fn empty_page_numbers(document: &DocumentQuestionSet) -> Vec<usize> {
    document
        .iter()
        .enumerate()
        .filter(|(_, page)| page.is_empty())
        .map(|(index, _)| index + 1)
        .collect()
}

/// 读取题目文件全文
pub async fn read_question_file(path: &Path) -> AppResult<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))
}

/// 覆盖写入题目文件，父目录不存在时先创建
pub async fn write_question_file(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent, e))?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path, e))
}
