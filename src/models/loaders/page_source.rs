use crate::error::{AppError, AppResult, FileError};
use crate::models::question::PageText;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 页面分隔符，`pdftotext` 在每页之后输出一个换页符
const FORM_FEED: char = '\x0C';

/// 页面文本来源
///
/// 每个文档调用一次，返回按页排序的文本
#[async_trait]
pub trait PageTextSource: Send + Sync {
    async fn extract_pages(&self, document: &Path) -> AppResult<Vec<PageText>>;
}

/// 以换页符分隔页面的纯文本文档
#[derive(Debug, Default, Clone, Copy)]
pub struct FormFeedTextSource;

#[async_trait]
impl PageTextSource for FormFeedTextSource {
    async fn extract_pages(&self, document: &Path) -> AppResult<Vec<PageText>> {
        let content = read_document(document).await?;
        let pages = split_form_feed_pages(&content);
        tracing::info!("从 {} 提取了 {} 页文本", document.display(), pages.len());
        Ok(pages)
    }
}

/// JSON 字符串数组形式的文档，每个元素是一页
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPagesSource;

#[async_trait]
impl PageTextSource for JsonPagesSource {
    async fn extract_pages(&self, document: &Path) -> AppResult<Vec<PageText>> {
        let content = read_document(document).await?;
        let pages: Vec<PageText> =
            serde_json::from_str(&content).map_err(|source| FileError::JsonParseFailed {
                path: document.display().to_string(),
                source,
            })?;
        tracing::info!("从 {} 提取了 {} 页文本", document.display(), pages.len());
        Ok(pages)
    }
}

/// 按扩展名选择具体的页面来源
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentSource;

#[async_trait]
impl PageTextSource for DocumentSource {
    async fn extract_pages(&self, document: &Path) -> AppResult<Vec<PageText>> {
        if is_json(document) {
            JsonPagesSource.extract_pages(document).await
        } else {
            FormFeedTextSource.extract_pages(document).await
        }
    }
}

/// 按换页符切分页面；文件末尾换页符之后的空白页会被丢弃
pub fn split_form_feed_pages(content: &str) -> Vec<PageText> {
    let mut pages: Vec<PageText> = content.split(FORM_FEED).map(str::to_string).collect();
    if pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// 扫描文件夹中所有待处理的文档（`.txt` 与 `.json`），按文件名排序
pub async fn load_document_paths(folder_path: &str) -> AppResult<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !fs::try_exists(&folder).await.unwrap_or(false) {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut documents = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(&folder, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(&folder, e))?
    {
        let path = entry.path();
        if is_json(&path) || has_extension(&path, "txt") {
            tracing::debug!(
                "找到文档: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

async fn read_document(document: &Path) -> AppResult<String> {
    fs::read_to_string(document)
        .await
        .map_err(|e| AppError::file_read_failed(document, e))
}

fn is_json(path: &Path) -> bool {
    has_extension(path, "json")
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
