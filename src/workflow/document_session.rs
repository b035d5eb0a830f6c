//! 文档会话 - 流程层
//!
//! 一次文档处理请求的全部状态：文档路径、题目文件路径和当前题目集。
//! 每个请求各自持有一个会话，不存在进程级的"当前文档"。
//!
//! 流程顺序：
//! 1. `open` - 读取已有题目文件（不存在则为空）
//! 2. `regenerate` - 提取页面 → 逐页生成 → 成功后整体覆盖题目文件

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::loaders::PageTextSource;
use crate::models::question::{count_questions, DocumentQuestionSet, QuestionType};
use crate::orchestrator::ConversationOrchestrator;
use crate::services::question_file::QuestionFileCodec;

/// 题目文件后缀
const QUESTION_FILE_SUFFIX: &str = ".questions.txt";

/// 文档对应的题目文件：`<questions_folder>/<文件名主干>.questions.txt`
pub fn question_file_for(document: &Path, questions_folder: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    questions_folder.join(format!("{}{}", stem, QUESTION_FILE_SUFFIX))
}

/// 生成参数
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub question_type: QuestionType,
    pub questions_per_page: u32,
}

/// 文档会话
#[derive(Debug)]
pub struct DocumentSession {
    document_index: usize,
    document_path: PathBuf,
    question_file: PathBuf,
    questions: DocumentQuestionSet,
    codec: QuestionFileCodec,
}

impl DocumentSession {
    /// 打开文档会话并读取已有题目
    ///
    /// 题目文件不存在时以空题目集开始；其他读取错误照常返回
    pub async fn open(
        document_index: usize,
        document_path: impl Into<PathBuf>,
        question_file: impl Into<PathBuf>,
    ) -> AppResult<Self> {
        let document_path = document_path.into();
        let question_file = question_file.into();
        let codec = QuestionFileCodec;

        let questions = match codec.load(&question_file).await {
            Ok(questions) => {
                info!(
                    "[文档 {}] 已读取题目文件 {}: {} 页",
                    document_index,
                    question_file.display(),
                    questions.len()
                );
                questions
            }
            Err(e) if e.is_file_unavailable() => {
                info!(
                    "[文档 {}] 题目文件不存在，从空题目集开始: {}",
                    document_index,
                    question_file.display()
                );
                DocumentQuestionSet::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            document_index,
            document_path,
            question_file,
            questions,
            codec,
        })
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn question_file(&self) -> &Path {
        &self.question_file
    }

    /// 当前题目集
    pub fn questions(&self) -> &DocumentQuestionSet {
        &self.questions
    }

    /// 重新生成整个文档的题目
    ///
    /// 生成失败时内存与磁盘上的题目都保持不变；
    /// 生成成功后整体替换内存中的题目再写入文件，写入失败会返回错误，此时磁盘内容可能是旧的
    pub async fn regenerate(
        &mut self,
        source: &dyn PageTextSource,
        orchestrator: &ConversationOrchestrator,
        options: GenerationOptions,
    ) -> AppResult<&DocumentQuestionSet> {
        let pages = source.extract_pages(&self.document_path).await?;

        if !self.questions.is_empty() && self.questions.len() != pages.len() {
            warn!(
                "[文档 {}] ⚠️ 已有题目 {} 页与文档 {} 页不一致，将整体替换",
                self.document_index,
                self.questions.len(),
                pages.len()
            );
        }

        let generated = orchestrator
            .generate(
                self.document_index,
                &pages,
                options.question_type,
                options.questions_per_page,
            )
            .await?;

        self.questions = generated;
        self.codec.save(&self.question_file, &self.questions).await?;

        info!(
            "[文档 {}] 💾 已保存 {} 道题目至 {}",
            self.document_index,
            count_questions(&self.questions),
            self.question_file.display()
        );

        Ok(&self.questions)
    }
}
