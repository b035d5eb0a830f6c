//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量文档的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、创建 LLM 客户端和编排器
//! 2. **批量加载**：扫描所有待处理的文档
//! 3. **并发控制**：使用 Semaphore 限制同时处理的文档数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：汇总所有文档的处理结果
//!
//! 单个文档失败不影响其他文档；每个文档的页面始终按顺序串行处理。

use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::loaders::{load_document_paths, DocumentSource, PageTextSource};
use crate::models::question::count_questions;
use crate::orchestrator::ConversationOrchestrator;
use crate::services::llm_service::{ConversationClient, OpenAiConversationClient};
use crate::utils::logging;
use crate::workflow::{question_file_for, DocumentSession, GenerationOptions};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: ConversationOrchestrator,
    source: Arc<dyn PageTextSource>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_concurrent_documents);

        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未配置 LLM_API_KEY，请求可能会被拒绝");
        }

        let client: Arc<dyn ConversationClient> = Arc::new(OpenAiConversationClient::new(&config));
        Ok(Self::with_parts(config, client, Arc::new(DocumentSource)))
    }

    /// 使用指定的客户端和页面来源组装应用
    pub fn with_parts(
        config: Config,
        client: Arc<dyn ConversationClient>,
        source: Arc<dyn PageTextSource>,
    ) -> Self {
        Self {
            config,
            orchestrator: ConversationOrchestrator::new(client),
            source,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        let documents = self.load_documents().await?;

        if documents.is_empty() {
            warn!("⚠️ 没有找到待处理的文档，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_documents_loaded(documents.len(), self.config.max_concurrent_documents);

        let stats = self.process_all_documents(documents).await?;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 扫描待处理的文档
    async fn load_documents(&self) -> Result<Vec<PathBuf>> {
        info!("\n📁 正在扫描待处理的文档...");
        load_document_paths(&self.config.documents_folder)
            .await
            .with_context(|| format!("无法扫描文档目录: {}", self.config.documents_folder))
    }

    /// 处理所有文档
    async fn process_all_documents(&self, documents: Vec<PathBuf>) -> Result<ProcessingStats> {
        let batch_size = self.config.max_concurrent_documents.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = documents.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_index, batch) in documents.chunks(batch_size).enumerate() {
            let batch_start = batch_index * batch_size;
            logging::log_batch_start(
                batch_index + 1,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let batch_result = self
                .process_batch(batch, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;

            logging::log_batch_complete(
                batch_index + 1,
                batch_result.success,
                batch_result.success + batch_result.failed,
            );
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[PathBuf],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, document) in batch.iter().enumerate() {
            let document_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let document = document.clone();
            let orchestrator = self.orchestrator.clone();
            let source = self.source.clone();
            let questions_folder = PathBuf::from(&self.config.questions_folder);
            let options = GenerationOptions {
                question_type: self.config.question_type,
                questions_per_page: self.config.questions_per_page,
            };

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                process_document(
                    document_index,
                    &document,
                    &questions_folder,
                    source.as_ref(),
                    &orchestrator,
                    options,
                )
                .await
            }));
        }

        let mut result = BatchResult::default();
        for (idx, joined) in join_all(handles).await.into_iter().enumerate() {
            let document_index = batch_start + idx + 1;
            match joined {
                Ok(Ok(())) => result.success += 1,
                Ok(Err(e)) => {
                    error!("[文档 {}] ❌ 处理过程中发生错误: {:#}", document_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[文档 {}] 任务执行失败: {}", document_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理单个文档：打开会话 → 重新生成 → 保存
pub async fn process_document(
    document_index: usize,
    document: &Path,
    questions_folder: &Path,
    source: &dyn PageTextSource,
    orchestrator: &ConversationOrchestrator,
    options: GenerationOptions,
) -> Result<()> {
    info!("[文档 {}] 开始处理: {}", document_index, document.display());

    let question_file = question_file_for(document, questions_folder);
    let mut session = DocumentSession::open(document_index, document, question_file).await?;

    let questions = session
        .regenerate(source, orchestrator, options)
        .await
        .with_context(|| format!("文档处理失败: {}", document.display()))?;

    info!(
        "[文档 {}] ✅ 文档处理完成: {} 页, {} 道题目",
        document_index,
        questions.len(),
        count_questions(questions)
    );

    Ok(())
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}
