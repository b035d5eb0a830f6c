//! 会话编排器 - 编排层
//!
//! ## 职责
//!
//! 按页顺序驱动一次多轮对话，把每页的回复整理成题目并按页汇总。
//!
//! ## 顺序保证
//!
//! - 第 i+1 页的请求必须等第 i 页的回复返回后才能发出
//! - [`GenerationRun`] 独占会话链接，每一轮都需要 `&mut self`，
//!   同一次运行中不可能出现两个并发请求
//! - 任意一页失败都会中止整个运行，不返回部分结果，不自动重试
//!
//! 不同文档的运行互不影响，可以并发执行；同一文档的并发运行需要调用方自行避免。

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BusinessError, LlmError};
use crate::models::question::{DocumentQuestionSet, PageQuestionSet, PageText, QuestionType};
use crate::services::llm_service::{ConversationClient, ConversationLink};
use crate::services::prompt_builder::build_page_prompt;
use crate::services::response_structurer::ResponseStructurer;
use crate::utils::logging::{page_preview, truncate_text};
use crate::workflow::PageCtx;

/// 会话编排器
///
/// 持有对话客户端和回复结构化器，可以廉价克隆后放入并发任务
#[derive(Clone)]
pub struct ConversationOrchestrator {
    client: Arc<dyn ConversationClient>,
    structurer: Arc<ResponseStructurer>,
}

impl ConversationOrchestrator {
    pub fn new(client: Arc<dyn ConversationClient>) -> Self {
        Self::with_structurer(client, ResponseStructurer::new())
    }

    pub fn with_structurer(client: Arc<dyn ConversationClient>, structurer: ResponseStructurer) -> Self {
        Self {
            client,
            structurer: Arc::new(structurer),
        }
    }

    /// 为整个文档生成题目
    ///
    /// # 参数
    /// - `document_index`: 文档索引（用于日志）
    /// - `pages`: 按顺序排列的页面文本，不能为空
    /// - `question_type`: 题目类型
    /// - `count`: 每页题目数量，必须大于 0
    ///
    /// # 返回
    /// 返回与页面一一对应的题目集；任意一页失败则返回 `AppError::Generation`
    pub async fn generate(
        &self,
        document_index: usize,
        pages: &[PageText],
        question_type: QuestionType,
        count: u32,
    ) -> AppResult<DocumentQuestionSet> {
        if pages.is_empty() {
            return Err(BusinessError::EmptyDocument.into());
        }
        if count == 0 {
            return Err(BusinessError::InvalidQuestionCount { count }.into());
        }

        info!(
            "[文档 {}] 开始生成题目: {} 页, 类型 {}, 每页 {} 题",
            document_index,
            pages.len(),
            question_type,
            count
        );

        let mut run = GenerationRun::new(
            self.client.as_ref(),
            self.structurer.as_ref(),
            question_type,
            count,
        );
        let mut document = DocumentQuestionSet::with_capacity(pages.len());

        for (page_index, page_text) in pages.iter().enumerate() {
            let ctx = PageCtx::new(document_index, page_index, pages.len());

            match run.next_page(&ctx, page_text).await {
                Ok(page) => document.push(page),
                Err(e) => {
                    error!("{} ❌ 生成失败，中止整个文档: {}", ctx, e);
                    run.finish().await;
                    return Err(AppError::generation_failed(page_index, e));
                }
            }
        }

        run.finish().await;

        info!(
            "[文档 {}] ✅ 题目生成完成: {} 页, 共 {} 题",
            document_index,
            document.len(),
            crate::models::question::count_questions(&document)
        );

        Ok(document)
    }
}

/// 一次文档运行
///
/// 独占会话链接：第一页开启会话，之后每页都携带上一页返回的链接并重新绑定
pub struct GenerationRun<'a> {
    client: &'a dyn ConversationClient,
    structurer: &'a ResponseStructurer,
    question_type: QuestionType,
    count: u32,
    link: Option<ConversationLink>,
}

impl<'a> GenerationRun<'a> {
    pub fn new(
        client: &'a dyn ConversationClient,
        structurer: &'a ResponseStructurer,
        question_type: QuestionType,
        count: u32,
    ) -> Self {
        Self {
            client,
            structurer,
            question_type,
            count,
            link: None,
        }
    }

    /// 当前的会话链接
    pub fn link(&self) -> Option<&ConversationLink> {
        self.link.as_ref()
    }

    /// 处理下一页
    ///
    /// 成功时重新绑定会话链接；失败时链接保持不变
    pub async fn next_page(
        &mut self,
        ctx: &PageCtx,
        page_text: &str,
    ) -> Result<PageQuestionSet, LlmError> {
        let prompt = build_page_prompt(self.question_type, self.count, page_text);

        info!(
            "{} 🤖 正在生成题目{}...",
            ctx,
            if ctx.is_first() { "（新会话）" } else { "" }
        );
        debug!("{} 提示词: {}", ctx, truncate_text(&prompt, 120));

        let turn = self.client.send_turn(&prompt, self.link.as_ref()).await?;
        self.link = Some(turn.link);

        let page = self.structurer.structure(&turn.reply);
        info!("{} ✓ 得到 {} 道题目", ctx, page.len());
        debug!("{} {}", ctx, truncate_text(&page_preview(&page), 200));

        Ok(page)
    }

    /// 结束运行并丢弃会话链接
    pub async fn finish(mut self) {
        if let Some(link) = self.link.take() {
            self.client.end_conversation(&link).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::Turn;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio_test::assert_err;

    /// 按脚本回复的对话客户端，记录每次请求
    #[derive(Default)]
    struct ScriptedClient {
        replies: Vec<Result<String, String>>,
        calls: Mutex<Vec<(String, Option<ConversationLink>)>>,
        ended: Mutex<Vec<ConversationLink>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ConversationClient for ScriptedClient {
        async fn send_turn(
            &self,
            prompt: &str,
            link: Option<&ConversationLink>,
        ) -> Result<Turn, LlmError> {
            let turn_index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((prompt.to_string(), link.cloned()));
                calls.len() - 1
            };
            let reply = self.replies[turn_index].clone().map_err(LlmError::Other)?;
            Ok(Turn {
                reply,
                link: ConversationLink {
                    conversation_id: "conv".to_string(),
                    message_id: format!("msg-{}", turn_index),
                },
            })
        }

        async fn end_conversation(&self, link: &ConversationLink) {
            self.ended.lock().unwrap().push(link.clone());
        }
    }

    fn pages(texts: &[&str]) -> Vec<PageText> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_links_are_threaded_in_page_order() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("C1: One?\nAnswer: 1."),
            Ok("C1: Two?\nC2: Three?"),
            Ok("Questions: Four? Five?"),
        ]));
        let orchestrator = ConversationOrchestrator::new(client.clone());

        let document = orchestrator
            .generate(
                1,
                &pages(&["page one  \n", "page two", "page three"]),
                QuestionType::Comprehension,
                2,
            )
            .await
            .unwrap();

        assert_eq!(document.len(), 3);
        assert_eq!(document[0].len(), 1);
        assert_eq!(document[0][0].answer.as_deref(), Some("Answer: 1."));
        assert_eq!(document[1].len(), 2);
        assert_eq!(document[2][1].question, "Five?");

        let calls = client.calls.lock().unwrap();
        assert!(calls[0].1.is_none());
        assert_eq!(calls[1].1.as_ref().unwrap().message_id, "msg-0");
        assert_eq!(calls[2].1.as_ref().unwrap().message_id, "msg-1");

        // 每页的提示词只包含当前页文本，且去掉了末尾空白
        assert!(calls[0].0.contains("\"page one\""));
        assert!(!calls[1].0.contains("page one"));
        assert!(calls[2].0.contains("page three"));

        let ended = client.ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].message_id, "msg-2");
    }

    #[tokio::test]
    async fn test_failure_aborts_whole_run() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("C1: One?\nC2: Two?"),
            Err("service unavailable"),
            Ok("C1: never requested?"),
        ]));
        let orchestrator = ConversationOrchestrator::new(client.clone());

        let err = assert_err!(
            orchestrator
                .generate(1, &pages(&["a", "b", "c"]), QuestionType::Analysis, 2)
                .await
        );

        assert!(matches!(err, AppError::Generation { page: 1, .. }));
        assert_eq!(client.calls.lock().unwrap().len(), 2);
        // 失败后仍然丢弃第一页建立的会话
        assert_eq!(client.ended.lock().unwrap()[0].message_id, "msg-0");
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let orchestrator = ConversationOrchestrator::new(client.clone());

        let err = assert_err!(orchestrator.generate(1, &[], QuestionType::Both, 4).await);
        assert!(matches!(err, AppError::Business(BusinessError::EmptyDocument)));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_question_count_is_rejected() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let orchestrator = ConversationOrchestrator::new(client.clone());

        let err = assert_err!(
            orchestrator
                .generate(1, &pages(&["a"]), QuestionType::Comprehension, 0)
                .await
        );
        assert!(matches!(
            err,
            AppError::Business(BusinessError::InvalidQuestionCount { count: 0 })
        ));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_keeps_page_alignment() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(""), Ok("C1: Only?\nC2: Two?")]));
        let orchestrator = ConversationOrchestrator::new(client);

        let document = orchestrator
            .generate(1, &pages(&["a", "b"]), QuestionType::Comprehension, 2)
            .await
            .unwrap();

        assert_eq!(document.len(), 2);
        assert!(document[0].is_empty());
        assert_eq!(document[1].len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_follows_question_type() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("A1: x?\nA2: y?")]));
        let orchestrator = ConversationOrchestrator::new(client.clone());

        orchestrator
            .generate(1, &pages(&["text"]), QuestionType::Both, 3)
            .await
            .unwrap();

        let calls = client.calls.lock().unwrap();
        assert!(calls[0].0.contains("Write 2 comprehension questions"));
        assert!(calls[0].0.contains("write 1 analysis questions"));
    }

    #[tokio::test]
    async fn test_generation_run_rebinds_link_only_on_success() {
        let client = ScriptedClient::new(vec![Ok("C1: a?\nC2: b?"), Err("boom")]);
        let structurer = ResponseStructurer::new();
        let mut run = GenerationRun::new(&client, &structurer, QuestionType::Comprehension, 2);

        assert!(run.link().is_none());
        run.next_page(&PageCtx::new(1, 0, 2), "a").await.unwrap();
        assert_eq!(run.link().unwrap().message_id, "msg-0");

        assert!(run.next_page(&PageCtx::new(1, 1, 2), "b").await.is_err());
        assert_eq!(run.link().unwrap().message_id, "msg-0");

        run.finish().await;
        assert_eq!(client.ended.lock().unwrap().len(), 1);
    }
}
