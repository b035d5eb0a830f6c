//! LLM 服务 - 业务能力层
//!
//! 只负责"发送一轮对话"能力，不关心页面顺序
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务
//!
//! Chat Completions 接口本身没有会话状态，这里在内存中保存每个会话的消息，
//! 通过 `(conversation_id, message_id)` 链接找回历史并拼接到下一轮请求中。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::LlmError;

/// 会话链接：会话 ID 与最后一条消息 ID
///
/// 只在一次文档处理中有效，不会被持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLink {
    pub conversation_id: String,
    pub message_id: String,
}

/// 一轮对话的结果
#[derive(Debug, Clone)]
pub struct Turn {
    pub reply: String,
    pub link: ConversationLink,
}

/// 对话式生成服务
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// 发送一轮对话；`link` 为 `None` 时开启新会话
    async fn send_turn(
        &self,
        prompt: &str,
        link: Option<&ConversationLink>,
    ) -> Result<Turn, LlmError>;

    /// 丢弃会话，默认不做任何事
    async fn end_conversation(&self, _link: &ConversationLink) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
}

/// 会话中保存的一条消息
#[derive(Debug, Clone)]
struct StoredMessage {
    role: Role,
    content: String,
    parent_id: Option<String>,
}

/// 一个会话内的所有消息，按 ID 索引
type ConversationStore = HashMap<String, StoredMessage>;

/// 基于 OpenAI 兼容接口的对话客户端
///
/// 职责：
/// - 调用 Chat Completions API
/// - 按父消息链重建历史
/// - 不关心页面、题目类型和文件
pub struct OpenAiConversationClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    conversations: Mutex<HashMap<String, ConversationStore>>,
}

impl OpenAiConversationClient {
    /// 创建新的对话客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 当前内存中保存的会话数量
    pub async fn open_conversations(&self) -> usize {
        self.conversations.lock().await.len()
    }

    fn api_error(&self, source: async_openai::error::OpenAIError) -> LlmError {
        LlmError::ApiCallFailed {
            model: self.model_name.clone(),
            source,
        }
    }

    fn build_messages(
        &self,
        history: &[StoredMessage],
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let mut messages = Vec::with_capacity(history.len() + 1);

        for message in history {
            let message = match message.role {
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(message.content.as_str())
                        .build()
                        .map_err(|e| self.api_error(e))?,
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(message.content.as_str())
                        .build()
                        .map_err(|e| self.api_error(e))?,
                ),
            };
            messages.push(message);
        }

        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| self.api_error(e))?,
        ));

        Ok(messages)
    }
}

#[async_trait]
impl ConversationClient for OpenAiConversationClient {
    async fn send_turn(
        &self,
        prompt: &str,
        link: Option<&ConversationLink>,
    ) -> Result<Turn, LlmError> {
        let history = match link {
            Some(link) => {
                let conversations = self.conversations.lock().await;
                let store = conversations.get(&link.conversation_id).ok_or_else(|| {
                    LlmError::UnknownConversation {
                        conversation_id: link.conversation_id.clone(),
                        message_id: link.message_id.clone(),
                    }
                })?;
                collect_history(store, &link.message_id).ok_or_else(|| {
                    LlmError::UnknownConversation {
                        conversation_id: link.conversation_id.clone(),
                        message_id: link.message_id.clone(),
                    }
                })?
            }
            None => Vec::new(),
        };

        debug!(
            "调用 LLM API，模型: {}，历史消息: {} 条，提示词长度: {} 字符",
            self.model_name,
            history.len(),
            prompt.len()
        );

        let messages = self.build_messages(&history, prompt)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.api_error(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.api_error(e)
        })?;

        debug!("LLM API 调用成功");

        let reply = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        let conversation_id = link
            .map(|link| link.conversation_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_id = Uuid::new_v4().to_string();
        let assistant_id = Uuid::new_v4().to_string();

        let mut conversations = self.conversations.lock().await;
        let store = conversations.entry(conversation_id.clone()).or_default();
        store.insert(
            user_id.clone(),
            StoredMessage {
                role: Role::User,
                content: prompt.to_string(),
                parent_id: link.map(|link| link.message_id.clone()),
            },
        );
        store.insert(
            assistant_id.clone(),
            StoredMessage {
                role: Role::Assistant,
                content: reply.clone(),
                parent_id: Some(user_id),
            },
        );

        Ok(Turn {
            reply,
            link: ConversationLink {
                conversation_id,
                message_id: assistant_id,
            },
        })
    }

    async fn end_conversation(&self, link: &ConversationLink) {
        if self
            .conversations
            .lock()
            .await
            .remove(&link.conversation_id)
            .is_some()
        {
            debug!("会话 {} 已结束", link.conversation_id);
        }
    }
}

/// 从最后一条消息沿父链回溯，返回按时间顺序排列的历史
fn collect_history(store: &ConversationStore, last_message_id: &str) -> Option<Vec<StoredMessage>> {
    let mut history = Vec::new();
    let mut cursor = Some(last_message_id.to_string());

    while let Some(id) = cursor {
        let message = store.get(&id)?;
        cursor = message.parent_id.clone();
        history.push(message.clone());
    }

    history.reverse();
    Some(history)
}
