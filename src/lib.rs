//! # Page Questions
//!
//! 逐页驱动对话式 LLM，为多页文档生成学习题目并保存为可编辑的文本文件
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/question` - 题目记录、单页题目集、文档题目集、题目类型
//! - `models/loaders` - 页面文本来源（换页符文本 / JSON 数组）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `ConversationClient` - 发送一轮对话，线程化会话链接
//! - `ResponseStructurer` - 把自由文本回复整理成题目记录
//! - `QuestionFileCodec` - 题目文件的编码、解码与读写
//!
//! ### ③ 流程层（Workflow）
//! - `DocumentSession` - 单个文档请求的上下文（读取 → 生成 → 保存）
//! - `PageCtx` - 页面上下文（文档索引 + 页码）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/conversation` - 单个文档的逐页会话编排
//! - `orchestrator/batch_processor` - 批量文档处理器，管理并发
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{DocumentQuestionSet, PageQuestionSet, PageText, QuestionRecord, QuestionType};
pub use orchestrator::{App, ConversationOrchestrator};
pub use services::{ConversationClient, ConversationLink, QuestionFileCodec, ResponseStructurer};
pub use workflow::{DocumentSession, GenerationOptions, PageCtx};
