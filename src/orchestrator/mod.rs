//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文档处理器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 扫描待处理文档（Vec<PathBuf>）
//! - 控制并发数量（Semaphore）
//! - 每个文档一个独立的 DocumentSession
//!
//! ### `conversation` - 单个文档的会话编排器
//! - 按页顺序发送请求，线程化会话链接
//! - 整理每页回复，汇总为整个文档的题目
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Document>)
//!     ↓
//! workflow::DocumentSession (读取 → 生成 → 保存)
//!     ↓
//! conversation (处理 Vec<PageText>)
//!     ↓
//! services (能力层：llm / structurer / prompt / question_file)
//! ```

pub mod batch_processor;
pub mod conversation;

pub use batch_processor::App;
pub use conversation::{ConversationOrchestrator, GenerationRun};
