use std::path::Path;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 某一页的生成调用失败，整个文档的运行被中止
    #[error("第 {page} 页生成失败: {source}")]
    Generation {
        /// 失败页的索引（从 0 开始）
        page: usize,
        #[source]
        source: LlmError,
    },
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 会话链接指向不存在的会话或消息
    #[error("未知的会话: {conversation_id} / 消息 {message_id}")]
    UnknownConversation {
        conversation_id: String,
        message_id: String,
    },
    /// 其他客户端实现返回的错误
    #[error("{0}")]
    Other(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 文档没有任何页面
    #[error("文档没有可处理的页面")]
    EmptyDocument,
    /// 每页题目数量必须为正数
    #[error("每页题目数量无效: {count}")]
    InvalidQuestionCount { count: u32 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 未知的题目类型
    #[error("未知的题目类型: {value}")]
    UnknownQuestionType { value: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误；文件不存在时归类为 `FileError::NotFound`
    pub fn file_read_failed(path: &Path, source: std::io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound { path })
        } else {
            AppError::File(FileError::ReadFailed { path, source })
        }
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建页面生成失败错误
    pub fn generation_failed(page: usize, source: LlmError) -> Self {
        AppError::Generation { page, source }
    }

    /// 问题文件不存在属于可恢复的情况，调用方应当以空题目集继续
    pub fn is_file_unavailable(&self) -> bool {
        matches!(self, AppError::File(FileError::NotFound { .. }))
    }

    /// 是否为生成阶段的硬失败
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, AppError::Generation { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
