use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, AppResult, FileError};
use crate::models::question::QuestionType;

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的文档数量
    pub max_concurrent_documents: usize,
    /// 待处理文档所在目录
    pub documents_folder: String,
    /// 题目文件存放目录
    pub questions_folder: String,
    /// 题目类型
    pub question_type: QuestionType,
    /// 每页生成的题目数量
    pub questions_per_page: u32,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_documents: 4,
            documents_folder: "documents".to_string(),
            questions_folder: "questions".to_string(),
            question_type: QuestionType::Comprehension,
            questions_per_page: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1024,
        }
    }
}

impl Config {
    /// 加载配置：`CONFIG_FILE`（默认 `config.toml`）存在时先读文件，再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(Path::new(&path))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        Self::from_toml_str(&content).map_err(|source| {
            FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            max_concurrent_documents: env_parse("MAX_CONCURRENT_DOCUMENTS")
                .unwrap_or(self.max_concurrent_documents),
            documents_folder: std::env::var("DOCUMENTS_FOLDER").unwrap_or(self.documents_folder),
            questions_folder: std::env::var("QUESTIONS_FOLDER").unwrap_or(self.questions_folder),
            question_type: env_parse("QUESTION_TYPE").unwrap_or(self.question_type),
            questions_per_page: env_parse("QUESTIONS_PER_PAGE").unwrap_or(self.questions_per_page),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(self.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(self.llm_max_tokens),
        }
    }
}

/// 读取并解析环境变量，解析失败时记录警告并忽略
fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(
                "{}",
                crate::error::ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: std::any::type_name::<T>().to_string(),
                }
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            question_type = "both"
            questions_per_page = 6
            llm_model_name = "local-model"
            "#,
        )
        .unwrap();

        assert_eq!(config.question_type, QuestionType::Both);
        assert_eq!(config.questions_per_page, 6);
        assert_eq!(config.llm_model_name, "local-model");
        assert_eq!(config.questions_folder, "questions");
        assert_eq!(config.max_concurrent_documents, 4);
    }

    #[test]
    fn test_invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "questions_per_page = \"many\"").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(matches!(
            err,
            AppError::File(FileError::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_toml_file(Path::new("/no/such/config.toml")).unwrap_err();
        assert!(err.is_file_unavailable());
    }
}
