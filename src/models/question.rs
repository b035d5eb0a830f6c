use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// 单页文本，提取后不再修改
pub type PageText = String;

/// 一道题目，可选地附带答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl QuestionRecord {
    /// 只有题目、没有答案的记录
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            question: text.into(),
            answer: None,
        }
    }

    /// 题目和答案都存在的记录
    pub fn with_answer(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: Some(answer.into()),
        }
    }

    pub fn has_answer(&self) -> bool {
        self.answer.is_some()
    }
}

/// 一页的题目，按生成顺序排列
pub type PageQuestionSet = Vec<QuestionRecord>;

/// 整个文档的题目，第 i 项对应源文档的第 i 页
pub type DocumentQuestionSet = Vec<PageQuestionSet>;

/// 题目类型，只影响提示词，不影响记录结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Comprehension,
    Analysis,
    Both,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Comprehension => "comprehension",
            QuestionType::Analysis => "analysis",
            QuestionType::Both => "both",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comprehension" => Ok(QuestionType::Comprehension),
            "analysis" => Ok(QuestionType::Analysis),
            "both" => Ok(QuestionType::Both),
            _ => Err(ConfigError::UnknownQuestionType {
                value: s.to_string(),
            }),
        }
    }
}

/// 统计整个文档中的题目数量
pub fn count_questions(document: &DocumentQuestionSet) -> usize {
    document.iter().map(Vec::len).sum()
}

/// 统计整个文档中带答案的题目数量
pub fn count_answers(document: &DocumentQuestionSet) -> usize {
    document
        .iter()
        .flatten()
        .filter(|record| record.has_answer())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_from_str() {
        assert_eq!(
            "Comprehension".parse::<QuestionType>().unwrap(),
            QuestionType::Comprehension
        );
        assert_eq!(" both ".parse::<QuestionType>().unwrap(), QuestionType::Both);
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn test_counts() {
        let document = vec![
            vec![
                QuestionRecord::with_answer("C1: What is X?", "Answer: Y."),
                QuestionRecord::question("C2: What is Z?"),
            ],
            vec![],
            vec![QuestionRecord::question("A1: Why?")],
        ];
        assert_eq!(count_questions(&document), 3);
        assert_eq!(count_answers(&document), 1);
    }
}
