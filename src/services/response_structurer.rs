//! 回复结构化 - 业务能力层
//!
//! 把 LLM 对单页的自由文本回复整理成题目记录列表。
//!
//! 规则按顺序尝试，第一个适用的切分规则生效：
//! 1. [`LineSplit`] - 按行切分，至少两行非空时生效
//! 2. [`QuestionMarkSplit`] - 只有一行时按 `?` 切分
//!
//! 切分之后，每一项再经过题目/答案拆分：
//! - 同一行内 `C1: ... Answer: ...` 拆成题目和答案
//! - 独立的 `Answer: ...` 行挂到前一道题目上
//!
//! 整个过程是纯函数，相同输入永远得到相同输出。

use regex::Regex;
use std::sync::OnceLock;

use crate::models::question::{PageQuestionSet, QuestionRecord};

/// 回复只有一行时，部分模型会在开头加上这个前缀
const QUESTIONS_PREFIX: &str = "Questions:";

/// 答案行的固定前缀
const ANSWER_PREFIX: &str = "Answer:";

/// 切分规则：把原始回复切成若干候选项
///
/// 返回 `None` 表示本规则不适用，交给下一条规则
pub trait SplitRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn split(&self, reply: &str) -> Option<Vec<String>>;
}

/// 规则 1：按换行切分
#[derive(Debug, Default, Clone, Copy)]
pub struct LineSplit;

impl SplitRule for LineSplit {
    fn name(&self) -> &'static str {
        "line"
    }

    fn split(&self, reply: &str) -> Option<Vec<String>> {
        let lines = non_empty_lines(reply);
        (lines.len() >= 2).then_some(lines)
    }
}

/// 规则 2：整段回复没有换行，按问号切分
#[derive(Debug, Default, Clone, Copy)]
pub struct QuestionMarkSplit;

impl SplitRule for QuestionMarkSplit {
    fn name(&self) -> &'static str {
        "question-mark"
    }

    fn split(&self, reply: &str) -> Option<Vec<String>> {
        let lines = non_empty_lines(reply);
        let [paragraph] = lines.as_slice() else {
            return None;
        };

        let fragments = paragraph
            .split('?')
            .enumerate()
            .map(|(index, fragment)| {
                let fragment = fragment.trim();
                if index == 0 {
                    fragment
                        .strip_prefix(QUESTIONS_PREFIX)
                        .map(str::trim)
                        .unwrap_or(fragment)
                } else {
                    fragment
                }
            })
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| format!("{}?", fragment))
            .collect();

        Some(fragments)
    }
}

/// 回复结构化器
///
/// 持有有序的切分规则列表，可以单独替换或测试每条规则
pub struct ResponseStructurer {
    rules: Vec<Box<dyn SplitRule>>,
}

impl Default for ResponseStructurer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseStructurer {
    /// 使用默认规则链（按行 → 按问号）
    pub fn new() -> Self {
        Self::with_rules(vec![Box::new(LineSplit), Box::new(QuestionMarkSplit)])
    }

    pub fn with_rules(rules: Vec<Box<dyn SplitRule>>) -> Self {
        Self { rules }
    }

    /// 把一次回复整理成单页题目集
    ///
    /// 没有任何非空行时返回空列表，而不是错误
    pub fn structure(&self, reply: &str) -> PageQuestionSet {
        let items = self
            .rules
            .iter()
            .find_map(|rule| {
                rule.split(reply).inspect(|items| {
                    tracing::debug!("回复使用 {} 规则切分为 {} 项", rule.name(), items.len());
                })
            })
            .unwrap_or_default();

        assemble_records(items)
    }
}

/// 使用默认规则链整理回复
pub fn structure_response(reply: &str) -> PageQuestionSet {
    ResponseStructurer::new().structure(reply)
}

/// 题目/答案拆分与挂接
///
/// - 同一项内包含题目编号和答案标记时拆成一条带答案的记录
/// - `Answer:` 开头的项挂到前一条尚无答案的记录上
/// - 其余项原样作为只有题目的记录
pub fn assemble_records<I, S>(items: I) -> PageQuestionSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut records: PageQuestionSet = Vec::new();

    for item in items {
        let item = item.as_ref();

        if let Some((question, answer)) = split_inline_answer(item) {
            records.push(QuestionRecord::with_answer(question, answer));
            continue;
        }

        if is_answer_line(item) {
            if let Some(last) = records.last_mut().filter(|record| !record.has_answer()) {
                last.answer = Some(item.trim().to_string());
                continue;
            }
        }

        records.push(QuestionRecord::question(item));
    }

    records
}

/// 拆分同一行里的 “题目编号 题目 答案标记 答案”
///
/// 题目编号形如 `C1:`、`Q2:`；答案标记为 `Answer:` 或 `A1:` 这样的 A 编号。
/// 答案标记前需要有空白，或紧跟在 `?`、`.`、`!` 之后
pub fn split_inline_answer(item: &str) -> Option<(String, String)> {
    let captures = inline_answer_pattern().captures(item.trim())?;
    let question = captures.name("question")?.as_str().trim();
    let answer = captures.name("answer")?.as_str().trim();
    Some((question.to_string(), answer.to_string()))
}

/// 是否为独立的答案行
pub fn is_answer_line(item: &str) -> bool {
    item.trim_start().starts_with(ANSWER_PREFIX)
}

fn inline_answer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // 常量模式，只会在首次使用时编译一次，不会失败
        Regex::new(
            r"^(?P<question>[A-Za-z]\d+:.+?(?:[?.!]\s*|\s+))(?P<answer>(?:Answer|A\d+):.*)$",
        )
        .expect("inline answer pattern is valid")
    })
}

fn non_empty_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
