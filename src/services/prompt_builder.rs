//! 提示词构建
//!
//! 提示词只由题目类型、每页题目数量和当前页文本决定，
//! 后续页面不重复之前页面的文本，上下文由会话链接保持。

use crate::models::question::QuestionType;

/// 分析题的固定说明
const ANALYSIS_PREAMBLE: &str = "Analysis questions ask the reader to go beyond recalling facts: \
they require examining how ideas in the text relate to each other, evaluating the evidence and \
reasoning behind the claims, and applying the findings to new situations.";

/// 构建单页提示词
///
/// 页面文本末尾的空白会被去掉
pub fn build_page_prompt(question_type: QuestionType, count: u32, page_text: &str) -> String {
    let text = page_text.trim_end();

    match question_type {
        QuestionType::Comprehension => format!(
            "Write {count} comprehension questions followed by answers to the questions on a new line \
             about the following research article: \"{text}\". {}",
            numbering_instructions("C")
        ),
        QuestionType::Analysis => format!(
            "{ANALYSIS_PREAMBLE} Write {count} analysis questions followed by answers to the questions \
             on a new line about the following research article: \"{text}\". {}",
            numbering_instructions("A")
        ),
        QuestionType::Both => {
            let (comprehension, analysis) = split_both_count(count);
            let mut prompt = format!(
                "Write {comprehension} comprehension questions followed by answers to the questions \
                 on a new line about the following research article: \"{text}\". {}",
                numbering_instructions("C")
            );
            if analysis > 0 {
                prompt.push_str(&format!(
                    " {ANALYSIS_PREAMBLE} After the comprehension questions, write {analysis} analysis \
                     questions followed by answers about the same article. {}",
                    numbering_instructions("A")
                ));
            }
            prompt
        }
    }
}

/// `Both` 模式下的题目数量分配：理解题向上取整，分析题向下取整
pub fn split_both_count(count: u32) -> (u32, u32) {
    (count.div_ceil(2), count / 2)
}

fn numbering_instructions(letter: &str) -> String {
    format!(
        "Number these questions with {article} {letter} (like {letter}1, {letter}2, etc) and output \
         each question to a new line. Output an answer preceded with 'Answer:' to a new line after \
         each question.",
        article = if letter == "A" { "an" } else { "a" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comprehension_prompt_matches_template() {
        let prompt = build_page_prompt(QuestionType::Comprehension, 4, "Cells divide.  \n\n");
        assert_eq!(
            prompt,
            "Write 4 comprehension questions followed by answers to the questions on a new line \
             about the following research article: \"Cells divide.\". Number these questions with \
             a C (like C1, C2, etc) and output each question to a new line. Output an answer \
             preceded with 'Answer:' to a new line after each question."
        );
    }

    #[test]
    fn test_analysis_prompt_has_preamble_and_a_numbering() {
        let prompt = build_page_prompt(QuestionType::Analysis, 3, "Text");
        assert!(prompt.starts_with(ANALYSIS_PREAMBLE));
        assert!(prompt.contains("Write 3 analysis questions"));
        assert!(prompt.contains("with an A (like A1, A2, etc)"));
    }

    #[test]
    fn test_both_prompt_splits_count() {
        let prompt = build_page_prompt(QuestionType::Both, 5, "Text");
        assert!(prompt.contains("Write 3 comprehension questions"));
        assert!(prompt.contains("write 2 analysis questions"));
        assert!(prompt.contains("(like C1, C2, etc)"));
        assert!(prompt.contains("(like A1, A2, etc)"));
    }

    #[test]
    fn test_both_with_single_question_has_no_analysis_part() {
        let prompt = build_page_prompt(QuestionType::Both, 1, "Text");
        assert!(prompt.contains("Write 1 comprehension questions"));
        assert!(!prompt.contains("analysis"));
    }

    #[test]
    fn test_split_both_count() {
        assert_eq!(split_both_count(1), (1, 0));
        assert_eq!(split_both_count(4), (2, 2));
        assert_eq!(split_both_count(7), (4, 3));
    }
}
