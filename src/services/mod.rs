pub mod llm_service;
pub mod prompt_builder;
pub mod question_file;
pub mod response_structurer;

pub use llm_service::{ConversationClient, ConversationLink, OpenAiConversationClient, Turn};
pub use prompt_builder::build_page_prompt;
pub use question_file::QuestionFileCodec;
pub use response_structurer::{structure_response, ResponseStructurer, SplitRule};
