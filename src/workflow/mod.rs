pub mod document_session;
pub mod page_ctx;

pub use document_session::{question_file_for, DocumentSession, GenerationOptions};
pub use page_ctx::PageCtx;
