pub mod loaders;
pub mod question;

pub use loaders::{load_document_paths, DocumentSource, PageTextSource};
pub use question::{
    DocumentQuestionSet, PageQuestionSet, PageText, QuestionRecord, QuestionType,
};
