pub mod page_source;

pub use page_source::{
    load_document_paths, split_form_feed_pages, DocumentSource, FormFeedTextSource,
    JsonPagesSource, PageTextSource,
};
