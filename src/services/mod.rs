pub mod generation_service;
pub mod prompt_builder;
pub mod response_parser;
pub mod text_extractor;

pub use generation_service::{Backoff, GenerationClient, RetryPolicy};
pub use prompt_builder::PromptBuilder;
pub use response_parser::ResponseParser;
pub use text_extractor::{ExtractedText, TextExtractor};
