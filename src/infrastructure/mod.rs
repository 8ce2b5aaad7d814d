pub mod history_store;
pub mod pdf_reader;

pub use history_store::HistoryStore;
pub use pdf_reader::{LopdfReader, PageTextSource};
