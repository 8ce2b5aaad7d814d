pub mod question;

pub use question::{
    GenerationRequest, QuestionRecord, QuizParams, DEFAULT_QUESTION_COUNT,
    DEFAULT_QUESTION_TYPE, DEFAULT_SUBJECT,
};
