//! 出题请求上下文
//!
//! 封装"我正在处理哪一个请求、哪个科目"这一信息，用于日志前缀

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// 出题请求上下文
#[derive(Debug, Clone)]
pub struct QuizCtx {
    /// 进程内递增的请求编号
    pub request_id: u64,
    /// 科目
    pub subject: String,
}

impl QuizCtx {
    /// 创建新的请求上下文，自动分配编号
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            subject: subject.into(),
        }
    }
}

impl Display for QuizCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[请求 #{} 科目 {}]", self.request_id, self.subject)
    }
}
