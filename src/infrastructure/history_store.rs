//! 历史记录存储 - 基础设施层
//!
//! 每个科目一个 JSON 文件，内容为题目数组，新批次插在最前面。
//!
//! 写入流程：
//! 1. 获取该科目的互斥锁（不同科目互不阻塞）
//! 2. 读取现有记录
//! 3. 新批次 + 旧记录 → 写入同目录临时文件
//! 4. `persist` 原子替换目标文件
//!
//! 读者只会看到完整的旧文件或完整的新文件。

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::HistoryError;
use crate::models::QuestionRecord;

const HISTORY_EXT: &str = "json";

/// 历史记录存储
pub struct HistoryStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl HistoryStore {
    /// 创建存储，目录在首次写入时创建
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把新批次插到科目历史的最前面
    ///
    /// # 参数
    /// - `subject`: 科目名
    /// - `batch`: 本次生成的题目
    ///
    /// # 返回
    /// 返回写入后该科目的题目总数
    pub async fn append(
        &self,
        subject: &str,
        batch: &[QuestionRecord],
    ) -> Result<usize, HistoryError> {
        let lock = self.subject_lock(subject);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(subject, batch).await
        };
        self.release_lock(subject, lock);
        result
    }

    async fn append_locked(
        &self,
        subject: &str,
        batch: &[QuestionRecord],
    ) -> Result<usize, HistoryError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| HistoryError::io(self.root.display().to_string(), e))?;

        let path = self.subject_path(subject);
        let existing = read_records(&path).await?;

        let mut merged = Vec::with_capacity(batch.len() + existing.len());
        merged.extend_from_slice(batch);
        merged.extend(existing);
        let total = merged.len();

        let body = serde_json::to_vec_pretty(&merged)?;
        let dir = self.root.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &body))
            .await
            .map_err(|e| HistoryError::Task(e.to_string()))??;

        info!(
            "💾 科目 [{}] 新增 {} 道题，历史共 {} 道",
            subject,
            batch.len(),
            total
        );
        Ok(total)
    }

    /// 读取科目历史（新的在前），未知科目返回空列表
    pub async fn read(&self, subject: &str) -> Result<Vec<QuestionRecord>, HistoryError> {
        read_records(&self.subject_path(subject)).await
    }

    /// 列出所有写入过的科目（按名称排序）
    pub async fn list_subjects(&self) -> Result<Vec<String>, HistoryError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::io(self.root.display().to_string(), e)),
        };

        let mut subjects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HistoryError::io(self.root.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(HISTORY_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_subject(stem) {
                Some(subject) => subjects.push(subject),
                None => debug!("忽略无法识别的历史文件: {}", path.display()),
            }
        }

        subjects.sort();
        Ok(subjects)
    }

    fn subject_path(&self, subject: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", encode_subject(subject), HISTORY_EXT))
    }

    fn subject_lock(&self, subject: &str) -> Arc<tokio::sync::Mutex<()>> {
        // 锁表只在这里短暂持有；中毒时沿用内部数据
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(subject.to_string()).or_default().clone()
    }

    /// 没有其它写入者等待时移除该科目的锁，锁表只保留正在写入的科目
    fn release_lock(&self, subject: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // 锁表一份 + 本次调用一份
        let idle = locks
            .get(subject)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(subject);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

async fn read_records(path: &Path) -> Result<Vec<QuestionRecord>, HistoryError> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HistoryError::io(path.display().to_string(), e)),
    };

    serde_json::from_slice(&content).map_err(|source| {
        warn!("历史记录文件无法解析: {}", path.display());
        HistoryError::Corrupt {
            path: path.display().to_string(),
            source,
        }
    })
}

fn write_atomic(dir: &Path, target: &Path, body: &[u8]) -> Result<(), HistoryError> {
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| HistoryError::io(dir.display().to_string(), e))?;
    tmp.write_all(body)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| HistoryError::io(tmp.path().display().to_string(), e))?;
    tmp.persist(target)
        .map_err(|e| HistoryError::io(target.display().to_string(), e.error))?;
    Ok(())
}

/// 科目名 → 文件名
///
/// 百分号编码，`.` 也编码为 `%2E`，文件名中不会出现 `/` 或 `..`
pub(crate) fn encode_subject(subject: &str) -> String {
    urlencoding::encode(subject).replace('.', "%2E")
}

/// 文件名 → 科目名，不是 [`encode_subject`] 的输出时返回 `None`
pub(crate) fn decode_subject(stem: &str) -> Option<String> {
    let subject = urlencoding::decode(stem).ok()?.into_owned();
    (encode_subject(&subject) == stem).then_some(subject)
}
