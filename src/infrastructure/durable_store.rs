//! 持久化键值存储 - 基础设施层
//!
//! 只暴露 get / set / delete 能力，不认识答案或考生

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{AppError, AppResult};

/// 持久化键值存储
///
/// `set` 返回即表示已落盘，进程随后崩溃也不会丢失。
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn delete(&self, key: &str) -> AppResult<()>;
}

/// 基于目录的文件存储，每个键一个 JSON 文件
///
/// 写入流程：写临时文件 → fsync → rename 覆盖，保证崩溃时要么是旧值要么是新值。
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// 打开（必要时创建）存储目录
    pub fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::storage_write_failed(dir.display().to_string(), e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn sync_dir(&self) {
        // 目录 fsync 在部分平台不支持，失败只记录
        if let Ok(dir) = File::open(&self.dir) {
            if let Err(e) = dir.sync_all() {
                debug!("目录 fsync 失败 ({}): {}", self.dir.display(), e);
            }
        }
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage_read_failed(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file =
            File::create(&tmp_path).map_err(|e| AppError::storage_write_failed(key, e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| AppError::storage_write_failed(key, e))?;
        file.sync_all()
            .map_err(|e| AppError::storage_write_failed(key, e))?;
        drop(file);

        fs::rename(&tmp_path, &path).map_err(|e| AppError::storage_write_failed(key, e))?;
        self.sync_dir();

        debug!("已写入 {} ({} 字节)", path.display(), value.len());
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.sync_dir();
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage_delete_failed(key, e)),
        }
    }
}

/// 内存存储，用于测试和无盘环境
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Other("内存存储锁已中毒".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("exam-store-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = temp_dir();
        {
            let store = FileStore::open(&dir).unwrap();
            store.set("answers_PY101_en", r#"{"1":"A"}"#).unwrap();
        }

        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(
            reopened.get("answers_PY101_en").unwrap().as_deref(),
            Some(r#"{"1":"A"}"#)
        );
        assert!(!dir.join("answers_PY101_en.json.tmp").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_delete_is_idempotent() {
        let dir = temp_dir();
        let store = FileStore::open(&dir).unwrap();

        store.set("candidateInfo", "{}").unwrap();
        store.delete("candidateInfo").unwrap();
        store.delete("candidateInfo").unwrap();
        assert_eq!(store.get("candidateInfo").unwrap(), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_key_is_sanitized() {
        let dir = temp_dir();
        let store = FileStore::open(&dir).unwrap();
        store.set("answers_../../etc_en", "{}").unwrap();
        assert!(dir.join("answers_______etc_en.json").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
