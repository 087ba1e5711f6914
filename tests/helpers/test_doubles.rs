// ==========================================
// 测试替身
// ==========================================
// RecordingNotifier: 记录全部通知
// FailingStore: 批量写入必然失败，运行审计保存在内存
// ==========================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corona_ingest::domain::record::{CanonicalRecord, IngestRun, RecordTags};
use corona_ingest::domain::types::{FederalState, Measurement};
use corona_ingest::notify::{Notifier, NotifyResult};
use corona_ingest::repository::{RecordStore, RepositoryError, RepositoryResult};
use std::sync::{Arc, Mutex};

// ==========================================
// RecordingNotifier - 记录全部通知
// ==========================================
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(FederalState, String)>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(FederalState, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, state: FederalState, message: &str) -> NotifyResult<()> {
        self.messages.lock().unwrap().push((state, message.to_string()));
        Ok(())
    }
}

// ==========================================
// FailingStore - 写入失败的存储
// ==========================================
#[derive(Clone, Default)]
pub struct FailingStore {
    runs: Arc<Mutex<Vec<IngestRun>>>,
}

impl FailingStore {
    pub const FAILURE: &'static str = "database or disk is full";

    pub fn runs(&self) -> Vec<IngestRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn write_batch(&self, _records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        Err(RepositoryError::DatabaseTransactionError(
            Self::FAILURE.to_string(),
        ))
    }

    async fn query_series(
        &self,
        _measurement: Measurement,
        _state: &str,
        _county: Option<&str>,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        Ok(Vec::new())
    }

    async fn query_since(
        &self,
        _measurement: Measurement,
        _since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        Ok(Vec::new())
    }

    async fn list_tag_values(&self, _measurement: Measurement) -> RepositoryResult<Vec<RecordTags>> {
        Ok(Vec::new())
    }

    async fn count_records(&self) -> RepositoryResult<usize> {
        Ok(0)
    }

    async fn rename_region(
        &self,
        _measurement: Measurement,
        _state: Option<&str>,
        _old_name: &str,
        _new_name: &str,
    ) -> RepositoryResult<usize> {
        Ok(0)
    }

    async fn insert_run(&self, run: &IngestRun) -> RepositoryResult<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> RepositoryResult<Vec<IngestRun>> {
        Ok(self.runs().into_iter().rev().take(limit).collect())
    }
}
