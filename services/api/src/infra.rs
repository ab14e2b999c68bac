use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use mime::Mime;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use veritas::config::DocumentStoreConfig;
use veritas::verification::{
    DocumentStore, DocumentStoreError, RemoteRequestId, RepositoryError, RequestId,
    RequestRepository, RequestStatus, ResultRepository, VerificationRequest, VerificationResult,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) documents: Arc<LocalDocumentStore>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default)]
struct RequestTable {
    rows: HashMap<RequestId, VerificationRequest>,
    by_remote: HashMap<RemoteRequestId, RequestId>,
}

/// Process-local request store. Contents are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRequestRepository {
    table: Arc<Mutex<RequestTable>>,
}

impl RequestRepository for InMemoryRequestRepository {
    fn insert(&self, request: VerificationRequest) -> Result<VerificationRequest, RepositoryError> {
        let mut table = lock(&self.table)?;
        if table.rows.contains_key(&request.id)
            || table.by_remote.contains_key(&request.remote_request_id)
        {
            return Err(RepositoryError::Conflict);
        }
        table
            .by_remote
            .insert(request.remote_request_id.clone(), request.id.clone());
        table.rows.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut table = lock(&self.table)?;
        let row = table.rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        row.status = status;
        row.updated_at = at;
        Ok(())
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<VerificationRequest>, RepositoryError> {
        Ok(lock(&self.table)?.rows.get(id).cloned())
    }

    fn find_by_remote_id(
        &self,
        remote_request_id: &RemoteRequestId,
    ) -> Result<Option<VerificationRequest>, RepositoryError> {
        let table = lock(&self.table)?;
        Ok(table
            .by_remote
            .get(remote_request_id)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<VerificationRequest>, RepositoryError> {
        let table = lock(&self.table)?;
        let mut rows: Vec<VerificationRequest> = table.rows.values().cloned().collect();
        rows.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryResultRepository {
    rows: Arc<Mutex<Vec<VerificationResult>>>,
}

impl ResultRepository for InMemoryResultRepository {
    fn insert_batch(&self, results: Vec<VerificationResult>) -> Result<(), RepositoryError> {
        lock(&self.rows)?.extend(results);
        Ok(())
    }

    fn for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<VerificationResult>, RepositoryError> {
        Ok(lock(&self.rows)?
            .iter()
            .filter(|row| &row.request_id == request_id)
            .cloned()
            .collect())
    }
}

/// Writes report documents to a directory and links them under a public base URL.
#[derive(Debug, Clone)]
pub(crate) struct LocalDocumentStore {
    directory: PathBuf,
    public_base_url: String,
}

impl LocalDocumentStore {
    pub(crate) fn new(config: &DocumentStoreConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolves a stored filename; anything that could leave the directory is refused.
    pub(crate) fn path_for(&self, filename: &str) -> Option<PathBuf> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && filename
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        valid.then(|| self.directory.join(filename))
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }
}

impl DocumentStore for LocalDocumentStore {
    fn put(
        &self,
        filename: &str,
        bytes: &[u8],
        _content_type: &Mime,
    ) -> Result<String, DocumentStoreError> {
        let path = self
            .path_for(filename)
            .ok_or_else(|| DocumentStoreError::Backend(format!("invalid filename '{filename}'")))?;
        fs::create_dir_all(&self.directory)
            .map_err(|err| DocumentStoreError::Backend(err.to_string()))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => DocumentStoreError::Conflict(filename.to_string()),
                _ => DocumentStoreError::Backend(err.to_string()),
            })?;
        file.write_all(bytes)
            .map_err(|err| DocumentStoreError::Backend(err.to_string()))?;

        Ok(format!("{}/{}", self.public_base_url, filename))
    }
}
