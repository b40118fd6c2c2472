//! Execution history sources
//!
//! A history source returns the ordered events for an execution identifier.
//! Failures are returned unchanged; retrying is left to conditions built on
//! top of the source (see [`crate::poller`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::event::{parse_history, ExecutionEvent};
use crate::common::{paths, Error, Result};

/// Anything that can fetch the event history of an execution
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the events of `execution_arn` in ascending timestamp order
    async fn get_history(&self, execution_arn: &str) -> Result<Vec<ExecutionEvent>>;
}

#[async_trait]
impl<T: HistorySource + ?Sized> HistorySource for std::sync::Arc<T> {
    async fn get_history(&self, execution_arn: &str) -> Result<Vec<ExecutionEvent>> {
        (**self).get_history(execution_arn).await
    }
}

/// Reads history documents from disk
///
/// Every fetch re-reads the file, so a writer updating it is observed by the
/// next poll.
#[derive(Debug, Clone)]
pub struct FileHistorySource {
    dir: PathBuf,
}

impl FileHistorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the history of `execution` is read from
    ///
    /// An identifier naming an existing file is used as-is.
    pub fn resolve(&self, execution: &str) -> PathBuf {
        let direct = Path::new(execution);
        if direct.is_file() {
            return direct.to_path_buf();
        }
        self.dir.join(paths::history_file_name(execution))
    }
}

#[async_trait]
impl HistorySource for FileHistorySource {
    async fn get_history(&self, execution_arn: &str) -> Result<Vec<ExecutionEvent>> {
        let path = self.resolve(execution_arn);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::history_not_found(execution_arn, &path));
            }
            Err(e) => return Err(Error::file_read(&path, e)),
        };

        let events = parse_history(&content)?;
        tracing::debug!(
            execution = execution_arn,
            path = %path.display(),
            events = events.len(),
            "Read execution history"
        );
        Ok(events)
    }
}

/// In-memory histories, for tests and embedding callers
#[derive(Debug, Default)]
pub struct StaticHistorySource {
    histories: RwLock<HashMap<String, Vec<ExecutionEvent>>>,
}

impl StaticHistorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the history of `execution`
    pub async fn insert(&self, execution: &str, events: Vec<ExecutionEvent>) {
        self.histories
            .write()
            .await
            .insert(execution.to_string(), events);
    }

    /// Append one event to the history of `execution`, creating it if needed
    pub async fn push_event(&self, execution: &str, event: ExecutionEvent) {
        self.histories
            .write()
            .await
            .entry(execution.to_string())
            .or_default()
            .push(event);
    }
}

#[async_trait]
impl HistorySource for StaticHistorySource {
    async fn get_history(&self, execution_arn: &str) -> Result<Vec<ExecutionEvent>> {
        self.histories
            .read()
            .await
            .get(execution_arn)
            .cloned()
            .ok_or_else(|| Error::HistorySource(format!("ExecutionDoesNotExist: {}", execution_arn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fixtures::at;

    #[tokio::test]
    async fn test_file_source_resolves_arn() {
        let dir = tempfile::tempdir().unwrap();
        let arn = "arn:aws:states:us-east-1:123:execution:orders:run-1";
        std::fs::write(
            dir.path().join(paths::history_file_name(arn)),
            r#"[{"timestamp": "2024-01-01T00:00:00Z", "type": "ExecutionStarted"}]"#,
        )
        .unwrap();

        let source = FileHistorySource::new(dir.path());
        let events = source.get_history(arn).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_file_source_accepts_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"events": []}"#).unwrap();

        let source = FileHistorySource::new("/nonexistent");
        let events = source
            .get_history(path.to_str().unwrap())
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_missing_history() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileHistorySource::new(dir.path());

        let err = source.get_history("run-404").await.unwrap_err();
        assert!(matches!(err, Error::HistoryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_source_propagates_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        let source = FileHistorySource::new(dir.path());

        let err = source.get_history("broken").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_static_source_push_and_fetch() {
        let source = StaticHistorySource::new();
        assert!(source.get_history("run-1").await.is_err());

        source
            .push_event("run-1", ExecutionEvent::execution_started(at(0)))
            .await;
        source
            .push_event("run-1", ExecutionEvent::execution_succeeded(at(10)))
            .await;

        let events = source.get_history("run-1").await.unwrap();
        assert_eq!(events.len(), 2);
    }
}
