//! In-memory document store with failure injection

use folio_domain::{
    Document, DocumentId, DocumentMutation, DocumentStore, ExtractionOverview, ExtractionState,
    ReprocessCriteria,
};
use std::sync::{Arc, Mutex, MutexGuard};

type CommitHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Inner {
    docs: Vec<Document>,
    commit_sizes: Vec<usize>,
    fetch_error: Option<String>,
    commits_left: Option<usize>,
    commit_hook: Option<CommitHook>,
}

/// Clones share the same documents
#[derive(Clone, Default)]
pub(crate) struct MockStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockStore {
    /// `count` pending text documents with ids 1..=count and file ids `file-<id>`
    pub fn with_pending(count: i64) -> Self {
        let store = Self::default();
        store.lock().docs = (1..=count)
            .map(|i| Document {
                id: DocumentId::new(i),
                external_file_id: format!("file-{}", i),
                name: format!("doc-{}.txt", i),
                mime_type: "text/plain".to_string(),
                extracted_text: None,
                extraction_state: ExtractionState::Pending,
            })
            .collect();
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn fail_fetch(&self, message: &str) {
        self.lock().fetch_error = Some(message.to_string());
    }

    /// Let `n` commits succeed, fail every later one
    pub fn fail_commit_after(&self, n: usize) {
        self.lock().commits_left = Some(n);
    }

    /// Run `hook` at the start of every commit, before anything is written
    pub fn on_commit(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.lock().commit_hook = Some(Arc::new(hook));
    }

    pub fn commit_sizes(&self) -> Vec<usize> {
        self.lock().commit_sizes.clone()
    }

    pub fn state_of(&self, id: i64) -> ExtractionState {
        self.lock()
            .docs
            .iter()
            .find(|d| d.id.value() == id)
            .map(|d| d.extraction_state.clone())
            .unwrap()
    }
}

impl DocumentStore for MockStore {
    type Error = String;

    fn fetch_pending(
        &self,
        limit: usize,
        mime_type: Option<&str>,
    ) -> Result<Vec<Document>, Self::Error> {
        let inner = self.lock();
        if let Some(e) = &inner.fetch_error {
            return Err(e.clone());
        }
        Ok(inner
            .docs
            .iter()
            .filter(|d| d.is_selectable())
            .filter(|d| mime_type.is_none_or(|m| d.mime_type == m))
            .take(limit)
            .cloned()
            .collect())
    }

    fn commit(&self, mutations: &[DocumentMutation]) -> Result<(), Self::Error> {
        let hook = self.lock().commit_hook.clone();
        if let Some(hook) = hook {
            hook();
        }

        let mut inner = self.lock();
        match inner.commits_left {
            Some(0) => return Err("commit failed".to_string()),
            Some(n) => inner.commits_left = Some(n - 1),
            None => {}
        }

        for mutation in mutations {
            if let Some(doc) = inner.docs.iter_mut().find(|d| d.id == mutation.document_id) {
                if let Some(text) = &mutation.text {
                    doc.extracted_text = Some(text.clone());
                }
                doc.extraction_state = mutation.state.clone();
            }
        }
        inner.commit_sizes.push(mutations.len());
        Ok(())
    }

    fn count_documents(&self, mime_type: Option<&str>) -> Result<u64, Self::Error> {
        Ok(self
            .lock()
            .docs
            .iter()
            .filter(|d| mime_type.is_none_or(|m| d.mime_type == m))
            .count() as u64)
    }

    fn count_pending(&self, mime_type: Option<&str>) -> Result<u64, Self::Error> {
        Ok(self
            .lock()
            .docs
            .iter()
            .filter(|d| d.is_selectable())
            .filter(|d| mime_type.is_none_or(|m| d.mime_type == m))
            .count() as u64)
    }

    fn extraction_overview(&self) -> Result<ExtractionOverview, Self::Error> {
        Ok(ExtractionOverview::default())
    }

    fn flag_for_reprocess(&self, _criteria: &ReprocessCriteria) -> Result<u64, Self::Error> {
        Ok(0)
    }
}
