//! Open drafts kept in memory between edits, keyed by a session id.

use std::collections::BTreeMap;

use draftsmith_core::{DraftError, FrameRate, Result};
use tracing::debug;
use uuid::Uuid;

use crate::document::DraftDocument;
use crate::folder::{DraftFolder, SaveReport};

/// A draft being edited and where it is saved.
#[derive(Debug, Clone)]
pub struct CachedDraft {
    pub document: DraftDocument,
    pub folder: DraftFolder,
    /// Project name inside `folder`.
    pub name: String,
}

/// Drafts open for editing.
///
/// Session ids are 16 lowercase hex digits. The cache is a plain value;
/// share it behind a lock when several callers edit concurrently.
#[derive(Debug, Default)]
pub struct DraftCache {
    drafts: BTreeMap<String, CachedDraft>,
}

fn session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

impl DraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `document` open as project `name` of `folder`. Returns its
    /// session id.
    pub fn store(
        &mut self,
        document: DraftDocument,
        folder: DraftFolder,
        name: impl Into<String>,
    ) -> String {
        let mut id = session_id();
        while self.drafts.contains_key(&id) {
            id = session_id();
        }
        let name = name.into();
        debug!(session = %id, draft = %name, "cached draft");
        self.drafts.insert(
            id.clone(),
            CachedDraft {
                document,
                folder,
                name,
            },
        );
        id
    }

    /// Create a draft on disk and open it.
    pub fn create(
        &mut self,
        folder: &DraftFolder,
        name: &str,
        width: u32,
        height: u32,
        fps: FrameRate,
        allow_replace: bool,
    ) -> Result<String> {
        let document = folder.create(name, width, height, fps, allow_replace)?;
        Ok(self.store(document, folder.clone(), name))
    }

    /// Load a saved draft and open it.
    pub fn open(&mut self, folder: &DraftFolder, name: &str) -> Result<String> {
        let document = folder.load(name)?;
        Ok(self.store(document, folder.clone(), name))
    }

    pub fn get(&self, session: &str) -> Option<&CachedDraft> {
        self.drafts.get(session)
    }

    pub fn get_mut(&mut self, session: &str) -> Option<&mut CachedDraft> {
        self.drafts.get_mut(session)
    }

    /// Write an open draft to its project.
    pub fn save(&mut self, session: &str) -> Result<SaveReport> {
        let entry = self
            .drafts
            .get_mut(session)
            .ok_or_else(|| DraftError::not_found("draft session", session))?;
        entry.folder.save(&entry.name, &mut entry.document)
    }

    /// Close a session without saving.
    pub fn remove(&mut self, session: &str) -> Option<CachedDraft> {
        let removed = self.drafts.remove(session);
        if removed.is_some() {
            debug!(session, "closed draft");
        }
        removed
    }

    /// Session ids with their project names, ordered by id.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.drafts
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn clear(&mut self) {
        self.drafts.clear();
    }
}
