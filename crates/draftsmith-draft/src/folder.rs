//! On-disk draft projects: one directory per draft under a root folder.
//!
//! ```text
//! <root>/<name>/draft_content.json
//! <root>/<name>/materials/...
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use draftsmith_core::settings::Settings;
use draftsmith_core::{DraftError, FrameRate, Identifier, Result};
use draftsmith_media::canonical_path;
use tracing::{debug, info, warn};

use crate::document::DraftDocument;
use crate::serialization;

/// File holding the serialized draft inside a project directory.
pub const CONTENT_FILE: &str = "draft_content.json";
/// Subdirectory receiving copies of external materials on save.
pub const MATERIALS_DIR: &str = "materials";

/// Outcome of [`DraftFolder::save`].
#[derive(Debug)]
pub struct SaveReport {
    /// The written `draft_content.json`.
    pub path: PathBuf,
    /// Materials copied into the project on this save.
    pub copied: usize,
    /// Materials that could not be copied. They keep their original path.
    pub failures: Vec<DraftError>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A folder of draft projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftFolder {
    root: PathBuf,
}

impl DraftFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.draft_folder)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn content_path(&self, name: &str) -> PathBuf {
        self.project_dir(name).join(CONTENT_FILE)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.content_path(name).is_file()
    }

    /// Create and save an empty draft.
    ///
    /// An existing draft of the same name is an error unless `allow_replace`
    /// is set, in which case its directory is removed first.
    pub fn create(
        &self,
        name: &str,
        width: u32,
        height: u32,
        fps: FrameRate,
        allow_replace: bool,
    ) -> Result<DraftDocument> {
        let dir = self.project_dir(name);
        if dir.exists() {
            if !allow_replace {
                return Err(DraftError::DraftExists(name.to_string()));
            }
            debug!(draft = name, "replacing existing draft");
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        let doc = DraftDocument::new(name, width, height, fps);
        serialization::save_file(&doc, &self.content_path(name))?;
        info!(draft = name, width, height, fps = %fps, "created draft");
        Ok(doc)
    }

    pub fn load(&self, name: &str) -> Result<DraftDocument> {
        if !self.exists(name) {
            return Err(DraftError::not_found("draft", name));
        }
        let doc = serialization::load_file(&self.content_path(name))?;
        info!(draft = name, tracks = doc.tracks.len(), "loaded draft");
        Ok(doc)
    }

    /// Write `doc` as draft `name`.
    ///
    /// Materials outside the project directory are copied into its
    /// `materials/` folder and repointed there. A failed copy is reported,
    /// not fatal; that material keeps its original path.
    pub fn save(&self, name: &str, doc: &mut DraftDocument) -> Result<SaveReport> {
        doc.validate()?;

        let dir = self.project_dir(name);
        let materials_dir = dir.join(MATERIALS_DIR);
        fs::create_dir_all(&materials_dir)?;
        let project_root = canonical_path(&dir);

        let mut used_names: HashSet<String> = fs::read_dir(&materials_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        let mut copied = 0;
        let mut failures = Vec::new();

        let external: Vec<(Identifier, PathBuf)> = doc
            .materials
            .iter()
            .filter(|m| !canonical_path(&m.path).starts_with(&project_root))
            .map(|m| (m.id.clone(), m.path.clone()))
            .collect();
        for (id, source_path) in external {
            let file_name = source_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.to_string());
            let file_name = if used_names.contains(&file_name) {
                format!("{id}_{file_name}")
            } else {
                file_name
            };
            let target = materials_dir.join(&file_name);

            match fs::copy(&source_path, &target) {
                Ok(bytes) => {
                    debug!(material = %id, to = %target.display(), bytes, "copied material");
                    used_names.insert(file_name);
                    doc.materials.set_path(&id, canonical_path(&target))?;
                    copied += 1;
                }
                Err(source) => {
                    warn!(
                        material = %id,
                        path = %source_path.display(),
                        error = %source,
                        "failed to copy material into project"
                    );
                    failures.push(DraftError::MaterialCopyFailed {
                        path: source_path,
                        source,
                    });
                }
            }
        }

        let path = self.content_path(name);
        serialization::save_file(doc, &path)?;
        info!(draft = name, copied, failed = failures.len(), "saved draft");
        Ok(SaveReport {
            path,
            copied,
            failures,
        })
    }

    /// Names of the drafts in this folder, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().join(CONTENT_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(DraftError::not_found("draft", name));
        }
        fs::remove_dir_all(self.project_dir(name))?;
        info!(draft = name, "removed draft");
        Ok(())
    }

    /// Copy draft `template` to `new_name` and load the copy.
    ///
    /// Materials stored inside the template's directory are repointed to the
    /// copy's directory. The copy gets a fresh draft id.
    pub fn duplicate_as_template(&self, template: &str, new_name: &str) -> Result<DraftDocument> {
        if !self.exists(template) {
            return Err(DraftError::not_found("draft", template));
        }
        let target = self.project_dir(new_name);
        if target.exists() {
            return Err(DraftError::DraftExists(new_name.to_string()));
        }

        let source = self.project_dir(template);
        copy_dir(&source, &target)?;

        let mut doc = self.load(new_name)?;
        let old_root = canonical_path(&source);
        let new_root = canonical_path(&target);
        let moved: Vec<(Identifier, PathBuf)> = doc
            .materials
            .iter()
            .filter_map(|m| {
                let path = canonical_path(&m.path);
                let relative = path.strip_prefix(&old_root).ok()?;
                Some((m.id.clone(), new_root.join(relative)))
            })
            .collect();
        for (id, path) in moved {
            doc.materials.set_path(&id, path)?;
        }
        doc.id = doc.ids_mut().new_id();
        doc.name = new_name.to_string();
        serialization::save_file(&doc, &self.content_path(new_name))?;
        info!(template, draft = new_name, "duplicated draft");
        Ok(doc)
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}
