//! Source assets referenced by segments.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use draftsmith_core::{DraftError, IdAllocator, Identifier, Micros, Result};
use draftsmith_media::{canonical_path, MediaInfo, MediaInspector, MediaKind};
use serde_json::{Map, Value};
use tracing::debug;

use crate::track::Track;

/// Where an entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provenance {
    /// Created through this library.
    #[default]
    Authored,
    /// Loaded from a template file or copied in by a track import.
    Imported,
}

/// A registered source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: Identifier,
    pub kind: MediaKind,
    pub path: PathBuf,
    /// Display name, the file name unless the caller chose one.
    pub name: String,
    /// `None` for still images.
    pub duration: Option<Micros>,
    pub width: u32,
    pub height: u32,
    pub provenance: Provenance,
    /// Fields of a loaded entry that are carried but not interpreted.
    pub extra: Map<String, Value>,
}

impl Material {
    pub fn from_descriptor(id: Identifier, descriptor: MaterialDescriptor) -> Self {
        let name = descriptor.display_name();
        Self {
            id,
            kind: descriptor.info.kind,
            path: descriptor.path,
            name,
            duration: descriptor.info.duration,
            width: descriptor.info.width,
            height: descriptor.info.height,
            provenance: Provenance::Authored,
            extra: Map::new(),
        }
    }

    /// Overwrite content while keeping the identifier and provenance.
    fn apply(&mut self, descriptor: MaterialDescriptor) {
        self.name = descriptor.display_name();
        self.kind = descriptor.info.kind;
        self.path = descriptor.path;
        self.duration = descriptor.info.duration;
        self.width = descriptor.info.width;
        self.height = descriptor.info.height;
    }

    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }

    pub fn is_visual(&self) -> bool {
        !self.is_audio()
    }
}

/// Content for a new or replacement material with known metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    pub path: PathBuf,
    pub name: Option<String>,
    pub info: MediaInfo,
}

impl MaterialDescriptor {
    pub fn new(path: impl Into<PathBuf>, info: MediaInfo) -> Self {
        Self {
            path: path.into(),
            name: None,
            info,
        }
    }

    /// Describe a file by asking `inspector` for its metadata.
    pub fn inspect<I: MediaInspector + ?Sized>(path: impl AsRef<Path>, inspector: &I) -> Result<Self> {
        let path = canonical_path(path.as_ref());
        let info = inspector.inspect(&path)?;
        Ok(Self::new(path, info))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// How a caller names an existing material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialSelector {
    Path(PathBuf),
    Id(Identifier),
}

impl fmt::Display for MaterialSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<Identifier> for MaterialSelector {
    fn from(id: Identifier) -> Self {
        Self::Id(id)
    }
}

impl From<&Path> for MaterialSelector {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Deduplicated store of materials, in insertion order.
///
/// Materials are never removed; a segment going away leaves its material in
/// place. Paths are indexed by their canonical form, computed once when a
/// path enters the registry, so lookups never touch the filesystem for
/// stored materials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    index: HashMap<Identifier, usize>,
    /// Canonical path of each material, parallel to `materials`.
    keys: Vec<PathBuf>,
    /// First material registered under each canonical path.
    paths: HashMap<PathBuf, usize>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the material at `path`, registering it first if needed.
    ///
    /// Inspection only happens for paths not yet registered. If it fails the
    /// registry is left untouched.
    pub fn intern<I: MediaInspector + ?Sized>(
        &mut self,
        path: &Path,
        inspector: &I,
        ids: &mut IdAllocator,
    ) -> Result<Identifier> {
        if let Some(existing) = self.find_by_path(path) {
            debug!(path = %path.display(), id = %existing.id, "material already registered");
            return Ok(existing.id.clone());
        }
        let descriptor = MaterialDescriptor::inspect(path, inspector)?;
        Ok(self.push_new(descriptor, ids))
    }

    /// Register a material whose metadata the caller already has.
    pub fn insert_described(
        &mut self,
        descriptor: MaterialDescriptor,
        ids: &mut IdAllocator,
    ) -> Identifier {
        if let Some(existing) = self.find_by_path(&descriptor.path) {
            return existing.id.clone();
        }
        let descriptor = MaterialDescriptor {
            path: canonical_path(&descriptor.path),
            ..descriptor
        };
        self.push_new(descriptor, ids)
    }

    fn push_new(&mut self, descriptor: MaterialDescriptor, ids: &mut IdAllocator) -> Identifier {
        let material = Material::from_descriptor(ids.new_id(), descriptor);
        let id = material.id.clone();
        debug!(id = %id, path = %material.path.display(), kind = ?material.kind, "registered material");
        let key = material.path.clone();
        self.push(material, key);
        id
    }

    fn push(&mut self, material: Material, key: PathBuf) {
        let pos = self.materials.len();
        self.index.insert(material.id.clone(), pos);
        self.paths.entry(key.clone()).or_insert(pos);
        self.keys.push(key);
        self.materials.push(material);
    }

    /// Insert a fully formed material, keeping its identifier.
    pub(crate) fn insert(&mut self, material: Material) -> Result<()> {
        if self.index.contains_key(&material.id) {
            return Err(DraftError::malformed(format!(
                "duplicate material id {}",
                material.id
            )));
        }
        let key = canonical_path(&material.path);
        self.push(material, key);
        Ok(())
    }

    pub fn get(&self, id: &Identifier) -> Result<&Material> {
        self.index
            .get(id)
            .map(|&i| &self.materials[i])
            .ok_or_else(|| DraftError::not_found("material", id))
    }

    fn position(&self, id: &Identifier) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DraftError::not_found("material", id))
    }

    /// Overwrite a material's content, keeping its identifier and provenance.
    pub fn apply(&mut self, id: &Identifier, descriptor: MaterialDescriptor) -> Result<()> {
        let pos = self.position(id)?;
        let key = canonical_path(&descriptor.path);
        self.materials[pos].apply(descriptor);
        self.rekey(pos, key);
        Ok(())
    }

    /// Point a material at a different file with the same content.
    pub fn set_path(&mut self, id: &Identifier, path: impl Into<PathBuf>) -> Result<()> {
        let pos = self.position(id)?;
        let path = path.into();
        let key = canonical_path(&path);
        self.materials[pos].path = path;
        self.rekey(pos, key);
        Ok(())
    }

    fn rekey(&mut self, pos: usize, key: PathBuf) {
        let old = std::mem::replace(&mut self.keys[pos], key.clone());
        if old == key {
            return;
        }
        if self.paths.get(&old) == Some(&pos) {
            self.paths.remove(&old);
            if let Some(next) = self.keys.iter().position(|k| *k == old) {
                self.paths.insert(old, next);
            }
        }
        let first = self.keys.iter().position(|k| *k == key).unwrap_or(pos);
        self.paths.insert(key, first);
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.index.contains_key(id)
    }

    /// Material whose source resolves to the same canonical path.
    pub fn find_by_path(&self, path: &Path) -> Option<&Material> {
        self.paths
            .get(path)
            .or_else(|| self.paths.get(&canonical_path(path)))
            .map(|&i| &self.materials[i])
    }

    pub fn select(&self, selector: &MaterialSelector) -> Option<&Material> {
        match selector {
            MaterialSelector::Path(path) => self.find_by_path(path),
            MaterialSelector::Id(id) => self.get(id).ok(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// How many segments of `tracks` reference each registered material.
    /// Unreferenced materials map to zero.
    pub fn reference_counts(&self, tracks: &[Track]) -> HashMap<Identifier, usize> {
        let mut counts: HashMap<Identifier, usize> =
            self.materials.iter().map(|m| (m.id.clone(), 0)).collect();
        for segment in tracks.iter().flat_map(|t| t.segments.iter()) {
            if let Some(id) = segment.material_id() {
                *counts.entry(id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
