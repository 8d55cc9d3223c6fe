use anyhow::{Context, Result};
use roadmap_canvas::model::RoadmapDiagram;
use roadmap_canvas::persistence;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::domain::RoadmapMeta;

/// A locally kept roadmap that has no backend id yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    pub meta: RoadmapMeta,
    pub diagram: RoadmapDiagram,
}

/// Local slot for the last diagram and metadata of an unsaved roadmap.
pub trait DraftStore: Send + Sync {
    /// Returns `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<Draft>>;

    fn save(&self, meta: &RoadmapMeta, diagram: &RoadmapDiagram) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// On-disk shape of a draft. The diagram is kept in its stored string form.
#[derive(Serialize, Deserialize)]
struct DraftFile {
    meta: RoadmapMeta,
    #[serde(rename = "diagramJSON")]
    diagram_json: String,
}

impl DraftFile {
    fn encode(meta: &RoadmapMeta, diagram: &RoadmapDiagram) -> Result<Vec<u8>> {
        let file = DraftFile {
            meta: meta.clone(),
            diagram_json: persistence::serialize(diagram)?,
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    fn decode(bytes: &[u8]) -> Result<Draft> {
        let file: DraftFile = serde_json::from_slice(bytes).context("Invalid draft file")?;
        let diagram = persistence::parse(&file.diagram_json).context("Invalid draft diagram")?;
        Ok(Draft {
            meta: file.meta,
            diagram,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryDraftStore {
    // Kept encoded so load/save behave exactly like the file store.
    slot: Arc<RwLock<Option<Vec<u8>>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<Draft>> {
        let guard = self
            .slot
            .read()
            .map_err(|_| anyhow::anyhow!("Draft slot poisoned"))?;
        guard.as_deref().map(DraftFile::decode).transpose()
    }

    fn save(&self, meta: &RoadmapMeta, diagram: &RoadmapDiagram) -> Result<()> {
        let bytes = DraftFile::encode(meta, diagram)?;
        *self
            .slot
            .write()
            .map_err(|_| anyhow::anyhow!("Draft slot poisoned"))? = Some(bytes);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .slot
            .write()
            .map_err(|_| anyhow::anyhow!("Draft slot poisoned"))? = None;
        Ok(())
    }
}

/// Draft kept in a single JSON file. Writes go to a sibling temp file which is then renamed
/// over the target, so a crash never leaves a half-written draft.
#[derive(Clone, Debug)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "draft".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<Draft>> {
        match fs::read(&self.path) {
            Ok(bytes) => DraftFile::decode(&bytes)
                .with_context(|| format!("Failed to read draft {}", self.path.display()))
                .map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to open draft {}", self.path.display())),
        }
    }

    fn save(&self, meta: &RoadmapMeta, diagram: &RoadmapDiagram) -> Result<()> {
        let bytes = DraftFile::encode(meta, diagram)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, bytes).with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace draft {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "draft saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove draft {}", self.path.display())),
        }
    }
}
