use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ResourceStore, Result, StoreError};
use crate::reconciler::ConnectionDetails;
use crate::spec::{Managed, Observed, ResourceSpec};

const CONNECTIONS_DIR: &str = "connections";

const DOCUMENT_MODE: u32 = 0o644;
/// Connection details may carry a root password.
const SECRET_MODE: u32 = 0o600;

/// On-disk form of one instance; the name is the file stem.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: DeserializeOwned"))]
struct Document<S> {
    spec: S,
    #[serde(default)]
    status: Observed<S>,
    #[serde(default)]
    deletion_requested: bool,
}

/// Directory-backed store: `<dir>/<name>.json` per instance and
/// `<dir>/connections/<name>.json` for connection details.
///
/// Files are edited by the caller, so there are no change notifications;
/// instances are picked up on the next interval pass.
pub struct FileStore<S> {
    dir: PathBuf,
    events: broadcast::Sender<String>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ResourceSpec> FileStore<S> {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(CONNECTIONS_DIR)).await?;
        let (events, _) = broadcast::channel(1);
        Ok(Self {
            dir,
            events,
            _spec: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    fn connection_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(CONNECTIONS_DIR).join(format!("{}.json", name)))
    }

    async fn read(&self, name: &str) -> Result<Option<Document<S>>> {
        match fs::read(self.document_path(name)?).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, doc: &Document<S>) -> Result<()> {
        write_atomic(
            &self.document_path(name)?,
            &serde_json::to_vec_pretty(doc)?,
            DOCUMENT_MODE,
        )
        .await
    }

    /// Declare an instance or replace its desired spec.
    pub async fn apply(&self, name: &str, spec: S) -> Result<()> {
        let doc = match self.read(name).await? {
            Some(mut doc) => {
                doc.spec = spec;
                doc
            }
            None => Document {
                spec,
                status: Observed::default(),
                deletion_requested: false,
            },
        };
        self.write(name, &doc).await
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::Internal(format!("invalid instance name {:?}", name)))
    }
}

/// Write to a temp file created with `mode`, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    // A leftover temp file would keep its old permissions.
    remove_if_exists(&tmp).await?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl<S: ResourceSpec> ResourceStore<S> for FileStore<S> {
    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if validate_name(name).is_ok() && entry.file_type().await?.is_file() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<Option<Managed<S>>> {
        Ok(self.read(name).await?.map(|doc| Managed {
            name: name.to_string(),
            spec: doc.spec,
            status: doc.status,
            deletion_requested: doc.deletion_requested,
        }))
    }

    async fn save_status(&self, name: &str, status: &Observed<S>) -> Result<()> {
        let mut doc = self
            .read(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        doc.status = status.clone();
        self.write(name, &doc).await?;
        debug!(kind = S::KIND, name, "Status saved");
        Ok(())
    }

    async fn finalize(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.document_path(name)?).await?;
        remove_if_exists(&self.connection_path(name)?).await
    }

    async fn publish_connection_details(
        &self,
        name: &str,
        details: &ConnectionDetails,
    ) -> Result<()> {
        let path = self.connection_path(name)?;
        write_atomic(&path, &serde_json::to_vec_pretty(details)?, SECRET_MODE).await
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }
}
