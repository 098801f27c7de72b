//! PDB and AlphaFold structure fetching with an on-disk cache.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rhesus_common::sandbox::SandboxClient;
use rhesus_common::{Result, RhesusError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const RCSB_BASE_URL: &str = "https://files.rcsb.org/download";
pub const ALPHAFOLD_BASE_URL: &str = "https://alphafold.ebi.ac.uk/files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSource {
    /// Experimental structure from the RCSB Protein Data Bank.
    Pdb,
    /// Predicted model from the AlphaFold Protein Structure Database.
    AlphaFold,
}

impl StructureSource {
    /// Normalise and validate an identifier for this source.
    pub fn normalise_id(self, id: &str) -> Result<String> {
        static PDB_ID: OnceLock<Regex> = OnceLock::new();
        static ACCESSION: OnceLock<Regex> = OnceLock::new();

        let id = id.trim();
        let (re, id, what) = match self {
            Self::Pdb => (
                PDB_ID.get_or_init(|| Regex::new(r"^[0-9][A-Za-z0-9]{3}$").expect("valid regex")),
                id.to_lowercase(),
                "PDB ID",
            ),
            Self::AlphaFold => (
                ACCESSION.get_or_init(|| Regex::new(r"^[A-Z0-9]{6,10}$").expect("valid regex")),
                id.to_uppercase(),
                "UniProt accession",
            ),
        };
        if re.is_match(&id) {
            Ok(id)
        } else {
            Err(RhesusError::InvalidInput(format!("Invalid {}: {:?}", what, id)))
        }
    }

    fn file_name(self, id: &str) -> String {
        match self {
            Self::Pdb => format!("{}.pdb", id),
            Self::AlphaFold => format!("AF-{}-F1-model_v4.pdb", id),
        }
    }
}

/// Client for fetching protein structures from PDB and AlphaFold.
pub struct StructureFetcher {
    client: SandboxClient,
    cache_dir: PathBuf,
    rcsb_base: String,
    alphafold_base: String,
}

impl StructureFetcher {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        Self::with_sources(cache_dir, RCSB_BASE_URL, ALPHAFOLD_BASE_URL)
    }

    /// Use mirror base URLs instead of the public archives.
    pub fn with_sources<P: AsRef<Path>>(cache_dir: P, rcsb_base: &str, alphafold_base: &str) -> Result<Self> {
        let mut client = SandboxClient::new()?;
        client.allow_url(rcsb_base)?;
        client.allow_url(alphafold_base)?;
        Ok(Self {
            client,
            cache_dir: cache_dir.as_ref().to_path_buf(),
            rcsb_base: rcsb_base.trim_end_matches('/').to_string(),
            alphafold_base: alphafold_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Fetch a PDB file by its ID, returning the cached path.
    pub async fn fetch_pdb(&self, pdb_id: &str) -> Result<PathBuf> {
        self.fetch(StructureSource::Pdb, pdb_id).await
    }

    /// Fetch an AlphaFold model by UniProt accession, returning the cached path.
    pub async fn fetch_alphafold(&self, uniprot_id: &str) -> Result<PathBuf> {
        self.fetch(StructureSource::AlphaFold, uniprot_id).await
    }

    /// Fetch and return the PDB-format text of a structure.
    pub async fn read_structure(&self, source: StructureSource, id: &str) -> Result<String> {
        let path = self.fetch(source, id).await?;
        Ok(fs::read_to_string(&path).await?)
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, source: StructureSource, id: &str) -> Result<PathBuf> {
        let id = source.normalise_id(id)?;
        let file_name = source.file_name(&id);
        let file_path = self.cache_dir.join(&file_name);

        if fs::try_exists(&file_path).await.unwrap_or(false) {
            debug!(?source, id = %id, "Structure found in cache");
            return Ok(file_path);
        }

        let base = match source {
            StructureSource::Pdb => &self.rcsb_base,
            StructureSource::AlphaFold => &self.alphafold_base,
        };
        let url = format!("{}/{}", base, file_name);
        info!(?source, id = %id, url = %url, "Downloading structure");

        let response = self.client.get(&url)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RhesusError::NotFound(format!("No structure found for {}", id)));
        }
        let content = response.error_for_status()?.bytes().await?;

        fs::create_dir_all(&self.cache_dir).await?;
        // Each download gets its own temp file; concurrent fetches of one id race only on the rename.
        let tmp_path = self.cache_dir.join(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&tmp_path, &content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            if !fs::try_exists(&file_path).await.unwrap_or(false) {
                return Err(e.into());
            }
            debug!(?source, id = %id, "Structure cached by a concurrent fetch");
        }

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_id_validation() {
        assert_eq!(StructureSource::Pdb.normalise_id(" 1CRN ").unwrap(), "1crn");
        assert!(StructureSource::Pdb.normalise_id("CRN1").is_err());
        assert!(StructureSource::Pdb.normalise_id("../etc/passwd").is_err());
        assert_eq!(StructureSource::AlphaFold.normalise_id("p01308").unwrap(), "P01308");
        assert!(StructureSource::AlphaFold.normalise_id("P0-308").is_err());
    }

    #[tokio::test]
    async fn test_cached_file_is_reused() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("AF-P01308-F1-model_v4.pdb"), "HEADER    CACHED\n").unwrap();
        let fetcher = StructureFetcher::new(dir.path()).unwrap();

        let text = fetcher.read_structure(StructureSource::AlphaFold, "P01308").await.unwrap();
        assert_eq!(text, "HEADER    CACHED\n");
    }

    #[tokio::test]
    #[ignore = "requires network access to files.rcsb.org"]
    async fn test_fetch_pdb_live() {
        let dir = tempdir().unwrap();
        let fetcher = StructureFetcher::new(dir.path()).unwrap();
        let path = fetcher.fetch_pdb("1CRN").await.unwrap();
        assert!(path.exists());
    }
}
