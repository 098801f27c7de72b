//! UniProtKB lookup: protein name -> reviewed entry with its sequence.

use async_trait::async_trait;
use rhesus_common::sandbox::SandboxClient;
use rhesus_common::{Result, RhesusError, UniProtEntry};
use serde_json::Value;
use tracing::{debug, info, instrument};

pub const UNIPROT_BASE_URL: &str = "https://rest.uniprot.org";

/// Resolves a free-text protein name to a sequence.
#[async_trait]
pub trait SequenceLookup: Send + Sync {
    async fn fetch_sequence(&self, protein_name: &str) -> Result<UniProtEntry>;
}

pub struct UniProtClient {
    client: SandboxClient,
    base_url: String,
}

impl UniProtClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(SandboxClient::new()?, base_url)
    }

    pub fn with_client(mut client: SandboxClient, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        client.allow_url(&base_url)?;
        Ok(Self { client, base_url })
    }

    /// Best reviewed (Swiss-Prot) hit for the name; the sequence is left empty.
    #[instrument(skip(self))]
    async fn search(&self, protein_name: &str) -> Result<UniProtEntry> {
        let query = format!("reviewed:true AND ({})", protein_name);
        let resp = self
            .client
            .get(&format!("{}/uniprotkb/search", self.base_url))?
            .header("Accept", "application/json")
            .query(&[
                ("query", query.as_str()),
                ("fields", "accession,protein_name,organism_name"),
                ("size", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RhesusError::upstream(
                "UniProt",
                format!("search failed with status: {}", status.as_u16()),
            ));
        }

        let body: Value = resp.json().await?;
        let entry = body["results"]
            .as_array()
            .and_then(|r| r.first())
            .ok_or_else(|| {
                RhesusError::NotFound(format!(
                    "No reviewed UniProt entry found for \"{}\". Try a more specific name (e.g., \"human insulin\").",
                    protein_name
                ))
            })?;

        let accession = entry["primaryAccession"]
            .as_str()
            .ok_or_else(|| RhesusError::upstream("UniProt", "search result has no accession"))?
            .to_string();
        Ok(UniProtEntry {
            accession,
            protein_name: protein_name_of(entry),
            organism_name: entry["organism"]["scientificName"].as_str().unwrap_or_default().to_string(),
            sequence: String::new(),
        })
    }

    #[instrument(skip(self))]
    async fn fasta(&self, accession: &str) -> Result<String> {
        let resp = self
            .client
            .get(&format!("{}/uniprotkb/{}.fasta", self.base_url, accession))?
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RhesusError::upstream(
                "UniProt",
                format!("Failed to fetch FASTA sequence for {}. Status: {}", accession, status.as_u16()),
            ));
        }
        let sequence = sequence_from_fasta(&resp.text().await?);
        if sequence.is_empty() {
            return Err(RhesusError::upstream(
                "UniProt",
                format!("Could not parse sequence from FASTA for {}.", accession),
            ));
        }
        Ok(sequence)
    }
}

#[async_trait]
impl SequenceLookup for UniProtClient {
    async fn fetch_sequence(&self, protein_name: &str) -> Result<UniProtEntry> {
        let name = protein_name.trim();
        if name.is_empty() {
            return Err(RhesusError::InvalidInput("A valid protein name is required.".to_string()));
        }

        let mut entry = self.search(name).await?;
        debug!(accession = %entry.accession, "UniProt search matched");
        entry.sequence = self.fasta(&entry.accession).await?;
        info!(accession = %entry.accession, length = entry.sequence.len(), "UniProt sequence fetched");
        Ok(entry)
    }
}

fn protein_name_of(entry: &Value) -> String {
    let desc = &entry["proteinDescription"];
    desc["recommendedName"]["fullName"]["value"]
        .as_str()
        .or_else(|| desc["submissionNames"][0]["fullName"]["value"].as_str())
        .unwrap_or("Unknown Protein")
        .to_string()
}

/// Residues of the first record: every line after the header, joined.
pub fn sequence_from_fasta(fasta: &str) -> String {
    fasta
        .lines()
        .skip(1)
        .map(str::trim)
        .take_while(|l| !l.starts_with('>'))
        .collect()
}
