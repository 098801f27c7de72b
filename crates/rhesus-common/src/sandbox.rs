use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::RhesusError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP client that only talks to approved hosts.
/// Every outbound request of the assistant goes through one of these.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of bioinformatics and LLM hosts.
    pub fn new() -> Result<Self, RhesusError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RhesusError> {
        let domains = [
            "ebi.ac.uk",                          // EBI Job Dispatcher, AlphaFold DB
            "rest.uniprot.org",                   // UniProt REST
            "www.uniprot.org",                    // UniProt FASTA downloads
            "files.rcsb.org",                     // PDB files
            "generativelanguage.googleapis.com",  // Gemini
            "localhost",                          // Ollama / local OpenAI-compatible servers
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| RhesusError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of a configured base URL (e.g. a mirror or a self-hosted endpoint).
    pub fn allow_url(&mut self, url: &str) -> Result<(), RhesusError> {
        let parsed = Url::parse(url)
            .map_err(|e| RhesusError::Config(format!("Invalid URL {}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RhesusError::Config(format!("URL has no host: {}", url)))?;
        self.allow_domain(host);
        Ok(())
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, RhesusError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, RhesusError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), RhesusError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            tracing::warn!(url, "Blocked request to host outside the allowlist");
            Err(RhesusError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist_covers_ebi_subdomains() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://www.ebi.ac.uk/Tools/services/rest/blast/run"));
        assert!(client.is_allowed("https://alphafold.ebi.ac.uk/files/AF-P69905-F1-model_v4.pdb"));
        assert!(client.is_allowed("https://rest.uniprot.org/uniprotkb/search"));
    }

    #[test]
    fn test_blocks_unknown_hosts() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://evil.example.com/steal"));
        assert!(!client.is_allowed("https://notebi.ac.uk.example.com/"));
        assert!(!client.is_allowed("not a url"));
        assert!(matches!(
            client.get("https://evil.example.com/"),
            Err(RhesusError::Security(_))
        ));
    }

    #[test]
    fn test_allow_url_adds_host() {
        let mut client = SandboxClient::new().unwrap();
        client.allow_url("https://mirror.example.org/rest").unwrap();
        assert!(client.is_allowed("https://mirror.example.org/rest/blast/run"));
        assert!(client.allow_url("::nope").is_err());
    }
}
