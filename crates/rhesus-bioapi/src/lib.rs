//! rhesus-bioapi: clients for the remote bioinformatics services.
//!
//! EMBL-EBI jobs (BLAST, Clustal Omega, phylogenetic trees) are asynchronous:
//! they are submitted, then polled until a terminal state. `jobs` holds the
//! state machine, `poller` the bounded polling loop, `ebi` the REST client.

pub mod jobs;
pub mod poller;
pub mod ebi;
pub mod blast;
pub mod uniprot;
pub mod structure;

pub use jobs::{JobInput, JobKind, JobOutput, JobPoll, JobService, JobState};
pub use poller::{JobPoller, PollConfig};
pub use ebi::{EbiClient, EbiConfig};
pub use uniprot::{SequenceLookup, UniProtClient};
pub use structure::{StructureFetcher, StructureSource};
