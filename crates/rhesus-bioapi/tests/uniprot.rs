mod common;

use common::setup_mock_server;
use rhesus_bioapi::{SequenceLookup, UniProtClient};
use rhesus_common::RhesusError;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_fetch_sequence_resolves_reviewed_entry() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param("query", "reviewed:true AND (human insulin)"))
        .and(query_param("size", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "primaryAccession": "P01308",
                "proteinDescription": { "recommendedName": { "fullName": { "value": "Insulin" } } },
                "organism": { "scientificName": "Homo sapiens" }
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uniprotkb/P01308.fasta"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            ">sp|P01308|INS_HUMAN Insulin OS=Homo sapiens\nMALWMRLLPLLALLALWGPDPAAA\nFVNQHLCGSHLVEALYLVCGERGF\n",
        ))
        .mount(&server)
        .await;

    let client = assert_ok!(UniProtClient::new(server.uri()));
    let entry = assert_ok!(client.fetch_sequence("  human insulin ").await);
    assert_eq!(entry.accession, "P01308");
    assert_eq!(entry.protein_name, "Insulin");
    assert_eq!(entry.organism_name, "Homo sapiens");
    assert_eq!(entry.sequence, "MALWMRLLPLLALLALWGPDPAAAFVNQHLCGSHLVEALYLVCGERGF");
}

#[tokio::test]
async fn test_no_reviewed_entry_is_not_found() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let client = assert_ok!(UniProtClient::new(server.uri()));
    match client.fetch_sequence("zzzz").await {
        Err(RhesusError::NotFound(msg)) => assert_eq!(
            msg,
            "No reviewed UniProt entry found for \"zzzz\". Try a more specific name (e.g., \"human insulin\")."
        ),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_name_is_rejected_without_a_request() {
    let server = setup_mock_server().await;
    let client = assert_ok!(UniProtClient::new(server.uri()));
    let err = client.fetch_sequence("   ").await.unwrap_err();
    assert!(err.is_client_error());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
#[ignore = "requires network access to rest.uniprot.org"]
async fn test_live_lookup() {
    let client = assert_ok!(UniProtClient::new(rhesus_bioapi::uniprot::UNIPROT_BASE_URL));
    let entry = assert_ok!(client.fetch_sequence("human insulin").await);
    assert_eq!(entry.accession, "P01308");
}
