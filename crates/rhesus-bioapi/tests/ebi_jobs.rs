mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ebi_client, setup_mock_server};
use rhesus_bioapi::{JobInput, JobKind, JobOutput, JobPoll, JobPoller, JobService, JobState, PollConfig};
use serde_json::json;
use tokio::sync::watch;
use tokio_test::assert_ok;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_blast_submission_posts_form() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/ncbiblast/run"))
        .and(header("accept", "text/plain"))
        .and(body_string_contains("program=blastp"))
        .and(body_string_contains("database=uniprotkb"))
        .and(body_string_contains("email=tests%40example.com"))
        .and(body_string_contains("sequence=MALWMRLLPL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ncbiblast-R20250101-000001-0001-1-p1m\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ebi_client(&server);
    let input = assert_ok!(JobInput::sequence("MALWMRLLPL"));
    let job_id = assert_ok!(client.submit(JobKind::Blast, &input).await);
    assert_eq!(job_id, "ncbiblast-R20250101-000001-0001-1-p1m");
}

#[tokio::test]
async fn test_msa_submission_sends_fasta() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/clustalo/run"))
        .and(body_string_contains("sequence=%3Eseq1%0AAAAA%0A%3Eseq2%0ACCCC"))
        .respond_with(ResponseTemplate::new(200).set_body_string("clustalo-1"))
        .mount(&server)
        .await;

    let client = ebi_client(&server);
    let input = assert_ok!(JobInput::sequences(&["AAAA", "CCCC"]));
    assert_eq!(assert_ok!(client.submit(JobKind::Msa, &input).await), "clustalo-1");
}

#[tokio::test]
async fn test_submission_error_uses_xml_description() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/ncbiblast/run"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<?xml version='1.0' encoding='UTF-8'?><error><description>Invalid parameters: email</description></error>",
        ))
        .mount(&server)
        .await;

    let client = ebi_client(&server);
    let input = assert_ok!(JobInput::sequence("MALW"));
    let err = client.submit(JobKind::Blast, &input).await.unwrap_err();
    assert_eq!(err.to_string(), "EBI error: job submission failed: Invalid parameters: email");
}

#[tokio::test]
async fn test_check_maps_status_text() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/clustalo/status/running-job"))
        .respond_with(ResponseTemplate::new(200).set_body_string("QUEUED"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clustalo/status/failed-job"))
        .respond_with(ResponseTemplate::new(200).set_body_string("FAILURE"))
        .mount(&server)
        .await;
    // Unknown job ids answer 404 until the dispatcher has registered them.
    Mock::given(method("GET"))
        .and(path("/clustalo/status/new-job"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clustalo/status/broken-job"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ebi_client(&server);
    assert_eq!(assert_ok!(client.check(JobKind::Msa, "running-job").await), JobPoll::Running);
    assert_eq!(assert_ok!(client.check(JobKind::Msa, "new-job").await), JobPoll::Running);
    assert_eq!(
        assert_ok!(client.check(JobKind::Msa, "failed-job").await),
        JobPoll::Failed("Job failed with status: FAILURE".to_string())
    );
    assert!(client.check(JobKind::Msa, "broken-job").await.is_err());
}

#[tokio::test]
async fn test_finished_blast_fetches_json_results() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/ncbiblast/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("FINISHED"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ncbiblast/result/job-1/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{
                "hit_acc": "P01308",
                "hit_desc": "Insulin",
                "hit_hsps": [{ "hsp_bit_score": 226.5, "hsp_expect": 2e-130, "hsp_identity": 100.0 }]
            }]
        })))
        .mount(&server)
        .await;

    let client = ebi_client(&server);
    match assert_ok!(client.check(JobKind::Blast, "job-1").await) {
        JobPoll::Finished(JobOutput::BlastHits(hits)) => {
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].accession, "P01308");
            assert_eq!(hits[0].e_value, "2e-130");
            assert_eq!(hits[0].identity, 1.0);
        }
        other => panic!("unexpected poll {other:?}"),
    }
}

#[tokio::test]
async fn test_poller_drives_tree_job_to_completion() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/clustalo/status/tree-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("RUNNING"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clustalo/status/tree-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("FINISHED"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clustalo/result/tree-1/phylotree"))
        .respond_with(ResponseTemplate::new(200).set_body_string("(seq1:0.1,seq2:0.2);"))
        .mount(&server)
        .await;

    let service: Arc<dyn JobService> = Arc::new(ebi_client(&server));
    let poller = JobPoller::new(
        service,
        PollConfig { interval: Duration::from_millis(10), timeout: Duration::from_secs(10) },
    );
    let (_tx, rx) = watch::channel(false);

    let state = poller.run(JobKind::PhyloTree, "tree-1".to_string(), rx).await;
    assert_eq!(
        state,
        JobState::Finished {
            job_id: "tree-1".to_string(),
            output: JobOutput::Tree("(seq1:0.1,seq2:0.2);".to_string()),
        }
    );
}
