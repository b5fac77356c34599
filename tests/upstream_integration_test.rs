use clinical_research_engine::{
    ComprehensiveRequest, Config, Error, ResearchEngine, SortMode,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRIALS_PATH: &str = "/api/query/study_fields";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.literature.base_url = server.uri();
    config.trials.base_url = format!("{}{TRIALS_PATH}", server.uri());
    config.literature.timeout_secs = 5;
    config.trials.timeout_secs = 5;
    config.engine.branch_timeout_secs = 5;
    config
}

fn esearch_body(ids: &[&str]) -> serde_json::Value {
    json!({
        "header": {"type": "esearch", "version": "0.3"},
        "esearchresult": {
            "count": ids.len().to_string(),
            "retmax": ids.len().to_string(),
            "idlist": ids,
        }
    })
}

fn esummary_body() -> serde_json::Value {
    json!({
        "result": {
            "uids": ["38000001", "38000002"],
            "38000001": {
                "uid": "38000001",
                "title": "Metformin and cardiovascular outcomes in type 2 diabetes",
                "authors": [{"name": "Smith J"}, {"name": "Doe A"}],
                "source": "Diabetes Care",
                "pubdate": "2024 Jan",
                "articleids": [
                    {"idtype": "pubmed", "value": "38000001"},
                    {"idtype": "doi", "value": "10.2337/dc23-0001"}
                ]
            },
            "38000002": {
                "uid": "38000002",
                "title": "Dietary patterns in older adults",
                "authors": [],
                "fulljournalname": "Nutrition Reviews",
                "pubdate": "",
                "epubdate": "1998 Mar 2"
            }
        }
    })
}

fn study_fields_body() -> serde_json::Value {
    json!({
        "StudyFieldsResponse": {
            "APIVrs": "1.01.05",
            "NStudiesFound": 2,
            "MinRank": 1,
            "MaxRank": 2,
            "StudyFields": [
                {
                    "Rank": 1,
                    "NCTId": ["NCT05000001"],
                    "BriefTitle": ["Semaglutide in Adults With Type 2 Diabetes"],
                    "Condition": ["Diabetes Mellitus, Type 2", "Obesity"],
                    "Phase": ["Phase 3"],
                    "OverallStatus": ["Recruiting"],
                    "StartDate": ["March 2023"],
                    "CompletionDate": [],
                    "StudyType": ["Interventional"]
                },
                {
                    "Rank": 2,
                    "NCTId": [],
                    "BriefTitle": ["Record without an identifier"]
                }
            ]
        }
    })
}

async fn mount_pubmed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_body(&[
            "38000001", "38000002",
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("id", "38000001,38000002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esummary_body()))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_trials(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TRIALS_PATH))
        .and(query_param("fmt", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(study_fields_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_literature_search_two_phase_lookup() {
    let server = MockServer::start().await;
    mount_pubmed(&server).await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let items = engine
        .search_literature("diabetes", Some(5), SortMode::Date)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    let first = &items[0];
    assert_eq!(first.id, "38000001");
    assert_eq!(first.authors, "Smith J, Doe A");
    assert_eq!(first.journal, "Diabetes Care");
    assert_eq!(first.external_id.as_deref(), Some("10.2337/dc23-0001"));
    assert_eq!(first.url, "https://pubmed.ncbi.nlm.nih.gov/38000001/");
    assert_eq!(first.source, "PubMed");
    assert!(first.relevance_score >= 3);

    let second = &items[1];
    assert_eq!(second.journal, "Nutrition Reviews");
    assert_eq!(second.publish_date, "1998 Mar 2");
    assert_eq!(second.relevance_score, 0);

    let requests = server.received_requests().await.unwrap();
    let search = requests
        .iter()
        .find(|r| r.url.path() == "/esearch.fcgi")
        .unwrap();
    let params: Vec<(String, String)> = search.url.query_pairs().into_owned().collect();
    assert!(params.contains(&("retmax".to_string(), "5".to_string())));
    assert!(params.contains(&("sort".to_string(), "pub_date".to_string())));
    assert!(params.contains(&("retmode".to_string(), "json".to_string())));
}

#[tokio::test]
async fn test_empty_id_list_skips_summary_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_body(&[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esummary_body()))
        .expect(0)
        .mount(&server)
        .await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let items = engine
        .search_literature("nonexistent_condition_xyz", None, SortMode::Relevance)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_upstream_errors_degrade_to_empty() {
    for status in [500_u16, 503, 429, 404] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream trouble"))
            .mount(&server)
            .await;

        let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
        let literature = engine
            .search_literature("asthma", None, SortMode::Relevance)
            .await
            .unwrap();
        let trials = engine.search_trials("asthma", None).await.unwrap();

        assert!(literature.is_empty(), "literature not empty for HTTP {status}");
        assert!(trials.is_empty(), "trials not empty for HTTP {status}");
    }
}

#[tokio::test]
async fn test_unreachable_upstream_degrades_to_empty() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    drop(server);

    let engine = ResearchEngine::from_config(config).unwrap();
    let result = engine
        .comprehensive_research(&ComprehensiveRequest::new("asthma"))
        .await
        .unwrap();

    assert!(result.literature.is_empty());
    assert!(result.clinical_trials.is_empty());
    assert!(result.diagnostic_criteria.is_some());
    assert!(result.degraded_sources.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    mount_trials(&server).await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let err = engine
        .search_literature("asthma", None, SortMode::Relevance)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { .. }));
    assert!(err.is_surfaced());

    let err = engine
        .comprehensive_research(&ComprehensiveRequest::new("asthma"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { .. }));
}

#[tokio::test]
async fn test_corrupt_compressed_body_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .insert_header("content-type", "application/json")
                .set_body_bytes(b"\x1f\x8b\x08\x00truncated".to_vec()),
        )
        .mount(&server)
        .await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let literature = engine
        .search_literature("asthma", None, SortMode::Relevance)
        .await
        .unwrap();
    let trials = engine.search_trials("asthma", None).await.unwrap();
    assert!(literature.is_empty());
    assert!(trials.is_empty());

    let result = engine
        .comprehensive_research(&ComprehensiveRequest::new("asthma"))
        .await
        .unwrap();
    assert!(result.literature.is_empty());
    assert!(result.diagnostic_criteria.is_some());
}

#[tokio::test]
async fn test_trial_registry_query_and_mapping() {
    let server = MockServer::start().await;
    mount_trials(&server).await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let trials = engine.search_trials("type 2 diabetes", Some(2)).await.unwrap();

    assert_eq!(trials.len(), 1);
    let trial = &trials[0];
    assert_eq!(trial.id, "NCT05000001");
    assert_eq!(trial.condition, "Diabetes Mellitus, Type 2");
    assert_eq!(trial.phase, "Phase 3");
    assert_eq!(trial.status, "Recruiting");
    assert_eq!(trial.completion_date, "");
    assert_eq!(trial.url, "https://clinicaltrials.gov/study/NCT05000001");

    let requests = server.received_requests().await.unwrap();
    let params: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
    let expr = params
        .iter()
        .find(|(k, _)| k == "expr")
        .map(|(_, v)| v.as_str())
        .unwrap();
    assert!(expr.starts_with("type 2 diabetes AND AREA[OverallStatus]("));
    assert!(params.contains(&("min_rnk".to_string(), "1".to_string())));
    assert!(params.contains(&("max_rnk".to_string(), "2".to_string())));
    assert!(params.iter().any(|(k, v)| k == "fields" && v.contains("NCTId")));
}

#[tokio::test]
async fn test_comprehensive_research_merges_every_source() {
    let server = MockServer::start().await;
    mount_pubmed(&server).await;
    mount_trials(&server).await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let request = ComprehensiveRequest::new("diabetes").with_medications(vec![
        "Metformin".to_string(),
        "Lisinopril".to_string(),
        "Warfarin".to_string(),
        "Aspirin".to_string(),
    ]);
    let result = engine.comprehensive_research(&request).await.unwrap();

    assert_eq!(result.literature.len(), 2);
    assert_eq!(result.clinical_trials.len(), 1);
    assert_eq!(result.diagnostic_criteria.unwrap().criteria.len(), 4);
    assert!(result.treatment_guidelines.is_some());
    assert_eq!(result.icd_codes.unwrap().code, "E11.9");
    assert!(!result.calculators.is_empty());
    assert_eq!(result.drug_interactions.len(), 1);
    assert_eq!(result.drug_interactions[0].drug1, "Warfarin");
    assert_eq!(result.drug_interactions[0].drug2, "Aspirin");
    assert!(result.degraded_sources.is_empty());
}

#[tokio::test]
async fn test_slow_upstream_exceeds_branch_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(esearch_body(&[]))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;
    mount_trials(&server).await;

    let mut config = config_for(&server);
    config.engine.branch_timeout_secs = 1;
    let engine = ResearchEngine::from_config(config).unwrap();

    let result = engine
        .comprehensive_research(&ComprehensiveRequest::new("diabetes"))
        .await
        .unwrap();

    assert!(result.literature.is_empty());
    assert_eq!(result.clinical_trials.len(), 1);
    assert_eq!(result.degraded_sources, vec!["literature".to_string()]);
}

#[tokio::test]
async fn test_http_timeout_is_neutralized_not_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(esearch_body(&[]))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.literature.timeout_secs = 1;
    config.trials.timeout_secs = 1;
    let engine = ResearchEngine::from_config(config).unwrap();

    let result = engine
        .comprehensive_research(&ComprehensiveRequest::new("hypertension"))
        .await
        .unwrap();

    assert!(result.literature.is_empty());
    assert!(result.clinical_trials.is_empty());
    assert!(result.degraded_sources.is_empty());
    assert_eq!(result.icd_codes.unwrap().code, "I10");
}

#[tokio::test]
async fn test_health_check_against_mock_upstreams() {
    let server = MockServer::start().await;
    mount_pubmed(&server).await;
    Mock::given(method("GET"))
        .and(path(TRIALS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = ResearchEngine::from_config(config_for(&server)).unwrap();
    let health = engine.health_check().await;

    assert_eq!(health.get("pubmed"), Some(&true));
    assert_eq!(health.get("clinical_trials"), Some(&false));
}
