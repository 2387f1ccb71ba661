use super::*;

fn test_client(base_url: &str) -> AnalysisClient {
    AnalysisClient::with_base_url("test-key", "asst_123", base_url)
        .expect("client construction should not fail")
}

#[test]
fn endpoint_appends_to_versioned_base_path() {
    let client = test_client("https://api.example.com/v1");
    let url = client.endpoint("threads/runs").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/threads/runs");
}

#[test]
fn endpoint_tolerates_trailing_slash() {
    let client = test_client("https://api.example.com/v1/");
    let url = client.endpoint("threads/t_1/messages").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/threads/t_1/messages");
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = AnalysisClient::with_base_url("k", "a", "not a url").unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidBaseUrl { .. }));
}
