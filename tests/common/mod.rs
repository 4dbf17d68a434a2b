//! Shared fixtures for the integration tests: a mocked Capella API and a
//! provider pointed at it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use couchbase_capella_provider::testing::ProviderTester;
use couchbase_capella_provider::{CapellaProvider, PollConfig, ProviderConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PROJECT: &str = "4a2c2f0c-4e8b-4c3d-9f1a-2b3c4d5e6f70";
pub const CLUSTER: &str = "0b4bd1f3-3c35-4a0a-9d6c-9bcbd2a33f52";
pub const CLOUD: &str = "1c2d3e4f-5a6b-4c7d-8e9f-0a1b2c3d4e5f";

/// A provider talking to `server` that polls without waiting.
pub fn tester(server: &MockServer) -> ProviderTester<CapellaProvider> {
    let config = ProviderConfig::new("test-access-key", "test-secret-key")
        .with_api_url(server.uri())
        .with_poll(PollConfig {
            delay: Some(0),
            interval: Some(0),
        });
    ProviderTester::new(CapellaProvider::configured(&config).expect("provider configures"))
}

/// Replies with each template in turn, repeating the last one.
pub struct Sequence {
    responses: Vec<ResponseTemplate>,
    calls: AtomicUsize,
}

impl Sequence {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "a sequence needs at least one response");
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    /// `200 {"status": ...}` for each status, then `404` if `then_gone`.
    pub fn statuses(statuses: &[&str], then_gone: bool) -> Self {
        let mut responses: Vec<ResponseTemplate> = statuses
            .iter()
            .map(|s| ResponseTemplate::new(200).set_body_json(json!({ "status": s })))
            .collect();
        if then_gone {
            responses.push(ResponseTemplate::new(404));
        }
        Self::new(responses)
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses[call.min(self.responses.len() - 1)].clone()
    }
}

/// Mount `GET /v2/clusters/{CLUSTER}` as an existing in-VPC cluster.
pub async fn mount_vpc_cluster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}", CLUSTER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": CLUSTER,
            "name": "vpc-1",
            "cloudId": CLOUD,
            "projectId": PROJECT
        })))
        .mount(server)
        .await;
}

/// Mount `CLUSTER` as a cluster only the hosted API knows about.
pub async fn mount_hosted_only_cluster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}", CLUSTER)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}", CLUSTER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": CLUSTER,
            "name": "hosted-1"
        })))
        .mount(server)
        .await;
}
