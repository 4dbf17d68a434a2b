mod common;

use common::{tester, Sequence, CLOUD, PROJECT};
use couchbase_capella_provider::testing::{assert_plan_changes_attribute, assert_plan_updates_in_place};
use couchbase_capella_provider::ProviderError;
use serde_json::{json, Value};
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOSTED: &str = "couchbasecapella_hosted_cluster";
const VPC: &str = "couchbasecapella_vpc_cluster";
const NEW_CLUSTER: &str = "7b0c9a52-1d2e-4f3a-8b4c-5d6e7f8a9b0c";

fn hosted_config() -> Value {
    json!({
        "name": "hosted 1",
        "project_id": PROJECT,
        "place": {"single_az": true, "hosted": {"provider": "aws", "region": "us-east-2", "cidr": "10.0.16.0/20"}},
        "support_package": {"timezone": "GMT", "support_package_type": "DeveloperPro"},
        "servers": [{
            "size": 3,
            "compute": "m5.xlarge",
            "services": ["data", "index", "query"],
            "storage": {"storage_type": "GP3", "iops": 3000, "storage_size": 50}
        }]
    })
}

fn hosted_state() -> Value {
    let mut state = hosted_config();
    state["id"] = json!(NEW_CLUSTER);
    state
}

fn vpc_config() -> Value {
    json!({
        "name": "vpc-1",
        "cloud_id": CLOUD,
        "project_id": PROJECT,
        "servers": [{
            "size": 3,
            "services": ["data", "query"],
            "aws": {"instance_size": "m5.xlarge", "ebs_size_gib": 50}
        }]
    })
}

async fn mount_cloud(server: &MockServer, provider: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/clouds/{}", CLOUD)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": CLOUD,
            "name": "prod",
            "provider": provider,
            "region": "us-east-1",
            "virtualNetworkCidr": "10.1.0.0/16"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_hosted_create_polls_until_healthy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/clusters"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("/v3/clusters/{}", NEW_CLUSTER).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["deploying", "deploying", "healthy"], false))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": NEW_CLUSTER,
            "name": "hosted 1",
            "projectId": PROJECT
        })))
        .mount(&server)
        .await;

    let state = tester(&server)
        .lifecycle_create(HOSTED, hosted_config())
        .await
        .unwrap();

    assert_eq!(state["id"], NEW_CLUSTER);
    assert_eq!(state["servers"][0]["compute"], "m5.xlarge");
}

#[tokio::test]
async fn test_hosted_create_fails_on_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/clusters"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("/v3/clusters/{}", NEW_CLUSTER).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["deploying", "deploymentFailed"], false))
        .mount(&server)
        .await;

    let err = tester(&server)
        .create(HOSTED, hosted_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedState(_)), "{}", err);
}

#[tokio::test]
async fn test_hosted_delete_refused_while_deploying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["deploying"], false))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v3/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let err = tester(&server)
        .delete(HOSTED, hosted_state())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::FailedPrecondition(_)), "{}", err);
    assert!(err.to_string().contains("deploying"));
}

#[tokio::test]
async fn test_hosted_delete_waits_until_gone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["healthy", "destroying"], true))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v3/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    tester(&server)
        .delete(HOSTED, hosted_state())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vpc_create_polls_until_ready() {
    let server = MockServer::start().await;
    mount_cloud(&server, "aws").await;

    Mock::given(method("POST"))
        .and(path("/v2/clusters"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", format!("/v2/clusters/{}", NEW_CLUSTER).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(
            &["deploying", "deploy_succeeded", "ready"],
            false,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": NEW_CLUSTER,
            "name": "vpc-1",
            "cloudId": CLOUD,
            "projectId": PROJECT
        })))
        .mount(&server)
        .await;

    let state = tester(&server)
        .lifecycle_create(VPC, vpc_config())
        .await
        .unwrap();
    assert_eq!(state["id"], NEW_CLUSTER);
    assert_eq!(state["servers"][0]["aws"]["ebs_size_gib"], 50);
}

#[tokio::test]
async fn test_vpc_create_rejects_provider_mismatch() {
    let server = MockServer::start().await;
    mount_cloud(&server, "azure").await;

    Mock::given(method("POST"))
        .and(path("/v2/clusters"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let err = tester(&server).create(VPC, vpc_config()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)), "{}", err);
}

#[tokio::test]
async fn test_vpc_create_reports_missing_cloud() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/clouds/{}", CLOUD)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/clusters"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let err = tester(&server).create(VPC, vpc_config()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)), "{}", err);
    assert!(err.to_string().contains("verify your cloud_id"));
}

#[tokio::test]
async fn test_vpc_server_change_is_unsupported() {
    let server = MockServer::start().await;
    let mut prior = vpc_config();
    prior["id"] = json!(NEW_CLUSTER);
    let mut planned = prior.clone();
    planned["servers"][0]["size"] = json!(5);

    let err = tester(&server)
        .update(VPC, prior, planned)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unimplemented(_)), "{}", err);
}

#[tokio::test]
async fn test_vpc_timeouts_change_applies_without_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server);
    let mut prior = vpc_config();
    prior["id"] = json!(NEW_CLUSTER);
    let mut proposed = vpc_config();
    proposed["timeouts"] = json!({"create": 3600});

    let plan = tester
        .plan_update(VPC, prior.clone(), proposed)
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "timeouts");

    let updated = tester
        .update(VPC, prior, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["id"], NEW_CLUSTER);
    assert_eq!(updated["timeouts"]["create"], 3600);
}

#[tokio::test]
async fn test_vpc_delete_refused_unless_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["deploying"], false))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let mut state = vpc_config();
    state["id"] = json!(NEW_CLUSTER);

    let err = tester(&server).delete(VPC, state).await.unwrap_err();
    assert!(matches!(err, ProviderError::FailedPrecondition(_)), "{}", err);
}

#[tokio::test]
async fn test_vpc_delete_waits_until_gone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(
            &["ready", "destroying", "destroy_succeeded"],
            true,
        ))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v2/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = vpc_config();
    state["id"] = json!(NEW_CLUSTER);

    tester(&server).delete(VPC, state).await.unwrap();
}

async fn mount_hosted_put(server: &MockServer, group: &str, times: u64) {
    Mock::given(method("PUT"))
        .and(path(format!("/v3/clusters/{}/{}", NEW_CLUSTER, group)))
        .respond_with(ResponseTemplate::new(204))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_hosted_cluster(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}", NEW_CLUSTER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": NEW_CLUSTER,
            "name": name,
            "projectId": PROJECT
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_hosted_servers_change_puts_servers_and_waits() {
    let server = MockServer::start().await;
    mount_hosted_cluster(&server, "hosted 1").await;
    mount_hosted_put(&server, "meta", 0).await;
    mount_hosted_put(&server, "support", 0).await;
    mount_hosted_put(&server, "servers", 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["deploying", "healthy"], false))
        .expect(2)
        .mount(&server)
        .await;

    let mut planned = hosted_state();
    planned["servers"][0]["size"] = json!(5);

    let updated = tester(&server)
        .update(HOSTED, hosted_state(), planned)
        .await
        .unwrap();
    assert_eq!(updated["servers"][0]["size"], 5);
}

#[tokio::test]
async fn test_hosted_meta_and_support_change_skip_servers() {
    let server = MockServer::start().await;
    mount_hosted_cluster(&server, "hosted 2").await;
    mount_hosted_put(&server, "servers", 0).await;
    Mock::given(method("PUT"))
        .and(path(format!("/v3/clusters/{}/meta", NEW_CLUSTER)))
        .and(body_json(json!({"name": "hosted 2", "description": ""})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/v3/clusters/{}/support", NEW_CLUSTER)))
        .and(body_json(json!({
            "supportPackage": {"timezone": "GMT", "type": "Enterprise"}
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/clusters/{}/status", NEW_CLUSTER)))
        .respond_with(Sequence::statuses(&["healthy"], false))
        .expect(0)
        .mount(&server)
        .await;

    let mut planned = hosted_state();
    planned["name"] = json!("hosted 2");
    planned["support_package"]["support_package_type"] = json!("Enterprise");

    let updated = tester(&server)
        .update(HOSTED, hosted_state(), planned)
        .await
        .unwrap();
    assert_eq!(updated["name"], "hosted 2");
}

#[tokio::test]
async fn test_cloud_data_source() {
    let server = MockServer::start().await;
    mount_cloud(&server, "aws").await;

    let cloud = tester(&server)
        .read_data_source("couchbasecapella_cloud", json!({"cloud_id": CLOUD}))
        .await
        .unwrap();
    assert_eq!(cloud["provider"], "aws");
    assert_eq!(cloud["virtual_network_cidr"], "10.1.0.0/16");
}
