//! Integration tests for the MAAS client using wiremock
//!
//! These tests verify the client against mocked endpoints: bootstrapping
//! from the describe document, verb-specific argument routing, response
//! decoding, and the machine cache.

use maas_client::{CallArgs, Error, FilterSpec, MaasClient, Reply};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "consumer:token:secret";

/// Describe document whose handler uris point at the mock server
fn description(server_uri: &str) -> Value {
    let api = format!("{}/MAAS/api/2.0", server_uri);
    json!({
        "doc": "MAAS API",
        "hash": "abc",
        "resources": [
            {
                "name": "MachinesHandler",
                "anon": null,
                "auth": {
                    "name": "MachinesHandler",
                    "doc": "Manage the collection of all the machines in the MAAS.",
                    "path": "/MAAS/api/2.0/machines/",
                    "uri": format!("{}/machines/", api),
                    "params": [],
                    "actions": [
                        {"name": "read", "method": "GET", "op": null, "doc": "List machines.", "restful": true},
                        {"name": "list_allocated", "method": "GET", "op": "list_allocated", "doc": "List allocated.", "restful": false},
                        {"name": "allocate", "method": "POST", "op": "allocate", "doc": "Allocate a machine.", "restful": false}
                    ]
                }
            },
            {
                "name": "MachineHandler",
                "anon": null,
                "auth": {
                    "name": "MachineHandler",
                    "doc": "Manage an individual machine.",
                    "path": "/MAAS/api/2.0/machines/{system_id}/",
                    "uri": format!("{}/machines/{{system_id}}/", api),
                    "params": ["system_id"],
                    "actions": [
                        {"name": "read", "method": "GET", "op": null, "doc": "Read a machine.", "restful": true},
                        {"name": "deploy", "method": "POST", "op": "deploy", "doc": "Deploy.", "restful": false},
                        {"name": "update", "method": "PUT", "op": null, "doc": "Update.", "restful": true},
                        {"name": "delete", "method": "DELETE", "op": null, "doc": "Delete.", "restful": true}
                    ]
                }
            },
            {
                "name": "VersionHandler",
                "anon": {
                    "name": "VersionHandler",
                    "path": "/MAAS/api/2.0/version/",
                    "uri": format!("{}/version/", api),
                    "params": [],
                    "actions": []
                },
                "auth": null
            }
        ]
    })
}

async fn mount_describe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/MAAS/api/2.0/describe/"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server.uri())))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> MaasClient {
    mount_describe(server).await;
    MaasClient::connect(&format!("{}/MAAS", server.uri()), API_KEY)
        .await
        .expect("client should connect")
}

fn machines() -> Value {
    json!([
        {"system_id": "aaa", "hostname": "web-01", "status_name": "Ready", "tag_names": ["web"]},
        {"system_id": "bbb", "hostname": "db-01", "status_name": "Deployed", "tag_names": ["db"]},
        {"system_id": "ccc", "hostname": "web-02", "status_name": "Deployed", "tag_names": ["web"]},
        {"hostname": "orphan", "status_name": "Ready"}
    ])
}

fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Test module for client bootstrap
mod bootstrap_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_builds_authenticated_resources() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        let names: Vec<&str> = client.resources().map(|r| r.name()).collect();
        assert_eq!(names, vec!["machine", "machines"]);
        assert!(client.resource("version").is_err());

        let machine = client.resource("machine").unwrap();
        assert!(machine.params().contains("system_id"));
        assert_eq!(machine.operations().count(), 4);
        assert_eq!(client.description()["hash"], "abc");
    }

    #[tokio::test]
    async fn test_describe_failure_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/describe/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = MaasClient::connect(&format!("{}/MAAS", server.uri()), API_KEY).await;
        match result {
            Err(Error::Describe { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[tokio::test]
    async fn test_malformed_description_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/describe/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [{"name": "MachinesHandler", "auth": {"uri": "x", "params": []}}]
            })))
            .mount(&server)
            .await;

        let result = MaasClient::connect(&format!("{}/MAAS", server.uri()), API_KEY).await;
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[tokio::test]
    async fn test_bad_api_key_fails_before_network() {
        let server = MockServer::start().await;

        let result = MaasClient::connect(&format!("{}/MAAS", server.uri()), "not-a-key").await;
        assert!(matches!(result, Err(Error::InvalidApiKey)));

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        mount_describe(&server).await;

        let client = MaasClient::connect(&format!("{}/MAAS/", server.uri()), API_KEY)
            .await
            .expect("client should connect");
        assert!(client.base_url().ends_with("/MAAS"));
    }
}

/// Test module for operation invocation
mod invocation_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_sends_args_as_query() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .and(query_param("hostname", "web-01"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"system_id": "aaa"}])))
            .mount(&server)
            .await;

        let reply = client
            .call("machines", "read", CallArgs::new().arg("hostname", "web-01"))
            .await
            .expect("read should succeed");

        assert_eq!(reply, Reply::Json(json!([{"system_id": "aaa"}])));
    }

    #[tokio::test]
    async fn test_get_with_op_tag_and_explicit_params() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .and(query_param("op", "list_allocated"))
            .and(query_param("x", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let reply = client
            .call(
                "machines",
                "list_allocated",
                CallArgs::new().params(map(json!({"x": 1}))),
            )
            .await
            .expect("list_allocated should succeed");

        assert_eq!(reply, Reply::Json(json!([])));
    }

    #[tokio::test]
    async fn test_uri_params_fill_template_and_are_not_resent() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/abc123/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"system_id": "abc123"})))
            .mount(&server)
            .await;

        let reply = client
            .call("machine", "read", CallArgs::new().kwarg("system_id", "abc123"))
            .await
            .expect("read should succeed");
        assert_eq!(reply.into_json()["system_id"], "abc123");

        let requests = server.received_requests().await.unwrap_or_default();
        let read = requests.last().expect("read request recorded");
        assert!(read.url.query().is_none());
    }

    #[tokio::test]
    async fn test_post_sends_multipart_form() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("POST"))
            .and(path("/MAAS/api/2.0/machines/abc123/"))
            .and(query_param("op", "deploy"))
            .and(body_string_contains("name=\"distro_series\""))
            .and(body_string_contains("jammy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "system_id": "abc123",
                "status_name": "Deploying"
            })))
            .mount(&server)
            .await;

        let reply = client
            .call(
                "machine",
                "deploy",
                CallArgs::new().args(map(json!({"system_id": "abc123", "distro_series": "jammy"}))),
            )
            .await
            .expect("deploy should succeed");

        assert_eq!(reply.into_json()["status_name"], "Deploying");
    }

    #[tokio::test]
    async fn test_put_uses_explicit_files() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("PUT"))
            .and(path("/MAAS/api/2.0/machines/abc123/"))
            .and(body_string_contains("node-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hostname": "node-7"})))
            .mount(&server)
            .await;

        let reply = client
            .call(
                "machine",
                "update",
                CallArgs::new()
                    .kwarg("system_id", "abc123")
                    .files(map(json!({"hostname": "node-7"}))),
            )
            .await
            .expect("update should succeed");

        assert_eq!(reply.into_json()["hostname"], "node-7");
    }

    #[tokio::test]
    async fn test_delete_returns_status_code() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/MAAS/api/2.0/machines/abc123/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let reply = client
            .call("machine", "delete", CallArgs::new().arg("system_id", "abc123"))
            .await
            .expect("delete should succeed");

        assert_eq!(reply, Reply::Status(204));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        Mock::given(method("POST"))
            .and(path("/MAAS/api/2.0/machines/"))
            .and(query_param("op", "allocate"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("No machine available matching constraints."),
            )
            .mount(&server)
            .await;

        let err = client
            .call("machines", "allocate", CallArgs::new().arg("cpu_count", 64))
            .await
            .unwrap_err();

        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, "No machine available matching constraints.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_template_arg_sends_nothing() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        let before = server.received_requests().await.unwrap_or_default().len();

        let err = client
            .call("machine", "read", CallArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingTemplateArg { .. }));

        let after = server.received_requests().await.unwrap_or_default().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let server = MockServer::start().await;
        let client = connect(&server).await;

        let err = client
            .call("machines", "explode", CallArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOperation { .. }));
    }
}

/// Test module for the machine cache
mod cache_tests {
    use super::*;

    #[tokio::test]
    async fn test_reload_and_find_machines() {
        let server = MockServer::start().await;
        let mut client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(machines()))
            .mount(&server)
            .await;

        let stored = client
            .reload_machines(Map::new(), false)
            .await
            .expect("reload should succeed");
        assert_eq!(stored, 3);

        let all = client
            .find_machines(&FilterSpec::new(), false)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let mut ids: Vec<String> = client
            .find_machine_ids(
                &FilterSpec::new()
                    .with("status_name", "Deployed")
                    .with("tag_names", "web"),
                false,
            )
            .await
            .unwrap()
            .into_iter()
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["ccc"]);
    }

    #[tokio::test]
    async fn test_reload_passes_filter_args() {
        let server = MockServer::start().await;
        let mut client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .and(query_param("status", "ready"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"system_id": "aaa", "status_name": "Ready"}
            ])))
            .mount(&server)
            .await;

        let stored = client
            .reload_machines(map(json!({"status": "ready"})), false)
            .await
            .expect("reload should succeed");
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn test_reset_then_empty_refresh_clears_cache() {
        let server = MockServer::start().await;
        let mut client = connect(&server).await;

        // First read returns machines
        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(machines()))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Later reads return nothing
        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        client.reload_machines(Map::new(), false).await.unwrap();
        assert_eq!(client.find_machines(&FilterSpec::new(), false).await.unwrap().len(), 3);

        // Without reset, records survive an empty read
        client.reload_machines(Map::new(), false).await.unwrap();
        assert_eq!(client.find_machines(&FilterSpec::new(), false).await.unwrap().len(), 3);

        client.reload_machines(Map::new(), true).await.unwrap();
        assert!(client
            .find_machines(&FilterSpec::new(), false)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_with_update_refreshes_first() {
        let server = MockServer::start().await;
        let mut client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(machines()))
            .expect(1)
            .mount(&server)
            .await;

        let found = client
            .find_machines(&FilterSpec::new().with("hostname", "*-01"), true)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_non_list_read_is_rejected() {
        let server = MockServer::start().await;
        let mut client = connect(&server).await;

        Mock::given(method("GET"))
            .and(path("/MAAS/api/2.0/machines/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
            .mount(&server)
            .await;

        let err = client.reload_machines(Map::new(), false).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }
}
