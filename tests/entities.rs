//! Entity tests against a wiremock Connect server.
//!
//! Cover updates, deletes, immutability and the HTTP error mapping.

use connectapi::{
    Attrs, Client, Config, ConnectError, Create, Delete, Fetchable, Queryable, Resource, Update,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEM: &str = "f2f37341-e21d-3d80-c698-a935ad614066";

fn client(server: &MockServer) -> Client {
    Client::new(Config::new(&server.uri(), "test-key").unwrap()).unwrap()
}

async fn mount_item(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/__api__/v1/content/{ITEM}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": ITEM,
            "name": "sales-dashboard",
            "title": "Sales",
            "app_mode": "python-streamlit",
            "owner_guid": "u1",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_requests_send_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__api__/server_settings"))
        .and(header("authorization", "Key test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "2024.08.0"})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client(&server).server_version().await.unwrap(), "2024.08.0");
}

#[tokio::test]
async fn test_update_returns_new_entity() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/__api__/v1/content/{ITEM}")))
        .and(body_json(json!({"title": "Q3 Sales"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": ITEM,
            "name": "sales-dashboard",
            "title": "Q3 Sales",
            "app_mode": "python-streamlit",
            "owner_guid": "u1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    let updated = item.update(Attrs::new().set("title", "Q3 Sales")).await.unwrap();

    assert_eq!(updated.title().unwrap().as_deref(), Some("Q3 Sales"));
    assert_eq!(item.title().unwrap().as_deref(), Some("Sales"));
    assert_eq!(updated.guid().unwrap(), item.guid().unwrap());
}

#[tokio::test]
async fn test_update_with_empty_response_keeps_sent_fields() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/__api__/v1/content/{ITEM}")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    let updated = item.update(Attrs::new().set("title", "Renamed")).await.unwrap();

    assert_eq!(updated.title().unwrap().as_deref(), Some("Renamed"));
    assert_eq!(updated.name().unwrap(), "sales-dashboard");
}

#[tokio::test]
async fn test_delete_twice_reports_not_found() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/__api__/v1/content/{ITEM}")))
        .respond_with(ResponseTemplate::new(204))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/__api__/v1/content/{ITEM}")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"code": 4, "error": "not found", "payload": null})),
        )
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();

    item.delete().await.unwrap();
    let second = item.delete().await;
    assert!(matches!(second, Err(ConnectError::NotFound { .. })));
}

#[tokio::test]
async fn test_group_update_is_immutable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__api__/v1/groups/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"guid": "g1", "name": "finance"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let group = client(&server).groups().unwrap().get("g1").await.unwrap();
    let result = group.entity().update(Attrs::new().set("name", "accounting")).await;

    assert!(matches!(result, Err(ConnectError::Immutable { .. })));
    assert_eq!(group.name().unwrap(), "finance");
}

#[tokio::test]
async fn test_create_posts_attributes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/__api__/v1/content"))
        .and(body_json(json!({"name": "new-app", "title": "New App"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guid": "c9",
            "name": "new-app",
            "title": "New App",
            "app_mode": "unknown",
            "owner_guid": "u1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = client(&server)
        .content()
        .unwrap()
        .create(Attrs::new().set("name", "new-app").set("title", "New App"))
        .await
        .unwrap();

    assert_eq!(item.guid().unwrap(), "c9");
    assert_eq!(item.id().as_deref(), Some("c9"));
}

#[tokio::test]
async fn test_repository_absent_is_none() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/__api__/v1/content/{ITEM}/repository")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"code": 4, "error": "not found", "payload": null})),
        )
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    assert!(item.repository().await.unwrap().is_none());
}

#[tokio::test]
async fn test_repository_server_error_propagates() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/__api__/v1/content/{ITEM}/repository")))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    let err = item.repository().await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, ConnectError::ApiError { status_code: Some(500), .. }));
}

#[tokio::test]
async fn test_deploy_waits_on_returned_task() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/__api__/v1/content/{ITEM}/deploy")))
        .and(body_json(json!({"bundle_id": null})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "t42"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/__api__/v1/tasks/t42"))
        .and(query_param("wait", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t42",
            "finished": true,
            "code": 1,
            "error": "Unable to restore environment",
            "output": ["Restoring packages", "Error: missing lockfile"],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/__api__/v1/tasks/t42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t42",
            "finished": false,
            "output": ["Restoring packages"],
        })))
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    let task = item.deploy().await.unwrap();
    assert!(!task.is_finished().unwrap());
    assert_eq!(task.error_code().unwrap(), None);

    let done = task.wait_for().await.unwrap();
    assert_eq!(done.error_code().unwrap(), Some(1));
    assert_eq!(done.error_message().unwrap().as_deref(), Some("Unable to restore environment"));
    assert_eq!(done.output().unwrap().len(), 2);
}

#[tokio::test]
async fn test_permissions_scoped_to_item() {
    let server = MockServer::start().await;
    mount_item(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/__api__/v1/content/{ITEM}/permissions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "7",
            "content_guid": ITEM,
            "principal_guid": "u2",
            "principal_type": "user",
            "role": "viewer",
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let item = client(&server).content().unwrap().get(ITEM).await.unwrap();
    let permissions = item.permissions().unwrap();

    assert_eq!(permissions.path(), format!("v1/content/{ITEM}/permissions"));
    let fetched = permissions.fetch().await.unwrap();
    assert_eq!(fetched[0].principal_guid().unwrap(), "u2");
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__api__/v1/content"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let result = client(&server).content().unwrap().count().await;
    assert!(matches!(
        result,
        Err(ConnectError::RateLimited {
            retry_after_secs: Some(30)
        })
    ));
}

#[tokio::test]
async fn test_connect_error_code_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__api__/v1/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"code": 30, "error": "Invalid API key.", "payload": null})),
        )
        .mount(&server)
        .await;

    match client(&server).me().await {
        Err(ConnectError::ApiError {
            message,
            status_code,
            error_code,
        }) => {
            assert_eq!(message, "Invalid API key.");
            assert_eq!(status_code, Some(401));
            assert_eq!(error_code, Some(30));
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}
