//! End-to-end flows against a scripted transport.

use pagesync_client::{
    ClientConfig, ClientError, HttpMethod, PageId, PageStatus, ScaffoldData, ScriptedHttp,
    SyncClient,
};

fn client_with(http: &ScriptedHttp) -> SyncClient {
    SyncClient::new(http.clone(), ClientConfig::new("http://wiki"))
}

const DRAFT_PAGE: &str = r#"{
    "id": "100",
    "status": "current",
    "title": "Draft",
    "space": {"key": "OPS"},
    "version": {"number": 5},
    "body": {"storage": {"value": "<p>draft</p>", "representation": "storage"}},
    "ancestors": [{"id": "1", "title": "Home", "space": {"key": "OPS"}}]
}"#;

#[test]
fn fetch_mutate_update_roundtrip() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(
        200,
        r#"{"id": "100", "title": "Final", "version": {"number": 6}}"#,
    );
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    assert_eq!(page.title(), Some("Draft"));
    assert_eq!(page.version(), Some(5));
    assert_eq!(page.parent_id().unwrap().value(), 1);
    assert!(!page.is_dirty());

    page.set_title("Final").unwrap();
    assert!(page.dirty().title);

    assert!(client.update(&mut page, false).unwrap());
    assert_eq!(page.title(), Some("Final"));
    assert_eq!(page.version(), Some(6));
    assert!(!page.is_dirty());

    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, HttpMethod::Put);
    assert_eq!(requests[1].url, "http://wiki/rest/api/content/100");
    let body = requests[1].body.as_ref().unwrap();
    assert!(body.contains("\"number\":6"));
    assert!(body.contains("\"title\":\"Final\""));
}

#[test]
fn update_adopts_authoritative_version_on_server_noop() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    // The server no-ops the write and does not bump the version.
    http.push_response(200, r#"{"id": "100", "version": {"number": 5}}"#);
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_title("Draft2").unwrap();
    assert!(client.update(&mut page, false).unwrap());
    assert_eq!(page.version(), Some(5));
}

#[test]
fn update_failure_returns_false_and_records_error() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(409, "version conflict");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_title("Final").unwrap();
    assert!(!client.update(&mut page, false).unwrap());
    assert!(page.dirty().title);
    let message = client.last_error().unwrap();
    assert!(message.contains("409"));
}

#[test]
fn suppressing_notifications_marks_minor_edit() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(200, r#"{"id": "100", "version": {"number": 6}}"#);
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_title("Final").unwrap();
    client.update(&mut page, true).unwrap();

    let body = http.requests()[1].body.clone().unwrap();
    assert!(body.contains("\"minorEdit\":true"));
}

#[test]
fn search_terminates_after_empty_page() {
    let http = ScriptedHttp::new();
    http.push_response(
        200,
        r#"{"results": [{"id": "1", "title": "A"}, {"id": "2", "title": "B"}], "size": 2}"#,
    );
    http.push_response(200, r#"{"results": [], "size": 0}"#);
    let client = client_with(&http);

    let pages = client.search("type=page", false).unwrap().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(http.requests().len(), 2);
}

#[test]
fn double_delete_is_a_usage_error_without_network() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(204, "");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    assert!(client.delete(&mut page).unwrap());
    assert_eq!(page.status(), PageStatus::Trashed);
    let before = http.requests().len();

    assert!(matches!(
        client.delete(&mut page),
        Err(ClientError::Usage(_))
    ));
    assert_eq!(http.requests().len(), before);
}

#[test]
fn reconcile_issues_symmetric_difference() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    // Server currently holds {b, c}; the local set will be {a, b}.
    http.push_response(
        200,
        r#"{"results": [{"prefix": "global", "name": "b"}, {"prefix": "global", "name": "c"}]}"#,
    );
    http.push_response(204, "");
    http.push_response(200, "{}");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.add_label("a").unwrap();
    page.add_label("b").unwrap();

    assert!(client.reconcile_labels(&mut page).unwrap());
    assert!(!page.dirty().labels);

    let requests = http.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].method, HttpMethod::Get);
    assert_eq!(requests[2].method, HttpMethod::Delete);
    assert!(requests[2].url.ends_with("/label?name=c"));
    assert_eq!(requests[3].method, HttpMethod::Post);
    assert!(requests[3].body.as_ref().unwrap().contains("\"name\":\"a\""));
}

#[test]
fn reconcile_partial_failure_still_attempts_everything() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(
        200,
        r#"{"results": [{"prefix": "global", "name": "b"}, {"prefix": "global", "name": "c"}]}"#,
    );
    http.push_response(500, "remove failed");
    http.push_response(200, "{}");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.add_label("a").unwrap();
    page.add_label("b").unwrap();

    assert!(!client.reconcile_labels(&mut page).unwrap());
    // The add for "a" was still issued after the failing remove.
    assert_eq!(http.requests().len(), 4);
    assert_eq!(http.requests()[3].method, HttpMethod::Post);
    // Partial application leaves the set dirty.
    assert!(page.dirty().labels);
}

#[test]
fn sidecar_update_bumps_version_locally() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(200, "");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.install_scaffold(ScaffoldData::new());
    page.set_scaffold_value("owner", Some("ops"));

    assert!(client.update_sidecar(&mut page).unwrap());
    assert_eq!(page.version(), Some(6));
    assert!(!page.dirty().scaffold);

    let request = &http.requests()[1];
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.url, "http://wiki/rest/scaffolding/1.0/api/form/100");
}

#[test]
fn sidecar_not_modified_counts_as_success() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(304, "");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_scaffold_value("owner", Some("ops"));

    assert!(client.update_sidecar(&mut page).unwrap());
    // No content version was recorded by the server.
    assert_eq!(page.version(), Some(5));
    assert!(!page.dirty().scaffold);
}

#[test]
fn sidecar_save_without_load_is_a_usage_error() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    assert!(matches!(
        client.update_sidecar(&mut page),
        Err(ClientError::Usage(_))
    ));
    assert_eq!(http.requests().len(), 1);
}

#[test]
fn create_adopts_server_identity_and_pushes_labels() {
    let http = ScriptedHttp::new();
    http.push_response(200, r#"{"id": "200", "status": "current", "version": {"number": 1}}"#);
    http.push_response(200, "{}");
    let client = client_with(&http);

    let mut page = client.new_page();
    page.set_title("New Runbook").unwrap();
    page.set_collection_key("OPS").unwrap();
    page.set_parent(PageId::parse("1").unwrap());
    page.add_label("runbook").unwrap();

    assert!(client.create(&mut page).unwrap());
    assert_eq!(page.id().unwrap().value(), 200);
    assert_eq!(page.version(), Some(1));
    assert_eq!(page.status(), PageStatus::Current);
    assert!(!page.dirty().labels);

    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, "http://wiki/rest/api/content");
    let create_body: serde_json::Value =
        serde_json::from_str(requests[0].body.as_ref().unwrap()).unwrap();
    assert!(create_body.get("id").is_none());
    assert!(create_body.get("version").is_none());
    assert_eq!(create_body["ancestors"][0]["id"], "1");
    assert_eq!(requests[1].method, HttpMethod::Post);
    assert!(requests[1].url.ends_with("/content/200/label"));
    assert!(requests[1].body.as_ref().unwrap().contains("runbook"));
}

#[test]
fn create_without_labels_skips_label_call() {
    let http = ScriptedHttp::new();
    http.push_response(200, r#"{"id": "200", "version": {"number": 1}}"#);
    let client = client_with(&http);

    let mut page = client.new_page();
    page.set_title("Plain").unwrap();
    page.set_collection_key("OPS").unwrap();
    page.set_parent(PageId::parse("1").unwrap());

    assert!(client.create(&mut page).unwrap());
    assert_eq!(http.requests().len(), 1);
}

#[test]
fn add_and_remove_labels_mirror_locally() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(200, "{}");
    http.push_response(204, "");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    assert!(client.add_labels(&mut page, &["Docs", "ops"]).unwrap());
    assert!(page.has_label("docs"));
    assert!(page.has_label("OPS"));

    assert!(client.remove_label(&mut page, "docs").unwrap());
    assert!(!page.has_label("docs"));

    let remove = &http.requests()[2];
    assert_eq!(remove.method, HttpMethod::Delete);
    assert!(remove.url.ends_with("/label?name=docs"));
}

#[test]
fn clean_entity_save_is_a_local_noop() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    assert!(page.save(false).unwrap());
    assert!(page.save_labels().unwrap());
    assert!(page.save_sidecar().unwrap());
    assert_eq!(http.requests().len(), 1);
}

#[test]
fn sync_all_short_circuits_on_first_failure() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(500, "update rejected");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_title("Final").unwrap();
    page.add_label("docs").unwrap();

    assert!(!page.sync_all(false).unwrap());
    // The failing page save stops the chain; no label request goes out.
    assert_eq!(http.requests().len(), 2);
    assert_eq!(http.requests()[1].method, HttpMethod::Put);
}

#[test]
fn sync_all_runs_all_stages_in_order() {
    let http = ScriptedHttp::new();
    http.push_response(200, DRAFT_PAGE);
    http.push_response(200, r#"{"id": "100", "version": {"number": 6}}"#);
    http.push_response(200, r#"{"results": []}"#);
    http.push_response(200, "{}");
    http.push_response(200, "");
    let client = client_with(&http);

    let mut page = client.fetch_by_id(PageId::parse("100").unwrap()).unwrap();
    page.set_title("Final").unwrap();
    page.add_label("docs").unwrap();
    page.install_scaffold(ScaffoldData::new());
    page.set_scaffold_value("owner", Some("ops"));

    assert!(page.sync_all(false).unwrap());
    assert!(!page.is_dirty());

    let methods: Vec<HttpMethod> = http.requests().iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![
            HttpMethod::Get,    // fetch
            HttpMethod::Put,    // page update
            HttpMethod::Get,    // label list
            HttpMethod::Post,   // label add
            HttpMethod::Put,    // sidecar update
        ]
    );
    // Page update took the version to 6, the sidecar write to 7.
    assert_eq!(page.version(), Some(7));
}

#[test]
fn children_listing_uses_child_endpoint() {
    let http = ScriptedHttp::new();
    http.push_response(200, r#"{"results": [{"id": "5", "title": "Child"}], "size": 1}"#);
    http.push_response(200, r#"{"results": [], "size": 0}"#);
    let client = client_with(&http);

    let children = client
        .list_children(PageId::parse("42").unwrap(), false)
        .unwrap();
    assert_eq!(children.len(), 1);
    assert!(http.requests()[0]
        .url
        .starts_with("http://wiki/rest/api/content/42/child/page?"));
}
