use std::sync::Arc;
use storybox::db;
use storybox::feed::{FeedClient, FeedError, FeedQuery, WordPressClient};
use storybox::model::SyncStatus;
use storybox::store::SqliteStore;
use storybox::sync::Syncer;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query() -> FeedQuery {
    FeedQuery {
        site_id: "113100833".into(),
        category: "historias-infantis-abobrinha".into(),
        number: 100,
        fields: "ID,title,content,featured_image".into(),
    }
}

fn client_for(server: &MockServer) -> WordPressClient {
    WordPressClient::new(&format!("{}/rest/v1.1/sites/", server.uri()), &query()).unwrap()
}

async fn mount(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/rest/v1.1/sites/113100833/posts"))
        .and(query_param("category", "historias-infantis-abobrinha"))
        .and(query_param("number", "100"))
        .and(query_param("fields", "ID,title,content,featured_image"))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn returns_body_on_success() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string(r#"{"found":1,"posts":[{"ID":1,"title":"a"}]}"#),
    )
    .await;

    let body = client_for(&server).fetch_feed().await.unwrap();
    assert_eq!(
        body.as_deref(),
        Some(r#"{"found":1,"posts":[{"ID":1,"title":"a"}]}"#)
    );
}

#[tokio::test]
async fn empty_body_is_absent_not_error() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200)).await;

    let body = client_for(&server).fetch_feed().await.unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn whitespace_body_is_passed_through() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_string(" \n")).await;

    let body = client_for(&server).fetch_feed().await.unwrap();
    assert_eq!(body.as_deref(), Some(" \n"));
    assert!(storybox::feed::parse(body.as_deref().unwrap()).is_err());
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(503).set_body_string("down")).await;

    let err = client_for(&server).fetch_feed().await.unwrap_err();
    match err {
        FeedError::Status(code) => assert_eq!(code.as_u16(), 503),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    // Bind and release a port so nothing is listening on it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let base = format!("http://127.0.0.1:{}/rest/v1.1/sites/", port);

    let client = WordPressClient::new(&base, &query()).unwrap();
    let err = client.fetch_feed().await.unwrap_err();
    assert!(matches!(err, FeedError::Http(_)));
}

#[tokio::test]
async fn full_pass_against_http_feed() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string(
            r#"{"found":2,"posts":[
                {"ID":11,"title":"A Girafa","content":"<p>...</p>","featured_image":"https://img/11.jpg"},
                {"ID":12,"title":"O Le&atilde;o","content":"<p>...</p>","featured_image":""}
            ]}"#,
        ),
    )
    .await;

    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let syncer = Syncer::new(
        Arc::new(client_for(&server)),
        store.clone(),
        store.clone(),
    );

    let report = syncer.run_pass().await.unwrap();
    assert_eq!(report.status, SyncStatus::Ok);
    assert_eq!(report.after, 2);

    let stories = store.list_stories().await.unwrap();
    let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["A Girafa", "O Leão"]);
    assert_eq!(stories[1].image_url, None);
    assert_eq!(db::get_sync_state(&pool).await.unwrap().status, SyncStatus::Ok);
}
