//! Integration tests for the Novella Server API

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use novella_core::fixture::{EpubFixture, TINY_PNG};
use novella_server::routes::create_router;
use novella_server::state::{AppState, ServerConfig};
use serde_json::Value;
use tempfile::TempDir;

/// Create a test app state with temporary storage
async fn create_test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = ServerConfig::with_storage_path(temp_dir.path());
    let state = AppState::new(config).await.expect("Failed to create state");
    (state, temp_dir)
}

/// Create a test server
async fn create_test_server() -> (TestServer, TempDir) {
    let (state, temp_dir) = create_test_state().await;
    let app = create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, temp_dir)
}

fn sample_epub(prefix: &str, chapters: u32) -> Vec<u8> {
    let mut fixture = EpubFixture::new("The Quiet Harbor")
        .author("M. Writer")
        .description("A town by the sea.");
    for n in 1..=chapters {
        fixture = fixture.chapter(&format!("Ch{}", n), &format!("<p>{}{}</p>", prefix, n));
    }
    fixture.cover_image(TINY_PNG, "image/png").build()
}

fn upload_form(data: Vec<u8>, filename: &str, language: &str) -> MultipartForm {
    MultipartForm::new().add_text("language", language).add_part(
        "file",
        Part::bytes(data)
            .file_name(filename)
            .mime_type("application/epub+zip"),
    )
}

async fn import(server: &TestServer, prefix: &str, chapters: u32) -> Value {
    let response = server
        .post("/api/v1/novels")
        .multipart(upload_form(sample_epub(prefix, chapters), "harbor.epub", "en"))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_health_check() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_list_novels_empty() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server.get("/api/v1/novels").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["novels"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 0);
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 20);
}

#[tokio::test]
async fn test_list_novels_page_zero_treated_as_one() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .get("/api/v1/novels")
        .add_query_param("page", "0")
        .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn test_list_novels_huge_page_is_empty() {
    let (server, _temp_dir) = create_test_server().await;
    import(&server, "Hello", 1).await;

    let response = server
        .get("/api/v1/novels")
        .add_query_param("page", u32::MAX.to_string())
        .add_query_param("per_page", u32::MAX.to_string())
        .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["novels"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], u32::MAX);
}

#[tokio::test]
async fn test_import_new_novel() {
    let (server, temp_dir) = create_test_server().await;

    let report = import(&server, "Hello", 3).await;
    assert_eq!(report["title"], "The Quiet Harbor");
    assert_eq!(report["language"], "en");
    assert_eq!(report["created"], serde_json::json!([1, 2, 3]));
    assert_eq!(report["cover_stored"], true);
    assert_eq!(report["summary"], "3 chapters created, 0 updated, 0 failed to save");

    let id = report["novel_id"].as_str().unwrap();
    let response = server.get(&format!("/api/v1/novels/{}", id)).await;
    response.assert_status_ok();
    let novel: Value = response.json();
    assert_eq!(novel["author"], "M. Writer");
    assert_eq!(novel["status"], "ongoing");
    assert_eq!(novel["view_count"], 0);
    assert_eq!(novel["chapter_count"], 3);
    assert_eq!(novel["languages"], serde_json::json!(["en"]));

    let cover_url = novel["cover_url"].as_str().unwrap();
    assert!(cover_url.starts_with("http://127.0.0.1:3000/assets/covers/"));
    assert!(cover_url.ends_with("-cover.png"));

    // The library index is written after every import
    assert!(temp_dir.path().join("library.json").exists());
}

#[tokio::test]
async fn test_cover_is_served_from_assets() {
    let (server, _temp_dir) = create_test_server().await;

    let report = import(&server, "Hello", 1).await;
    let id = report["novel_id"].as_str().unwrap();
    let novel: Value = server.get(&format!("/api/v1/novels/{}", id)).await.json();

    let cover_url = novel["cover_url"].as_str().unwrap();
    let path = cover_url.trim_start_matches("http://127.0.0.1:3000");
    let response = server.get(path).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), TINY_PNG);
}

#[tokio::test]
async fn test_list_chapters() {
    let (server, _temp_dir) = create_test_server().await;

    let report = import(&server, "Hello", 2).await;
    let id = report["novel_id"].as_str().unwrap();

    let response = server.get(&format!("/api/v1/novels/{}/chapters", id)).await;
    response.assert_status_ok();
    let chapters: Value = response.json();
    let chapters = chapters.as_array().unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0]["number"], 1);
    assert_eq!(chapters[0]["title"], "Ch1");
    assert!(chapters[0].get("content_en").is_none());

    let response = server
        .get(&format!("/api/v1/novels/{}/chapters", id))
        .add_query_param("content", "true")
        .await;
    let chapters: Value = response.json();
    assert_eq!(chapters[1]["content_en"], "<p>Hello2</p>");
}

#[tokio::test]
async fn test_add_language() {
    let (server, _temp_dir) = create_test_server().await;

    let report = import(&server, "Hello", 3).await;
    let id = report["novel_id"].as_str().unwrap();

    let form = upload_form(sample_epub("Halo", 2), "harbor-id.epub", "id")
        .add_text("source_url", "https://example.com/harbor-id.epub");
    let response = server
        .post(&format!("/api/v1/novels/{}/languages", id))
        .multipart(form)
        .await;
    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["updated"], serde_json::json!([1, 2]));
    assert_eq!(report["created"], serde_json::json!([]));

    let chapters: Value = server
        .get(&format!("/api/v1/novels/{}/chapters", id))
        .add_query_param("content", "true")
        .await
        .json();
    assert_eq!(chapters[0]["content_en"], "<p>Hello1</p>");
    assert_eq!(chapters[0]["content_id"], "<p>Halo1</p>");
    assert_eq!(chapters[0]["epub_id_url"], "https://example.com/harbor-id.epub");
    assert_eq!(chapters[2]["languages"], serde_json::json!(["en"]));

    let novel: Value = server.get(&format!("/api/v1/novels/{}", id)).await.json();
    assert_eq!(novel["languages"], serde_json::json!(["en", "id"]));
}

#[tokio::test]
async fn test_add_language_unknown_novel() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .post("/api/v1/novels/00000000-0000-0000-0000-000000000000/languages")
        .multipart(upload_form(sample_epub("Halo", 1), "x.epub", "id"))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_get_novel_not_found() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .get("/api/v1/novels/00000000-0000-0000-0000-000000000000")
        .await;
    response.assert_status_not_found();

    let response = server
        .get("/api/v1/novels/00000000-0000-0000-0000-000000000000/chapters")
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_upload_no_file() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .post("/api/v1/novels")
        .multipart(MultipartForm::new().add_text("language", "en"))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_upload_not_an_epub() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .post("/api/v1/novels")
        .multipart(upload_form(b"plain text".to_vec(), "notes.epub", "en"))
        .await;

    response.assert_status_bad_request();

    let body: Value = server.get("/api/v1/novels").await.json();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_upload_missing_container() {
    let (server, _temp_dir) = create_test_server().await;

    let data = EpubFixture::new("Broken")
        .chapter("One", "<p>1</p>")
        .without_container()
        .build();
    let response = server
        .post("/api/v1/novels")
        .multipart(upload_form(data, "broken.epub", "en"))
        .await;

    response.assert_status_bad_request();
    assert!(response.text().contains("container"));
}

#[tokio::test]
async fn test_upload_unsupported_language() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .post("/api/v1/novels")
        .multipart(upload_form(sample_epub("x", 1), "x.epub", "fr"))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_search_novels() {
    let (server, _temp_dir) = create_test_server().await;
    import(&server, "Hello", 1).await;

    let body: Value = server
        .get("/api/v1/novels")
        .add_query_param("search", "harbor")
        .await
        .json();
    assert_eq!(body["total"], 1);

    let body: Value = server
        .get("/api/v1/novels")
        .add_query_param("search", "writer")
        .await
        .json();
    assert_eq!(body["total"], 1);

    let body: Value = server
        .get("/api/v1/novels")
        .add_query_param("search", "nothing like it")
        .await
        .json();
    assert_eq!(body["total"], 0);
}
