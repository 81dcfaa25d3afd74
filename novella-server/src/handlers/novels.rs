//! Novel import and browsing handlers

use crate::state::{AppState, ServerEvent};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use novella_core::{
    ContentStore, ImportReport, Language, NovellaError, StoreError, StoredChapter, StoredNovel,
};
use serde::{Deserialize, Serialize};

type ApiError = (StatusCode, String);

/// Query parameters for listing novels
#[derive(Debug, Deserialize)]
pub struct ListNovelsQuery {
    /// Page number (1-indexed, 0 treated as 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Match against title and author
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

/// List response with pagination
#[derive(Debug, Serialize)]
pub struct ListNovelsResponse {
    pub novels: Vec<StoredNovel>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

/// List novels, newest first
pub async fn list_novels(
    State(state): State<AppState>,
    Query(query): Query<ListNovelsQuery>,
) -> Result<Json<ListNovelsResponse>, ApiError> {
    let novels = state.store.list_novels().await.map_err(store_error)?;

    let novels: Vec<StoredNovel> = match &query.search {
        Some(search) => {
            let needle = search.to_lowercase();
            novels
                .into_iter()
                .filter(|n| {
                    n.title.to_lowercase().contains(&needle)
                        || n
                            .author
                            .as_deref()
                            .is_some_and(|a| a.to_lowercase().contains(&needle))
                })
                .collect()
        }
        None => novels,
    };

    let total = novels.len() as u32;
    let page = query.page.max(1);
    // u32 * u32 always fits in u64; a start past the end yields an empty page
    let start = u64::from(page - 1) * u64::from(query.per_page);
    let start = usize::try_from(start).unwrap_or(usize::MAX);
    let novels = novels
        .into_iter()
        .skip(start)
        .take(query.per_page as usize)
        .collect();

    Ok(Json(ListNovelsResponse {
        novels,
        total,
        page,
        per_page: query.per_page,
    }))
}

/// Novel header plus chapter statistics
#[derive(Debug, Serialize)]
pub struct NovelResponse {
    #[serde(flatten)]
    pub novel: StoredNovel,
    pub chapter_count: usize,
    /// Languages present on at least one chapter
    pub languages: Vec<Language>,
}

/// Get a single novel
pub async fn get_novel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NovelResponse>, ApiError> {
    let novel = find_novel(&state, &id).await?;
    let chapters = state.store.list_chapters(&id).await.map_err(store_error)?;

    let languages = Language::ALL
        .into_iter()
        .filter(|&l| chapters.iter().any(|c| c.content(l).is_some()))
        .collect();

    Ok(Json(NovelResponse {
        novel,
        chapter_count: chapters.len(),
        languages,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChaptersQuery {
    /// Include chapter bodies
    #[serde(default)]
    pub content: bool,
}

/// Chapter listing entry; bodies only when asked for
#[derive(Debug, Serialize)]
pub struct ChapterResponse {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub languages: Vec<Language>,
    pub epub_en_url: Option<String>,
    pub epub_id_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl ChapterResponse {
    fn new(chapter: StoredChapter, with_content: bool) -> Self {
        let languages = chapter.languages();
        let (content_en, content_id) = if with_content {
            (chapter.content_en, chapter.content_id)
        } else {
            (None, None)
        };
        Self {
            id: chapter.id,
            number: chapter.number,
            title: chapter.title,
            languages,
            epub_en_url: chapter.epub_en_url,
            epub_id_url: chapter.epub_id_url,
            content_en,
            content_id,
        }
    }
}

/// List a novel's chapters in order
pub async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChaptersQuery>,
) -> Result<Json<Vec<ChapterResponse>>, ApiError> {
    find_novel(&state, &id).await?;
    let chapters = state.store.list_chapters(&id).await.map_err(store_error)?;

    Ok(Json(
        chapters
            .into_iter()
            .map(|c| ChapterResponse::new(c, query.content))
            .collect(),
    ))
}

/// Fields of an upload form
struct Upload {
    filename: String,
    data: Vec<u8>,
    language: Language,
    source_url: Option<String>,
}

async fn read_upload(mut multipart: axum_extra::extract::Multipart) -> Result<Upload, ApiError> {
    let mut file = None;
    let mut language = None;
    let mut source_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            "language" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                let parsed = text
                    .parse::<Language>()
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                language = Some(parsed);
            }
            "source_url" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    source_url = Some(text.to_string());
                }
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, data) =
        file.ok_or_else(|| (StatusCode::BAD_REQUEST, "No file provided".to_string()))?;

    Ok(Upload {
        filename,
        data,
        language: language.unwrap_or_default(),
        source_url,
    })
}

/// Create a novel from an uploaded EPUB
pub async fn import_novel(
    State(state): State<AppState>,
    multipart: axum_extra::extract::Multipart,
) -> Result<Json<ImportReport>, ApiError> {
    let upload = read_upload(multipart).await?;

    let report = state
        .importer
        .import_new_novel(&upload.filename, upload.data, upload.language)
        .await
        .map_err(|e| import_error(&state, e))?;

    persist(&state).await;
    state.broadcast(ServerEvent::NovelImported {
        id: report.novel_id.clone(),
        title: report.title.clone(),
        chapters: report.created.len(),
    });

    Ok(Json(report))
}

/// Add a language track to an existing novel from an uploaded EPUB
pub async fn add_language(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: axum_extra::extract::Multipart,
) -> Result<Json<ImportReport>, ApiError> {
    let upload = read_upload(multipart).await?;

    let report = state
        .importer
        .add_language(
            &id,
            &upload.filename,
            upload.data,
            upload.language,
            upload.source_url.as_deref(),
        )
        .await
        .map_err(|e| import_error(&state, e))?;

    persist(&state).await;
    state.broadcast(ServerEvent::LanguageAdded {
        id: report.novel_id.clone(),
        language: report.language,
        created: report.created.len(),
        updated: report.updated.len(),
    });

    Ok(Json(report))
}

async fn find_novel(state: &AppState, id: &str) -> Result<StoredNovel, ApiError> {
    state
        .store
        .get_novel(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Novel not found: {}", id)))
}

/// The import itself succeeded, so a failed index write is only logged
async fn persist(state: &AppState) {
    if let Err(e) = state.save_library().await {
        tracing::error!("{:#}", e);
    }
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NovelNotFound(_) | StoreError::ChapterNotFound(_) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn import_error(state: &AppState, e: NovellaError) -> ApiError {
    let message = e.to_string();
    state.broadcast(ServerEvent::Error {
        message: message.clone(),
    });

    let status = match e {
        NovellaError::FileFormat(_) | NovellaError::Package(_) => StatusCode::BAD_REQUEST,
        NovellaError::Store(e) => return store_error(e),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, message)
}
