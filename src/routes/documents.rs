use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::error::{AppError, AppResult};
use crate::models::{Document, Member, NewDocument};
use crate::schema::{documents, members, users};
use crate::state::AppState;

use super::members::company_names;
use super::notifications::{notify, RELATED_DOCUMENT, SEVERITY_INFO};
use super::to_iso;

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub member_id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: String,
    pub member_name: String,
    pub company_name: String,
    pub uploader_name: String,
}

#[derive(Serialize)]
pub struct DocumentDownloadResponse {
    pub url: String,
    pub expires_in: u64,
    pub title: String,
    pub file_type: String,
    pub size_bytes: i64,
}

#[derive(Deserialize)]
pub struct DocumentListQuery {
    pub member_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

struct UploadFields {
    bytes: Vec<u8>,
    original_name: Option<String>,
    content_type: Option<String>,
    member_id: Uuid,
    title: String,
    description: Option<String>,
}

pub(super) fn to_document_response(
    document: Document,
    member_name: Option<&String>,
    company_name: Option<&String>,
    uploader_name: Option<&String>,
) -> DocumentResponse {
    DocumentResponse {
        id: document.id,
        member_id: document.member_id,
        company_id: document.company_id,
        title: document.title,
        description: document.description,
        file_type: document.file_type,
        size_bytes: document.size_bytes,
        uploaded_by: document.uploaded_by,
        uploaded_at: to_iso(document.uploaded_at),
        member_name: member_name.cloned().unwrap_or_else(|| "Unknown".to_string()),
        company_name: company_name
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        uploader_name: uploader_name
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

/// Full user names keyed by id, one query for the whole batch.
fn user_names(
    conn: &mut PgConnection,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    let mut unique: Vec<Uuid> = ids.collect();
    unique.sort();
    unique.dedup();

    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String, String)> = users::table
        .filter(users::id.eq_any(unique))
        .select((users::id, users::first_name, users::last_name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, first, last)| (id, format!("{first} {last}")))
        .collect())
}

/// Full member names keyed by id, one query for the whole batch.
pub(super) fn member_names(
    conn: &mut PgConnection,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    let mut unique: Vec<Uuid> = ids.collect();
    unique.sort();
    unique.dedup();

    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String, String)> = members::table
        .filter(members::id.eq_any(unique))
        .select((members::id, members::first_name, members::last_name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, first, last)| (id, format!("{first} {last}")))
        .collect())
}

async fn read_upload_fields(multipart: &mut Multipart) -> AppResult<UploadFields> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut member_id: Option<Uuid> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                original_name = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                bytes = Some(data.to_vec());
            }
            Some("member_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid member id: {err}")))?;
                member_id = Some(
                    Uuid::parse_str(value.trim())
                        .map_err(|_| AppError::bad_request("member_id must be a valid UUID"))?,
                );
            }
            Some("title") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid title: {err}")))?;
                title = Some(value);
            }
            Some("description") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid description: {err}")))?;
                if !value.trim().is_empty() {
                    description = Some(value);
                }
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::bad_request("file field is required"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("file field must not be empty"));
    }
    let member_id = member_id.ok_or_else(|| AppError::bad_request("member_id is required"))?;
    let title = title
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("title must not be empty"))?;

    Ok(UploadFields {
        bytes,
        original_name,
        content_type,
        member_id,
        title,
        description,
    })
}

pub async fn upload_document(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let fields = read_upload_fields(&mut multipart).await?;

    let file_type = fields
        .content_type
        .clone()
        .or_else(|| {
            fields
                .original_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut conn = state.db()?;
    let member: Member = members::table.find(fields.member_id).first(&mut conn)?;
    drop(conn);

    let document_id = Uuid::new_v4();
    let storage_key = format!("documents/{document_id}");
    let size_bytes = fields.bytes.len() as i64;

    state
        .storage
        .put_object(&storage_key, fields.bytes, Some(file_type.clone()))
        .await
        .map_err(|err| {
            error!(error = %err, "blob upload failed");
            AppError::internal(format!("failed to store document payload: {err}"))
        })?;

    let new_document = NewDocument {
        id: document_id,
        member_id: member.id,
        // Company reference is frozen from the member at upload time.
        company_id: member.company_id,
        title: fields.title,
        description: fields.description,
        storage_key: storage_key.clone(),
        file_type,
        size_bytes,
        uploaded_by: admin.user_id,
    };

    let mut conn = state.db()?;
    if let Err(err) = diesel::insert_into(documents::table)
        .values(&new_document)
        .execute(&mut conn)
    {
        drop(conn);
        if let Err(cleanup_err) = state.storage.delete_object(&storage_key).await {
            warn!(error = %cleanup_err, key = %storage_key, "failed to clean up blob after insert failure");
        }
        return Err(AppError::from(err));
    }

    let document: Document = documents::table.find(document_id).first(&mut conn)?;

    notify(
        &mut conn,
        member.user_id,
        "New Document Uploaded",
        &format!("A new document \"{}\" has been uploaded", document.title),
        SEVERITY_INFO,
        Some((RELATED_DOCUMENT, document.id)),
    )?;

    let names = company_names(&mut conn, std::iter::once(document.company_id))?;
    let uploaders = user_names(&mut conn, std::iter::once(document.uploaded_by))?;
    let member_name = format!("{} {}", member.first_name, member.last_name);

    info!(
        document_id = %document.id,
        member_id = %member.id,
        size_bytes,
        "document registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(to_document_response(
            document.clone(),
            Some(&member_name),
            names.get(&document.company_id),
            uploaders.get(&document.uploaded_by),
        )),
    ))
}

pub async fn list_documents(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let mut conn = state.db()?;

    let mut docs_query = documents::table.into_boxed();
    if let Some(member_id) = query.member_id {
        docs_query = docs_query.filter(documents::member_id.eq(member_id));
    }
    if let Some(company_id) = query.company_id {
        docs_query = docs_query.filter(documents::company_id.eq(company_id));
    }

    let docs: Vec<Document> = docs_query
        .order(documents::uploaded_at.desc())
        .load(&mut conn)?;

    let member_map = member_names(&mut conn, docs.iter().map(|d| d.member_id))?;
    let company_map = company_names(&mut conn, docs.iter().map(|d| d.company_id))?;
    let uploader_map = user_names(&mut conn, docs.iter().map(|d| d.uploaded_by))?;

    let response = docs
        .into_iter()
        .map(|doc| {
            let member_name = member_map.get(&doc.member_id);
            let company_name = company_map.get(&doc.company_id);
            let uploader_name = uploader_map.get(&doc.uploaded_by);
            to_document_response(doc, member_name, company_name, uploader_name)
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_document(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(document_id).first(&mut conn)?;

    let member_map = member_names(&mut conn, std::iter::once(document.member_id))?;
    let company_map = company_names(&mut conn, std::iter::once(document.company_id))?;
    let uploader_map = user_names(&mut conn, std::iter::once(document.uploaded_by))?;

    Ok(Json(to_document_response(
        document.clone(),
        member_map.get(&document.member_id),
        company_map.get(&document.company_id),
        uploader_map.get(&document.uploaded_by),
    )))
}

pub async fn update_document(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    let _existing: Document = documents::table.find(document_id).first(&mut conn)?;

    if let Some(ref title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title must not be empty"));
        }
        diesel::update(documents::table.find(document_id))
            .set(documents::title.eq(title.trim()))
            .execute(&mut conn)?;
    }
    if let Some(ref description) = payload.description {
        diesel::update(documents::table.find(document_id))
            .set(documents::description.eq(description))
            .execute(&mut conn)?;
    }

    let updated: Document = documents::table.find(document_id).first(&mut conn)?;
    let member_map = member_names(&mut conn, std::iter::once(updated.member_id))?;
    let company_map = company_names(&mut conn, std::iter::once(updated.company_id))?;
    let uploader_map = user_names(&mut conn, std::iter::once(updated.uploaded_by))?;

    Ok(Json(to_document_response(
        updated.clone(),
        member_map.get(&updated.member_id),
        company_map.get(&updated.company_id),
        uploader_map.get(&updated.uploaded_by),
    )))
}

pub async fn delete_document(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(document_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(document_id).first(&mut conn)?;

    diesel::delete(documents::table.find(document_id)).execute(&mut conn)?;
    drop(conn);

    if let Err(err) = state.storage.delete_object(&document.storage_key).await {
        warn!(error = %err, key = %document.storage_key, "failed to delete blob for removed document");
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_document(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentDownloadResponse>> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(document_id).first(&mut conn)?;
    drop(conn);

    let expires_in = state.config.download_url_expiry_seconds;
    let url = state
        .storage
        .presign_get_object(&document.storage_key, Duration::from_secs(expires_in))
        .await
        .map_err(|err| AppError::internal(format!("failed to presign download URL: {err}")))?;

    Ok(Json(DocumentDownloadResponse {
        url,
        expires_in,
        title: document.title,
        file_type: document.file_type,
        size_bytes: document.size_bytes,
    }))
}
