use std::time::Duration;

use axum::extract::{Json, State};
use diesel::prelude::*;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{Document, Member};
use crate::schema::{documents, members};
use crate::state::AppState;

use super::members::company_names;
use super::to_iso;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub region: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub date_joined: String,
}

#[derive(Serialize)]
pub struct ProfileDocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_type: String,
    pub size_bytes: i64,
    pub uploaded_at: String,
    pub file_url: Option<String>,
}

/// The caller's own member record. Admins have no member row and get a
/// 404 here.
pub async fn my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProfileResponse>> {
    let mut conn = state.db()?;

    let member: Member = members::table
        .filter(members::user_id.eq(user.user_id))
        .first(&mut conn)?;

    let names = company_names(&mut conn, std::iter::once(member.company_id))?;
    let company_name = names
        .get(&member.company_id)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(Json(ProfileResponse {
        id: member.id,
        staff_id: member.staff_id,
        first_name: member.first_name,
        last_name: member.last_name,
        email: member.email,
        gender: member.gender,
        phone: member.phone,
        address: member.address,
        date_of_birth: member.date_of_birth,
        position: member.position,
        department: member.department,
        region: member.region,
        location: member.location,
        status: member.status,
        company_id: member.company_id,
        company_name,
        date_joined: to_iso(member.date_joined),
    }))
}

pub async fn my_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ProfileDocumentResponse>>> {
    let mut conn = state.db()?;

    let member: Member = members::table
        .filter(members::user_id.eq(user.user_id))
        .first(&mut conn)?;

    let docs: Vec<Document> = documents::table
        .filter(documents::member_id.eq(member.id))
        .order(documents::uploaded_at.desc())
        .load(&mut conn)?;
    drop(conn);

    let expiry = Duration::from_secs(state.config.download_url_expiry_seconds);
    let mut response = Vec::with_capacity(docs.len());
    for document in docs {
        let file_url = match state
            .storage
            .presign_get_object(&document.storage_key, expiry)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(error = %err, key = %document.storage_key, "presign failed for profile document");
                None
            }
        };
        response.push(ProfileDocumentResponse {
            id: document.id,
            title: document.title,
            description: document.description,
            file_type: document.file_type,
            size_bytes: document.size_bytes,
            uploaded_at: to_iso(document.uploaded_at),
            file_url,
        });
    }

    Ok(Json(response))
}
