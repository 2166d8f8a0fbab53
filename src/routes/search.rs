use std::collections::BTreeSet;
use std::time::Duration;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::models::{Company, Document, Member, NewSavedSearch, SavedSearch};
use crate::schema::{companies, documents, members, saved_searches};
use crate::search::{
    company_matches_filters, company_matches_term, document_matches_filters,
    document_matches_term, member_matches_filters, member_matches_term, SearchFilters,
    SearchModule,
};
use crate::state::AppState;

use super::documents::member_names;
use super::members::company_names;
use super::to_iso;

const DEFAULT_LIMIT: usize = 50;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub search_term: Option<String>,
    pub modules: Option<Vec<SearchModule>>,
    pub filters: Option<SearchFilters>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyHit {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
    pub created_at: String,
}

impl From<Company> for CompanyHit {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            description: company.description,
            region: company.region,
            branch: company.branch,
            created_at: to_iso(company.created_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberHit {
    pub id: Uuid,
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub region: Option<String>,
    pub company_id: Uuid,
    pub company_name: String,
    pub date_joined: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHit {
    pub id: Uuid,
    pub member_id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_type: String,
    pub size_bytes: i64,
    pub member_name: String,
    pub company_name: String,
    pub uploaded_at: String,
    pub file_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub companies: Vec<CompanyHit>,
    pub members: Vec<MemberHit>,
    pub documents: Vec<DocumentHit>,
    pub total_count: usize,
}

/// One pass per requested module: term predicate, then filters, count,
/// truncate, and only then enrich the survivors.
pub async fn run_search(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Json(payload): Json<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    let term = payload
        .search_term
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let modules = payload
        .modules
        .unwrap_or_else(|| SearchModule::ALL.to_vec());
    let filters = payload.filters.unwrap_or_default();
    let limit = payload.limit.unwrap_or(DEFAULT_LIMIT);

    let mut conn = state.db()?;
    let mut total_count = 0usize;

    let mut company_hits: Vec<CompanyHit> = Vec::new();
    if modules.contains(&SearchModule::Companies) {
        let rows: Vec<Company> = companies::table.load(&mut conn)?;
        let mut matched: Vec<Company> = rows
            .into_iter()
            .filter(|company| {
                company_matches_term(company, &term) && company_matches_filters(company, &filters)
            })
            .collect();
        total_count += matched.len();
        matched.truncate(limit);
        company_hits = matched.into_iter().map(CompanyHit::from).collect();
    }

    let mut member_hits: Vec<MemberHit> = Vec::new();
    if modules.contains(&SearchModule::Members) {
        let rows: Vec<Member> = members::table.load(&mut conn)?;
        let mut matched: Vec<Member> = rows
            .into_iter()
            .filter(|member| {
                member_matches_term(member, &term) && member_matches_filters(member, &filters)
            })
            .collect();
        total_count += matched.len();
        matched.truncate(limit);

        let names = company_names(&mut conn, matched.iter().map(|m| m.company_id))?;
        member_hits = matched
            .into_iter()
            .map(|member| {
                let company_name = names
                    .get(&member.company_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string());
                MemberHit {
                    id: member.id,
                    staff_id: member.staff_id,
                    first_name: member.first_name,
                    last_name: member.last_name,
                    email: member.email,
                    status: member.status,
                    position: member.position,
                    department: member.department,
                    region: member.region,
                    company_id: member.company_id,
                    company_name,
                    date_joined: to_iso(member.date_joined),
                }
            })
            .collect();
    }

    let mut document_hits: Vec<DocumentHit> = Vec::new();
    if modules.contains(&SearchModule::Documents) {
        let rows: Vec<Document> = documents::table.load(&mut conn)?;
        let mut matched: Vec<Document> = rows
            .into_iter()
            .filter(|document| {
                document_matches_term(document, &term)
                    && document_matches_filters(document, &filters)
            })
            .collect();
        total_count += matched.len();
        matched.truncate(limit);

        let member_map = member_names(&mut conn, matched.iter().map(|d| d.member_id))?;
        let company_map = company_names(&mut conn, matched.iter().map(|d| d.company_id))?;
        drop(conn);

        let expiry = Duration::from_secs(state.config.download_url_expiry_seconds);
        for document in matched {
            let file_url = match state
                .storage
                .presign_get_object(&document.storage_key, expiry)
                .await
            {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(error = %err, key = %document.storage_key, "presign failed for search hit");
                    None
                }
            };
            document_hits.push(DocumentHit {
                id: document.id,
                member_id: document.member_id,
                company_id: document.company_id,
                title: document.title,
                description: document.description,
                file_type: document.file_type,
                size_bytes: document.size_bytes,
                member_name: member_map
                    .get(&document.member_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                company_name: company_map
                    .get(&document.company_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                uploaded_at: to_iso(document.uploaded_at),
                file_url,
            });
        }
    }

    Ok(Json(SearchResponse {
        companies: company_hits,
        members: member_hits,
        documents: document_hits,
        total_count,
    }))
}

#[derive(Serialize)]
pub struct CompanyOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
pub struct FilterOptionsResponse {
    pub regions: Vec<String>,
    pub branches: Vec<String>,
    pub departments: Vec<String>,
    pub positions: Vec<String>,
    pub companies: Vec<CompanyOption>,
}

/// Distinct non-empty values to drive the filter pickers. Regions pool
/// company and member values together.
pub async fn filter_options(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
) -> AppResult<Json<FilterOptionsResponse>> {
    let mut conn = state.db()?;

    let company_rows: Vec<(Uuid, String, Option<String>, Option<String>)> = companies::table
        .select((
            companies::id,
            companies::name,
            companies::region,
            companies::branch,
        ))
        .load(&mut conn)?;

    let member_rows: Vec<(Option<String>, Option<String>, Option<String>)> = members::table
        .select((members::region, members::department, members::position))
        .load(&mut conn)?;

    let mut regions = BTreeSet::new();
    let mut branches = BTreeSet::new();
    let mut departments = BTreeSet::new();
    let mut positions = BTreeSet::new();

    let mut company_options = Vec::with_capacity(company_rows.len());
    for (id, name, region, branch) in company_rows {
        if let Some(value) = region.filter(|v| !v.is_empty()) {
            regions.insert(value);
        }
        if let Some(value) = branch.filter(|v| !v.is_empty()) {
            branches.insert(value);
        }
        company_options.push(CompanyOption { id, name });
    }
    company_options.sort_by(|a, b| a.name.cmp(&b.name));

    for (region, department, position) in member_rows {
        if let Some(value) = region.filter(|v| !v.is_empty()) {
            regions.insert(value);
        }
        if let Some(value) = department.filter(|v| !v.is_empty()) {
            departments.insert(value);
        }
        if let Some(value) = position.filter(|v| !v.is_empty()) {
            positions.insert(value);
        }
    }

    Ok(Json(FilterOptionsResponse {
        regions: regions.into_iter().collect(),
        branches: branches.into_iter().collect(),
        departments: departments.into_iter().collect(),
        positions: positions.into_iter().collect(),
        companies: company_options,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSearchRequest {
    pub name: String,
    pub search_term: Option<String>,
    pub modules: Option<Vec<SearchModule>>,
    pub filters: Option<SearchFilters>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSavedSearchRequest {
    pub name: Option<String>,
    pub search_term: Option<String>,
    pub modules: Option<Vec<SearchModule>>,
    pub filters: Option<SearchFilters>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSearchResponse {
    pub search_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchResponse {
    pub id: Uuid,
    pub name: String,
    pub search_term: Option<String>,
    pub modules: Vec<SearchModule>,
    pub filters: SearchFilters,
    pub created_at: String,
    pub last_used: String,
    pub use_count: i64,
}

impl TryFrom<SavedSearch> for SavedSearchResponse {
    type Error = AppError;

    fn try_from(row: SavedSearch) -> Result<Self, Self::Error> {
        let modules: Vec<SearchModule> = serde_json::from_value(row.modules)?;
        let filters: SearchFilters = serde_json::from_value(row.filters)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            search_term: row.search_term,
            modules,
            filters,
            created_at: to_iso(row.created_at),
            last_used: to_iso(row.last_used),
            use_count: row.use_count,
        })
    }
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = saved_searches)]
struct SavedSearchChangeset {
    name: Option<String>,
    search_term: Option<String>,
    modules: Option<serde_json::Value>,
    filters: Option<serde_json::Value>,
}

pub async fn save_search(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SaveSearchRequest>,
) -> AppResult<(StatusCode, Json<SaveSearchResponse>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let modules = payload
        .modules
        .unwrap_or_else(|| SearchModule::ALL.to_vec());
    let filters = payload.filters.unwrap_or_default();

    let new_search = NewSavedSearch {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        name: name.to_string(),
        search_term: payload
            .search_term
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty()),
        modules: serde_json::to_value(&modules)?,
        filters: serde_json::to_value(&filters)?,
    };

    let mut conn = state.db()?;
    diesel::insert_into(saved_searches::table)
        .values(&new_search)
        .execute(&mut conn)?;

    Ok((
        StatusCode::CREATED,
        Json(SaveSearchResponse {
            search_id: new_search.id,
        }),
    ))
}

pub async fn list_saved_searches(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<SavedSearchResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<SavedSearch> = saved_searches::table
        .filter(saved_searches::user_id.eq(user.user_id))
        .order(saved_searches::last_used.desc())
        .load(&mut conn)?;

    rows.into_iter()
        .map(SavedSearchResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Records a use of a saved search. The counter bump is a single SQL
/// increment so concurrent touches never lose an update.
pub async fn touch_saved_search(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(search_id): Path<Uuid>,
) -> AppResult<Json<SavedSearchResponse>> {
    let mut conn = state.db()?;

    let updated = diesel::update(
        saved_searches::table
            .find(search_id)
            .filter(saved_searches::user_id.eq(user.user_id)),
    )
    .set((
        saved_searches::use_count.eq(saved_searches::use_count + 1),
        saved_searches::last_used.eq(diesel::dsl::now),
    ))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::not_found());
    }

    let row: SavedSearch = saved_searches::table.find(search_id).first(&mut conn)?;
    Ok(Json(SavedSearchResponse::try_from(row)?))
}

pub async fn update_saved_search(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(search_id): Path<Uuid>,
    Json(payload): Json<UpdateSavedSearchRequest>,
) -> AppResult<Json<SavedSearchResponse>> {
    if let Some(ref candidate) = payload.name {
        if candidate.trim().is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
    }

    let mut conn = state.db()?;
    let _existing: SavedSearch = saved_searches::table
        .find(search_id)
        .filter(saved_searches::user_id.eq(user.user_id))
        .first(&mut conn)?;

    let changeset = SavedSearchChangeset {
        name: payload.name.map(|name| name.trim().to_string()),
        search_term: payload.search_term,
        modules: payload
            .modules
            .map(|modules| serde_json::to_value(&modules))
            .transpose()?,
        filters: payload
            .filters
            .map(|filters| serde_json::to_value(&filters))
            .transpose()?,
    };

    let has_changes = changeset.name.is_some()
        || changeset.search_term.is_some()
        || changeset.modules.is_some()
        || changeset.filters.is_some();
    if has_changes {
        diesel::update(saved_searches::table.find(search_id))
            .set(&changeset)
            .execute(&mut conn)?;
    }

    let row: SavedSearch = saved_searches::table.find(search_id).first(&mut conn)?;
    Ok(Json(SavedSearchResponse::try_from(row)?))
}

pub async fn delete_saved_search(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(search_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    let deleted = diesel::delete(
        saved_searches::table
            .find(search_id)
            .filter(saved_searches::user_id.eq(user.user_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
