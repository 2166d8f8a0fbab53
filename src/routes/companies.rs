use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::RequireAdmin,
    error::{AppError, AppResult},
    models::{Company, NewCompany},
    schema::{companies, documents, members},
    state::AppState,
};

use super::to_iso;

#[derive(Serialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
    pub created_at: String,
    pub created_by: Uuid,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            description: company.description,
            region: company.region,
            branch: company.branch,
            created_at: to_iso(company.created_at),
            created_by: company.created_by,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = companies)]
struct CompanyChangeset<'a> {
    name: Option<&'a str>,
    description: Option<&'a str>,
    region: Option<&'a str>,
    branch: Option<&'a str>,
}

#[derive(Serialize)]
pub struct CompanyStatsResponse {
    pub total_members: i64,
    pub active_members: i64,
    pub total_documents: i64,
}

pub async fn list_companies(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
) -> AppResult<Json<Vec<CompanyResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Company> = companies::table
        .order(companies::name.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(CompanyResponse::from).collect()))
}

pub async fn create_company(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Json(payload): Json<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<CompanyResponse>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let new_company = NewCompany {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: payload.description,
        region: payload.region,
        branch: payload.branch,
        created_by: user.user_id,
    };

    let mut conn = state.db()?;
    diesel::insert_into(companies::table)
        .values(&new_company)
        .execute(&mut conn)?;

    let company: Company = companies::table.find(new_company.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(company.into())))
}

pub async fn get_company(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<CompanyResponse>> {
    let mut conn = state.db()?;
    let company: Company = companies::table.find(company_id).first(&mut conn)?;
    Ok(Json(company.into()))
}

pub async fn update_company(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> AppResult<Json<CompanyResponse>> {
    let mut conn = state.db()?;
    let _existing: Company = companies::table.find(company_id).first(&mut conn)?;

    if let Some(ref candidate) = payload.name {
        if candidate.trim().is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
    }

    let changeset = CompanyChangeset {
        name: payload.name.as_deref().map(str::trim),
        description: payload.description.as_deref(),
        region: payload.region.as_deref(),
        branch: payload.branch.as_deref(),
    };

    diesel::update(companies::table.find(company_id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: Company = companies::table.find(company_id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

pub async fn delete_company(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(company_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    let member_count: i64 = members::table
        .filter(members::company_id.eq(company_id))
        .select(count_star())
        .first(&mut conn)?;

    if member_count > 0 {
        return Err(AppError::bad_request(
            "cannot delete company that still has members",
        ));
    }

    let deleted = diesel::delete(companies::table.find(company_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn company_stats(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<CompanyStatsResponse>> {
    let mut conn = state.db()?;
    let _company: Company = companies::table.find(company_id).first(&mut conn)?;

    let total_members: i64 = members::table
        .filter(members::company_id.eq(company_id))
        .select(count_star())
        .first(&mut conn)?;

    let active_members: i64 = members::table
        .filter(members::company_id.eq(company_id))
        .filter(members::status.eq(super::members::STATUS_ACTIVE))
        .select(count_star())
        .first(&mut conn)?;

    let total_documents: i64 = documents::table
        .filter(documents::company_id.eq(company_id))
        .select(count_star())
        .first(&mut conn)?;

    Ok(Json(CompanyStatsResponse {
        total_members,
        active_members,
        total_documents,
    }))
}
