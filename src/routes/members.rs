use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::{prelude::*, result::DatabaseErrorKind, PgConnection};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{password, RequireAdmin, ROLE_MEMBER},
    error::{AppError, AppResult},
    models::{Company, Member, NewMember, NewUser},
    schema::{companies, documents, members, users},
    state::AppState,
};

use super::notifications::{notify, RELATED_MEMBER, SEVERITY_SUCCESS};
use super::to_iso;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DORMANT: &str = "dormant";
pub const GENDERS: &[&str] = &["male", "female"];
pub const DORMANT_REASONS: &[&str] =
    &["resignation", "retirement", "dismissal", "deferred", "other"];

/// Staff identifiers follow a 2-letter + 6-digit convention (e.g. JD123456).
pub fn is_valid_staff_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 8
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

pub fn generate_staff_id(first_name: &str, last_name: &str) -> String {
    let initial = |name: &str| {
        name.chars()
            .next()
            .filter(char::is_ascii_alphabetic)
            .map(|ch| ch.to_ascii_uppercase())
            .unwrap_or('X')
    };
    let mut rng = rand::thread_rng();
    format!(
        "{}{}{:06}",
        initial(first_name),
        initial(last_name),
        rng.gen_range(0u32..1_000_000)
    )
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub company_name: Option<String>,
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_card_number: Option<String>,
    pub next_of_kin: Option<String>,
    pub emergency_contact: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub region: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub dormant_reason: Option<String>,
    pub dormant_note: Option<String>,
    pub date_joined: String,
}

pub(super) fn to_member_response(member: Member, company_name: Option<String>) -> MemberResponse {
    MemberResponse {
        id: member.id,
        user_id: member.user_id,
        company_id: member.company_id,
        company_name,
        staff_id: member.staff_id,
        first_name: member.first_name,
        last_name: member.last_name,
        email: member.email,
        gender: member.gender,
        phone: member.phone,
        address: member.address,
        date_of_birth: member.date_of_birth,
        id_card_number: member.id_card_number,
        next_of_kin: member.next_of_kin,
        emergency_contact: member.emergency_contact,
        position: member.position,
        department: member.department,
        region: member.region,
        location: member.location,
        status: member.status,
        dormant_reason: member.dormant_reason,
        dormant_note: member.dormant_note,
        date_joined: to_iso(member.date_joined),
    }
}

#[derive(Deserialize)]
pub struct CreateMemberRequest {
    pub company_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub staff_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_card_number: Option<String>,
    pub next_of_kin: Option<String>,
    pub emergency_contact: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub region: Option<String>,
    pub location: Option<String>,
}

#[derive(Serialize)]
pub struct CreateMemberResponse {
    pub member: MemberResponse,
    /// One-time initial password for the provisioned login account.
    pub generated_password: String,
}

#[derive(Deserialize)]
pub struct MemberListQuery {
    pub company_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_card_number: Option<String>,
    pub next_of_kin: Option<String>,
    pub emergency_contact: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub region: Option<String>,
    pub location: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = members)]
struct MemberChangeset<'a> {
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
    email: Option<&'a str>,
    gender: Option<&'a str>,
    phone: Option<&'a str>,
    address: Option<&'a str>,
    date_of_birth: Option<&'a str>,
    id_card_number: Option<&'a str>,
    next_of_kin: Option<&'a str>,
    emergency_contact: Option<&'a str>,
    position: Option<&'a str>,
    department: Option<&'a str>,
    region: Option<&'a str>,
    location: Option<&'a str>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    pub dormant_reason: Option<String>,
    pub dormant_note: Option<String>,
}

pub async fn create_member(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<CreateMemberResponse>)> {
    let first_name = payload.first_name.trim().to_string();
    let last_name = payload.last_name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::bad_request("first and last name are required"));
    }
    if email.is_empty() {
        return Err(AppError::bad_request("email must not be empty"));
    }
    if !GENDERS.contains(&payload.gender.as_str()) {
        return Err(AppError::bad_request("gender must be 'male' or 'female'"));
    }

    let staff_id = match payload.staff_id {
        Some(ref supplied) => {
            let trimmed = supplied.trim().to_uppercase();
            if !is_valid_staff_id(&trimmed) {
                return Err(AppError::bad_request(
                    "staff id must be 2 letters followed by 6 digits",
                ));
            }
            trimmed
        }
        None => generate_staff_id(&first_name, &last_name),
    };

    let plain_password = password::generate_member_password();
    let password_hash = password::hash_password(&plain_password)?;

    let mut conn = state.db()?;
    let company: Company = companies::table.find(payload.company_id).first(&mut conn)?;

    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash,
        role: ROLE_MEMBER.to_string(),
        company_id: Some(company.id),
        first_name: first_name.clone(),
        last_name: last_name.clone(),
    };

    let new_member = NewMember {
        id: Uuid::new_v4(),
        user_id: new_user.id,
        company_id: company.id,
        staff_id,
        first_name,
        last_name,
        email,
        gender: payload.gender,
        phone: payload.phone,
        address: payload.address,
        date_of_birth: payload.date_of_birth,
        id_card_number: payload.id_card_number,
        next_of_kin: payload.next_of_kin,
        emergency_contact: payload.emergency_contact,
        position: payload.position,
        department: payload.department,
        region: payload.region,
        location: payload.location,
        status: STATUS_ACTIVE.to_string(),
    };

    // Login account and member profile land together; the unique
    // constraints on users.email and members.staff_id decide conflicts.
    let insert_result = conn.transaction::<(), diesel::result::Error, _>(|conn| {
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)?;
        diesel::insert_into(members::table)
            .values(&new_member)
            .execute(conn)?;
        Ok(())
    });

    match insert_result {
        Ok(()) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            let message = if info.constraint_name() == Some("members_staff_id_key") {
                "staff id already in use"
            } else {
                "email already registered"
            };
            return Err(AppError::bad_request(message));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let member: Member = members::table.find(new_member.id).first(&mut conn)?;

    notify(
        &mut conn,
        admin.user_id,
        "New Member Added",
        &format!(
            "{} {} has been added to {}",
            member.first_name, member.last_name, company.name
        ),
        SEVERITY_SUCCESS,
        Some((RELATED_MEMBER, member.id)),
    )?;

    info!(
        member_id = %member.id,
        staff_id = %member.staff_id,
        company_id = %company.id,
        "member created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateMemberResponse {
            member: to_member_response(member, Some(company.name)),
            generated_password: plain_password,
        }),
    ))
}

pub async fn list_members(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Query(query): Query<MemberListQuery>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Member> = match query.company_id {
        Some(company_id) => members::table
            .filter(members::company_id.eq(company_id))
            .order(members::date_joined.desc())
            .load(&mut conn)?,
        None => members::table
            .order(members::date_joined.desc())
            .load(&mut conn)?,
    };

    let names = company_names(&mut conn, rows.iter().map(|m| m.company_id))?;
    let response = rows
        .into_iter()
        .map(|member| {
            let company_name = names.get(&member.company_id).cloned();
            to_member_response(member, company_name)
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_member(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(member_id): Path<Uuid>,
) -> AppResult<Json<MemberResponse>> {
    let mut conn = state.db()?;
    let member: Member = members::table.find(member_id).first(&mut conn)?;
    let company_name = companies::table
        .find(member.company_id)
        .select(companies::name)
        .first::<String>(&mut conn)
        .optional()?;
    Ok(Json(to_member_response(member, company_name)))
}

pub async fn update_member(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRequest>,
) -> AppResult<Json<MemberResponse>> {
    let mut conn = state.db()?;
    let _existing: Member = members::table.find(member_id).first(&mut conn)?;

    if let Some(ref gender) = payload.gender {
        if !GENDERS.contains(&gender.as_str()) {
            return Err(AppError::bad_request("gender must be 'male' or 'female'"));
        }
    }
    if let Some(ref email) = payload.email {
        if email.trim().is_empty() {
            return Err(AppError::bad_request("email must not be empty"));
        }
    }

    let changeset = MemberChangeset {
        first_name: payload.first_name.as_deref().map(str::trim),
        last_name: payload.last_name.as_deref().map(str::trim),
        email: payload.email.as_deref().map(str::trim),
        gender: payload.gender.as_deref(),
        phone: payload.phone.as_deref(),
        address: payload.address.as_deref(),
        date_of_birth: payload.date_of_birth.as_deref(),
        id_card_number: payload.id_card_number.as_deref(),
        next_of_kin: payload.next_of_kin.as_deref(),
        emergency_contact: payload.emergency_contact.as_deref(),
        position: payload.position.as_deref(),
        department: payload.department.as_deref(),
        region: payload.region.as_deref(),
        location: payload.location.as_deref(),
    };

    diesel::update(members::table.find(member_id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: Member = members::table.find(member_id).first(&mut conn)?;
    let company_name = companies::table
        .find(updated.company_id)
        .select(companies::name)
        .first::<String>(&mut conn)
        .optional()?;
    Ok(Json(to_member_response(updated, company_name)))
}

pub async fn set_member_status(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<MemberResponse>> {
    if payload.status != STATUS_ACTIVE && payload.status != STATUS_DORMANT {
        return Err(AppError::bad_request(
            "status must be 'active' or 'dormant'",
        ));
    }

    let mut conn = state.db()?;
    let _existing: Member = members::table.find(member_id).first(&mut conn)?;

    if payload.status == STATUS_DORMANT {
        if let Some(ref reason) = payload.dormant_reason {
            if !DORMANT_REASONS.contains(&reason.as_str()) {
                return Err(AppError::bad_request(format!(
                    "dormant reason must be one of: {}",
                    DORMANT_REASONS.join(", ")
                )));
            }
        }
        diesel::update(members::table.find(member_id))
            .set((
                members::status.eq(STATUS_DORMANT),
                members::dormant_reason.eq(payload.dormant_reason.as_deref()),
                members::dormant_note.eq(payload.dormant_note.as_deref()),
            ))
            .execute(&mut conn)?;
    } else {
        // Reactivation clears the dormant bookkeeping.
        diesel::update(members::table.find(member_id))
            .set((
                members::status.eq(STATUS_ACTIVE),
                members::dormant_reason.eq::<Option<String>>(None),
                members::dormant_note.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;
    }

    let updated: Member = members::table.find(member_id).first(&mut conn)?;
    let company_name = companies::table
        .find(updated.company_id)
        .select(companies::name)
        .first::<String>(&mut conn)
        .optional()?;
    Ok(Json(to_member_response(updated, company_name)))
}

pub async fn delete_member(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(member_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let member: Member = members::table.find(member_id).first(&mut conn)?;

    let storage_keys: Vec<String> = documents::table
        .filter(documents::member_id.eq(member_id))
        .select(documents::storage_key)
        .load(&mut conn)?;

    conn.transaction::<(), diesel::result::Error, _>(|conn| {
        diesel::delete(documents::table.filter(documents::member_id.eq(member_id)))
            .execute(conn)?;
        diesel::delete(members::table.find(member_id)).execute(conn)?;
        diesel::delete(users::table.find(member.user_id)).execute(conn)?;
        Ok(())
    })?;
    drop(conn);

    for key in storage_keys {
        if let Err(err) = state.storage.delete_object(&key).await {
            tracing::warn!(error = %err, key = %key, "failed to delete orphaned blob");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn company_names(
    conn: &mut PgConnection,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    let mut unique: Vec<Uuid> = ids.collect();
    unique.sort();
    unique.dedup();

    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String)> = companies::table
        .filter(companies::id.eq_any(unique))
        .select((companies::id, companies::name))
        .load(conn)?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_id_format_validation() {
        assert!(is_valid_staff_id("JD123456"));
        assert!(is_valid_staff_id("AB000000"));
        assert!(!is_valid_staff_id("jd123456"));
        assert!(!is_valid_staff_id("J1234567"));
        assert!(!is_valid_staff_id("JDX12345"));
        assert!(!is_valid_staff_id("JD12345"));
        assert!(!is_valid_staff_id("JD1234567"));
    }

    #[test]
    fn generated_staff_ids_are_valid() {
        for _ in 0..32 {
            let staff_id = generate_staff_id("Jane", "Doe");
            assert!(is_valid_staff_id(&staff_id), "bad staff id {staff_id}");
            assert!(staff_id.starts_with("JD"));
        }
    }

    #[test]
    fn generated_staff_id_falls_back_on_non_alphabetic_names() {
        let staff_id = generate_staff_id("1st", "");
        assert!(is_valid_staff_id(&staff_id));
        assert!(staff_id.starts_with("XX"));
    }
}
