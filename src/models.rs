use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = companies)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
    pub created_at: NaiveDateTime,
    pub created_by: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = companies)]
pub struct NewCompany {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = members)]
#[diesel(belongs_to(Company, foreign_key = company_id))]
pub struct Member {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
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
    pub date_joined: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = members)]
pub struct NewMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
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
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(Member, foreign_key = member_id))]
#[diesel(belongs_to(Company, foreign_key = company_id))]
pub struct Document {
    pub id: Uuid,
    pub member_id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub storage_key: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub member_id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub storage_key: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = notifications)]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub read: bool,
    pub related_kind: Option<String>,
    pub related_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub read: bool,
    pub related_kind: Option<String>,
    pub related_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = saved_searches)]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub search_term: Option<String>,
    pub modules: serde_json::Value,
    pub filters: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub last_used: NaiveDateTime,
    pub use_count: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = saved_searches)]
pub struct NewSavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub search_term: Option<String>,
    pub modules: serde_json::Value,
    pub filters: serde_json::Value,
}
