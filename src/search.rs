//! Pure matching logic for the advanced search subsystem.
//!
//! The aggregator in `routes::search` loads whole collections and reduces
//! them with the predicates here: free-text containment first, then the
//! sparse filter object. Filters are exact equality; only the free-text
//! term is a substring match. Absent filter fields are wildcards.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Company, Document, Member};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModule {
    Companies,
    Members,
    Documents,
}

impl SearchModule {
    pub const ALL: [SearchModule; 3] = [
        SearchModule::Companies,
        SearchModule::Members,
        SearchModule::Documents,
    ];
}

/// Sparse filter object shared by live searches and saved searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_file_type: Option<String>,
    /// Inclusive lower bound, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<i64>,
    /// Inclusive upper bound, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<i64>,
}

impl SearchFilters {
    fn date_range_contains(&self, timestamp: NaiveDateTime) -> bool {
        let millis = timestamp.and_utc().timestamp_millis();
        if let Some(from) = self.date_from {
            if millis < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if millis > to {
                return false;
            }
        }
        true
    }
}

fn eq_filter(filter: &Option<String>, field: Option<&str>) -> bool {
    match filter {
        Some(wanted) => field == Some(wanted.as_str()),
        None => true,
    }
}

fn contains_term(field: Option<&str>, term: &str) -> bool {
    field
        .map(|value| value.to_lowercase().contains(term))
        .unwrap_or(false)
}

/// Free-text match. `term` must already be lower-cased; an empty term
/// matches every record.
pub fn company_matches_term(company: &Company, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    contains_term(Some(&company.name), term)
        || contains_term(company.description.as_deref(), term)
        || contains_term(company.region.as_deref(), term)
        || contains_term(company.branch.as_deref(), term)
}

pub fn member_matches_term(member: &Member, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    contains_term(Some(&member.first_name), term)
        || contains_term(Some(&member.last_name), term)
        || contains_term(Some(&member.email), term)
        || contains_term(Some(&member.staff_id), term)
        || contains_term(member.position.as_deref(), term)
        || contains_term(member.department.as_deref(), term)
        || contains_term(member.phone.as_deref(), term)
        || contains_term(member.address.as_deref(), term)
        || contains_term(member.id_card_number.as_deref(), term)
}

pub fn document_matches_term(document: &Document, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    contains_term(Some(&document.title), term)
        || contains_term(document.description.as_deref(), term)
}

pub fn company_matches_filters(company: &Company, filters: &SearchFilters) -> bool {
    eq_filter(&filters.company_region, company.region.as_deref())
        && eq_filter(&filters.company_branch, company.branch.as_deref())
        && filters.date_range_contains(company.created_at)
}

pub fn member_matches_filters(member: &Member, filters: &SearchFilters) -> bool {
    eq_filter(&filters.member_status, Some(&member.status))
        && eq_filter(&filters.member_gender, Some(&member.gender))
        && eq_filter(&filters.member_region, member.region.as_deref())
        && eq_filter(&filters.member_department, member.department.as_deref())
        && eq_filter(&filters.member_position, member.position.as_deref())
        && filters
            .company_id
            .map(|id| member.company_id == id)
            .unwrap_or(true)
        && filters.date_range_contains(member.date_joined)
}

pub fn document_matches_filters(document: &Document, filters: &SearchFilters) -> bool {
    eq_filter(&filters.document_file_type, Some(&document.file_type))
        && filters
            .company_id
            .map(|id| document.company_id == id)
            .unwrap_or(true)
        && filters.date_range_contains(document.uploaded_at)
}
