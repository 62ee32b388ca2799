use serde::{Deserialize, Serialize};

/// Canonical shape of a scraped company page, before it has a storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyPage {
    pub page_id: String, // URL slug, e.g. "acme-corp"
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub headquarters: Option<String>,
    pub specialties: Option<String>,
    pub founded_year: Option<i32>,
    pub followers_count: i64, // parsed from "2.5K followers" style text
    pub employees_count: i64, // midpoint of the advertised size range
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub id: i64,
    #[serde(flatten)]
    pub page: CompanyPage,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String, // derived key, unique within one scrape run only
    pub content: Option<String>,
    pub posted_at: String, // RFC 3339, converted from "3 days ago" style text
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64, // not present in the feed markup, stored as 0
    pub post_url: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String, // derived key, same scheme as Post
    pub name: String,
    pub title: Option<String>,
    pub profile_url: Option<String>,
    pub profile_picture: Option<String>,
    pub location: Option<String>,
}
