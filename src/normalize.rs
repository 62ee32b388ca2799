//! Assembles raw extractor output into the canonical records.
//!
//! Counts default to zero, missing optional fields stay missing, and child
//! records get locally derived identifiers — the site exposes no stable
//! native id for posts or profile cards, so the key is parent id + ordinal +
//! wall-clock stamp. Re-scraping therefore appends a fresh batch instead of
//! merging; see DESIGN.md before changing that.

use chrono::{DateTime, Utc};

use crate::extract::{RawCompany, RawEmployee, RawPost};
use crate::models::{CompanyPage, Employee, Post};
use crate::parse;

pub fn company(raw: RawCompany, page_id: &str, url: &str) -> CompanyPage {
    CompanyPage {
        page_id: page_id.to_string(),
        name: raw.name,
        url: url.to_string(),
        description: raw.description,
        website: raw.website,
        logo_url: raw.logo,
        industry: raw.industry,
        headquarters: raw.headquarters,
        specialties: raw.specialties,
        founded_year: raw
            .founded
            .as_deref()
            .map(parse::count)
            .filter(|year| *year > 0)
            .map(|year| year as i32),
        followers_count: raw.followers.as_deref().map(parse::magnitude).unwrap_or(0),
        employees_count: raw
            .company_size
            .as_deref()
            .map(parse::size_range)
            .unwrap_or(0),
    }
}

pub fn posts(raws: Vec<RawPost>, page_id: &str, now: DateTime<Utc>) -> Vec<Post> {
    let stamp = now.format("%Y%m%d%H%M%S").to_string();
    raws.into_iter()
        .enumerate()
        .map(|(idx, raw)| Post {
            post_id: format!("{page_id}_post_{idx}_{stamp}"),
            content: raw.content,
            posted_at: raw
                .posted_at
                .as_deref()
                .map(|text| parse::relative_time(text, now))
                .unwrap_or(now)
                .to_rfc3339(),
            likes_count: raw.likes.as_deref().map(parse::count).unwrap_or(0),
            comments_count: raw.comments.as_deref().map(parse::count).unwrap_or(0),
            shares_count: 0,
            post_url: raw.post_url,
            media_url: raw.media,
        })
        .collect()
}

/// Cards without a recoverable name are dropped silently; a nameless profile
/// card is an ad slot or a rendering artifact, not a person.
pub fn employees(raws: Vec<RawEmployee>, page_id: &str, now: DateTime<Utc>) -> Vec<Employee> {
    let stamp = now.format("%Y%m%d%H%M%S").to_string();
    raws.into_iter()
        .filter_map(|raw| {
            let name = raw.name.clone()?.trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some((name, raw))
        })
        .enumerate()
        .map(|(idx, (name, raw))| Employee {
            employee_id: format!("{page_id}_emp_{idx}_{stamp}"),
            name,
            title: raw.title,
            profile_url: raw.profile_url,
            profile_picture: raw.picture,
            location: raw.location,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{self, fixtures::FixtureRenderer};

    #[test]
    fn test_company_normalization_end_to_end() {
        let html = r#"<html><body>
            <h1>Acme Corp</h1>
            <div class="org-top-card-summary-info-list">
              <div class="org-top-card-summary-info-list__info-item">2,500 followers</div>
            </div>
            <dl>
              <dt>Company size</dt><dd>51-200</dd>
            </dl>
        </body></html>"#;
        let mut renderer = FixtureRenderer::new(html);
        let raw = extract::extract_company(&mut renderer, "acme-corp", false).unwrap();
        let page = company(raw, "acme-corp", "https://www.linkedin.com/company/acme-corp/");

        assert_eq!(page.name, "Acme Corp");
        assert_eq!(page.followers_count, 2_500);
        assert_eq!(page.employees_count, 125);
        assert_eq!(page.page_id, "acme-corp");
        assert!(page.description.is_none());
        assert!(page.founded_year.is_none());
    }

    #[test]
    fn test_company_counts_default_to_zero() {
        let raw = RawCompany {
            name: "Quiet Co".to_string(),
            ..RawCompany::default()
        };
        let page = company(raw, "quiet-co", "https://example.com/quiet-co/");
        assert_eq!(page.followers_count, 0);
        assert_eq!(page.employees_count, 0);
        assert!(page.industry.is_none());
    }

    #[test]
    fn test_company_founded_year_kept_only_if_positive() {
        let mut raw = RawCompany {
            name: "X".to_string(),
            ..RawCompany::default()
        };
        raw.founded = Some("Founded in 2015".to_string());
        assert_eq!(
            company(raw, "x", "u").founded_year,
            Some(2015),
        );

        let mut raw = RawCompany {
            name: "X".to_string(),
            ..RawCompany::default()
        };
        raw.founded = Some("unknown".to_string());
        assert_eq!(company(raw, "x", "u").founded_year, None);
    }

    #[test]
    fn test_post_ids_and_defaults() {
        let now = Utc::now();
        let raws = vec![
            RawPost {
                content: Some("hello".to_string()),
                posted_at: Some("3 days ago".to_string()),
                likes: Some("1,204".to_string()),
                ..RawPost::default()
            },
            RawPost::default(),
        ];
        let posts = posts(raws, "acme-corp", now);

        let stamp = now.format("%Y%m%d%H%M%S").to_string();
        assert_eq!(posts[0].post_id, format!("acme-corp_post_0_{stamp}"));
        assert_eq!(posts[1].post_id, format!("acme-corp_post_1_{stamp}"));
        assert_eq!(posts[0].likes_count, 1_204);
        assert_eq!(
            posts[0].posted_at,
            (now - chrono::Duration::days(3)).to_rfc3339()
        );
        // Nothing extracted still yields a well-formed record.
        assert_eq!(posts[1].likes_count, 0);
        assert_eq!(posts[1].comments_count, 0);
        assert_eq!(posts[1].shares_count, 0);
        assert_eq!(posts[1].posted_at, now.to_rfc3339());
    }

    #[test]
    fn test_nameless_employee_cards_are_dropped() {
        let now = Utc::now();
        let raws = vec![
            RawEmployee {
                name: Some("Jo Doe".to_string()),
                title: Some("Engineer".to_string()),
                ..RawEmployee::default()
            },
            RawEmployee {
                title: Some("ad slot".to_string()),
                ..RawEmployee::default()
            },
            RawEmployee {
                name: Some("   ".to_string()),
                ..RawEmployee::default()
            },
            RawEmployee {
                name: Some("Sam Roe".to_string()),
                ..RawEmployee::default()
            },
        ];
        let batch = employees(raws, "acme-corp", now);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].name, "Jo Doe");
        assert_eq!(batch[1].name, "Sam Roe");
        // Ordinals are assigned after the drop, so they stay contiguous.
        assert!(batch[1].employee_id.starts_with("acme-corp_emp_1_"));
    }
}
