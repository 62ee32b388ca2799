//! Per-request scrape orchestration.
//!
//! One scrape runs strictly in order on one owned rendering session: load the
//! company page, read its fields, then visit the posts feed and the people
//! section. The page record is written before any children are fetched, since
//! posts and employees hang off its storage key.

use anyhow::Result;
use chrono::Utc;

use crate::db::Database;
use crate::extract::{self, Renderer, ScrapeError};
use crate::models::{CompanyPage, Employee, Post};
use crate::normalize;

pub const DEFAULT_MAX_POSTS: usize = 15;
pub const DEFAULT_MAX_EMPLOYEES: usize = 20;

const BASE_URL: &str = "https://www.linkedin.com/company";

pub fn company_url(page_id: &str) -> String {
    format!("{BASE_URL}/{page_id}/")
}

pub struct ScrapeOptions {
    pub with_posts: bool,
    pub with_employees: bool,
    pub max_posts: usize,
    pub max_employees: usize,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            with_posts: true,
            with_employees: true,
            max_posts: DEFAULT_MAX_POSTS,
            max_employees: DEFAULT_MAX_EMPLOYEES,
        }
    }
}

pub struct Scraper<R: Renderer> {
    renderer: R,
    pub debug_snapshots: bool,
}

impl<R: Renderer> Scraper<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            debug_snapshots: false,
        }
    }

    pub fn scrape_company(&mut self, page_id: &str) -> Result<CompanyPage, ScrapeError> {
        let url = company_url(page_id);
        self.renderer.navigate(&url)?;
        let raw = extract::extract_company(&mut self.renderer, page_id, self.debug_snapshots)?;
        Ok(normalize::company(raw, page_id, &url))
    }

    pub fn scrape_posts(&mut self, page_id: &str, max: usize) -> Result<Vec<Post>, ScrapeError> {
        self.renderer
            .navigate(&format!("{BASE_URL}/{page_id}/posts/"))?;
        let raws = extract::collect_posts(&mut self.renderer, max)?;
        Ok(normalize::posts(raws, page_id, Utc::now()))
    }

    pub fn scrape_employees(
        &mut self,
        page_id: &str,
        max: usize,
    ) -> Result<Vec<Employee>, ScrapeError> {
        self.renderer
            .navigate(&format!("{BASE_URL}/{page_id}/people/"))?;
        let raws = extract::collect_employees(&mut self.renderer, max)?;
        Ok(normalize::employees(raws, page_id, Utc::now()))
    }
}

/// Full journey for one page id. Returns the page's storage key.
///
/// A page that cannot be found or loaded aborts the whole run; a failure in
/// the posts or people leg is reported and skipped, keeping the page record
/// that was already written.
pub fn scrape_and_store<R: Renderer>(
    scraper: &mut Scraper<R>,
    db: &Database,
    page_id: &str,
    options: &ScrapeOptions,
) -> Result<i64> {
    let page = scraper.scrape_company(page_id)?;
    let page_key = db.upsert_page(&page)?;
    println!("Stored page '{}' (#{})", page.name, page_key);

    if options.with_posts {
        match scraper.scrape_posts(page_id, options.max_posts) {
            Ok(posts) if posts.is_empty() => println!("No posts found"),
            Ok(posts) => {
                db.insert_posts(page_key, &posts)?;
                println!("Stored {} post(s)", posts.len());
            }
            Err(e) => eprintln!("Posts scrape failed: {}", e),
        }
    }

    if options.with_employees {
        match scraper.scrape_employees(page_id, options.max_employees) {
            Ok(employees) if employees.is_empty() => println!("No employee cards found"),
            Ok(employees) => {
                db.insert_employees(page_key, &employees)?;
                println!("Stored {} employee(s)", employees.len());
            }
            Err(e) => eprintln!("Employees scrape failed: {}", e),
        }
    }

    Ok(page_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::FixtureRenderer;

    const COMPANY_HTML: &str = r#"<html><body>
        <h1 class="org-top-card-summary__title">Acme Corp</h1>
        <div class="org-top-card-summary-info-list__info-item">2,500 followers</div>
        <dl><dt>Company size</dt><dd>51-200 employees</dd></dl>
    </body></html>"#;

    const POSTS_HTML: &str = r#"<html><body>
        <div class="feed-shared-update-v2">
          <span class="break-words">We shipped a thing</span>
          <span class="social-details-social-counts__reactions-count">12</span>
        </div>
        <div class="feed-shared-update-v2">
          <span class="break-words">Another update</span>
        </div>
    </body></html>"#;

    const PEOPLE_HTML: &str = r#"<html><body>
        <div class="org-people-profile-card">
          <div class="org-people-profile-card__profile-title">Jo Doe</div>
        </div>
        <div class="org-people-profile-card">
          <div class="artdeco-entity-lockup__subtitle">nameless card</div>
        </div>
    </body></html>"#;

    fn routed_renderer() -> FixtureRenderer {
        FixtureRenderer::empty()
            .route("/posts/", POSTS_HTML)
            .route("/people/", PEOPLE_HTML)
            .route("/company/acme-corp/", COMPANY_HTML)
    }

    #[test]
    fn test_scrape_company_visits_canonical_url() {
        let mut scraper = Scraper::new(routed_renderer());
        let page = scraper.scrape_company("acme-corp").unwrap();

        assert_eq!(page.name, "Acme Corp");
        assert_eq!(page.followers_count, 2_500);
        assert_eq!(page.employees_count, 125);
        assert_eq!(
            scraper.renderer.visited,
            vec!["https://www.linkedin.com/company/acme-corp/"]
        );
    }

    #[test]
    fn test_not_found_page_yields_no_record() {
        let mut scraper = Scraper::new(FixtureRenderer::empty());
        let err = scraper.scrape_company("ghost-co").unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound(_)));
    }

    #[test]
    fn test_navigation_failure_is_transport_not_not_found() {
        let mut renderer = FixtureRenderer::empty();
        renderer.fail_navigation = true;
        let mut scraper = Scraper::new(renderer);
        let err = scraper.scrape_company("acme-corp").unwrap_err();
        assert!(matches!(err, ScrapeError::Transport(_)));
    }

    #[test]
    fn test_full_journey_persists_parent_then_children() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let mut scraper = Scraper::new(routed_renderer());
        let page_key =
            scrape_and_store(&mut scraper, &db, "acme-corp", &ScrapeOptions::default()).unwrap();

        let stored = db.get_page("acme-corp").unwrap().unwrap();
        assert_eq!(stored.id, page_key);
        assert_eq!(stored.page.name, "Acme Corp");

        let posts = db.posts_for_page(page_key, 0, 25).unwrap();
        assert_eq!(posts.len(), 2);

        // The nameless card was dropped on the way in.
        let employees = db.employees_for_page(page_key, 0, 50).unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].name, "Jo Doe");
    }

    #[test]
    fn test_rescrape_appends_children_and_keeps_one_page_row() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let mut scraper = Scraper::new(routed_renderer());
        let options = ScrapeOptions::default();
        let first_key = scrape_and_store(&mut scraper, &db, "acme-corp", &options).unwrap();
        let second_key = scrape_and_store(&mut scraper, &db, "acme-corp", &options).unwrap();

        // Upsert keeps a single page row...
        assert_eq!(first_key, second_key);
        assert_eq!(db.list_pages(&Default::default()).unwrap().len(), 1);

        // ...but children have no natural key, so the second run doubles them.
        let posts = db.posts_for_page(first_key, 0, 100).unwrap();
        assert_eq!(posts.len(), 4);
    }
}
