use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, ToSql};
use std::path::PathBuf;

use crate::models::{CompanyPage, Employee, Post, StoredPage};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

/// Listing filters; substring filters are case-insensitive.
pub struct PageFilters {
    pub skip: usize,
    pub limit: usize,
    pub min_followers: Option<i64>,
    pub max_followers: Option<i64>,
    pub industry: Option<String>,
    pub name_search: Option<String>,
}

impl Default for PageFilters {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 10,
            min_followers: None,
            max_followers: None,
            industry: None,
            name_search: None,
        }
    }
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "lens") {
            Ok(proj_dirs.data_dir().join("lens.db"))
        } else {
            Ok(PathBuf::from("lens.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT,
                website TEXT,
                logo_url TEXT,
                industry TEXT,
                headquarters TEXT,
                specialties TEXT,
                founded_year INTEGER,
                followers_count INTEGER NOT NULL DEFAULT 0,
                employees_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL REFERENCES pages(id),
                post_id TEXT NOT NULL,
                content TEXT,
                posted_at TEXT NOT NULL,
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                shares_count INTEGER NOT NULL DEFAULT 0,
                post_url TEXT,
                media_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL REFERENCES pages(id),
                employee_id TEXT NOT NULL,
                name TEXT NOT NULL,
                title TEXT,
                profile_url TEXT,
                profile_picture TEXT,
                location TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_posts_page ON posts(page_id);
            CREATE INDEX IF NOT EXISTS idx_employees_page ON employees(page_id);
            CREATE INDEX IF NOT EXISTS idx_pages_followers ON pages(followers_count);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='pages'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'lens init' first."));
        }
        Ok(())
    }

    // --- Page operations ---

    /// Insert-or-update keyed by page_id. Optional fields that came back
    /// absent this time never null out previously stored values. Returns the
    /// storage key the child records hang off.
    pub fn upsert_page(&self, page: &CompanyPage) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO pages (page_id, name, url, description, website, logo_url,
                               industry, headquarters, specialties, founded_year,
                               followers_count, employees_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(page_id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                description = COALESCE(excluded.description, description),
                website = COALESCE(excluded.website, website),
                logo_url = COALESCE(excluded.logo_url, logo_url),
                industry = COALESCE(excluded.industry, industry),
                headquarters = COALESCE(excluded.headquarters, headquarters),
                specialties = COALESCE(excluded.specialties, specialties),
                founded_year = COALESCE(excluded.founded_year, founded_year),
                followers_count = excluded.followers_count,
                employees_count = excluded.employees_count,
                updated_at = datetime('now')
            "#,
            params![
                page.page_id,
                page.name,
                page.url,
                page.description,
                page.website,
                page.logo_url,
                page.industry,
                page.headquarters,
                page.specialties,
                page.founded_year,
                page.followers_count,
                page.employees_count,
            ],
        )?;

        self.conn
            .query_row(
                "SELECT id FROM pages WHERE page_id = ?1",
                [&page.page_id],
                |row| row.get(0),
            )
            .context("Failed to read back page id")
    }

    pub fn get_page(&self, page_id: &str) -> Result<Option<StoredPage>> {
        let result = self.conn.query_row(
            &format!("{PAGE_SELECT} WHERE page_id = ?1"),
            [page_id],
            Self::row_to_page,
        );
        match result {
            Ok(page) => Ok(Some(page)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_pages(&self, filters: &PageFilters) -> Result<Vec<StoredPage>> {
        let mut sql = format!("{PAGE_SELECT} WHERE 1=1");
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(min) = filters.min_followers {
            sql.push_str(&format!(" AND followers_count >= ?{}", values.len() + 1));
            values.push(Box::new(min));
        }
        if let Some(max) = filters.max_followers {
            sql.push_str(&format!(" AND followers_count <= ?{}", values.len() + 1));
            values.push(Box::new(max));
        }
        if let Some(industry) = &filters.industry {
            sql.push_str(&format!(" AND industry LIKE ?{}", values.len() + 1));
            values.push(Box::new(format!("%{}%", industry)));
        }
        if let Some(name) = &filters.name_search {
            sql.push_str(&format!(" AND name LIKE ?{}", values.len() + 1));
            values.push(Box::new(format!("%{}%", name)));
        }

        sql.push_str(&format!(
            " ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            values.len() + 1,
            values.len() + 2
        ));
        values.push(Box::new(filters.limit as i64));
        values.push(Box::new(filters.skip as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(&refs[..], Self::row_to_page)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list pages")
    }

    fn row_to_page(row: &rusqlite::Row) -> rusqlite::Result<StoredPage> {
        Ok(StoredPage {
            id: row.get(0)?,
            page: CompanyPage {
                page_id: row.get(1)?,
                name: row.get(2)?,
                url: row.get(3)?,
                description: row.get(4)?,
                website: row.get(5)?,
                logo_url: row.get(6)?,
                industry: row.get(7)?,
                headquarters: row.get(8)?,
                specialties: row.get(9)?,
                founded_year: row.get(10)?,
                followers_count: row.get(11)?,
                employees_count: row.get(12)?,
            },
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    // --- Post operations ---

    /// Append-only: every batch is inserted as-is, even when an earlier
    /// scrape already stored the same feed items under different derived ids.
    pub fn insert_posts(&self, page_key: i64, posts: &[Post]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO posts (page_id, post_id, content, posted_at, likes_count,
                               comments_count, shares_count, post_url, media_url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;
        for post in posts {
            stmt.execute(params![
                page_key,
                post.post_id,
                post.content,
                post.posted_at,
                post.likes_count,
                post.comments_count,
                post.shares_count,
                post.post_url,
                post.media_url,
            ])?;
        }
        Ok(posts.len())
    }

    pub fn posts_for_page(&self, page_key: i64, skip: usize, limit: usize) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT post_id, content, posted_at, likes_count, comments_count,
                   shares_count, post_url, media_url
            FROM posts WHERE page_id = ?1
            ORDER BY posted_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![page_key, limit as i64, skip as i64],
            Self::row_to_post,
        )?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list posts")
    }

    fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
        Ok(Post {
            post_id: row.get(0)?,
            content: row.get(1)?,
            posted_at: row.get(2)?,
            likes_count: row.get(3)?,
            comments_count: row.get(4)?,
            shares_count: row.get(5)?,
            post_url: row.get(6)?,
            media_url: row.get(7)?,
        })
    }

    // --- Employee operations ---

    pub fn insert_employees(&self, page_key: i64, employees: &[Employee]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO employees (page_id, employee_id, name, title, profile_url,
                                   profile_picture, location)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;
        for employee in employees {
            stmt.execute(params![
                page_key,
                employee.employee_id,
                employee.name,
                employee.title,
                employee.profile_url,
                employee.profile_picture,
                employee.location,
            ])?;
        }
        Ok(employees.len())
    }

    pub fn employees_for_page(
        &self,
        page_key: i64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Employee>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT employee_id, name, title, profile_url, profile_picture, location
            FROM employees WHERE page_id = ?1
            ORDER BY id
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![page_key, limit as i64, skip as i64],
            Self::row_to_employee,
        )?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list employees")
    }

    fn row_to_employee(row: &rusqlite::Row) -> rusqlite::Result<Employee> {
        Ok(Employee {
            employee_id: row.get(0)?,
            name: row.get(1)?,
            title: row.get(2)?,
            profile_url: row.get(3)?,
            profile_picture: row.get(4)?,
            location: row.get(5)?,
        })
    }

    // --- Aggregates ---

    pub fn page_stats(&self, page_key: i64) -> Result<PageStats> {
        let posts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE page_id = ?1",
            [page_key],
            |row| row.get(0),
        )?;
        let employees: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM employees WHERE page_id = ?1",
            [page_key],
            |row| row.get(0),
        )?;
        Ok(PageStats { posts, employees })
    }
}

pub struct PageStats {
    pub posts: i64,
    pub employees: i64,
}

const PAGE_SELECT: &str = r#"
    SELECT id, page_id, name, url, description, website, logo_url, industry,
           headquarters, specialties, founded_year, followers_count,
           employees_count, created_at, updated_at
    FROM pages
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn sample_page(page_id: &str, followers: i64) -> CompanyPage {
        CompanyPage {
            page_id: page_id.to_string(),
            name: format!("{} Inc", page_id),
            url: format!("https://www.linkedin.com/company/{}/", page_id),
            description: Some("A sample".to_string()),
            website: Some("https://example.com".to_string()),
            logo_url: None,
            industry: Some("Software Development".to_string()),
            headquarters: None,
            specialties: None,
            founded_year: Some(2015),
            followers_count: followers,
            employees_count: 125,
        }
    }

    fn sample_post(post_id: &str) -> Post {
        Post {
            post_id: post_id.to_string(),
            content: Some("hello".to_string()),
            posted_at: Utc::now().to_rfc3339(),
            likes_count: 3,
            comments_count: 1,
            shares_count: 0,
            post_url: None,
            media_url: None,
        }
    }

    #[test]
    fn test_ensure_initialized_requires_init() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_upsert_is_keyed_by_page_id() {
        let db = test_db();
        let first = db.upsert_page(&sample_page("acme", 100)).unwrap();
        let second = db.upsert_page(&sample_page("acme", 200)).unwrap();
        assert_eq!(first, second);

        let stored = db.get_page("acme").unwrap().unwrap();
        assert_eq!(stored.page.followers_count, 200);
        assert_eq!(db.list_pages(&PageFilters::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_never_nulls_out_stored_optionals() {
        let db = test_db();
        db.upsert_page(&sample_page("acme", 100)).unwrap();

        // Second scrape came back thinner: most optionals missing.
        let mut sparse = sample_page("acme", 150);
        sparse.description = None;
        sparse.website = None;
        sparse.industry = None;
        sparse.founded_year = None;
        db.upsert_page(&sparse).unwrap();

        let stored = db.get_page("acme").unwrap().unwrap();
        assert_eq!(stored.page.description.as_deref(), Some("A sample"));
        assert_eq!(stored.page.website.as_deref(), Some("https://example.com"));
        assert_eq!(
            stored.page.industry.as_deref(),
            Some("Software Development")
        );
        assert_eq!(stored.page.founded_year, Some(2015));
        // Derived counts are always refreshed.
        assert_eq!(stored.page.followers_count, 150);
    }

    #[test]
    fn test_get_page_missing_is_none() {
        let db = test_db();
        assert!(db.get_page("nobody").unwrap().is_none());
    }

    #[test]
    fn test_list_pages_filters() {
        let db = test_db();
        db.upsert_page(&sample_page("small", 50)).unwrap();
        db.upsert_page(&sample_page("medium", 5_000)).unwrap();
        let mut other = sample_page("large", 2_000_000);
        other.industry = Some("Logistics".to_string());
        db.upsert_page(&other).unwrap();

        let filters = PageFilters {
            min_followers: Some(1_000),
            ..PageFilters::default()
        };
        let pages = db.list_pages(&filters).unwrap();
        assert_eq!(pages.len(), 2);

        let filters = PageFilters {
            min_followers: Some(1_000),
            max_followers: Some(10_000),
            ..PageFilters::default()
        };
        let pages = db.list_pages(&filters).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page.page_id, "medium");

        let filters = PageFilters {
            industry: Some("logi".to_string()),
            ..PageFilters::default()
        };
        let pages = db.list_pages(&filters).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page.page_id, "large");

        let filters = PageFilters {
            name_search: Some("med".to_string()),
            ..PageFilters::default()
        };
        let pages = db.list_pages(&filters).unwrap();
        assert_eq!(pages.len(), 1);

        let filters = PageFilters {
            limit: 2,
            ..PageFilters::default()
        };
        assert_eq!(db.list_pages(&filters).unwrap().len(), 2);
    }

    #[test]
    fn test_rescrape_appends_not_merges() {
        // Derived post ids carry a run timestamp, so a re-scrape inserts a
        // disjoint batch instead of updating the first one. Locked in on
        // purpose: if dedup ever lands, this should fail loudly.
        let db = test_db();
        let page_key = db.upsert_page(&sample_page("acme", 100)).unwrap();

        let batch = vec![
            sample_post("acme_post_0_20260101000000"),
            sample_post("acme_post_1_20260101000000"),
        ];
        db.insert_posts(page_key, &batch).unwrap();
        db.insert_posts(page_key, &batch).unwrap();

        let stored = db.posts_for_page(page_key, 0, 100).unwrap();
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn test_posts_newest_first_with_paging() {
        let db = test_db();
        let page_key = db.upsert_page(&sample_page("acme", 100)).unwrap();

        let now = Utc::now();
        let mut old = sample_post("old");
        old.posted_at = (now - chrono::Duration::days(7)).to_rfc3339();
        let mut new = sample_post("new");
        new.posted_at = now.to_rfc3339();
        db.insert_posts(page_key, &[old, new]).unwrap();

        let stored = db.posts_for_page(page_key, 0, 10).unwrap();
        assert_eq!(stored[0].post_id, "new");
        assert_eq!(stored[1].post_id, "old");

        let second_page = db.posts_for_page(page_key, 1, 10).unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].post_id, "old");
    }

    #[test]
    fn test_employee_round_trip_and_stats() {
        let db = test_db();
        let page_key = db.upsert_page(&sample_page("acme", 100)).unwrap();

        let employees = vec![Employee {
            employee_id: "acme_emp_0_20260101000000".to_string(),
            name: "Jo Doe".to_string(),
            title: Some("Engineer".to_string()),
            profile_url: Some("https://example.com/in/jodoe".to_string()),
            profile_picture: None,
            location: Some("Springfield".to_string()),
        }];
        db.insert_employees(page_key, &employees).unwrap();
        db.insert_posts(page_key, &[sample_post("p0")]).unwrap();

        let stored = db.employees_for_page(page_key, 0, 50).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Jo Doe");
        assert_eq!(stored[0].title.as_deref(), Some("Engineer"));

        let stats = db.page_stats(page_key).unwrap();
        assert_eq!(stats.posts, 1);
        assert_eq!(stats.employees, 1);
    }
}
