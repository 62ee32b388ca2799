mod ai;
mod browser;
mod db;
mod extract;
mod models;
mod normalize;
mod parse;
mod scrape;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use browser::ChromeSession;
use db::{Database, PageFilters};
use models::StoredPage;
use scrape::{ScrapeOptions, Scraper};

#[derive(Parser)]
#[command(name = "lens")]
#[command(about = "Company page insights - scrape, store, and summarize public company pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Fetch a company page, scraping it on first sight (or with --force)
    Page {
        /// Company page id, the slug from the page URL
        page_id: String,

        /// Re-scrape even if the page is already stored
        #[arg(long)]
        force: bool,

        /// Skip the posts feed
        #[arg(long)]
        no_posts: bool,

        /// Skip the people section
        #[arg(long)]
        no_employees: bool,

        /// Save a screenshot and page source for offline inspection
        #[arg(long)]
        debug: bool,

        /// Run the browser headless (default uses a visible window so the
        /// existing Chrome profile session carries over)
        #[arg(long)]
        headless: bool,

        /// Maximum posts to scrape
        #[arg(long, default_value = "15")]
        max_posts: usize,

        /// Maximum employee cards to scrape
        #[arg(long, default_value = "20")]
        max_employees: usize,
    },

    /// List stored pages
    Pages {
        /// Rows to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Maximum rows to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Minimum follower count
        #[arg(long)]
        min_followers: Option<i64>,

        /// Maximum follower count
        #[arg(long)]
        max_followers: Option<i64>,

        /// Industry substring filter
        #[arg(short, long)]
        industry: Option<String>,

        /// Name substring filter
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List stored posts for a page
    Posts {
        /// Company page id
        page_id: String,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "15")]
        limit: usize,
    },

    /// List stored employees for a page
    Employees {
        /// Company page id
        page_id: String,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Generate an AI summary of a stored page
    Summary {
        /// Company page id
        page_id: String,

        /// Model to use (gemini, gemini-pro, claude, haiku)
        #[arg(short, long, default_value = "gemini")]
        model: String,
    },

    /// Show stored counts for a page
    Stats {
        /// Company page id
        page_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::open()?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Page {
            page_id,
            force,
            no_posts,
            no_employees,
            debug,
            headless,
            max_posts,
            max_employees,
        } => {
            db.ensure_initialized()?;

            let existing = db.get_page(&page_id)?;
            if existing.is_none() || force {
                let verb = if existing.is_some() { "Re-scraping" } else { "Scraping" };
                println!("{} {}...", verb, page_id);

                let session = ChromeSession::launch(headless)?;
                let mut scraper = Scraper::new(session);
                scraper.debug_snapshots = debug;

                let options = ScrapeOptions {
                    with_posts: !no_posts,
                    with_employees: !no_employees,
                    max_posts,
                    max_employees,
                };
                scrape::scrape_and_store(&mut scraper, &db, &page_id, &options)?;
            }

            let page = db
                .get_page(&page_id)?
                .ok_or_else(|| anyhow!("Page '{}' not found", page_id))?;
            print_page(&page);

            if !no_posts {
                let posts = db.posts_for_page(page.id, 0, scrape::DEFAULT_MAX_POSTS)?;
                if !posts.is_empty() {
                    println!("\nPosts ({}):", posts.len());
                    for post in &posts {
                        let excerpt = post.content.as_deref().unwrap_or("(no text)");
                        println!(
                            "  [{}] {} (likes: {}, comments: {})",
                            &post.posted_at[..10.min(post.posted_at.len())],
                            truncate(excerpt, 60),
                            post.likes_count,
                            post.comments_count
                        );
                    }
                }
            }

            if !no_employees {
                let employees = db.employees_for_page(page.id, 0, 50)?;
                if !employees.is_empty() {
                    println!("\nEmployees ({}):", employees.len());
                    for employee in &employees {
                        println!(
                            "  {} - {}",
                            employee.name,
                            employee.title.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }

        Commands::Pages {
            skip,
            limit,
            min_followers,
            max_followers,
            industry,
            search,
        } => {
            db.ensure_initialized()?;
            let filters = PageFilters {
                skip,
                limit,
                min_followers,
                max_followers,
                industry,
                name_search: search,
            };
            let pages = db.list_pages(&filters)?;
            if pages.is_empty() {
                println!("No pages found.");
            } else {
                println!(
                    "{:<20} {:<28} {:>12} {:>10} {:<22}",
                    "PAGE ID", "NAME", "FOLLOWERS", "EMPLOYEES", "INDUSTRY"
                );
                println!("{}", "-".repeat(96));
                for stored in pages {
                    println!(
                        "{:<20} {:<28} {:>12} {:>10} {:<22}",
                        truncate(&stored.page.page_id, 18),
                        truncate(&stored.page.name, 26),
                        stored.page.followers_count,
                        stored.page.employees_count,
                        truncate(stored.page.industry.as_deref().unwrap_or("-"), 20)
                    );
                }
            }
        }

        Commands::Posts {
            page_id,
            skip,
            limit,
        } => {
            db.ensure_initialized()?;
            let page = db
                .get_page(&page_id)?
                .ok_or_else(|| anyhow!("Page '{}' not found. Scrape it first with 'lens page {}'", page_id, page_id))?;
            let posts = db.posts_for_page(page.id, skip, limit)?;
            if posts.is_empty() {
                println!("No posts stored for '{}'.", page_id);
            } else {
                for post in posts {
                    println!("{}", post.post_id);
                    println!("  Posted: {}", post.posted_at);
                    println!(
                        "  Likes: {}  Comments: {}",
                        post.likes_count, post.comments_count
                    );
                    if let Some(url) = &post.post_url {
                        println!("  URL: {}", url);
                    }
                    if let Some(content) = &post.content {
                        println!("  {}", truncate(content, 200));
                    }
                    println!();
                }
            }
        }

        Commands::Employees {
            page_id,
            skip,
            limit,
        } => {
            db.ensure_initialized()?;
            let page = db
                .get_page(&page_id)?
                .ok_or_else(|| anyhow!("Page '{}' not found. Scrape it first with 'lens page {}'", page_id, page_id))?;
            let employees = db.employees_for_page(page.id, skip, limit)?;
            if employees.is_empty() {
                println!("No employees stored for '{}'.", page_id);
            } else {
                println!("{:<26} {:<34} {:<24}", "NAME", "TITLE", "LOCATION");
                println!("{}", "-".repeat(84));
                for employee in employees {
                    println!(
                        "{:<26} {:<34} {:<24}",
                        truncate(&employee.name, 24),
                        truncate(employee.title.as_deref().unwrap_or("-"), 32),
                        truncate(employee.location.as_deref().unwrap_or("-"), 22)
                    );
                }
            }
        }

        Commands::Summary { page_id, model } => {
            db.ensure_initialized()?;
            let page = db.get_page(&page_id)?.ok_or_else(|| {
                anyhow!(
                    "Page '{}' not found. Scrape it first with 'lens page {}'",
                    page_id,
                    page_id
                )
            })?;

            let posts = db.posts_for_page(page.id, 0, 25)?;
            let employees = db.employees_for_page(page.id, 0, 50)?;

            let spec = ai::resolve_model(&model)?;
            let provider = ai::create_provider(&spec)?;
            println!("Generating summary for '{}' with {}...\n", page.page.name, spec.short_name);

            let sections = ai::generate_summary(provider.as_ref(), &page, &posts, &employees)?;

            print_section("Overview", &sections.summary);
            print_section("Follower Analysis", &sections.follower_analysis);
            print_section("Content Strategy", &sections.content_analysis);
            print_section("Engagement Insights", &sections.engagement_insights);
            print_section("Page Type", &sections.page_type);
            println!("Generated: {}", chrono::Utc::now().to_rfc3339());
        }

        Commands::Stats { page_id } => {
            db.ensure_initialized()?;
            let page = db
                .get_page(&page_id)?
                .ok_or_else(|| anyhow!("Page '{}' not found in database", page_id))?;
            let stats = db.page_stats(page.id)?;

            println!("Stats for '{}' ({})", page.page.name, page.page.page_id);
            println!("  Posts stored:     {}", stats.posts);
            println!("  Employees stored: {}", stats.employees);
            println!("  Followers:        {}", page.page.followers_count);
            println!("  Employee count:   {}", page.page.employees_count);
            if let Some(industry) = &page.page.industry {
                println!("  Industry:         {}", industry);
            }
        }
    }

    Ok(())
}

fn print_page(stored: &StoredPage) {
    let page = &stored.page;
    println!("\n{} ({})", page.name, page.page_id);
    println!("URL: {}", page.url);
    if let Some(description) = &page.description {
        println!("Description: {}", description);
    }
    if let Some(website) = &page.website {
        println!("Website: {}", website);
    }
    if let Some(industry) = &page.industry {
        println!("Industry: {}", industry);
    }
    if let Some(headquarters) = &page.headquarters {
        println!("Headquarters: {}", headquarters);
    }
    if let Some(year) = page.founded_year {
        println!("Founded: {}", year);
    }
    if let Some(specialties) = &page.specialties {
        println!("Specialties: {}", specialties);
    }
    println!("Followers: {}", page.followers_count);
    println!("Employees: {}", page.employees_count);
    println!("Last updated: {}", stored.updated_at);
}

fn print_section(title: &str, body: &str) {
    if body.is_empty() {
        return;
    }
    println!("--- {} ---", title);
    println!("{}\n", body);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
