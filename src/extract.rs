//! Field extraction against a rendered company page.
//!
//! Every field is backed by an ordered list of lookup strategies, evaluated
//! first-success-wins. A strategy that errors or comes back empty never stops
//! the ones after it; only the name field is load-bearing — when no strategy
//! recovers it, the page is treated as nonexistent and nothing else is read.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("company page '{0}' not found")]
    NotFound(String),
    #[error("browser transport failure: {0}")]
    Transport(anyhow::Error),
}

/// One concrete lookup rule for recovering a field's value.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Inner text of the first element matching the selector.
    Css(&'static str),
    /// Attribute value of the first element matching the selector.
    Attr {
        css: &'static str,
        attr: &'static str,
    },
    /// Inner text of the first matching element whose text contains the
    /// needle, case-insensitive.
    TextContains {
        css: &'static str,
        needle: &'static str,
    },
}

/// The rendering session as the extractor sees it. Navigation and scrolling
/// can fail with a transport error; lookups report absence as `Ok(None)`.
pub trait Renderer {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;
    fn scroll_to_bottom(&mut self, rounds: usize) -> Result<(), ScrapeError>;
    fn scroll_by(&mut self, pixels: i64) -> Result<(), ScrapeError>;
    fn find_first(&self, strategy: &Strategy) -> Result<Option<String>>;
    /// Outer HTML of every element matching the selector, in document order.
    fn find_all(&self, css: &str) -> Result<Vec<String>>;
    /// Best-effort diagnostic capture; must never propagate failure.
    fn snapshot(&self, tag: &str);
}

// Scroll cadence. Lazy sections only materialize after scrolling; skipping
// these does not error, it silently under-extracts.
const COMPANY_SCROLL_ROUNDS: usize = 5;
const FEED_SCROLL_ROUNDS: usize = 3;
const PEOPLE_SCROLL_ROUNDS: usize = 2;
const DETAILS_SCROLL_PX: i64 = 800;

const NAME: &[Strategy] = &[
    Strategy::Css("h1.org-top-card-summary__title"),
    Strategy::Css("h1[class*='top-card']"),
    Strategy::Css("h1"),
];

const TAGLINE: &[Strategy] = &[
    Strategy::Css("p.org-top-card-summary__tagline"),
    Strategy::Css("p[class*='tagline']"),
];

const FOLLOWERS: &[Strategy] = &[
    Strategy::TextContains {
        css: "div.org-top-card-summary-info-list__info-item",
        needle: "follower",
    },
    Strategy::TextContains {
        css: ".org-top-card-summary-info-list",
        needle: "follower",
    },
];

const WEBSITE: &[Strategy] = &[
    Strategy::Attr {
        css: "a[data-test-id='about-us__website']",
        attr: "href",
    },
    Strategy::Attr {
        css: "a.org-top-card-primary-actions__action",
        attr: "href",
    },
];

const LOGO: &[Strategy] = &[
    Strategy::Attr {
        css: "img.org-top-card-primary-content__logo",
        attr: "src",
    },
    Strategy::Attr {
        css: "img[class*='logo']",
        attr: "src",
    },
];

const DETAILS_VALUES: &str = "div.org-page-details__definition-text";

pub const POST_CARD: &str = "div.feed-shared-update-v2";

const POST_LINK: &[Strategy] = &[
    Strategy::Attr {
        css: "a[data-test-link='permalink']",
        attr: "href",
    },
    Strategy::Attr {
        css: "a[href*='/posts/']",
        attr: "href",
    },
];

const POST_CONTENT: &[Strategy] = &[Strategy::Css("span.break-words")];

const POST_TIME: &[Strategy] = &[Strategy::Css("span.feed-shared-actor__sub-description")];

const POST_LIKES: &[Strategy] =
    &[Strategy::Css("span.social-details-social-counts__reactions-count")];

const POST_COMMENTS: &[Strategy] =
    &[Strategy::Css("button.social-details-social-counts__comments")];

const POST_MEDIA: &[Strategy] = &[Strategy::Attr {
    css: "div.update-components-image img",
    attr: "src",
}];

pub const EMPLOYEE_CARD: &str = "div.org-people-profile-card";

const EMPLOYEE_NAME: &[Strategy] = &[
    Strategy::Css("div.org-people-profile-card__profile-title"),
    Strategy::Css("div.artdeco-entity-lockup__title"),
];

const EMPLOYEE_TITLE: &[Strategy] = &[Strategy::Css("div.artdeco-entity-lockup__subtitle")];

const EMPLOYEE_LINK: &[Strategy] = &[Strategy::Attr {
    css: "a[href*='/in/']",
    attr: "href",
}];

const EMPLOYEE_PICTURE: &[Strategy] = &[Strategy::Attr {
    css: "img",
    attr: "src",
}];

const EMPLOYEE_LOCATION: &[Strategy] = &[Strategy::Css("div.artdeco-entity-lockup__caption")];

/// Try each strategy in order and return the first non-empty result. A
/// failing strategy is skipped, never fatal.
pub fn first_match(renderer: &dyn Renderer, strategies: &[Strategy]) -> Option<String> {
    for strategy in strategies {
        match renderer.find_first(strategy) {
            Ok(Some(text)) => {
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
            Ok(None) | Err(_) => {}
        }
    }
    None
}

/// Raw textual field values pulled off a company page, pre-normalization.
#[derive(Debug, Default)]
pub struct RawCompany {
    pub name: String,
    pub description: Option<String>,
    pub followers: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub headquarters: Option<String>,
    pub founded: Option<String>,
    pub specialties: Option<String>,
}

#[derive(Debug, Default)]
pub struct RawPost {
    pub post_url: Option<String>,
    pub content: Option<String>,
    pub posted_at: Option<String>,
    pub likes: Option<String>,
    pub comments: Option<String>,
    pub media: Option<String>,
}

#[derive(Debug, Default)]
pub struct RawEmployee {
    pub name: Option<String>,
    pub title: Option<String>,
    pub profile_url: Option<String>,
    pub picture: Option<String>,
    pub location: Option<String>,
}

/// Read every company field off an already-navigated page.
///
/// The name is the existence signal: if no strategy recovers it the page is
/// reported as not found and no other field is attempted.
pub fn extract_company(
    renderer: &mut dyn Renderer,
    page_id: &str,
    debug: bool,
) -> Result<RawCompany, ScrapeError> {
    if debug {
        renderer.snapshot(page_id);
    }
    renderer.scroll_to_bottom(COMPANY_SCROLL_ROUNDS)?;

    let Some(name) = first_match(renderer, NAME) else {
        return Err(ScrapeError::NotFound(page_id.to_string()));
    };

    let mut raw = RawCompany {
        name,
        ..RawCompany::default()
    };
    raw.description = first_match(renderer, TAGLINE);
    raw.followers = first_match(renderer, FOLLOWERS);
    raw.website = first_match(renderer, WEBSITE);
    raw.logo = first_match(renderer, LOGO);

    // The details section sits below the fold.
    renderer.scroll_by(DETAILS_SCROLL_PX)?;
    let details = extract_details(renderer);
    raw.industry = details.industry;
    raw.company_size = details.company_size;
    raw.headquarters = details.headquarters;
    raw.founded = details.founded;
    raw.specialties = details.specialties;

    Ok(raw)
}

/// Feed cards from an already-navigated posts page, capped at `max`.
pub fn collect_posts(
    renderer: &mut dyn Renderer,
    max: usize,
) -> Result<Vec<RawPost>, ScrapeError> {
    renderer.scroll_to_bottom(FEED_SCROLL_ROUNDS)?;

    let cards = renderer.find_all(POST_CARD).unwrap_or_default();
    let posts = cards
        .iter()
        .take(max)
        .map(|html| {
            let card = Fragment::parse(html);
            RawPost {
                post_url: card.first_match(POST_LINK),
                content: card.first_match(POST_CONTENT),
                posted_at: card.first_match(POST_TIME),
                likes: card.first_match(POST_LIKES),
                comments: card.first_match(POST_COMMENTS),
                media: card.first_match(POST_MEDIA),
            }
        })
        .collect();
    Ok(posts)
}

/// Profile cards from an already-navigated people page, capped at `max`.
/// Cards are returned as-is here; dropping the nameless ones is the
/// normalizer's call.
pub fn collect_employees(
    renderer: &mut dyn Renderer,
    max: usize,
) -> Result<Vec<RawEmployee>, ScrapeError> {
    renderer.scroll_to_bottom(PEOPLE_SCROLL_ROUNDS)?;

    let cards = renderer.find_all(EMPLOYEE_CARD).unwrap_or_default();
    let employees = cards
        .iter()
        .take(max)
        .map(|html| {
            let card = Fragment::parse(html);
            RawEmployee {
                name: card.first_match(EMPLOYEE_NAME),
                title: card.first_match(EMPLOYEE_TITLE),
                profile_url: card.first_match(EMPLOYEE_LINK),
                picture: card.first_match(EMPLOYEE_PICTURE),
                location: card.first_match(EMPLOYEE_LOCATION),
            }
        })
        .collect();
    Ok(employees)
}

#[derive(Debug, Default)]
struct Details {
    industry: Option<String>,
    company_size: Option<String>,
    headquarters: Option<String>,
    founded: Option<String>,
    specialties: Option<String>,
}

impl Details {
    fn is_empty(&self) -> bool {
        self.industry.is_none()
            && self.company_size.is_none()
            && self.headquarters.is_none()
            && self.founded.is_none()
            && self.specialties.is_none()
    }
}

/// The about section is a definition list of label/value pairs. Labels are
/// matched by keyword; when no list yields anything, fall back to the bare
/// definition values in their usual order.
fn extract_details(renderer: &dyn Renderer) -> Details {
    if let Ok(lists) = renderer.find_all("dl") {
        for html in &lists {
            let details = details_from_pairs(&Fragment::parse(html));
            if !details.is_empty() {
                return details;
            }
        }
    }

    if let Ok(values) = renderer.find_all(DETAILS_VALUES) {
        let text_of = |idx: usize| {
            values
                .get(idx)
                .map(|html| Fragment::parse(html).full_text())
                .filter(|t| !t.is_empty())
        };
        return Details {
            industry: text_of(0),
            company_size: text_of(1),
            headquarters: text_of(2),
            founded: text_of(4),
            specialties: None,
        };
    }

    Details::default()
}

fn details_from_pairs(fragment: &Fragment) -> Details {
    let mut details = Details::default();
    for (label, value) in fragment.definition_pairs() {
        let label = label.to_lowercase();
        if label.contains("industry") {
            details.industry = Some(value);
        } else if label.contains("size") {
            details.company_size = Some(value);
        } else if label.contains("headquarters") || label.contains("hq") {
            details.headquarters = Some(value);
        } else if label.contains("founded") {
            details.founded = Some(value);
        } else if label.contains("specialties") {
            details.specialties = Some(value);
        }
    }
    details
}

/// A detached piece of page HTML (one card, one definition list) that field
/// strategies can run against without a live browser.
pub struct Fragment {
    doc: Html,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_fragment(html),
        }
    }

    pub fn first_match(&self, strategies: &[Strategy]) -> Option<String> {
        strategies.iter().find_map(|s| query(&self.doc, s))
    }

    pub fn full_text(&self) -> String {
        tidy_text(self.doc.root_element().text())
    }

    /// dt/dd pairs in document order; a dt whose next element sibling is not
    /// a dd is skipped.
    pub fn definition_pairs(&self) -> Vec<(String, String)> {
        let Ok(dt_selector) = Selector::parse("dt") else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for dt in self.doc.select(&dt_selector) {
            let label = tidy_text(dt.text());
            let mut sibling = dt.next_sibling();
            while let Some(node) = sibling {
                if let Some(element) = ElementRef::wrap(node) {
                    if element.value().name() == "dd" {
                        let value = tidy_text(element.text());
                        if !label.is_empty() && !value.is_empty() {
                            pairs.push((label.clone(), value));
                        }
                    }
                    break;
                }
                sibling = node.next_sibling();
            }
        }
        pairs
    }
}

/// Evaluate one strategy against a parsed document. Shared by fragments and
/// the test fixture renderer.
pub(crate) fn query(doc: &Html, strategy: &Strategy) -> Option<String> {
    match strategy {
        Strategy::Css(css) => {
            let selector = Selector::parse(css).ok()?;
            doc.select(&selector)
                .map(|el| tidy_text(el.text()))
                .find(|t| !t.is_empty())
        }
        Strategy::Attr { css, attr } => {
            let selector = Selector::parse(css).ok()?;
            doc.select(&selector)
                .find_map(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Strategy::TextContains { css, needle } => {
            let selector = Selector::parse(css).ok()?;
            let needle = needle.to_lowercase();
            doc.select(&selector)
                .map(|el| tidy_text(el.text()))
                .find(|t| t.to_lowercase().contains(&needle))
        }
    }
}

fn tidy_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use anyhow::anyhow;

    /// In-memory stand-in for the browser session: synthetic documents keyed
    /// by URL substring, plus switches for failure injection.
    pub(crate) struct FixtureRenderer {
        routes: Vec<(String, String)>,
        current: Html,
        pub visited: Vec<String>,
        pub scroll_rounds: usize,
        pub fail_navigation: bool,
    }

    impl FixtureRenderer {
        pub fn new(html: &str) -> Self {
            Self {
                routes: Vec::new(),
                current: Html::parse_document(html),
                visited: Vec::new(),
                scroll_rounds: 0,
                fail_navigation: false,
            }
        }

        pub fn empty() -> Self {
            Self::new("<html><body></body></html>")
        }

        /// Serve `html` for any navigated URL containing `url_part`.
        pub fn route(mut self, url_part: &str, html: &str) -> Self {
            self.routes.push((url_part.to_string(), html.to_string()));
            self
        }
    }

    impl Renderer for FixtureRenderer {
        fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
            if self.fail_navigation {
                return Err(ScrapeError::Transport(anyhow!("connection refused")));
            }
            self.visited.push(url.to_string());
            if !self.routes.is_empty() {
                let html = self
                    .routes
                    .iter()
                    .find(|(part, _)| url.contains(part.as_str()))
                    .map(|(_, html)| html.clone())
                    .unwrap_or_default();
                self.current = Html::parse_document(&html);
            }
            Ok(())
        }

        fn scroll_to_bottom(&mut self, rounds: usize) -> Result<(), ScrapeError> {
            self.scroll_rounds += rounds;
            Ok(())
        }

        fn scroll_by(&mut self, _pixels: i64) -> Result<(), ScrapeError> {
            Ok(())
        }

        fn find_first(&self, strategy: &Strategy) -> Result<Option<String>> {
            Ok(query(&self.current, strategy))
        }

        fn find_all(&self, css: &str) -> Result<Vec<String>> {
            let Ok(selector) = Selector::parse(css) else {
                return Ok(Vec::new());
            };
            Ok(self.current.select(&selector).map(|el| el.html()).collect())
        }

        fn snapshot(&self, _tag: &str) {}
    }
}
