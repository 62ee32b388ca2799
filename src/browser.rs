use anyhow::{Context, Result};
use headless_chrome::browser::default_executable;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::extract::{Renderer, ScrapeError, Strategy};

/// One exclusively-owned Chrome tab. Dropping the session closes the browser.
pub struct ChromeSession {
    _browser: Browser, // keeps the Chrome process alive for the session's lifetime
    tab: Arc<Tab>,
    settle: Duration,
}

impl ChromeSession {
    pub fn launch(headless: bool) -> Result<Self> {
        // Use the user's Chrome profile so the logged-in session carries over.
        // Default Chrome profile location on Linux: ~/.config/google-chrome
        let home = std::env::var("HOME").unwrap_or_else(|_| String::from("/home"));
        let user_data_dir = PathBuf::from(&home).join(".config/google-chrome");

        let launch_options = LaunchOptions {
            headless,
            sandbox: true,
            window_size: Some((1920, 1080)),
            user_data_dir: Some(user_data_dir),
            path: default_executable().ok(),
            ..Default::default()
        };

        let browser = Browser::new(launch_options)
            .context("Failed to launch Chrome. Make sure Chrome is installed and not already running with the same profile.")?;
        let tab = browser.new_tab().context("Failed to create browser tab")?;

        Ok(ChromeSession {
            _browser: browser,
            tab,
            settle: Duration::from_secs(2),
        })
    }
}

impl Renderer for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        println!("Navigating to: {}", url);
        let loaded = self
            .tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .with_context(|| format!("Failed to load {}", url));
        if let Err(e) = loaded {
            return Err(ScrapeError::Transport(e));
        }
        // Give the scripts a moment to fill in the dynamic parts.
        thread::sleep(self.settle);
        Ok(())
    }

    fn scroll_to_bottom(&mut self, rounds: usize) -> Result<(), ScrapeError> {
        for _ in 0..rounds {
            self.tab
                .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
                .context("Scroll failed")
                .map_err(ScrapeError::Transport)?;
            thread::sleep(Duration::from_secs(1));
        }
        Ok(())
    }

    fn scroll_by(&mut self, pixels: i64) -> Result<(), ScrapeError> {
        self.tab
            .evaluate(&format!("window.scrollBy(0, {});", pixels), false)
            .context("Scroll failed")
            .map_err(ScrapeError::Transport)?;
        thread::sleep(self.settle);
        Ok(())
    }

    fn find_first(&self, strategy: &Strategy) -> Result<Option<String>> {
        // A lookup that fails for any reason reads as absence; the fallback
        // chain decides what happens next.
        let found = match strategy {
            Strategy::Css(css) => self
                .tab
                .find_element(css)
                .ok()
                .and_then(|el| el.get_inner_text().ok()),
            Strategy::Attr { css, attr } => self
                .tab
                .find_element(css)
                .ok()
                .and_then(|el| el.get_attribute_value(attr).ok())
                .flatten(),
            Strategy::TextContains { css, needle } => {
                let needle = needle.to_lowercase();
                self.tab.find_elements(css).ok().and_then(|elements| {
                    elements
                        .iter()
                        .filter_map(|el| el.get_inner_text().ok())
                        .find(|text| text.to_lowercase().contains(&needle))
                })
            }
        };
        Ok(found
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    fn find_all(&self, css: &str) -> Result<Vec<String>> {
        let expression = format!(
            "JSON.stringify(Array.from(document.querySelectorAll({})).map(el => el.outerHTML))",
            serde_json::to_string(css)?
        );
        let result = self
            .tab
            .evaluate(&expression, false)
            .context("Card collection failed")?;
        let Some(serde_json::Value::String(json)) = result.value else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&json).unwrap_or_default())
    }

    fn snapshot(&self, tag: &str) {
        // Debugging aid only; a failed capture must never fail the scrape.
        if let Ok(png) =
            self.tab
                .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        {
            if std::fs::write(format!("{}_debug.png", tag), png).is_ok() {
                println!("  Saved {}_debug.png", tag);
            }
        }
        if let Ok(source) = self.tab.get_content() {
            if std::fs::write(format!("{}_source.html", tag), source).is_ok() {
                println!("  Saved {}_source.html", tag);
            }
        }
    }
}
