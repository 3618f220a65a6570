pub mod browser;
pub mod http;
pub mod locator;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;
use crate::wait::Poll;

pub use browser::BrowserPage;
pub use http::HttpPage;
pub use locator::{ElementHandle, Locator};

/// Browser-like surface the navigator drives.
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, path: &str) -> Result<(), AppError>;
    /// Markup of the document as currently rendered.
    async fn snapshot(&mut self) -> Result<String, AppError>;
    async fn click(&mut self, target: &ElementHandle) -> Result<(), AppError>;
    async fn scroll_into_view(&mut self, _target: &ElementHandle) -> Result<(), AppError> {
        Ok(())
    }
    async fn current_url(&mut self) -> Option<String>;
    /// Releases whatever backs the page (browser process, connections).
    async fn close(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl<D: PageDriver + ?Sized> PageDriver for Box<D> {
    async fn goto(&mut self, path: &str) -> Result<(), AppError> {
        (**self).goto(path).await
    }

    async fn snapshot(&mut self) -> Result<String, AppError> {
        (**self).snapshot().await
    }

    async fn click(&mut self, target: &ElementHandle) -> Result<(), AppError> {
        (**self).click(target).await
    }

    async fn scroll_into_view(&mut self, target: &ElementHandle) -> Result<(), AppError> {
        (**self).scroll_into_view(target).await
    }

    async fn current_url(&mut self) -> Option<String> {
        (**self).current_url().await
    }

    async fn close(&mut self) -> Result<(), AppError> {
        (**self).close().await
    }
}

/// Outcome of one best-effort interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Succeeded,
    NotFound,
    /// Found, but the click (or scroll) failed and was ignored.
    Ignored(String),
}

impl Interaction {
    /// Whether a target was found and engaged, regardless of click success.
    pub fn engaged(&self) -> bool {
        !matches!(self, Interaction::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLink {
    pub text: String,
    pub href: Option<String>,
}

/// Parsed selector set.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub candidates: Vec<Locator>,
    pub details_link: Locator,
    pub keyword_text: Locator,
    pub report_links: Locator,
}

impl Selectors {
    pub fn from_config(cfg: &Config) -> Result<Self, AppError> {
        let sel = &cfg.selectors;
        Ok(Self {
            candidates: sel
                .candidates
                .iter()
                .map(|s| Locator::parse(s))
                .collect::<Result<_, _>>()?,
            details_link: Locator::parse(&sel.details_link)?,
            keyword_text: Locator::parse(&cfg.keyword_locator())?,
            report_links: Locator::parse(&sel.report_links)?,
        })
    }
}

/// Page object for the announcements listing and its detail views.
pub struct EditalPage<D: PageDriver> {
    driver: D,
    selectors: Selectors,
    settle: Duration,
    poll_interval: Duration,
}

impl<D: PageDriver> EditalPage<D> {
    pub fn new(driver: D, selectors: Selectors, settle: Duration, poll_interval: Duration) -> Self {
        Self {
            driver,
            selectors,
            settle,
            poll_interval,
        }
    }

    pub fn from_config(driver: D, cfg: &Config) -> Result<Self, AppError> {
        Ok(Self::new(
            driver,
            Selectors::from_config(cfg)?,
            cfg.settle(),
            cfg.poll_interval(),
        ))
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    #[cfg(test)]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Navigates, then waits until an announcement container or details link
    /// shows up (bounded by the settle timeout).
    pub async fn goto(&mut self, path: &str) -> Result<(), AppError> {
        self.driver.goto(path).await?;

        let mut targets = self.selectors.candidates.clone();
        targets.push(self.selectors.details_link.clone());
        let ready = Locator::Any(targets);
        if !self.wait_for(&ready).await {
            tracing::debug!(path = %path, "No announcement container rendered");
        }
        Ok(())
    }

    /// Opens the first announcement: the first candidate container with a
    /// match is scrolled to and clicked, else the first details link.
    ///
    /// Returns whether something was engaged, not whether navigation
    /// happened; failed clicks still count.
    pub async fn open_first_edital(&mut self) -> bool {
        let Self {
            driver, selectors, ..
        } = self;

        for locator in &selectors.candidates {
            let outcome = engage(driver, locator, true).await;
            if outcome.engaged() {
                let url = driver.current_url().await;
                tracing::info!(locator = %locator, outcome = ?outcome, url = ?url, "Opened announcement");
                return true;
            }
        }

        let outcome = engage(driver, &selectors.details_link, false).await;
        let url = driver.current_url().await;
        tracing::info!(locator = %selectors.details_link, outcome = ?outcome, url = ?url, "Details link fallback");
        outcome.engaged()
    }

    /// `textContent` of every match, as authored.
    pub async fn collect_matching_text(&mut self, locator: &Locator) -> Result<Vec<String>, AppError> {
        let markup = self.driver.snapshot().await?;
        Ok(locator
            .handles(&markup)
            .into_iter()
            .map(|h| h.text_content)
            .collect())
    }

    pub async fn collect_links(&mut self, locator: &Locator) -> Result<Vec<ReportLink>, AppError> {
        let markup = self.driver.snapshot().await?;
        Ok(locator
            .handles(&markup)
            .into_iter()
            .map(|h| ReportLink {
                text: h.text,
                href: h.href,
            })
            .collect())
    }

    /// Texts of elements naming the target keyword.
    pub async fn collect_lot_texts(&mut self) -> Result<Vec<String>, AppError> {
        let locator = self.selectors.keyword_text.clone();
        self.collect_matching_text(&locator).await
    }

    pub async fn collect_reports(&mut self) -> Result<Vec<ReportLink>, AppError> {
        let locator = self.selectors.report_links.clone();
        self.collect_links(&locator).await
    }

    pub async fn content(&mut self) -> Result<String, AppError> {
        self.driver.snapshot().await
    }

    pub async fn close(&mut self) -> Result<(), AppError> {
        self.driver.close().await
    }

    /// Polls until `locator` matches at least one element.
    pub async fn wait_for(&mut self, locator: &Locator) -> bool {
        self.wait_until(|markup| !locator.handles(markup).is_empty())
            .await
    }

    /// Polls the rendered markup until `ready` holds or the settle timeout
    /// expires. Snapshot failures count as "not ready yet".
    pub async fn wait_until<F>(&mut self, ready: F) -> bool
    where
        F: Fn(&str) -> bool + Send,
    {
        let mut poll = Poll::new(self.settle, self.poll_interval);
        loop {
            match self.driver.snapshot().await {
                Ok(markup) if ready(&markup) => return true,
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Snapshot failed while waiting"),
            }
            if !poll.tick().await {
                tracing::debug!(
                    attempts = poll.attempts(),
                    elapsed_ms = poll.elapsed().as_millis() as u64,
                    "Wait condition not met"
                );
                return false;
            }
        }
    }
}

async fn engage<D: PageDriver>(driver: &mut D, locator: &Locator, scroll: bool) -> Interaction {
    let markup = match driver.snapshot().await {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(locator = %locator, error = %e, "Snapshot failed");
            return Interaction::NotFound;
        }
    };
    let Some(target) = locator.handles(&markup).into_iter().next() else {
        return Interaction::NotFound;
    };

    if scroll {
        if let Err(e) = driver.scroll_into_view(&target).await {
            return Interaction::Ignored(e.to_string());
        }
    }
    match driver.click(&target).await {
        Ok(()) => Interaction::Succeeded,
        Err(e) => {
            tracing::debug!(locator = %locator, error = %e, "Click failed, ignoring");
            Interaction::Ignored(e.to_string())
        }
    }
}
