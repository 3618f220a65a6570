use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::{release, Context, Scenario};
use crate::api;
use crate::dates::{extract_date, is_active, scan_date_strings, today};
use crate::error::AppError;
use crate::fields::{editais_of, first_present, id_of, scalar_text, FieldAliases};
use crate::output;
use crate::page::{EditalPage, PageDriver};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveEdital {
    pub id: Option<String>,
    pub date: NaiveDate,
    pub raw: String,
}

#[derive(Debug, Serialize)]
struct ApiReport {
    endpoint: Option<String>,
    found: usize,
    active: Vec<ActiveEdital>,
}

/// Announcements whose deadline alias parses to `today` or later.
/// Entries without a parseable deadline are skipped.
pub fn classify_active(editais: &[Value], aliases: &FieldAliases, today: NaiveDate) -> Vec<ActiveEdital> {
    editais
        .iter()
        .filter_map(|e| {
            let raw = first_present(e, &aliases.deadline).and_then(scalar_text)?;
            let date = extract_date(&raw)?;
            is_active(date, today).then(|| ActiveEdital {
                id: id_of(e, aliases),
                date,
                raw,
            })
        })
        .collect()
}

pub struct ActiveApi;

#[async_trait]
impl Scenario for ActiveApi {
    fn name(&self) -> &'static str {
        "active-api"
    }

    async fn run(&self, ctx: &Context) -> Result<(), AppError> {
        let hit = api::first_success(&ctx.client, ctx.base_url(), &ctx.config.scan.endpoints).await;

        let active = match &hit {
            Some(hit) => {
                let payload = hit.payload.as_json();
                let editais = editais_of(&payload, &ctx.config.aliases);
                tracing::info!(endpoint = %hit.endpoint, count = editais.len(), "Announcements received");
                classify_active(editais, &ctx.config.aliases, today())
            }
            None => Vec::new(),
        };

        let report = ApiReport {
            endpoint: hit.as_ref().map(|p| p.endpoint.clone()),
            found: active.len(),
            active,
        };
        let path = ctx.writer.write_json(output::ACTIVE_API, &report)?;
        tracing::info!(path = %path.display(), found = report.found, "Wrote active announcements");

        if hit.is_none() {
            return Err(AppError::assertion(self.name(), "no endpoint returned a payload"));
        }
        if report.found == 0 {
            return Err(AppError::assertion(self.name(), "no announcement with a current deadline"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateHit {
    pub raw: String,
    /// ISO calendar date.
    pub parsed: String,
}

#[derive(Debug, Serialize)]
pub struct UiReport {
    pub opened: bool,
    pub matches: Vec<String>,
    pub future: Vec<DateHit>,
}

/// Scanned date strings that fall on `today` or later.
pub fn future_dates(matches: &[String], today: NaiveDate) -> Vec<DateHit> {
    matches
        .iter()
        .filter_map(|raw| {
            let date = extract_date(raw)?;
            is_active(date, today).then(|| DateHit {
                raw: raw.clone(),
                parsed: date.to_string(),
            })
        })
        .collect()
}

/// Opens the listing and its first announcement, then scans the rendered
/// markup for dates.
pub async fn scan_opened_edital<D: PageDriver>(
    page: &mut EditalPage<D>,
    today: NaiveDate,
) -> Result<UiReport, AppError> {
    page.goto("/").await?;
    let opened = page.open_first_edital().await;
    if !page.wait_until(|markup| !scan_date_strings(markup).is_empty()).await {
        tracing::debug!("No date rendered after opening");
    }

    let content = page.content().await?;
    let matches = scan_date_strings(&content);
    let future = future_dates(&matches, today);
    tracing::info!(opened, dates = matches.len(), future = future.len(), "Scanned page dates");

    Ok(UiReport {
        opened,
        matches,
        future,
    })
}

pub struct ActiveUi;

#[async_trait]
impl Scenario for ActiveUi {
    fn name(&self) -> &'static str {
        "active-ui"
    }

    async fn run(&self, ctx: &Context) -> Result<(), AppError> {
        let mut page = ctx.open_page().await?;
        let scanned = scan_opened_edital(&mut page, today()).await;
        release(page).await;
        let report = scanned?;
        ctx.writer.write_json(output::ACTIVE_UI, &report)?;

        if report.future.is_empty() {
            return Err(AppError::assertion(
                self.name(),
                format!("none of {} dates on the page is current", report.matches.len()),
            ));
        }
        Ok(())
    }
}
