use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{release, Context, Scenario};
use crate::amount::{extract_amount, format_brl, RawValue};
use crate::api;
use crate::error::AppError;
use crate::fields::{editais_of, first_present, id_of, lots_of, scalar_text, FieldAliases};
use crate::finding::{total, Finding, Origin};
use crate::output;
use crate::page::{EditalPage, PageDriver};
use crate::scrape::scrape_page;

/// Root availability check.
pub struct ApiRoot;

#[async_trait]
impl Scenario for ApiRoot {
    fn name(&self) -> &'static str {
        "api-root"
    }

    async fn run(&self, ctx: &Context) -> Result<(), AppError> {
        let scan = &ctx.config.scan;
        let (status, body) = api::fetch_status(&ctx.client, ctx.base_url(), &scan.root_path).await?;
        ctx.writer.write_text(output::API_ROOT, &body)?;

        if !scan.accepted_statuses.contains(&status.as_u16()) {
            return Err(AppError::assertion(
                self.name(),
                format!("{} answered {}, expected one of {:?}", scan.root_path, status, scan.accepted_statuses),
            ));
        }
        Ok(())
    }
}

/// Lots of every announcement whose name contains `keyword`
/// (case-insensitive). Values that do not parse count as zero.
pub fn api_findings(payload: &Value, aliases: &FieldAliases, keyword: &str) -> Vec<Finding> {
    let keyword = keyword.to_lowercase();
    let mut findings = Vec::new();

    for edital in editais_of(payload, aliases) {
        for lot in lots_of(edital, aliases) {
            let name = first_present(lot, &aliases.lot_name)
                .and_then(scalar_text)
                .unwrap_or_default();
            if !name.to_lowercase().contains(&keyword) {
                continue;
            }

            let value = first_present(lot, &aliases.lot_value);
            findings.push(Finding {
                edital: id_of(edital, aliases),
                lote: Some(name),
                valor: extract_amount(RawValue::from(value)),
                raw: value.and_then(scalar_text).unwrap_or_else(|| "0".to_string()),
                source: Origin::Api,
            });
        }
    }

    findings
}

/// Page-scraping fallback. Best effort: navigation errors are logged and
/// yield no findings.
pub async fn ui_findings<D: PageDriver>(page: &mut EditalPage<D>) -> Vec<Finding> {
    if let Err(e) = page.goto("/").await {
        tracing::warn!(error = %e, "Listing unavailable for scraping");
        return Vec::new();
    }
    page.open_first_edital().await;
    if !page.wait_until(|markup| markup.contains("R$")).await {
        tracing::debug!("No currency rendered after opening");
    }

    match page.content().await {
        Ok(markup) => {
            let findings = scrape_page(&markup);
            tracing::info!(count = findings.len(), "Scraped page amounts");
            findings
        }
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot failed, nothing scraped");
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotsReport {
    pub endpoint_used: Option<String>,
    pub total: f64,
    pub findings: Vec<Finding>,
}

impl LotsReport {
    pub fn new(endpoint_used: Option<String>, findings: Vec<Finding>) -> Self {
        Self {
            endpoint_used,
            total: total(&findings),
            findings,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: R$ {}\nItems: {}",
            format_brl(self.total, 3),
            self.findings.len()
        )
    }
}

/// Keyword lots via API, falling back to the rendered page.
pub struct KeywordLots;

#[async_trait]
impl Scenario for KeywordLots {
    fn name(&self) -> &'static str {
        "lots"
    }

    async fn run(&self, ctx: &Context) -> Result<(), AppError> {
        let scan = &ctx.config.scan;
        let hit = api::first_success(&ctx.client, ctx.base_url(), &scan.endpoints).await;

        let mut findings = match &hit {
            Some(hit) => api_findings(&hit.payload.as_json(), &ctx.config.aliases, &scan.keyword),
            None => Vec::new(),
        };
        tracing::info!(keyword = %scan.keyword, count = findings.len(), "API lots matched");

        if findings.is_empty() {
            match ctx.open_page().await {
                Ok(mut page) => {
                    findings = ui_findings(&mut page).await;
                    release(page).await;
                }
                Err(e) => tracing::warn!(error = %e, "Page driver unavailable, nothing scraped"),
            }
        }

        let report = LotsReport::new(hit.map(|p| p.endpoint), findings);
        ctx.writer.write_json(output::LOTS, &report)?;
        ctx.writer.write_text(output::LOTS_SUMMARY, &report.summary())?;
        tracing::info!(total = report.total, items = report.findings.len(), "Lots summed");

        if report.endpoint_used.is_none() {
            return Err(AppError::assertion(self.name(), "no endpoint returned a payload"));
        }
        Ok(())
    }
}
