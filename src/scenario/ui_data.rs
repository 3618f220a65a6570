use async_trait::async_trait;
use serde::Serialize;

use super::{release, Context, Scenario};
use crate::error::AppError;
use crate::output;
use crate::page::{EditalPage, PageDriver, ReportLink};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditalData {
    pub lots_found: Vec<String>,
    pub reports: Vec<ReportLink>,
}

/// Opens the first announcement and collects keyword texts and report links
/// from whatever is rendered afterwards.
pub async fn collect_ui_data<D: PageDriver>(page: &mut EditalPage<D>) -> Result<EditalData, AppError> {
    page.goto("/").await?;
    page.open_first_edital().await;

    let keyword = page.selectors().keyword_text.clone();
    if !page.wait_for(&keyword).await {
        tracing::debug!(locator = %keyword, "Keyword text not rendered");
    }

    let lots_found = page.collect_lot_texts().await?;
    let reports = page.collect_reports().await?;
    tracing::info!(lots = lots_found.len(), reports = reports.len(), "Collected page data");

    Ok(EditalData { lots_found, reports })
}

pub struct UiData;

#[async_trait]
impl Scenario for UiData {
    fn name(&self) -> &'static str {
        "ui-data"
    }

    async fn run(&self, ctx: &Context) -> Result<(), AppError> {
        let mut page = ctx.open_page().await?;
        let collected = collect_ui_data(&mut page).await;
        release(page).await;
        let data = collected?;
        ctx.writer.write_json(output::UI_DATA, &data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::page::testing::FakePage;
    use crate::page::Selectors;
    use serde_json::json;
    use std::time::Duration;

    fn page(fake: FakePage) -> EditalPage<FakePage> {
        let selectors = Selectors::from_config(&Config::default()).unwrap();
        EditalPage::new(fake, selectors, Duration::from_millis(200), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_collects_from_opened_detail() {
        let listing = std::fs::read_to_string("tests/fixtures/editais_page.html")
            .expect("Missing fixture: tests/fixtures/editais_page.html");
        let detail = std::fs::read_to_string("tests/fixtures/edital_detail.html")
            .expect("Missing fixture: tests/fixtures/edital_detail.html");
        let mut fake = FakePage::with_page("/", &listing);
        fake.pages.insert("/editais/12".into(), detail);

        let data = collect_ui_data(&mut page(fake)).await.unwrap();
        assert_eq!(data.lots_found, vec!["Calculadora Científica", "Calculadora de mesa"]);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "lotsFound": ["Calculadora Científica", "Calculadora de mesa"],
                "reports": [{ "text": "Relatórios do pregão", "href": "/relatorios/12" }]
            })
        );
    }

    #[tokio::test]
    async fn test_empty_page_still_yields_data() {
        let data = collect_ui_data(&mut page(FakePage::with_page("/", "<body><p>Sem editais</p></body>")))
            .await
            .unwrap();
        assert!(data.lots_found.is_empty());
        assert!(data.reports.is_empty());
    }

    #[tokio::test]
    async fn test_missing_listing_is_an_error() {
        assert!(collect_ui_data(&mut page(FakePage::default())).await.is_err());
    }
}
