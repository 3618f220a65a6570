pub mod active;
pub mod lots;
pub mod ui_data;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::Client;

use crate::config::{Config, DriverKind};
use crate::error::AppError;
use crate::output::ResultWriter;
use crate::page::{BrowserPage, EditalPage, HttpPage, PageDriver};

/// Shared per-run state handed to every scenario.
pub struct Context {
    pub config: Config,
    pub client: Client,
    pub writer: ResultWriter,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.target.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        let writer = ResultWriter::new(config.output.dir.clone());
        Ok(Self {
            config,
            client,
            writer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.target.base_url
    }

    /// Fresh page object over the live site, backed by the configured driver.
    pub async fn open_page(&self) -> Result<EditalPage<Box<dyn PageDriver>>, AppError> {
        let driver: Box<dyn PageDriver> = match self.config.target.driver {
            DriverKind::Browser => Box::new(BrowserPage::launch(&self.config).await?),
            DriverKind::Http => Box::new(HttpPage::new(
                self.client.clone(),
                self.base_url(),
                self.config.action_timeout(),
            )?),
        };
        EditalPage::from_config(driver, &self.config)
    }
}

/// Closes a page opened by [`Context::open_page`]. Failures only get logged
/// since the scenario result is already known.
async fn release<D: PageDriver>(mut page: EditalPage<D>) {
    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "Page did not close cleanly");
    }
}

#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;
    /// Writes the scenario's artifact, then checks its assertion.
    async fn run(&self, ctx: &Context) -> Result<(), AppError>;
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioKind {
    /// API: at least one announcement with a deadline today or later
    ActiveApi,
    /// UI: the opened announcement shows a future date
    ActiveUi,
    /// API root answers with an accepted status
    ApiRoot,
    /// Keyword lots found via API (or page scraping) and summed
    Lots,
    /// UI: keyword texts and report links collected
    UiData,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::ActiveApi,
        ScenarioKind::ActiveUi,
        ScenarioKind::ApiRoot,
        ScenarioKind::Lots,
        ScenarioKind::UiData,
    ];
}

pub fn create_scenario(kind: ScenarioKind) -> Box<dyn Scenario> {
    match kind {
        ScenarioKind::ActiveApi => Box::new(active::ActiveApi),
        ScenarioKind::ActiveUi => Box::new(active::ActiveUi),
        ScenarioKind::ApiRoot => Box::new(lots::ApiRoot),
        ScenarioKind::Lots => Box::new(lots::KeywordLots),
        ScenarioKind::UiData => Box::new(ui_data::UiData),
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub name: &'static str,
    pub result: Result<(), AppError>,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs scenarios one after another, each bounded by the scenario timeout.
/// A hung scenario is reported as failed, not cancelled cleanly.
pub async fn run_scenarios(ctx: &Context, kinds: &[ScenarioKind]) -> Vec<Outcome> {
    let limit = ctx.config.scenario_timeout();
    let mut outcomes = Vec::with_capacity(kinds.len());

    for kind in kinds {
        let scenario = create_scenario(*kind);
        let name = scenario.name();
        tracing::info!(scenario = %name, "Starting scenario");

        let start = Instant::now();
        let result = match tokio::time::timeout(limit, scenario.run(ctx)).await {
            Ok(r) => r,
            Err(_) => Err(AppError::Timeout(limit)),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(
                scenario = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                "Scenario passed"
            ),
            Err(e) => tracing::error!(
                scenario = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Scenario failed"
            ),
        }

        outcomes.push(Outcome {
            name,
            result,
            elapsed,
        });
    }

    outcomes
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Context pointing at `base_url` and writing into `dir`.
    pub fn context(base_url: &str, dir: &std::path::Path) -> Context {
        let mut config = Config::default();
        config.target.base_url = base_url.to_string();
        config.target.driver = DriverKind::Http;
        config.target.request_timeout_secs = 5;
        config.target.scenario_timeout_secs = 10;
        config.output.dir = dir.to_path_buf();
        config.wait.settle_ms = 50;
        config.wait.poll_interval_ms = 5;
        Context::new(config).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_kinds() {
        let names: Vec<_> = ScenarioKind::ALL
            .iter()
            .map(|k| create_scenario(*k).name())
            .collect();
        assert_eq!(names, vec!["active-api", "active-ui", "api-root", "lots", "ui-data"]);
        for kind in ScenarioKind::ALL {
            let value = kind.to_possible_value().unwrap();
            assert_eq!(value.get_name(), create_scenario(kind).name());
        }
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_every_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = testing::context("http://127.0.0.1:9", tmp.path());
        let outcomes = run_scenarios(&ctx, &ScenarioKind::ALL).await;

        assert_eq!(outcomes.len(), 5);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.passed()).map(|o| o.name).collect();
        assert_eq!(failed, vec!["active-api", "active-ui", "api-root", "lots", "ui-data"]);
        // Artifacts are still written for post-run inspection.
        assert!(tmp.path().join("active-editais-api.json").exists());
        assert!(tmp.path().join("calculadora-lotes.json").exists());
    }

    #[tokio::test]
    async fn test_hung_scenario_times_out_and_run_continues() {
        use tiny_http::{Response, Server};

        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr());
        std::thread::spawn(move || {
            // Requests to the root path are held open and never answered.
            let mut held = Vec::new();
            for request in server.incoming_requests() {
                if request.url() == "/api" {
                    held.push(request);
                    continue;
                }
                let body = r#"[{"id":"A","dataLimite":"01/01/2099"}]"#;
                let _ = request.respond(Response::from_string(body));
            }
        });

        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = testing::context(&base, tmp.path());
        ctx.config.target.scenario_timeout_secs = 1;
        // Longer than the scenario limit, so only the runner can cut it short.
        ctx.config.target.request_timeout_secs = 30;
        let ctx = Context::new(ctx.config).unwrap();

        let start = Instant::now();
        let outcomes = run_scenarios(&ctx, &[ScenarioKind::ApiRoot, ScenarioKind::ActiveApi]).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "api-root");
        assert!(matches!(
            outcomes[0].result,
            Err(AppError::Timeout(limit)) if limit == Duration::from_secs(1)
        ));
        assert_eq!(outcomes[1].name, "active-api");
        assert!(outcomes[1].passed(), "{:?}", outcomes[1].result);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
