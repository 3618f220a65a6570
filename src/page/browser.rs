use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{ElementHandle, PageDriver};
use crate::api::resolve_url;
use crate::config::Config;
use crate::error::AppError;

/// Headless Chrome over the DevTools protocol. Snapshots are the live DOM
/// serialized after scripts ran; clicks and scrolls hit the rendered element
/// addressed by [`ElementHandle::path`].
pub struct BrowserPage {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
    base_url: String,
    action_timeout: Duration,
}

impl BrowserPage {
    pub async fn launch(cfg: &Config) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(cfg.action_timeout())
            .window_size(1280, 900)
            .arg("--no-sandbox")
            .arg(format!("--user-agent={}", cfg.target.user_agent));
        if let Some(path) = &cfg.target.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let browser_cfg = builder.build().map_err(AppError::Config)?;

        let (browser, mut handler) = Browser::launch(browser_cfg).await?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser event loop stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        tracing::info!(base_url = %cfg.target.base_url, "Browser launched");

        Ok(Self {
            browser,
            page,
            events,
            base_url: cfg.target.base_url.clone(),
            action_timeout: cfg.action_timeout(),
        })
    }
}

/// Runs one browser action under the action timeout.
async fn bounded<T, F>(limit: Duration, action: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send,
{
    tokio::time::timeout(limit, action)
        .await
        .map_err(|_| AppError::Timeout(limit))?
}

#[async_trait]
impl PageDriver for BrowserPage {
    async fn goto(&mut self, path: &str) -> Result<(), AppError> {
        let url = resolve_url(&self.base_url, path)?;
        tracing::info!(url = %url, "Loading page");
        let page = &self.page;
        bounded(self.action_timeout, async move {
            page.goto(url.as_str()).await?;
            Ok(())
        })
        .await
    }

    async fn snapshot(&mut self) -> Result<String, AppError> {
        let page = &self.page;
        bounded(self.action_timeout, async move { Ok(page.content().await?) }).await
    }

    async fn click(&mut self, target: &ElementHandle) -> Result<(), AppError> {
        let page = &self.page;
        let path = target.path.as_str();
        bounded(self.action_timeout, async move {
            page.find_element(path).await?.click().await?;
            Ok(())
        })
        .await
    }

    async fn scroll_into_view(&mut self, target: &ElementHandle) -> Result<(), AppError> {
        let page = &self.page;
        let path = target.path.as_str();
        bounded(self.action_timeout, async move {
            page.find_element(path).await?.scroll_into_view().await?;
            Ok(())
        })
        .await
    }

    async fn current_url(&mut self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.browser.close().await?;
        self.browser.wait().await?;
        Ok(())
    }
}

impl Drop for BrowserPage {
    fn drop(&mut self) {
        self.events.abort();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    /// Listing whose cards only exist after scripts run; clicking a card
    /// opens a details modal without navigating.
    pub const CLIENT_RENDERED: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"></head>
<body><div id="root"></div>
<script>
document.getElementById('root').innerHTML =
  '<article class="card"><h2>Pregão 1/2026</h2><p>Calculadora Valor: R$ 1.250,00</p></article>';
document.querySelector('article').addEventListener('click', function () {
  var modal = document.createElement('div');
  modal.className = 'modal';
  modal.innerHTML = '<p>Prazo: 15/12/2099</p><a href="/relatorios/1">Relatório</a>';
  document.body.appendChild(modal);
});
</script>
</body></html>"#;

    /// Serves `CLIENT_RENDERED` for every request until the test process exits.
    pub fn serve_client_rendered() -> String {
        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr());
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let response = Response::from_string(CLIENT_RENDERED).with_header(
                    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap(),
                );
                let _ = request.respond(response);
            }
        });
        base
    }

    pub async fn launch_against(base: &str) -> BrowserPage {
        let mut cfg = Config::default();
        cfg.target.base_url = base.to_string();
        BrowserPage::launch(&cfg).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{launch_against, serve_client_rendered};
    use super::*;
    use crate::page::{EditalPage, Locator, Selectors};

    #[tokio::test]
    #[ignore = "needs a local Chrome or Chromium"]
    async fn test_renders_scripts_and_clicks_live_element() {
        let base = serve_client_rendered();
        let selectors = Selectors::from_config(&Config::default()).unwrap();
        let mut page = EditalPage::new(
            launch_against(&base).await,
            selectors,
            Duration::from_secs(5),
            Duration::from_millis(50),
        );

        page.goto("/").await.unwrap();
        assert!(page.content().await.unwrap().contains("<article class=\"card\">"));

        assert!(page.open_first_edital().await);
        let modal = Locator::parse(".modal").unwrap();
        assert!(page.wait_for(&modal).await);
        let reports = page.collect_reports().await.unwrap();
        assert_eq!(reports[0].href.as_deref(), Some("/relatorios/1"));

        page.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_with_missing_binary_fails() {
        let mut cfg = Config::default();
        cfg.target.chrome_path = Some("/nonexistent/chrome-for-tests".into());
        assert!(BrowserPage::launch(&cfg).await.is_err());
    }
}
