use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{ElementHandle, PageDriver};
use crate::api::resolve_url;
use crate::error::AppError;

/// Server-rendered view of the site: navigation is a GET, clicking follows
/// the element's link. Client-side scripts are not executed, so this only
/// suits targets that render on the server; see [`super::BrowserPage`].
pub struct HttpPage {
    client: Client,
    base: Url,
    current: Option<Url>,
    markup: String,
    action_timeout: Duration,
}

impl HttpPage {
    pub fn new(client: Client, base_url: &str, action_timeout: Duration) -> Result<Self, AppError> {
        let base = resolve_url(base_url, "/")?;
        Ok(Self {
            client,
            base,
            current: None,
            markup: String::new(),
            action_timeout,
        })
    }

    async fn load(&mut self, url: Url) -> Result<(), AppError> {
        tracing::info!(url = %url, "Loading page");

        let resp = self
            .client
            .get(url.clone())
            .timeout(self.action_timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Interaction(format!("HTTP {} from {}", status, url)));
        }

        // Redirects land on the final URL; relative links resolve against it.
        let final_url = resp.url().clone();
        self.markup = resp.text().await?;
        self.current = Some(final_url);

        tracing::debug!(bytes = self.markup.len(), "Page loaded");
        Ok(())
    }

    fn resolve(&self, link: &str) -> Result<Url, AppError> {
        let from = self.current.as_ref().unwrap_or(&self.base);
        let url = from
            .join(link)
            .map_err(|e| AppError::Interaction(format!("bad link {link:?}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::Interaction(format!(
                "link {link:?} has unsupported scheme {other}"
            ))),
        }
    }
}

#[async_trait]
impl PageDriver for HttpPage {
    async fn goto(&mut self, path: &str) -> Result<(), AppError> {
        let url = resolve_url(self.base.as_str(), path)?;
        self.load(url).await
    }

    async fn snapshot(&mut self) -> Result<String, AppError> {
        if self.current.is_none() {
            return Err(AppError::Interaction("no page loaded".to_string()));
        }
        Ok(self.markup.clone())
    }

    async fn click(&mut self, target: &ElementHandle) -> Result<(), AppError> {
        let link = target
            .link
            .as_deref()
            .ok_or_else(|| AppError::Interaction(format!("<{}> has no link to follow", target.tag)))?;
        let url = self.resolve(link)?;
        self.load(url).await
    }

    async fn current_url(&mut self) -> Option<String> {
        self.current.as_ref().map(Url::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    fn html_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body).with_header(
            Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_goto_and_follow_link() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        let handle = thread::spawn(move || {
            for _ in 0..2 {
                let Ok(request) = server.recv() else { return };
                let body = match request.url() {
                    "/" => r#"<body><article><a href="editais/12">Detalhes</a></article></body>"#,
                    "/editais/12" => "<body><h2>Pregão 12/2026</h2></body>",
                    _ => "",
                };
                request.respond(html_response(body)).unwrap();
            }
        });

        let base = format!("http://{addr}");
        let mut page = HttpPage::new(Client::new(), &base, Duration::from_secs(5)).unwrap();
        assert!(page.snapshot().await.is_err());

        page.goto("/").await.unwrap();
        let target = ElementHandle {
            tag: "article".into(),
            text: "Detalhes".into(),
            text_content: "Detalhes".into(),
            href: None,
            link: Some("editais/12".into()),
            path: "html:nth-child(1) > body:nth-child(2) > article:nth-child(1)".into(),
        };
        page.click(&target).await.unwrap();

        assert_eq!(page.current_url().await, Some(format!("{base}/editais/12")));
        assert!(page.snapshot().await.unwrap().contains("Pregão 12/2026"));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_click_without_link_fails() {
        let mut page =
            HttpPage::new(Client::new(), "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let target = ElementHandle {
            tag: "div".into(),
            text: "Edital".into(),
            text_content: "Edital".into(),
            href: None,
            link: None,
            path: "html:nth-child(1) > body:nth-child(2) > div:nth-child(1)".into(),
        };
        assert!(matches!(page.click(&target).await, Err(AppError::Interaction(_))));

        let js = ElementHandle {
            link: Some("javascript:void(0)".into()),
            ..target
        };
        assert!(matches!(page.click(&js).await, Err(AppError::Interaction(_))));
    }

    #[tokio::test]
    async fn test_error_status_is_interaction_error() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        let handle = thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response =
                    Response::from_string("Not Found").with_status_code(tiny_http::StatusCode(404));
                request.respond(response).unwrap();
            }
        });

        let mut page =
            HttpPage::new(Client::new(), &format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        assert!(matches!(page.goto("/missing").await, Err(AppError::Interaction(_))));
        handle.join().unwrap();
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpPage::new(Client::new(), "not a url", Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
    }
}
