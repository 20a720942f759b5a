//! Async API client
//!
//! One `ApiClient` per configured server. Cookies (session and CSRF) live in a shared jar so a
//! token set by any response is reused by later requests.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, ACCEPT, REFERER};
use reqwest::{Client, Response, Url};

use crate::config::ClientConfig;
use crate::models::AnalysisSession;

use super::csrf::{token_from_cookie_header, token_from_html, CSRF_COOKIE, CSRF_HEADER};
use super::wire::{AnalysisResponse, SaveLevelRequest, SaveLevelResponse, ServerEnvelope};
use super::{ClientError, ClientResult};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
    config: ClientConfig,
}

/// Parse the configured base URL as a directory, so endpoint paths resolve below it
fn parse_base(raw: &str) -> ClientResult<Url> {
    let mut base =
        Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if base.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(format!("{}: not a base URL", raw)));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base = parse_base(&config.base_url)?;

        let jar = Arc::new(Jar::default());
        if let Some(ref session_id) = config.session_id {
            jar.add_cookie_str(&format!("sessionid={}; Path=/", session_id), &base);
        }
        if let Some(ref token) = config.csrf_token {
            jar.add_cookie_str(&format!("{}={}; Path=/", CSRF_COOKIE, token), &base);
        }

        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            jar,
            base,
            config,
        })
    }

    /// Resolve a path template below the base URL
    pub fn endpoint(&self, template: &str, menu_id: i64) -> ClientResult<Url> {
        let path = template.replace("{menu_id}", &menu_id.to_string());
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Token currently held in the cookie jar, if any
    fn token_from_jar(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .and_then(|header| token_from_cookie_header(&header))
    }

    /// Acquire the CSRF token: configured value, then cookie jar, then a page fetch
    /// (its `Set-Cookie` or an embedded form field).
    pub async fn csrf_token(&self) -> ClientResult<String> {
        if let Some(ref token) = self.config.csrf_token {
            return Ok(token.clone());
        }
        if let Some(token) = self.token_from_jar() {
            return Ok(token);
        }

        let page = self.endpoint(&self.config.csrf_page_path, 0)?;
        tracing::debug!(url = %page, "Fetching page for CSRF token");
        let html = self.http.get(page).send().await?.text().await?;

        if let Some(token) = self.token_from_jar() {
            return Ok(token);
        }
        if let Some(token) = token_from_html(&html) {
            // Django checks the header against the cookie
            self.jar
                .add_cookie_str(&format!("{}={}; Path=/", CSRF_COOKIE, token), &self.base);
            return Ok(token);
        }
        Err(ClientError::MissingCsrfToken)
    }

    /// Fetch a menu's analysis and build a session with totals recomputed
    pub async fn fetch_analysis(&self, menu_id: i64) -> ClientResult<AnalysisSession> {
        let url = self.endpoint(&self.config.analysis_path, menu_id)?;
        tracing::info!(menu_id, url = %url, "Fetching menu analysis");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        let text = check_status(response).await?.text().await?;

        let envelope: ServerEnvelope = serde_json::from_str(&text)?;
        if let Some(reason) = envelope.rejection() {
            return Err(ClientError::Rejected(reason));
        }
        let body: AnalysisResponse = serde_json::from_str(&text)?;

        let session = body.into_session();
        tracing::info!(
            menu_id,
            levels = session.levels.len(),
            rows = session.levels.iter().map(|l| l.rows.len()).sum::<usize>(),
            "Menu analysis loaded"
        );
        Ok(session)
    }

    /// Post one level's computed totals, percentages and rows
    pub async fn save_level(
        &self,
        session: &AnalysisSession,
        level_id: i64,
    ) -> ClientResult<SaveLevelResponse> {
        let level = session.level(level_id)?;
        let request = SaveLevelRequest::from_level(level);
        let url = self.endpoint(&self.config.save_path, session.menu_id)?;
        let token = self.csrf_token().await?;

        tracing::info!(menu_id = session.menu_id, level_id, url = %url, "Saving level analysis");

        let response = self
            .http
            .post(url)
            .header(CSRF_HEADER, token)
            .header(REFERER, self.base.as_str())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&request)
            .send()
            .await?;
        let text = check_status(response).await?.text().await?;
        let reply: SaveLevelResponse = serde_json::from_str(&text)?;

        if !reply.success {
            return Err(ClientError::Rejected(reply.notification()));
        }
        Ok(reply)
    }
}

/// Pass 2xx responses through. An error status whose body names a reason becomes `Rejected`.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Request failed");

    let reason = serde_json::from_str::<ServerEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.reason());
    match reason {
        Some(reason) => Err(ClientError::Rejected(reason)),
        None => Err(ClientError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}
