// src/browser/session.rs
//
// Attach to the user's already-running, already-logged-in browser. We never
// open a window or tab: the page the user logged in with is the one we drive.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CdpConnection, PageDriver};
use crate::config::consts::{COMMAND_TIMEOUT_SECS, DISCOVERY_TIMEOUT_SECS};
use crate::config::Endpoint;
use crate::error::{Result, ScrapeError};
use crate::specs::PageProfile;

/// One entry of the DevTools `/json/list` discovery response.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PageTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent while another DevTools client holds the target.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: Option<String>,
}

impl PageTarget {
    fn attachable(&self) -> bool {
        self.kind == "page" && self.ws_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Pick the page to drive: a logged-in site page first, then any site page,
/// then the first attachable page.
pub fn choose_page<'a>(targets: &'a [PageTarget], profile: &PageProfile) -> Option<&'a PageTarget> {
    let candidates: Vec<&PageTarget> = targets.iter().filter(|t| t.attachable()).collect();

    candidates
        .iter()
        .find(|t| profile.is_site_url(&t.url) && !profile.is_signin_url(&t.url))
        .or_else(|| candidates.iter().find(|t| profile.is_site_url(&t.url)))
        .or_else(|| candidates.first())
        .copied()
}

/// The live connection to the browser's page. Exactly one per run.
pub struct Session {
    endpoint: Endpoint,
    target: PageTarget,
    page: CdpConnection,
}

impl Session {
    /// Release the control channel; the browser and its tab stay open.
    pub async fn detach(self) {
        self.page.close().await;
        logf!(
            "detached from page {} on {} (browser window remains open)",
            self.target.id, self.endpoint
        );
    }
}

#[async_trait]
impl PageDriver for Session {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.navigate(url).await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.page.evaluate(expression).await
    }
}

/// Attach to the browser listening on `endpoint`.
///
/// Fails with `ConnectionUnavailable` when nothing answers the DevTools HTTP
/// API or the page socket refuses us, and with `NoActivePage` when the
/// browser has no page we could attach to.
pub async fn connect(endpoint: &Endpoint, profile: &PageProfile) -> Result<Session> {
    let unavailable = |reason: String| ScrapeError::ConnectionUnavailable {
        endpoint: endpoint.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DISCOVERY_TIMEOUT_SECS))
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let version: Value = client
        .get(format!("{}/json/version", endpoint.http_base()))
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?
        .json()
        .await
        .map_err(|e| unavailable(format!("not a DevTools endpoint: {e}")))?;
    let browser = version.get("Browser").and_then(Value::as_str).unwrap_or("unknown browser");
    logf!("connected to {} ({})", endpoint, browser);

    let targets: Vec<PageTarget> = client
        .get(format!("{}/json/list", endpoint.http_base()))
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?
        .json()
        .await
        .map_err(|e| unavailable(format!("bad target list: {e}")))?;
    logd!("{} devtools targets", targets.len());

    let target = choose_page(&targets, profile)
        .cloned()
        .ok_or_else(|| ScrapeError::NoActivePage { endpoint: endpoint.to_string() })?;

    if !profile.is_site_url(&target.url) || profile.is_signin_url(&target.url) {
        logw!(
            "attached page is not a logged-in {} page: {}. Log in in that tab before running.",
            profile.name, target.url
        );
    } else {
        logf!("attached to page {:?} at {}", target.title, target.url);
    }

    let ws_url = target.ws_url.clone().unwrap_or_default();
    let page = CdpConnection::connect(&ws_url, Duration::from_secs(COMMAND_TIMEOUT_SECS))
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    Ok(Session { endpoint: endpoint.clone(), target, page })
}
