// src/browser/mod.rs
//
// The browser is an opaque capability provider: "go to this address" and
// "evaluate this read-only expression on the current page". Everything above
// this module talks to `PageDriver` only.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ScrapeError};

pub mod cdp;
pub mod session;

pub use cdp::CdpConnection;
pub use session::{choose_page, connect, PageTarget, Session};

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Start navigating the page to `url`. Returns once the browser accepted it;
    /// readiness is the navigator's job.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    async fn current_url(&self) -> Result<String> {
        match self.evaluate("location.href").await? {
            Value::String(s) => Ok(s),
            other => Err(ScrapeError::Protocol(format!("location.href returned {other}"))),
        }
    }

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String> {
        match self.evaluate("document.documentElement.outerHTML").await? {
            Value::String(s) => Ok(s),
            other => Err(ScrapeError::Protocol(format!("outerHTML returned {other}"))),
        }
    }
}
