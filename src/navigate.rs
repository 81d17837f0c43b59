// src/navigate.rs
//
// Drive the page to one activity and wait until it is safe to read.
// Readiness is polled (render time varies with network and payload size);
// the wait is bounded by `NavOptions::timeout`.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::browser::PageDriver;
use crate::config::NavOptions;
use crate::error::{Result, ScrapeError};
use crate::request::ActivityRequest;
use crate::specs::{url_path, PageProfile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    NotFound,
    SignIn,
}

/// Proof that the page shows the requested activity and finished rendering.
#[derive(Clone, Debug)]
pub struct Ready {
    pub url: String,
    pub elapsed: Duration,
}

pub struct Navigator<'a> {
    profile: &'a PageProfile,
    opts: &'a NavOptions,
}

impl<'a> Navigator<'a> {
    pub fn new(profile: &'a PageProfile, opts: &'a NavOptions) -> Self {
        Self { profile, opts }
    }

    /// Navigate `page` to the request's activity and poll until ready.
    pub async fn navigate<P>(&self, page: &P, req: &ActivityRequest) -> Result<Ready>
    where
        P: PageDriver + ?Sized,
    {
        let url = self.profile.activity_url(req.id());
        let path = self.profile.activity_path(req.id()).ok_or_else(|| {
            ScrapeError::Profile(format!("activity address {url:?} is not an absolute URL"))
        })?;
        let script = self.probe_script(&path);
        logd!("navigating to {url}");

        let started = Instant::now();
        let deadline = started + self.opts.timeout;
        let timeout_err = || ScrapeError::NavigationTimeout {
            id: req.id().to_string(),
            waited: started.elapsed(),
        };

        match tokio::time::timeout(self.opts.timeout, page.navigate(&url)).await {
            Ok(res) => res?,
            Err(_) => return Err(timeout_err()),
        }

        let mut polls = 0u32;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let probe = match tokio::time::timeout(remaining, page.evaluate(&script)).await {
                Err(_) => return Err(timeout_err()),
                Ok(Ok(v)) => v,
                // the old document may be torn down under us mid-navigation
                Ok(Err(ScrapeError::Protocol(msg))) => {
                    logd!("probe failed while loading: {msg}");
                    Value::Null
                }
                Ok(Err(e)) => return Err(e),
            };
            polls += 1;

            let (mut state, href) = parse_probe(&probe);
            // A verdict only counts for the requested activity's own page.
            if matches!(state, Readiness::Ready | Readiness::NotFound)
                && href.as_deref().and_then(url_path).as_deref() != Some(path.as_str())
            {
                logd!("probe answered for {:?}, waiting for {path}", href);
                state = Readiness::Loading;
            }
            match state {
                Readiness::Ready => {
                    logd!("activity {} ready after {} polls", req.id(), polls);
                    return Ok(Ready { url: href.unwrap_or(url), elapsed: started.elapsed() });
                }
                Readiness::NotFound => {
                    return Err(ScrapeError::ActivityNotFound { id: req.id().to_string() });
                }
                Readiness::SignIn => {
                    return Err(ScrapeError::LoggedOut { url: href.unwrap_or_default() });
                }
                Readiness::Loading => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(timeout_err());
            }
            tokio::time::sleep(self.opts.poll_interval.min(deadline - now)).await;
        }
    }

    /// Read-only JS returning `{state, href}` for the current document.
    /// `path` is the activity page's path as given by `PageProfile::activity_path`.
    pub fn probe_script(&self, path: &str) -> String {
        format!(
            r#"(() => {{
  const href = location.href;
  const lc = href.toLowerCase();
  const out = (state) => ({{ state, href }});
  if ({signin}.some(m => lc.includes(m.toLowerCase()))) return out('signin');
  if (location.pathname.replace(/\/+$/, '') !== {path}) return out('loading');
  if ({nf_sel}.some(s => document.querySelector(s))) return out('not_found');
  const body = ((document.body && document.body.innerText) || '').toLowerCase();
  if ({nf_text}.some(p => body.includes(p.toLowerCase()))) return out('not_found');
  if (document.readyState !== 'complete') return out('loading');
  return out({ready}.some(s => document.querySelector(s)) ? 'ready' : 'loading');
}})()"#,
            signin = js_literal(&self.profile.signin_markers),
            path = js_literal(path),
            nf_sel = js_literal(&self.profile.not_found_selectors),
            nf_text = js_literal(&self.profile.not_found_phrases),
            ready = js_literal(&self.profile.ready_selectors),
        )
    }
}

/// JSON literal for embedding a value into a script.
fn js_literal<T: serde::Serialize + ?Sized>(v: &T) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| s!("null"))
}

/// Decode the probe's `{state, href}`. Anything unexpected counts as loading.
pub fn parse_probe(v: &Value) -> (Readiness, Option<String>) {
    let href = v.get("href").and_then(Value::as_str).map(String::from);
    let state = match v.get("state").and_then(Value::as_str) {
        Some("ready") => Readiness::Ready,
        Some("not_found") => Readiness::NotFound,
        Some("signin") => Readiness::SignIn,
        _ => Readiness::Loading,
    };
    (state, href)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_probe_states() {
        let (s, h) = parse_probe(&json!({ "state": "ready", "href": "https://x/activity/1" }));
        assert_eq!(s, Readiness::Ready);
        assert_eq!(h.as_deref(), Some("https://x/activity/1"));
        assert_eq!(parse_probe(&json!({ "state": "not_found" })).0, Readiness::NotFound);
        assert_eq!(parse_probe(&json!({ "state": "signin" })).0, Readiness::SignIn);
        assert_eq!(parse_probe(&Value::Null).0, Readiness::Loading);
        assert_eq!(parse_probe(&json!("weird")).0, Readiness::Loading);
    }

    #[test]
    fn probe_script_embeds_escaped_values() {
        let profile = PageProfile::builtin().unwrap();
        let opts = NavOptions::default();
        let nav = Navigator::new(&profile, &opts);
        let js = nav.probe_script("/modern/activity/12\"34");
        assert!(js.contains(r#"!== "/modern/activity/12\"34")"#));
        assert!(js.contains("#activityViewContent"));
        assert!(js.contains("activity not found"));
    }
}
