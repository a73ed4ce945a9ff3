//! Request interception
//!
//! The adapter sits on a host's outbound request pipeline. For every
//! request to `/ipfs/<hash>/...` it dispatches an access record in the
//! background and lets the request through untouched, whatever happens to
//! the pin afterwards.

use crate::access::AccessTracker;
use crate::audit::{events, AuditLog};
use crate::error::{PinkeepError, PinkeepResult};
use crate::ledger::ResourceKey;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::runtime::Handle;
use tracing::{debug, warn};
use ureq::http::Uri;

/// Pattern used when none is configured
pub const DEFAULT_URL_PATTERN: &str = "https://localhost:8080/ipfs/*";

/// Path segment that introduces a content address
const IPFS_SEGMENT: &str = "ipfs";

/// URL filter of the form `scheme://host[:port]/path-prefix*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    raw: String,
    scheme: String,
    host: String,
    port: Option<u16>,
    path_prefix: String,
}

impl UrlPattern {
    pub fn parse(pattern: &str) -> PinkeepResult<Self> {
        let invalid = |reason: &str| PinkeepError::InvalidUrlPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let base = pattern.strip_suffix('*').unwrap_or(pattern);
        if base.contains('*') {
            return Err(invalid("'*' is only allowed at the end"));
        }

        let uri: Uri = base.parse().map_err(|e: ureq::http::uri::InvalidUri| {
            invalid(&e.to_string())
        })?;
        let scheme = uri.scheme_str().ok_or_else(|| invalid("missing scheme"))?;
        let host = uri.host().ok_or_else(|| invalid("missing host"))?;

        Ok(Self {
            raw: pattern.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port: uri.port_u16().or_else(|| default_port(scheme)),
            path_prefix: uri.path().to_string(),
        })
    }

    /// Whether `url` falls under this pattern
    pub fn matches(&self, url: &str) -> bool {
        let Ok(uri) = url.parse::<Uri>() else {
            return false;
        };
        let (Some(scheme), Some(host)) = (uri.scheme_str(), uri.host()) else {
            return false;
        };

        scheme.eq_ignore_ascii_case(&self.scheme)
            && host.eq_ignore_ascii_case(&self.host)
            && uri.port_u16().or_else(|| default_port(scheme)) == self.port
            && uri.path().starts_with(&self.path_prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for UrlPattern {
    fn default() -> Self {
        Self {
            raw: DEFAULT_URL_PATTERN.to_string(),
            scheme: "https".to_string(),
            host: "localhost".to_string(),
            port: Some(8080),
            path_prefix: "/ipfs/".to_string(),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Extract the content address from `/ipfs/<hash>/...`
///
/// Returns `None` for other paths and for malformed hashes.
pub fn resource_key_from_url(url: &str) -> Option<ResourceKey> {
    let uri = url.parse::<Uri>().ok()?;
    let mut segments = uri.path().split('/').skip(1);

    if segments.next()? != IPFS_SEGMENT {
        return None;
    }
    ResourceKey::parse(segments.next()?).ok()
}

/// An outbound request as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetails {
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
}

impl RequestDetails {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_headers: BTreeMap::new(),
        }
    }
}

/// What the host should do with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDecision {
    pub cancel: bool,
    pub request_headers: BTreeMap<String, String>,
}

impl RequestDecision {
    /// Let the request proceed with its headers unchanged
    pub fn pass_through(details: RequestDetails) -> Self {
        Self {
            cancel: false,
            request_headers: details.request_headers,
        }
    }
}

/// Callback a host invokes for every matching request
pub type RequestHandler = Arc<dyn Fn(RequestDetails) -> RequestDecision + Send + Sync>;

/// Request pipeline that accepts a before-send hook
pub trait InterceptionHost: Send + Sync {
    /// Register `handler` for requests matching `filter`
    fn on_before_send_headers(&self, filter: UrlPattern, handler: RequestHandler);
}

/// Turns intercepted IPFS requests into background access records
pub struct InterceptionAdapter {
    pattern: UrlPattern,
    tracker: AccessTracker,
    audit: Arc<AuditLog>,
    runtime: Handle,
}

impl InterceptionAdapter {
    /// Create an adapter bound to the current tokio runtime
    pub fn new(
        pattern: UrlPattern,
        tracker: AccessTracker,
        audit: Arc<AuditLog>,
    ) -> PinkeepResult<Self> {
        let runtime = Handle::try_current().map_err(|_| PinkeepError::NoRuntime)?;
        Ok(Self {
            pattern,
            tracker,
            audit,
            runtime,
        })
    }

    /// Register this adapter with `host`
    pub fn install(self: Arc<Self>, host: &dyn InterceptionHost) {
        let filter = self.pattern.clone();
        debug!("Installing interception hook for {}", filter);
        let handler: RequestHandler =
            Arc::new(move |details: RequestDetails| self.handle_request(details));
        host.on_before_send_headers(filter, handler);
    }

    /// Observe one request; always returns a pass-through decision
    pub fn handle_request(&self, details: RequestDetails) -> RequestDecision {
        if self.pattern.matches(&details.url) {
            match resource_key_from_url(&details.url) {
                Some(key) => self.dispatch(key),
                None => debug!("Ignoring non-resource URL {}", details.url),
            }
        }
        RequestDecision::pass_through(details)
    }

    /// Record an access in the background
    fn dispatch(&self, key: ResourceKey) {
        let tracker = self.tracker.clone();
        let audit = Arc::clone(&self.audit);

        self.runtime.spawn(async move {
            if let Err(e) = tracker.record_access(&key).await {
                warn!("Failed to record access to {}: {}", key, e);
                audit
                    .log(
                        events::ACCESS_FAILED,
                        &serde_json::json!({ "key": key, "error": e.to_string() }),
                    )
                    .await;
            }
        });
    }
}

/// Minimal host fed one request URL per line
///
/// Lines may be bare URLs or log lines; the first `http(s)://` token is used.
#[derive(Default)]
pub struct LineFeedHost {
    handlers: Mutex<Vec<(UrlPattern, RequestHandler)>>,
}

impl LineFeedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a single line through the registered handlers
    ///
    /// Returns the number of handlers that saw the request.
    pub fn feed(&self, line: &str) -> usize {
        let Some(url) = line
            .split_whitespace()
            .find(|token| token.starts_with("http://") || token.starts_with("https://"))
        else {
            return 0;
        };

        let handlers: Vec<RequestHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(filter, _)| filter.matches(url))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &handlers {
            let decision = handler(RequestDetails::new(url));
            if decision.cancel {
                debug!("Handler cancelled {}", url);
            }
        }
        handlers.len()
    }

    /// Feed every line from `reader` until EOF, returning how many matched
    pub async fn run<R>(&self, reader: R) -> PinkeepResult<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut matched = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| PinkeepError::io("reading request feed", e))?
        {
            if self.feed(&line) > 0 {
                matched += 1;
            }
        }

        Ok(matched)
    }
}

impl InterceptionHost for LineFeedHost {
    fn on_before_send_headers(&self, filter: UrlPattern, handler: RequestHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((filter, handler));
    }
}
