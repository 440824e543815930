//! Derives request headers and URL-query additions from an [`AuthConfig`].
//!
//! Grounded on `turbomcp-http::transport::build_headers` (which folds an
//! auth token and a user header map into one `HeaderMap` before a send),
//! generalized here to the inspector's richer tagged-union auth shape.

use inspector_core::{AuthConfig, CombinedAuth};
use std::collections::HashMap;
use url::Url;

/// A request awaiting auth application: a URL plus an outgoing header map.
/// The transport layer constructs one of these per outbound call and hands
/// it to [`AuthApplier::apply`] exactly once, at exactly one site — the
/// round-trip testable property (spec §8) depends on that single
/// application point.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub url: Url,
    pub headers: HashMap<String, String>,
}

impl PendingRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HashMap::new(),
        }
    }
}

/// Derives final headers/URL-query from an [`AuthConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthApplier;

impl AuthApplier {
    pub fn new() -> Self {
        Self
    }

    /// Apply `auth` to `req` in place: `none` is the identity; `combined`
    /// sets the api-key header, then the basic-auth header (which wins if
    /// both are configured — see DESIGN.md), appends URL params, then sets
    /// ISO-8859-1-valid custom headers, logging and skipping any that
    /// aren't.
    pub fn apply(&self, auth: &AuthConfig, req: &mut PendingRequest) {
        let combined = match auth {
            AuthConfig::None => return,
            AuthConfig::Combined(c) => c,
        };
        self.apply_api_key(combined, req);
        self.apply_basic_auth(combined, req);
        self.apply_url_params(combined, req);
        self.apply_custom_headers(combined, req);
    }

    fn apply_api_key(&self, combined: &CombinedAuth, req: &mut PendingRequest) {
        let Some(api_key) = &combined.api_key else {
            return;
        };
        if api_key.api_key.is_empty() {
            return;
        }
        let value = format!("{}{}", api_key.prefix(), api_key.api_key);
        req.headers.insert(api_key.header_name().to_string(), value);
    }

    fn apply_basic_auth(&self, combined: &CombinedAuth, req: &mut PendingRequest) {
        let Some(basic) = &combined.basic_auth else {
            return;
        };
        if basic.username.is_empty() || basic.password.is_empty() {
            return;
        }
        let credentials = format!("{}:{}", basic.username, basic.password);
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            credentials.as_bytes(),
        );
        req.headers
            .insert("Authorization".to_string(), format!("Basic {encoded}"));
    }

    fn apply_url_params(&self, combined: &CombinedAuth, req: &mut PendingRequest) {
        if combined.url_params.is_empty() {
            return;
        }
        let mut pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        for param in &combined.url_params {
            if param.name.is_empty() || param.value.is_empty() {
                continue;
            }
            pairs.push((param.name.clone(), param.value.clone()));
        }
        req.url.query_pairs_mut().clear().extend_pairs(&pairs);
    }

    fn apply_custom_headers(&self, combined: &CombinedAuth, req: &mut PendingRequest) {
        for header in &combined.custom_headers {
            if !is_iso_8859_1(&header.name) || !is_iso_8859_1(&header.value) {
                tracing::warn!(
                    name = %header.name,
                    "skipping custom header with non-ISO-8859-1 content"
                );
                continue;
            }
            req.headers.insert(header.name.clone(), header.value.clone());
        }
    }
}

/// True if every code point fits in a single byte (U+0000..=U+00FF), the
/// constraint HTTP header field values are bound by.
fn is_iso_8859_1(s: &str) -> bool {
    s.chars().all(|c| (c as u32) <= 0xFF)
}
