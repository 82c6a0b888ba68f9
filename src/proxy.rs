//! Routing of target URLs through a proxying/rendering service

use url::Url;

use crate::error::{HarvestError, HarvestResult};

/// Turns a target URL into the URL a browser session actually navigates to
pub trait UrlRewriter: Send + Sync {
    fn rewrite(&self, target: &str) -> HarvestResult<String>;
}

/// Navigates to targets as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectRewriter;

impl UrlRewriter for DirectRewriter {
    fn rewrite(&self, target: &str) -> HarvestResult<String> {
        Ok(target.to_string())
    }
}

/// Fetches targets through a scraping proxy endpoint
///
/// `https://proxy.example/?api_key=KEY&url=<target>&country_code=us&wait=5000`
#[derive(Debug, Clone)]
pub struct ProxyRewriter {
    endpoint: Url,
    api_key: String,
    country: Option<String>,
    render_wait_ms: Option<u64>,
}

impl ProxyRewriter {
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> HarvestResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| HarvestError::Config(format!("invalid proxy endpoint '{endpoint}': {e}")))?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(HarvestError::Config("proxy API key is empty".to_string()));
        }
        Ok(Self {
            endpoint,
            api_key,
            country: None,
            render_wait_ms: None,
        })
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// How long the service lets the page render before returning it
    #[must_use]
    pub fn with_render_wait_ms(mut self, wait_ms: u64) -> Self {
        self.render_wait_ms = Some(wait_ms);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl UrlRewriter for ProxyRewriter {
    fn rewrite(&self, target: &str) -> HarvestResult<String> {
        let mut routed = self.endpoint.clone();
        {
            let mut query = routed.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            query.append_pair("url", target);
            if let Some(country) = &self.country {
                query.append_pair("country_code", country);
            }
            if let Some(wait) = self.render_wait_ms {
                query.append_pair("wait", &wait.to_string());
            }
        }
        Ok(routed.into())
    }
}

impl<T: UrlRewriter + ?Sized> UrlRewriter for Box<T> {
    fn rewrite(&self, target: &str) -> HarvestResult<String> {
        (**self).rewrite(target)
    }
}
