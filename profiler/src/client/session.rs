use async_trait::async_trait;
use common::config::OrgConfig;
use common::{Error, Result};
use dashmap::DashMap;
use tracing::debug;

const NO_SESSION: &str = "Unable to read Salesforce session. Verify you are logged in.";

/// Host and bearer token of an authenticated org session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub domain: String,
    pub token: String,
}

impl Session {
    /// Normalizes a cookie-style domain (`.my.salesforce.com`) and rejects
    /// blank credentials.
    pub fn new(domain: &str, token: &str) -> Result<Self> {
        let domain = domain.trim();
        let domain = domain.strip_prefix('.').unwrap_or(domain);
        if domain.is_empty() {
            return Err(Error::Precondition(
                "Salesforce domain not returned by session provider.".to_string(),
            ));
        }
        if token.trim().is_empty() {
            return Err(Error::Precondition(NO_SESSION.to_string()));
        }
        Ok(Self {
            domain: domain.to_string(),
            token: token.trim().to_string(),
        })
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session for the given request context (a page or tab url). Failures
    /// are preconditions; callers never retry.
    async fn session(&self, context: &str) -> Result<Session>;
}

/// Serves the session configured in settings, whatever the context.
pub struct StaticSessionProvider {
    domain: String,
    token: String,
}

impl StaticSessionProvider {
    pub fn new(config: &OrgConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            token: config.token.clone(),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn session(&self, _context: &str) -> Result<Session> {
        Session::new(&self.domain, &self.token)
    }
}

/// Memoizes sessions per request context.
pub struct CachingSessionProvider<P> {
    inner: P,
    cache: DashMap<String, Session>,
}

impl<P: SessionProvider> CachingSessionProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl<P: SessionProvider> SessionProvider for CachingSessionProvider<P> {
    async fn session(&self, context: &str) -> Result<Session> {
        if let Some(session) = self.cache.get(context) {
            return Ok(session.clone());
        }

        let session = self.inner.session(context).await?;
        debug!(context, domain = %session.domain, "Caching session");
        self.cache.insert(context.to_string(), session.clone());
        Ok(session)
    }
}
