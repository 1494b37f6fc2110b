//! Platform directory client.
//!
//! This module provides a lightweight client for the dashboard platform's
//! directory APIs, used while the user configures the panel:
//!
//! - Listing spaces, categorized as personal, shared, or managed
//! - Listing data connections, optionally scoped to a space, with a pluggable
//!   predicate that narrows the listing to AI-capable connections
//!
//! Authentication rides on the host browser session (cookies), so the client
//! carries no token management of its own. Directory failures never surface
//! to the configuration UI as errors: listings degrade to builtin placeholder
//! data instead, and every listing is labeled with its provenance
//! ([`ListingSource`]) so placeholder entries cannot be mistaken for live
//! connections.
//!
//! The primary entry point is [`DirectoryClient`]. Create an instance via
//! [`DirectoryClient::new`], then call [`DirectoryClient::list_spaces`] and
//! [`DirectoryClient::list_connections`].

use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, header};
use url::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use promptlens_types::directory::{Connection, ConnectionListing, ListingSource, Space, SpaceCatalog, SpaceKind};

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Directory API prefix shared by both endpoints.
const API_BASE: &str = "/api/v1";

/// Unfiltered fallback listings are capped to keep the dropdown sane.
const UNFILTERED_LISTING_CAP: usize = 10;

/// Predicate deciding whether a directory connection can serve AI requests.
///
/// The platform has no structured marker for AI-capable connections, so the
/// default implementation matches keywords against the connection name and
/// datasource identifier. Deployments with naming conventions of their own
/// supply a different implementation.
pub trait ConnectionFilter: Send + Sync + Debug {
    /// True when the connection should be offered for AI invocation.
    fn is_ai_connection(&self, connection: &Connection) -> bool;
}

/// Keyword-based [`ConnectionFilter`] covering the common provider names.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Filter matching the given keywords case-insensitively.
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
        }
    }
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(["claude", "anthropic", "openai", "gpt", "llm", "ai", "bedrock", "external"])
    }
}

impl ConnectionFilter for KeywordFilter {
    fn is_ai_connection(&self, connection: &Connection) -> bool {
        let haystack = format!(
            "{} {}",
            connection.name.to_lowercase(),
            connection.datasource_id.as_deref().unwrap_or("").to_lowercase()
        );
        self.keywords.iter().any(|keyword| haystack.contains(keyword))
    }
}

/// Thin wrapper around a configured `reqwest::Client` for directory access.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: String,
    http: Client,
    user_agent: String,
    filter: Arc<dyn ConnectionFilter>,
}

impl DirectoryClient {
    /// Construct a client for the given tenant origin with the default
    /// AI-connection predicate.
    ///
    /// Non-localhost origins must use HTTPS; localhost is allowed with any
    /// scheme for development.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_filter(base_url, Arc::new(KeywordFilter::default()))
    }

    /// Construct a client with a caller-supplied connection predicate.
    pub fn with_filter(base_url: &str, filter: Arc<dyn ConnectionFilter>) -> Result<Self> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        default_headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("promptlens/0.1; {}", env::consts::OS),
            filter,
        })
    }

    /// List the spaces visible to the current session, grouped by category.
    ///
    /// Directory failures degrade to the builtin placeholder catalog.
    pub async fn list_spaces(&self) -> SpaceCatalog {
        match self.fetch_spaces().await {
            Ok(spaces) => categorize_spaces(spaces),
            Err(error) => {
                warn!(%error, "space listing failed; substituting placeholder catalog");
                placeholder_spaces()
            }
        }
    }

    /// List data connections, scoped to `space_id` when given and narrowed by
    /// the AI predicate.
    ///
    /// The platform exposes no space-scoped endpoint, so scoping happens
    /// client-side. The fallback cascade is explicit in the result: predicate
    /// matches yield `Live`; no matches yield the space's connections
    /// unfiltered (capped); an empty or unreachable directory yields labeled
    /// placeholder data.
    pub async fn list_connections(&self, space_id: Option<&str>) -> ConnectionListing {
        let all = match self.fetch_connections().await {
            Ok(connections) => connections,
            Err(error) => {
                warn!(%error, "connection listing failed; substituting placeholder data");
                return placeholder_connections();
            }
        };

        let scoped: Vec<Connection> = match space_id {
            Some(space_id) => all.into_iter().filter(|dto| dto.belongs_to_space(space_id)).map(Connection::from).collect(),
            None => all.into_iter().map(Connection::from).collect(),
        };
        debug!(scoped = scoped.len(), space_id = space_id.unwrap_or("<all>"), "scoped directory connections");

        let matched: Vec<Connection> = scoped.iter().filter(|c| self.filter.is_ai_connection(c)).cloned().collect();
        if !matched.is_empty() {
            return ConnectionListing::live(matched);
        }

        if !scoped.is_empty() {
            warn!("no connections matched the AI predicate; returning unfiltered space connections");
            return ConnectionListing {
                connections: scoped.into_iter().take(UNFILTERED_LISTING_CAP).collect(),
                source: ListingSource::Unfiltered,
            };
        }

        warn!("directory returned no connections for the requested scope; substituting placeholder data");
        placeholder_connections()
    }

    async fn fetch_spaces(&self) -> Result<Vec<SpaceDto>> {
        let envelope: CollectionEnvelope<SpaceDto> = self.get_json("/spaces").await?;
        Ok(envelope.data)
    }

    async fn fetch_connections(&self) -> Result<Vec<ConnectionDto>> {
        let envelope: CollectionEnvelope<ConnectionDto> = self.get_json("/data-connections").await?;
        Ok(envelope.data)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{API_BASE}{path}", self.base_url);
        debug!(%url, "fetching directory listing");
        let response = self
            .http
            .get(&url)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .with_context(|| format!("request {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("directory request {url} returned {status}"));
        }
        response.json::<T>().await.with_context(|| format!("decode {url}"))
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|e| anyhow!("Invalid directory base URL '{}': {}", base, e))?;

    let host_name = parsed.host_str().ok_or_else(|| anyhow!("directory base URL must include a host"))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(anyhow!(
            "directory base URL must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        ));
    }

    Ok(())
}

/// Group spaces by category; unrecognized types land in `shared`, matching
/// the platform UI's treatment of new space kinds.
fn categorize_spaces(spaces: Vec<SpaceDto>) -> SpaceCatalog {
    let mut catalog = SpaceCatalog::empty(ListingSource::Live);
    for dto in spaces {
        let kind = dto.kind.as_deref().map(str::to_lowercase);
        let space = Space {
            id: dto.id,
            name: dto.name,
            kind: match kind.as_deref() {
                Some("personal") => SpaceKind::Personal,
                Some("managed") => SpaceKind::Managed,
                _ => SpaceKind::Shared,
            },
        };
        match space.kind {
            SpaceKind::Personal => catalog.personal.push(space),
            SpaceKind::Shared => catalog.shared.push(space),
            SpaceKind::Managed => catalog.managed.push(space),
        }
    }
    catalog
}

/// Builtin space catalog used when the directory is unreachable.
pub fn placeholder_spaces() -> SpaceCatalog {
    SpaceCatalog {
        personal: Vec::new(),
        shared: vec![Space {
            id: "placeholder-shared".into(),
            name: "Team Analytics".into(),
            kind: SpaceKind::Shared,
        }],
        managed: vec![Space {
            id: "placeholder-managed".into(),
            name: "Enterprise Analytics".into(),
            kind: SpaceKind::Managed,
        }],
        source: ListingSource::Placeholder,
    }
}

/// Builtin connection listing used when the directory is unreachable or
/// empty. Entries are labeled placeholders, never selectable as live.
pub fn placeholder_connections() -> ConnectionListing {
    let names = ["Claude Team Connection", "Anthropic Enterprise"];
    ConnectionListing {
        connections: names
            .iter()
            .map(|name| Connection {
                name: (*name).to_string(),
                ..Connection::default()
            })
            .collect(),
        source: ListingSource::Placeholder,
    }
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SpaceDto {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Directory connection payloads vary between platform releases; the space
/// reference in particular has shipped as `spaceId`, as a bare `space`
/// string, as a `space` object, and as `qSpaceId`.
#[derive(Debug, Default, Deserialize)]
struct ConnectionDto {
    id: Option<String>,
    #[serde(rename = "qName")]
    q_name: Option<String>,
    name: Option<String>,
    #[serde(rename = "datasourceID")]
    datasource_id: Option<String>,
    #[serde(rename = "spaceId")]
    space_id: Option<String>,
    space: Option<Value>,
    #[serde(rename = "qSpaceId")]
    q_space_id: Option<String>,
}

impl ConnectionDto {
    fn belongs_to_space(&self, space_id: &str) -> bool {
        if self.space_id.as_deref() == Some(space_id) || self.q_space_id.as_deref() == Some(space_id) {
            return true;
        }
        match &self.space {
            Some(Value::String(id)) => id == space_id,
            Some(Value::Object(map)) => map.get("id").and_then(Value::as_str) == Some(space_id),
            _ => false,
        }
    }

    fn owning_space_id(&self) -> Option<String> {
        if let Some(id) = &self.space_id {
            return Some(id.clone());
        }
        if let Some(id) = &self.q_space_id {
            return Some(id.clone());
        }
        match &self.space {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Object(map)) => map.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }
}

impl From<ConnectionDto> for Connection {
    fn from(dto: ConnectionDto) -> Self {
        let space_id = dto.owning_space_id();
        Connection {
            // Engine-facing name prefers the engine alias over the REST name.
            name: dto.q_name.or(dto.name).unwrap_or_default(),
            id: dto.id,
            datasource_id: dto.datasource_id,
            space_id,
        }
    }
}
