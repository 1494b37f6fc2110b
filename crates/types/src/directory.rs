//! Space and data-connection directory types.
//!
//! The platform directory is consumed only while the user configures the
//! panel: spaces populate the first dropdown, connections in the chosen space
//! populate the second. Listings always carry a [`ListingSource`] so fallback
//! data can never masquerade as a live connection.

use serde::{Deserialize, Serialize};

/// Governance category of a platform space.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceKind {
    Personal,
    Shared,
    Managed,
}

/// A platform space a user may hold connections in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Platform identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Governance category.
    pub kind: SpaceKind,
}

/// Where the entries of a listing actually came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    /// Fetched from the directory and matched by the AI-connection predicate.
    Live,
    /// Fetched from the directory but nothing matched the predicate; entries
    /// are unfiltered space connections.
    Unfiltered,
    /// Builtin placeholder data substituted after a fetch failure or an empty
    /// directory; not selectable as a real connection.
    Placeholder,
}

/// Spaces grouped by governance category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceCatalog {
    pub personal: Vec<Space>,
    pub shared: Vec<Space>,
    pub managed: Vec<Space>,
    /// Provenance of the catalog entries.
    pub source: ListingSource,
}

impl SpaceCatalog {
    /// Empty catalog with the given provenance.
    pub fn empty(source: ListingSource) -> Self {
        Self {
            personal: Vec::new(),
            shared: Vec::new(),
            managed: Vec::new(),
            source,
        }
    }

    /// All spaces in dropdown order: personal, shared, managed.
    pub fn iter(&self) -> impl Iterator<Item = &Space> {
        self.personal.iter().chain(self.shared.iter()).chain(self.managed.iter())
    }

    /// Look up a space by platform identifier across all categories.
    pub fn find(&self, space_id: &str) -> Option<&Space> {
        self.iter().find(|space| space.id == space_id)
    }
}

/// A data connection as listed by the platform directory.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Directory identifier, when the platform exposes one.
    pub id: Option<String>,
    /// Connection name used to build the invocation expression.
    pub name: String,
    /// Datasource driver identifier, when exposed.
    pub datasource_id: Option<String>,
    /// Identifier of the owning space, when exposed.
    pub space_id: Option<String>,
}

impl Connection {
    /// Fully-qualified identifier stored in the panel options
    /// (`SpaceName:ConnectionName`).
    pub fn qualified_name(&self, space_name: &str) -> String {
        format!("{space_name}:{}", self.name)
    }
}

/// A connection listing plus the provenance of its entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionListing {
    pub connections: Vec<Connection>,
    pub source: ListingSource,
}

impl ConnectionListing {
    /// Listing backed by real directory data.
    pub fn live(connections: Vec<Connection>) -> Self {
        Self {
            connections,
            source: ListingSource::Live,
        }
    }

    /// True when the entries should not be offered as real connections
    /// without a warning.
    pub fn is_placeholder(&self) -> bool {
        self.source == ListingSource::Placeholder
    }
}
