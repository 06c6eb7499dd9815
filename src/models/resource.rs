//! Resource URIs for browsing the table catalog.

use crate::error::{GatewayError, GatewayResult};
use std::fmt;

pub const RESOURCE_SCHEME: &str = "mysql";
pub const RESOURCE_MIME_TYPE: &str = "application/json";

/// A table resource, addressed as `mysql:///{database}/{table}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUri {
    pub database: String,
    pub table: String,
}

impl ResourceUri {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Parse a table resource URI.
    ///
    /// The URI must have an empty authority and exactly two non-empty path
    /// segments. Segments are taken verbatim, matching how URIs are produced.
    pub fn parse(uri: &str) -> GatewayResult<Self> {
        let invalid = || GatewayError::validation(format!("invalid resource URI: {}", uri));

        let path = uri
            .strip_prefix(RESOURCE_SCHEME)
            .and_then(|rest| rest.strip_prefix(":///"))
            .ok_or_else(invalid)?;

        let (database, table) = path.split_once('/').ok_or_else(invalid)?;
        if database.is_empty() || table.is_empty() || table.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(database, table))
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:///{}/{}", RESOURCE_SCHEME, self.database, self.table)
    }
}
