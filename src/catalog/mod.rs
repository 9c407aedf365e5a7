//! Static dataset of default-value changes shipped with each release.
//!
//! The catalog is embedded into the binary and parsed at most once per
//! process; afterwards it is only ever read.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::version::{Version, VersionError};

const EMBEDDED_CATALOG: &str = include_str!("upgrade_changes.json");

static CATALOG: OnceCell<Catalog> = OnceCell::new();

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse upgrade metadata: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid version {version:?} for catalog entry {name}: {source}")]
    InvalidVersion {
        name: String,
        version: String,
        #[source]
        source: VersionError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    SystemVariable,
    ConfigItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    Global,
    Session,
    Instance,
}

impl VariableScope {
    pub fn label(self) -> &'static str {
        match self {
            VariableScope::Global => "Global",
            VariableScope::Session => "Session",
            VariableScope::Instance => "Instance",
        }
    }
}

/// One default-value change introduced by a release.
#[derive(Debug, Clone)]
pub struct DefaultChange {
    /// Release that introduced the change
    pub version: Version,
    pub component: String,
    pub kind: ChangeKind,
    pub name: String,
    pub scope: VariableScope,
    pub from_default: String,
    pub to_default: String,
    /// Applied unconditionally by the upgrade, not only to fresh clusters
    pub forced: bool,
    pub summary: String,
    pub details: String,
}

impl DefaultChange {
    /// Global system variable the upgrade rewrites regardless of the running value.
    pub fn is_forced_global(&self) -> bool {
        self.forced && self.kind == ChangeKind::SystemVariable && self.scope == VariableScope::Global
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    changes: Vec<RawChange>,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    version: String,
    component: String,
    kind: ChangeKind,
    name: String,
    scope: VariableScope,
    #[serde(default)]
    from_default: String,
    #[serde(default)]
    to_default: String,
    #[serde(default)]
    forced: bool,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    changes: Vec<DefaultChange>,
}

impl Catalog {
    /// Return the catalog embedded in the binary, parsing it on first use.
    pub fn embedded() -> Result<&'static Catalog, CatalogError> {
        CATALOG.get_or_try_init(|| {
            let catalog = Catalog::from_json(EMBEDDED_CATALOG)?;
            debug!(changes = catalog.changes().len(), "loaded embedded upgrade catalog");
            Ok(catalog)
        })
    }

    pub fn from_json(data: &str) -> Result<Catalog, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(data)?;
        let changes = raw
            .changes
            .into_iter()
            .map(|c| -> Result<DefaultChange, CatalogError> {
                let version = Version::parse(&c.version).map_err(|source| {
                    CatalogError::InvalidVersion {
                        name: c.name.clone(),
                        version: c.version.clone(),
                        source,
                    }
                })?;
                Ok(DefaultChange {
                    version,
                    component: c.component.trim().to_string(),
                    kind: c.kind,
                    name: c.name.trim().to_string(),
                    scope: c.scope,
                    from_default: c.from_default,
                    to_default: c.to_default,
                    forced: c.forced,
                    summary: c.summary,
                    details: c.details,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Catalog { changes })
    }

    pub fn changes(&self) -> &[DefaultChange] {
        &self.changes
    }

    /// Changes introduced after `source` up to and including `target`, in catalog order.
    pub fn changes_between<'a>(
        &'a self,
        source: &'a Version,
        target: &'a Version,
    ) -> impl Iterator<Item = &'a DefaultChange> + 'a {
        self.changes
            .iter()
            .filter(move |c| &c.version > source && &c.version <= target)
    }

    /// Global system variables whose default the upgrade rewrites unconditionally.
    pub fn forced_global_sysvars<'a>(
        &'a self,
        source: &'a Version,
        target: &'a Version,
    ) -> impl Iterator<Item = &'a DefaultChange> + 'a {
        self.changes_between(source, target)
            .filter(|c| c.is_forced_global())
    }
}
