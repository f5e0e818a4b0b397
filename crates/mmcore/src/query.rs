//! Search, filter and sort state for the mod and profile lists.

use serde::{Deserialize, Serialize};

/// Storage key of the remote-catalog query.
pub const MOD_QUERY_KEY: &str = "modQuery";
/// Storage key of the installed-mods query.
pub const PROFILE_QUERY_KEY: &str = "profileQuery";

const DEFAULT_MAX_COUNT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    Newest,
    LastUpdated,
    Downloads,
    Rating,
    InstallDate,
    /// The user's own ordering of the profile.
    Custom,
    DiskSpace,
    Name,
    Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One search/filter/sort configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    pub max_count: u32,
    pub search_term: String,
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
    pub include_nsfw: bool,
    pub include_deprecated: bool,
    pub include_disabled: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl QueryArgs {
    /// Default for browsing the remote catalog: freshest, safe content first.
    pub fn mod_default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            search_term: String::new(),
            include_categories: Vec::new(),
            exclude_categories: Vec::new(),
            include_nsfw: false,
            include_deprecated: false,
            include_disabled: false,
            sort_by: SortBy::LastUpdated,
            sort_order: SortOrder::Descending,
        }
    }

    /// Default for browsing the active profile: everything, in custom order.
    pub fn profile_default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            search_term: String::new(),
            include_categories: Vec::new(),
            exclude_categories: Vec::new(),
            include_nsfw: true,
            include_deprecated: true,
            include_disabled: true,
            sort_by: SortBy::Custom,
            sort_order: SortOrder::Descending,
        }
    }
}

/// Which of the two persisted queries an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Mod,
    Profile,
}

impl QueryKind {
    pub fn key(self) -> &'static str {
        match self {
            QueryKind::Mod => MOD_QUERY_KEY,
            QueryKind::Profile => PROFILE_QUERY_KEY,
        }
    }

    pub fn default_query(self) -> QueryArgs {
        match self {
            QueryKind::Mod => QueryArgs::mod_default(),
            QueryKind::Profile => QueryArgs::profile_default(),
        }
    }
}

impl std::str::FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mod" | "mods" => Ok(QueryKind::Mod),
            "profile" | "profiles" => Ok(QueryKind::Profile),
            other => Err(format!("unknown query kind '{other}' (expected mod or profile)")),
        }
    }
}
