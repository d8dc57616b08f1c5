//! Fetch policies for query loads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a load may take its data from.
///
/// The default is `StoreAndNetwork`, the client re-fetch policy. Initial
/// server and client loads always use `StoreOrNetwork`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Use the store when it satisfies the query, otherwise go to the network.
    StoreOrNetwork,
    /// Render from the store when possible and refresh from the network.
    #[default]
    StoreAndNetwork,
    /// Always go to the network.
    NetworkOnly,
    /// Never go to the network.
    StoreOnly,
}

impl FetchPolicy {
    /// Whether a store hit can be rendered.
    pub fn reads_store(&self) -> bool {
        !matches!(self, Self::NetworkOnly)
    }

    /// Whether the network is hit even when the store has the data.
    pub fn refreshes_on_hit(&self) -> bool {
        matches!(self, Self::StoreAndNetwork | Self::NetworkOnly)
    }

    /// Whether the network is hit when the store misses.
    pub fn fetches_on_miss(&self) -> bool {
        !matches!(self, Self::StoreOnly)
    }

    /// Name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StoreOrNetwork => "store-or-network",
            Self::StoreAndNetwork => "store-and-network",
            Self::NetworkOnly => "network-only",
            Self::StoreOnly => "store-only",
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
