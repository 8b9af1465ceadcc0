//! Network profiles and the profile resolver.
//!
//! A profile bundles the service endpoints of one network. The resolver picks
//! exactly one profile from, in priority order: an explicit override, the tag
//! embedded in an address, the stored default, and finally the built-in
//! fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::WalletAddress;
use crate::error::TypesError;
use crate::network::NetworkId;

/// Network used when nothing else selects one.
pub const FALLBACK_NETWORK: NetworkId = NetworkId::Undeployed;

/// Service endpoints for one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: NetworkId,
    /// GraphQL websocket endpoint of the indexer (subscriptions).
    pub indexer_ws: String,
    /// GraphQL HTTP endpoint of the indexer.
    pub indexer_http: String,
    /// Node RPC endpoint.
    pub node: String,
    /// Proof server endpoint.
    pub prover: String,
}

impl NetworkProfile {
    /// The fixed profile for `network`.
    pub fn for_network(network: NetworkId) -> Self {
        let (indexer_http, indexer_ws, node) = match network {
            NetworkId::Undeployed => (
                "http://127.0.0.1:8088/api/v3/graphql".to_string(),
                "ws://127.0.0.1:8088/api/v3/graphql/ws".to_string(),
                "http://127.0.0.1:9944".to_string(),
            ),
            NetworkId::Mainnet => (
                "https://indexer.midnight.network/api/v3/graphql".to_string(),
                "wss://indexer.midnight.network/api/v3/graphql/ws".to_string(),
                "https://rpc.midnight.network".to_string(),
            ),
            other => {
                let tag = other.as_str();
                (
                    format!("https://indexer.{tag}.midnight.network/api/v3/graphql"),
                    format!("wss://indexer.{tag}.midnight.network/api/v3/graphql/ws"),
                    format!("https://rpc.{tag}.midnight.network"),
                )
            }
        };

        Self {
            network,
            indexer_ws,
            indexer_http,
            node,
            // Proofs are generated by a locally running proof server on every network.
            prover: "http://127.0.0.1:6300".to_string(),
        }
    }

    /// Every fixed profile, in display order.
    pub fn all() -> Vec<Self> {
        NetworkId::ALL.into_iter().map(Self::for_network).collect()
    }

    /// Replace endpoints with any overrides that are set.
    pub fn with_overrides(mut self, overrides: &EndpointOverrides) -> Self {
        if let Some(ws) = &overrides.indexer_ws {
            self.indexer_ws = ws.clone();
        }
        if let Some(node) = &overrides.node {
            self.node = node.clone();
        }
        if let Some(prover) = &overrides.prover {
            self.prover = prover.clone();
        }
        self
    }
}

/// Optional per-endpoint replacements applied after resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    pub indexer_ws: Option<String>,
    pub node: Option<String>,
    pub prover: Option<String>,
}

/// Which input decided the resolved network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileSource {
    Explicit,
    Address,
    StoredDefault,
    Fallback,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit override",
            Self::Address => "address tag",
            Self::StoredDefault => "stored default",
            Self::Fallback => "built-in fallback",
        })
    }
}

/// Result of resolving a profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub profile: NetworkProfile,
    pub source: ProfileSource,
}

/// Inputs to profile resolution.
#[derive(Clone, Debug, Default)]
pub struct Resolver<'a> {
    explicit: Option<&'a str>,
    address: Option<&'a str>,
    stored_default: Option<&'a str>,
    overrides: EndpointOverrides,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Network name given explicitly by the caller.
    pub fn explicit(mut self, name: Option<&'a str>) -> Self {
        self.explicit = name;
        self
    }

    /// Address whose embedded network tag may select the profile.
    pub fn address(mut self, address: Option<&'a str>) -> Self {
        self.address = address;
        self
    }

    /// Default network remembered in the wallet configuration.
    pub fn stored_default(mut self, name: Option<&'a str>) -> Self {
        self.stored_default = name;
        self
    }

    pub fn overrides(mut self, overrides: EndpointOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Pick one profile deterministically.
    ///
    /// A malformed explicit or stored network name is an error. An address
    /// that does not decode is skipped here; callers validate it separately.
    pub fn resolve(&self) -> Result<ResolvedProfile, TypesError> {
        let (network, source) = if let Some(name) = self.explicit {
            (name.parse::<NetworkId>()?, ProfileSource::Explicit)
        } else if let Some(network) = self
            .address
            .and_then(|a| WalletAddress::decode(a).ok())
            .map(|a| a.network())
        {
            (network, ProfileSource::Address)
        } else if let Some(name) = self.stored_default {
            (name.parse::<NetworkId>()?, ProfileSource::StoredDefault)
        } else {
            (FALLBACK_NETWORK, ProfileSource::Fallback)
        };

        Ok(ResolvedProfile {
            profile: NetworkProfile::for_network(network).with_overrides(&self.overrides),
            source,
        })
    }
}
