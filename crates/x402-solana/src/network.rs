use std::collections::HashMap;
use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;

use x402_types::constants::{
    DEVNET_RPC_URL, MAINNET_RPC_URL, SOLANA_DEVNET, SOLANA_MAINNET, SOLANA_TESTNET,
    SUPPORTED_NETWORKS, TESTNET_RPC_URL,
};
use x402_types::X402Error;

/// RPC endpoint for each supported network. Defaults to the public
/// endpoints; production deployments override per network via environment.
#[derive(Debug, Clone)]
pub struct NetworkEndpoints {
    pub mainnet: String,
    pub devnet: String,
    pub testnet: String,
}

impl Default for NetworkEndpoints {
    fn default() -> Self {
        Self {
            mainnet: MAINNET_RPC_URL.to_string(),
            devnet: DEVNET_RPC_URL.to_string(),
            testnet: TESTNET_RPC_URL.to_string(),
        }
    }
}

/// Maps a network identifier to a live RPC connection handle.
///
/// The set of supported networks is fixed at construction; there is no
/// dynamic registration. The map is read-only afterwards, so the registry
/// is shared across concurrent requests without synchronization.
pub struct NetworkRegistry {
    connections: HashMap<&'static str, Arc<RpcClient>>,
}

impl NetworkRegistry {
    pub fn new(endpoints: NetworkEndpoints) -> Self {
        let mut connections = HashMap::new();
        connections.insert(SOLANA_MAINNET, Self::connect(endpoints.mainnet));
        connections.insert(SOLANA_DEVNET, Self::connect(endpoints.devnet));
        connections.insert(SOLANA_TESTNET, Self::connect(endpoints.testnet));
        Self { connections }
    }

    fn connect(url: String) -> Arc<RpcClient> {
        Arc::new(RpcClient::new_with_commitment(
            url,
            CommitmentConfig::confirmed(),
        ))
    }

    /// Resolve a network identifier to its connection. Unknown identifiers
    /// yield a typed error, never a fault; the verifier and the settlement
    /// engine surface it with identical wording.
    pub fn resolve(&self, network: &str) -> Result<&RpcClient, X402Error> {
        self.connections
            .get(network)
            .map(|client| client.as_ref())
            .ok_or_else(|| X402Error::UnsupportedNetwork(network.to_string()))
    }

    pub fn is_supported(&self, network: &str) -> bool {
        self.connections.contains_key(network)
    }

    /// Supported network identifiers, in the registry's declaration order.
    pub fn networks(&self) -> Vec<&'static str> {
        SUPPORTED_NETWORKS
            .iter()
            .copied()
            .filter(|network| self.connections.contains_key(network))
            .collect()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(NetworkEndpoints::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_networks() {
        let registry = NetworkRegistry::default();
        assert!(registry.resolve("solana").is_ok());
        assert!(registry.resolve("solana-devnet").is_ok());
        assert!(registry.resolve("solana-testnet").is_ok());
    }

    #[test]
    fn test_resolve_unknown_network_is_typed() {
        let registry = NetworkRegistry::default();
        let err = registry.resolve("base-sepolia").unwrap_err();
        assert!(matches!(err, X402Error::UnsupportedNetwork(_)));
        assert_eq!(err.to_string(), "Unsupported network: base-sepolia");
    }

    #[test]
    fn test_networks_are_listed_in_declaration_order() {
        let registry = NetworkRegistry::default();
        assert_eq!(
            registry.networks(),
            vec!["solana", "solana-devnet", "solana-testnet"]
        );
    }
}
