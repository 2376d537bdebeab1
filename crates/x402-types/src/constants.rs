/// x402 protocol version implemented by this facilitator.
pub const X402_VERSION: u32 = 1;

/// x402 scheme name for exact-amount SPL token payments.
pub const SCHEME_NAME: &str = "exact";

/// Network identifier for Solana mainnet-beta.
pub const SOLANA_MAINNET: &str = "solana";

/// Network identifier for Solana devnet.
pub const SOLANA_DEVNET: &str = "solana-devnet";

/// Network identifier for Solana testnet.
pub const SOLANA_TESTNET: &str = "solana-testnet";

/// The fixed set of network identifiers this facilitator settles against.
pub const SUPPORTED_NETWORKS: [&str; 3] = [SOLANA_MAINNET, SOLANA_DEVNET, SOLANA_TESTNET];

/// Default public RPC endpoint for mainnet-beta.
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Default public RPC endpoint for devnet.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Default public RPC endpoint for testnet.
pub const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";

/// USDC mint on mainnet-beta.
pub const USDC_MINT_MAINNET: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// USDC mint on devnet.
pub const USDC_MINT_DEVNET: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// USDC has 6 decimal places.
pub const TOKEN_DECIMALS: u32 = 6;
