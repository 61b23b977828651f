//! Crypto payment rails assembled from wallet addresses in the
//! environment. The USD rail is always first; crypto rails follow in
//! network order. URIs carry the receiving address only; converting
//! the USD price into coin amounts would need a live exchange rate.

use tracing::info;

use hk_core::config::CredentialProvider;
use hk_core::types::PaymentRail;

use crate::traits::PaymentProcessor;

// ---------------------------------------------------------------------------
// Network table
// ---------------------------------------------------------------------------

/// One supported network. Wallet env vars are checked in order; the
/// first one set supplies the receiving address for that network.
struct NetworkRow {
    symbol: &'static str,
    network: &'static str,
    /// URI scheme for wallet deep links. `None` means the rail is
    /// address-only (BNB has no common scheme).
    uri_scheme: Option<&'static str>,
    wallet_envs: &'static [&'static str],
}

const NETWORKS: [NetworkRow; 4] = [
    NetworkRow {
        symbol: "ETH",
        network: "ethereum",
        uri_scheme: Some("ethereum"),
        wallet_envs: &["METAMASK_ETH_ADDRESS", "TRUSTWALLET_ETH_ADDRESS"],
    },
    NetworkRow {
        symbol: "SOL",
        network: "solana",
        uri_scheme: Some("solana"),
        wallet_envs: &["PHANTOM_SOL_ADDRESS", "TRUSTWALLET_SOL_ADDRESS"],
    },
    NetworkRow {
        symbol: "BTC",
        network: "bitcoin",
        uri_scheme: Some("bitcoin"),
        wallet_envs: &["METAMASK_BTC_ADDRESS"],
    },
    NetworkRow {
        symbol: "BNB",
        network: "bsc",
        uri_scheme: None,
        wallet_envs: &["TRUSTWALLET_BSC_ADDRESS"],
    },
];

// ---------------------------------------------------------------------------
// WalletPaymentProcessor
// ---------------------------------------------------------------------------

struct WalletRail {
    symbol: &'static str,
    network: &'static str,
    address: String,
    uri: Option<String>,
}

/// Payment processor backed by whatever wallets the environment holds.
pub struct WalletPaymentProcessor {
    wallets: Vec<WalletRail>,
}

impl WalletPaymentProcessor {
    /// Resolve wallets from the environment. `None` when no wallet var
    /// is set at all, which degrades the payments capability.
    pub fn from_env() -> Option<Self> {
        Self::with_lookup(CredentialProvider::from_env)
    }

    fn with_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let wallets: Vec<WalletRail> = NETWORKS
            .iter()
            .filter_map(|row| {
                row.wallet_envs
                    .iter()
                    .find_map(|var| lookup(var))
                    .map(|address| WalletRail {
                        symbol: row.symbol,
                        network: row.network,
                        uri: row.uri_scheme.map(|scheme| format!("{scheme}:{address}")),
                        address,
                    })
            })
            .collect();
        if wallets.is_empty() {
            return None;
        }
        info!(networks = wallets.len(), "wallet payment rails configured");
        Some(Self { wallets })
    }

    pub fn network_count(&self) -> usize {
        self.wallets.len()
    }
}

impl PaymentProcessor for WalletPaymentProcessor {
    fn rails(&self, list_price_usd: f64) -> Vec<PaymentRail> {
        let mut rails = vec![PaymentRail::fiat_usd()];
        rails.extend(self.wallets.iter().map(|w| PaymentRail {
            symbol: w.symbol.to_string(),
            network: w.network.to_string(),
            address: w.address.clone(),
            uri: w.uri.clone(),
        }));
        info!(
            price_usd = list_price_usd,
            rails = rails.len(),
            "payment rails assembled"
        );
        rails
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
