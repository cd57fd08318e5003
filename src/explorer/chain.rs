use serde::{Serialize, Serializer};
use url::Url;

/// (subdomain, chain id, display name)
const KNOWN_CHAINS: &[(&str, &str, &str)] = &[
    ("eth", "1", "Ethereum"),
    ("sepolia", "11155111", "Sepolia"),
    ("base", "8453", "Base"),
    ("optimism", "10", "Optimism"),
    ("arbitrum", "42161", "Arbitrum One"),
    ("gnosis", "100", "Gnosis"),
    ("polygon", "137", "Polygon"),
];

const PRIMARY: (&str, &str, &str) = KNOWN_CHAINS[0];

/// Which explorer deployment a request is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainEndpoint {
    pub chain_id: String,
    pub name: String,
    api_base: String,
}

impl ChainEndpoint {
    fn known((subdomain, chain_id, name): (&str, &str, &str)) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            name: name.to_string(),
            api_base: format!("https://{subdomain}.blockscout.com/api/v2"),
        }
    }

    pub fn mainnet() -> Self {
        Self::known(PRIMARY)
    }

    /// Chain selected in settings; unknown ids fall back to mainnet
    pub fn from_chain_id(chain_id: &str) -> Self {
        KNOWN_CHAINS
            .iter()
            .find(|(_, id, _)| *id == chain_id.trim())
            .map(|entry| Self::known(*entry))
            .unwrap_or_else(Self::mainnet)
    }

    /// Chain inferred from the explorer page the user is browsing,
    /// e.g. `https://optimism.blockscout.com/address/0x..`
    pub fn from_page_url(page_url: &str) -> Self {
        let host = Url::parse(page_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

        let Some(host) = host else {
            return Self::mainnet();
        };

        host.split('.')
            .next()
            .and_then(|label| KNOWN_CHAINS.iter().find(|(sub, _, _)| *sub == label))
            .map(|entry| Self::known(*entry))
            .unwrap_or_else(Self::mainnet)
    }

    /// Explicit base URL, used for self-hosted explorers and tests
    pub fn custom(chain_id: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            chain_id: chain_id.into(),
            name: "Custom".to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl Serialize for ChainEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.api_base)
    }
}
