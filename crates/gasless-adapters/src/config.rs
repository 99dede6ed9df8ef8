use std::path::PathBuf;

use gasless_core::{ChainRegistry, FlowSettings, PortError};

/// Registry compiled into the binary; `GASLESS_CHAIN_REGISTRY` overrides it.
pub const DEFAULT_CHAIN_REGISTRY: &str = include_str!("../config/chains.json");

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub wallet_proxy_url: Option<String>,
    pub dev_private_key: Option<String>,
    pub rpc_url: Option<String>,
    pub chain_registry_path: Option<PathBuf>,
    pub relayer_api_key: Option<String>,
    pub bundler_api_key: String,
    pub paymaster_api_key: String,
    pub http_timeout_ms: u64,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval_ms: u64,
    pub permit_ttl_secs: Option<u64>,
    pub toast_lifetime_ms: u64,
    /// Use in-memory relayer, bundler and paymaster instead of HTTP.
    pub offline: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            wallet_proxy_url: None,
            dev_private_key: None,
            rpc_url: None,
            chain_registry_path: None,
            relayer_api_key: None,
            bundler_api_key: String::new(),
            paymaster_api_key: String::new(),
            http_timeout_ms: 15_000,
            receipt_poll_attempts: 60,
            receipt_poll_interval_ms: 2_000,
            permit_ttl_secs: None,
            toast_lifetime_ms: 5_000,
            offline: false,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            wallet_proxy_url: env_string("GASLESS_WALLET_PROXY_URL"),
            dev_private_key: env_string("GASLESS_DEV_PRIVATE_KEY"),
            rpc_url: env_string("GASLESS_RPC_URL"),
            chain_registry_path: env_string("GASLESS_CHAIN_REGISTRY").map(PathBuf::from),
            relayer_api_key: env_string("GASLESS_RELAYER_API_KEY"),
            bundler_api_key: env_string("GASLESS_BUNDLER_API_KEY").unwrap_or_default(),
            paymaster_api_key: env_string("GASLESS_PAYMASTER_API_KEY").unwrap_or_default(),
            http_timeout_ms: env_parse("GASLESS_HTTP_TIMEOUT_MS").unwrap_or(defaults.http_timeout_ms),
            receipt_poll_attempts: env_parse("GASLESS_RECEIPT_POLL_ATTEMPTS")
                .unwrap_or(defaults.receipt_poll_attempts),
            receipt_poll_interval_ms: env_parse("GASLESS_RECEIPT_POLL_INTERVAL_MS")
                .unwrap_or(defaults.receipt_poll_interval_ms),
            permit_ttl_secs: env_parse("GASLESS_PERMIT_TTL_SECS"),
            toast_lifetime_ms: env_parse("GASLESS_TOAST_LIFETIME_MS")
                .unwrap_or(defaults.toast_lifetime_ms),
            offline: env_parse::<bool>("GASLESS_OFFLINE").unwrap_or(defaults.offline),
        }
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            receipt_poll_attempts: self.receipt_poll_attempts,
            receipt_poll_interval_ms: self.receipt_poll_interval_ms,
            permit_ttl_secs: self.permit_ttl_secs,
        }
    }

    /// Loads the chain registry and fills API keys into relayer and
    /// bundler/paymaster endpoints.
    pub fn load_registry(&self) -> Result<ChainRegistry, PortError> {
        let mut registry = match &self.chain_registry_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    PortError::NotFound(format!("chain registry {}: {e}", path.display()))
                })?;
                ChainRegistry::from_json(&raw)?
            }
            None => ChainRegistry::from_json(DEFAULT_CHAIN_REGISTRY)?,
        };
        if let Some(key) = &self.relayer_api_key {
            registry.fill_relayer_api_key(key);
        }
        registry.expand_endpoint_templates(&self.bundler_api_key, &self.paymaster_api_key);
        tracing::debug!(chains = registry.len(), "chain registry loaded");
        Ok(registry)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(name, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}
