use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

use gasless_core::domain::MetaTxRequest;
use gasless_core::{PortError, RelayerPort};

use crate::rpc::build_http_client;
use crate::AdapterConfig;

pub const NATIVE_META_TX_PATH: &str = "/api/v2/meta-tx/native";

/// Relayer flags meaning the request was accepted.
const ACCEPTED_FLAGS: [u16; 2] = [200, 143];

#[derive(Debug, Clone)]
pub struct BiconomyRelayerAdapter {
    mode: RelayerMode,
    state: Arc<Mutex<RelayerState>>,
}

#[derive(Debug, Clone)]
enum RelayerMode {
    Http(reqwest::blocking::Client),
    InMemory,
    Disabled(String),
}

#[derive(Debug, Clone, Default)]
struct RelayerState {
    submitted: Vec<MetaTxRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeMetaTxBody<'a> {
    to: String,
    api_id: &'a str,
    params: &'a [serde_json::Value],
    from: String,
    signature_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeMetaTxResponse {
    #[serde(default)]
    tx_hash: Option<B256>,
    #[serde(default)]
    log: Option<String>,
    #[serde(default)]
    flag: Option<u16>,
}

impl Default for BiconomyRelayerAdapter {
    fn default() -> Self {
        Self::with_config(&AdapterConfig::default())
    }
}

impl BiconomyRelayerAdapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        if config.offline {
            return Self::in_memory();
        }
        let mode = match build_http_client(config.http_timeout_ms) {
            Ok(client) => RelayerMode::Http(client),
            Err(e) => RelayerMode::Disabled(e.to_string()),
        };
        Self::from_mode(mode)
    }

    pub fn in_memory() -> Self {
        Self::from_mode(RelayerMode::InMemory)
    }

    fn from_mode(mode: RelayerMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(RelayerState::default())),
        }
    }

    /// Requests accepted so far, oldest first.
    pub fn submitted(&self) -> Result<Vec<MetaTxRequest>, PortError> {
        let g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("relayer lock poisoned: {e}")))?;
        Ok(g.submitted.clone())
    }

    fn record(&self, request: &MetaTxRequest) -> Result<usize, PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("relayer lock poisoned: {e}")))?;
        g.submitted.push(request.clone());
        Ok(g.submitted.len())
    }

    fn post(
        &self,
        client: &reqwest::blocking::Client,
        request: &MetaTxRequest,
    ) -> Result<B256, PortError> {
        if request.api_key.is_empty() {
            return Err(PortError::Policy(
                "relayer api key not configured (GASLESS_RELAYER_API_KEY)".to_owned(),
            ));
        }
        let url = format!(
            "{}{NATIVE_META_TX_PATH}",
            request.base_url.trim_end_matches('/')
        );
        let body = NativeMetaTxBody {
            to: request.to.to_string(),
            api_id: &request.api_id,
            params: &request.params,
            from: request.from.to_string(),
            signature_type: request.signature_type.relayer_signature_type(),
        };

        let response = client
            .post(&url)
            .header("x-api-key", &request.api_key)
            .json(&body)
            .send()
            .map_err(|e| PortError::Transport(format!("relayer request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| PortError::Transport(format!("relayer body read failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!("relayer status {status}: {text}")));
        }
        let parsed: NativeMetaTxResponse = serde_json::from_str(&text)
            .map_err(|e| PortError::Transport(format!("relayer json decode failed: {e}")))?;

        let accepted = parsed.flag.is_some_and(|f| ACCEPTED_FLAGS.contains(&f));
        match (accepted, parsed.tx_hash) {
            (true, Some(hash)) => Ok(hash),
            (true, None) => Err(PortError::Transport(
                "relayer accepted request without txHash".to_owned(),
            )),
            (false, _) => Err(PortError::Rejected(parsed.log.unwrap_or_else(|| {
                format!("relayer flag {:?}", parsed.flag)
            }))),
        }
    }
}

impl RelayerPort for BiconomyRelayerAdapter {
    fn send_meta_transaction(&self, request: &MetaTxRequest) -> Result<B256, PortError> {
        let tx_hash = match &self.mode {
            RelayerMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
            RelayerMode::Http(client) => {
                let hash = self.post(client, request)?;
                self.record(request)?;
                hash
            }
            RelayerMode::InMemory => {
                let seq = self.record(request)?;
                let mut seed = request.data.to_vec();
                seed.extend_from_slice(&(seq as u64).to_be_bytes());
                keccak256(seed)
            }
        };
        tracing::info!(
            to = %request.to,
            from = %request.from,
            signature_type = request.signature_type.relayer_signature_type(),
            %tx_hash,
            "meta transaction relayed"
        );
        Ok(tx_hash)
    }
}
