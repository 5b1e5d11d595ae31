//! Remote signer that delegates signing to a signer-proxy service.
//!
//! Supply transactions go through `eth_signTransaction`; permits go through
//! `eth_signTypedData_v4`. The proxy holds the key (typically in an HSM or
//! secure enclave) and may ask the account holder to confirm.

use crate::{PermitPayload, UserRejected};
use alloy_primitives::{Address, Bytes, Signature};
use alloy_rpc_types::eth::TransactionRequest;
use eyre::{bail, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// JSON-RPC error code a wallet returns when the user declines (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// A remote signer that delegates signing to a signer-proxy service.
///
/// # Example
///
/// ```ignore
/// let signer = RemoteSigner::new("http://localhost:9060", address, 1);
/// let signed_tx = signer.sign_transaction(tx_request).await?;
/// provider.send_raw_transaction(&signed_tx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    client: reqwest::Client,
    proxy_url: String,
    address: Address,
    chain_id: u64,
}

impl RemoteSigner {
    /// Creates a new remote signer.
    ///
    /// # Arguments
    /// * `proxy_url` - The URL of the signer-proxy service (e.g., "http://localhost:9060")
    /// * `address` - The Ethereum address of the signer
    /// * `chain_id` - The chain ID for EIP-155 replay protection
    pub fn new(proxy_url: impl Into<String>, address: Address, chain_id: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            proxy_url: proxy_url.into(),
            address,
            chain_id,
        }
    }

    /// Returns the signer's address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the chain ID.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Signs a transaction via the remote signer-proxy.
    ///
    /// Returns the signed transaction as raw bytes, ready to be broadcast
    /// via `provider.send_raw_transaction()`.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let result: SignedTransactionResponse =
            self.call("eth_signTransaction", [tx]).await?;
        let bytes: Bytes = result.raw.parse()?;
        Ok(bytes)
    }

    /// Signs a permit payload via `eth_signTypedData_v4`.
    pub async fn sign_permit(&self, payload: &PermitPayload) -> Result<Signature> {
        if payload.owner != self.address {
            bail!(
                "permit owner {} does not match signer {}",
                payload.owner,
                self.address
            );
        }

        let params = (self.address, payload.to_typed_data());
        let raw: String = self.call("eth_signTypedData_v4", params).await?;
        let bytes: Bytes = raw.parse()?;
        let signature = Signature::from_raw(&bytes)?;
        Ok(signature)
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.proxy_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            bail!("signer-proxy returned {status}: {body}");
        }

        let rpc_response: JsonRpcResponse<R> = response.json().await?;

        match rpc_response.result {
            Some(result) => Ok(result),
            None => {
                let error = rpc_response.error.unwrap_or(JsonRpcError {
                    code: -1,
                    message: "unknown error".to_string(),
                });
                if error.code == USER_REJECTED_CODE {
                    return Err(UserRejected(error.message).into());
                }
                bail!("JSON-RPC error {}: {}", error.code, error.message);
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Response from eth_signTransaction containing the signed transaction.
#[derive(Debug, Deserialize)]
struct SignedTransactionResponse {
    /// The signed transaction as hex-encoded RLP.
    raw: String,
}
