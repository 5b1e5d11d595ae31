//! EIP-2612 permit payloads.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use binding::token::Permit;
use serde_json::{json, Value};
use std::borrow::Cow;

/// Typed-data payload a wallet signs to grant an allowance off-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitPayload {
    /// Token name, part of the EIP-712 domain
    pub token_name: String,
    /// Domain version (almost always "1")
    pub version: String,
    pub chain_id: u64,
    /// Token contract (verifying contract of the domain)
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    /// Unix timestamp after which the signature is rejected
    pub deadline: u64,
}

impl PermitPayload {
    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Owned(self.token_name.clone())),
            Some(Cow::Owned(self.version.clone())),
            Some(U256::from(self.chain_id)),
            Some(self.token),
            None,
        )
    }

    pub fn message(&self) -> Permit {
        Permit {
            owner: self.owner,
            spender: self.spender,
            value: self.value,
            nonce: self.nonce,
            deadline: U256::from(self.deadline),
        }
    }

    /// Hash that is actually signed.
    pub fn signing_hash(&self) -> B256 {
        self.message().eip712_signing_hash(&self.domain())
    }

    /// JSON form accepted by `eth_signTypedData_v4`.
    pub fn to_typed_data(&self) -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Permit": [
                    { "name": "owner", "type": "address" },
                    { "name": "spender", "type": "address" },
                    { "name": "value", "type": "uint256" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "deadline", "type": "uint256" }
                ]
            },
            "primaryType": "Permit",
            "domain": {
                "name": self.token_name,
                "version": self.version,
                "chainId": self.chain_id,
                "verifyingContract": self.token.to_string(),
            },
            "message": {
                "owner": self.owner.to_string(),
                "spender": self.spender.to_string(),
                "value": self.value.to_string(),
                "nonce": self.nonce.to_string(),
                "deadline": self.deadline.to_string(),
            }
        })
    }
}
