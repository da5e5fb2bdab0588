//! The capability contract every key-management provider satisfies.
//!
//! A [`Provider`] is a registered, uninitialized adapter. Initializing it with a
//! [`ProviderContext`] yields a [`Session`]: the authenticated client that creates wallets and
//! signs. Wallets are plain data and are only ever handed back to the session that created them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::ChainClient;
use crate::config::{BenchmarkConfig, Environment, Transfer};
use crate::error::ProviderError;

pub mod local;
pub mod remote;

#[cfg(test)]
pub(crate) mod mock;

/// Shared inputs for provider initialization.
#[derive(Clone, Debug)]
pub struct ProviderContext {
    pub env: Environment,
    pub chain: Arc<ChainClient>,
    pub seed: u64,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Establish an authenticated session. Missing credentials are a
    /// [`ProviderError::Configuration`].
    async fn initialize(&self, ctx: &ProviderContext) -> Result<Box<dyn Session>, ProviderError>;
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Provision one new address-bearing key.
    async fn create_wallet(&self) -> Result<Wallet, ProviderError>;

    async fn sign_message(&self, wallet: &Wallet, message: &str)
        -> Result<Signature, ProviderError>;

    /// Fetch a fresh reference point and encode the transfer. Not part of the timed region.
    async fn prepare_transfer(
        &self,
        wallet: &Wallet,
        transfer: &Transfer,
    ) -> Result<UnsignedTransaction, ProviderError>;

    async fn sign_transaction(
        &self,
        wallet: &Wallet,
        tx: &UnsignedTransaction,
    ) -> Result<SignedTransaction, ProviderError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub address: String,
    /// Name of the provider whose session owns this wallet.
    pub provider: String,
}

/// Opaque signature bytes as returned by the provider (hex, base64, ... as the provider likes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction(pub String);

/// Minimal single-instruction transfer, serialized with bincode into the signed payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub reference: String,
    pub message: Vec<u8>,
}

impl UnsignedTransaction {
    pub fn build(
        wallet: &Wallet,
        transfer: &Transfer,
        reference: String,
    ) -> Result<Self, ProviderError> {
        let msg = TransferMessage {
            from: wallet.address.clone(),
            to: transfer.destination.clone(),
            amount: transfer.amount,
            reference: reference.clone(),
        };
        Ok(Self {
            reference,
            message: bincode::serialize(&msg)?,
        })
    }

    pub fn decode(&self) -> Result<TransferMessage, ProviderError> {
        Ok(bincode::deserialize(&self.message)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    MessageSigning,
    TransactionSigning,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::MessageSigning => "message_signing",
            OperationKind::TransactionSigning => "transaction_signing",
        }
    }
}

/// An operation with its fixed payload. The payload is constant for the whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    SignMessage(String),
    SignTransaction(Transfer),
}

impl Operation {
    pub fn from_config(kind: OperationKind, cfg: &BenchmarkConfig) -> Self {
        match kind {
            OperationKind::MessageSigning => Operation::SignMessage(cfg.message.clone()),
            OperationKind::TransactionSigning => Operation::SignTransaction(cfg.transfer.clone()),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::SignMessage(_) => OperationKind::MessageSigning,
            Operation::SignTransaction(_) => OperationKind::TransactionSigning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> Wallet {
        Wallet {
            id: "w-1".to_string(),
            address: "0xabc".to_string(),
            provider: "Test".to_string(),
        }
    }

    #[test]
    fn transfer_payload_carries_reference() {
        let transfer = Transfer::default();
        let tx = UnsignedTransaction::build(&wallet(), &transfer, "hash-1".to_string()).unwrap();
        let decoded = tx.decode().unwrap();
        assert_eq!(decoded.from, "0xabc");
        assert_eq!(decoded.to, transfer.destination);
        assert_eq!(decoded.amount, transfer.amount);
        assert_eq!(decoded.reference, "hash-1");

        let other = UnsignedTransaction::build(&wallet(), &transfer, "hash-2".to_string()).unwrap();
        assert_ne!(tx.message, other.message);
    }

    #[test]
    fn operations_follow_config() {
        use crate::config::Profile;
        use crate::BenchmarkType;

        let cfg = BenchmarkConfig::new(BenchmarkType::Comprehensive, Profile::Quick);
        let ops: Vec<Operation> = cfg
            .benchmark
            .operations()
            .iter()
            .map(|k| Operation::from_config(*k, &cfg))
            .collect();
        assert_eq!(ops[0], Operation::SignMessage(cfg.message.clone()));
        assert_eq!(ops[1].kind(), OperationKind::TransactionSigning);
    }
}
