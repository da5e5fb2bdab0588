//! In-process secp256k1 signer.
//!
//! Needs no credentials and does no network I/O on the signing path, so it serves as the
//! latency floor the remote providers are compared against.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::chain::ChainClient;
use crate::config::Transfer;
use crate::error::ProviderError;

use super::{
    Provider, ProviderContext, Session, SignedTransaction, Signature, UnsignedTransaction, Wallet,
};

pub const SERVICE_NAME: &str = "LocalKey";

#[derive(Debug, Default)]
pub struct LocalKeyProvider;

impl LocalKeyProvider {
    pub fn boxed() -> Result<Box<dyn Provider>, ProviderError> {
        Ok(Box::new(LocalKeyProvider))
    }
}

#[async_trait]
impl Provider for LocalKeyProvider {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn initialize(&self, ctx: &ProviderContext) -> Result<Box<dyn Session>, ProviderError> {
        Ok(Box::new(LocalSession {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(ctx.seed)),
            keys: Mutex::new(BTreeMap::new()),
            chain: Arc::clone(&ctx.chain),
        }))
    }
}

struct LocalSession {
    rng: Mutex<ChaCha8Rng>,
    keys: Mutex<BTreeMap<String, SigningKey>>,
    chain: Arc<ChainClient>,
}

impl LocalSession {
    fn generate_key(&self) -> Result<SigningKey, ProviderError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ProviderError::Signing("rng lock poisoned".to_string()))?;
        // Rejection-sample until the bytes form a valid non-zero scalar.
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Ok(key) = SigningKey::from_slice(&bytes) {
                return Ok(key);
            }
        }
    }

    fn sign(&self, wallet: &Wallet, payload: &[u8]) -> Result<String, ProviderError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| ProviderError::Signing("key store lock poisoned".to_string()))?;
        let key = keys
            .get(&wallet.id)
            .ok_or_else(|| ProviderError::UnknownWallet(wallet.id.clone()))?;
        let sig: EcdsaSignature = key.sign(payload);
        Ok(hex::encode(sig.to_bytes()))
    }
}

fn address_of(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(true);
    let digest = Sha256::digest(point.as_bytes());
    format!("0x{}", hex::encode(&digest[..20]))
}

#[async_trait]
impl Session for LocalSession {
    async fn create_wallet(&self) -> Result<Wallet, ProviderError> {
        let key = self.generate_key()?;
        let address = address_of(&key);
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| ProviderError::Signing("key store lock poisoned".to_string()))?;
        let id = format!("local-{}", keys.len() + 1);
        keys.insert(id.clone(), key);
        Ok(Wallet {
            id,
            address,
            provider: SERVICE_NAME.to_string(),
        })
    }

    async fn sign_message(
        &self,
        wallet: &Wallet,
        message: &str,
    ) -> Result<Signature, ProviderError> {
        self.sign(wallet, message.as_bytes()).map(Signature)
    }

    async fn prepare_transfer(
        &self,
        wallet: &Wallet,
        transfer: &Transfer,
    ) -> Result<UnsignedTransaction, ProviderError> {
        let reference = self.chain.latest_reference().await?;
        UnsignedTransaction::build(wallet, transfer, reference)
    }

    async fn sign_transaction(
        &self,
        wallet: &Wallet,
        tx: &UnsignedTransaction,
    ) -> Result<SignedTransaction, ProviderError> {
        let sig = self.sign(wallet, &tx.message)?;
        Ok(SignedTransaction(format!("{}{}", hex::encode(&tx.message), sig)))
    }
}
