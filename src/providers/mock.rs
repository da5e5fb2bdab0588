//! Scriptable provider used by pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Transfer;
use crate::error::{ConfigurationError, ProviderError};

use super::{
    Provider, ProviderContext, Session, SignedTransaction, Signature, UnsignedTransaction, Wallet,
};

#[derive(Clone, Debug, Default)]
pub(crate) struct MockProvider {
    pub name: String,
    pub fail_initialize: bool,
    pub fail_wallet: bool,
    /// 1-based signing call (warm-up included) that fails.
    pub fail_sign_call: Option<usize>,
    pub sign_calls: Arc<AtomicUsize>,
    pub prepare_calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, _ctx: &ProviderContext) -> Result<Box<dyn Session>, ProviderError> {
        if self.fail_initialize {
            return Err(ConfigurationError::MissingVariable(format!(
                "{}_API_KEY",
                self.name.to_ascii_uppercase()
            ))
            .into());
        }
        Ok(Box::new(MockSession {
            inner: self.clone(),
        }))
    }
}

struct MockSession {
    inner: MockProvider,
}

impl MockSession {
    fn next_sign(&self) -> Result<usize, ProviderError> {
        let call = self.inner.sign_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.fail_sign_call == Some(call) {
            return Err(ProviderError::Rejected {
                status: 500,
                message: format!("scripted failure on call {call}"),
            });
        }
        Ok(call)
    }
}

#[async_trait]
impl Session for MockSession {
    async fn create_wallet(&self) -> Result<Wallet, ProviderError> {
        if self.inner.fail_wallet {
            return Err(ProviderError::Rejected {
                status: 403,
                message: "wallet quota exceeded".to_string(),
            });
        }
        Ok(Wallet {
            id: format!("{}-wallet", self.inner.name),
            address: format!("0x{}", self.inner.name.to_ascii_lowercase()),
            provider: self.inner.name.clone(),
        })
    }

    async fn sign_message(
        &self,
        _wallet: &Wallet,
        message: &str,
    ) -> Result<Signature, ProviderError> {
        let call = self.next_sign()?;
        Ok(Signature(format!("{message}#{call}")))
    }

    async fn prepare_transfer(
        &self,
        wallet: &Wallet,
        transfer: &Transfer,
    ) -> Result<UnsignedTransaction, ProviderError> {
        let n = self.inner.prepare_calls.fetch_add(1, Ordering::SeqCst);
        UnsignedTransaction::build(wallet, transfer, format!("ref-{n}"))
    }

    async fn sign_transaction(
        &self,
        _wallet: &Wallet,
        tx: &UnsignedTransaction,
    ) -> Result<SignedTransaction, ProviderError> {
        let call = self.next_sign()?;
        Ok(SignedTransaction(format!("{}#{call}", tx.reference)))
    }
}
