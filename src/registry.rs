//! Static provider registry: discovery, initialization and wallet provisioning.
//!
//! Providers are registered as factories at build time. Every stage drops failing providers with
//! a warning and carries on with the rest, unless the run is strict.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{BenchError, ConfigurationError, ProviderError};
use crate::providers::local::LocalKeyProvider;
use crate::providers::remote::RemoteSignerProvider;
use crate::providers::{Provider, ProviderContext, Session, Wallet};
use crate::schema::SkippedProvider;

pub type ProviderFactory = Box<dyn Fn() -> Result<Box<dyn Provider>, ProviderError> + Send + Sync>;

/// Remote gateway slots: service name and environment prefix.
pub const REMOTE_GATEWAYS: &[(&str, &str)] = &[
    ("Para", "PARA"),
    ("Privy", "PRIVY"),
    ("Turnkey", "TURNKEY"),
];

struct Entry {
    name: String,
    factory: ProviderFactory,
}

#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

/// A provider that made it through every setup stage.
pub struct ReadyProvider {
    pub session: Box<dyn Session>,
    pub wallet: Wallet,
}

/// Collects per-provider setup failures.
#[derive(Debug, Default)]
pub struct SetupLog {
    strict: bool,
    skipped: Vec<SkippedProvider>,
}

impl SetupLog {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            skipped: Vec::new(),
        }
    }

    /// Record a dropped provider. In strict mode the failure is returned instead.
    fn drop_provider(
        &mut self,
        service: &str,
        stage: &'static str,
        err: ProviderError,
    ) -> Result<(), BenchError> {
        if self.strict {
            return Err(BenchError::Setup {
                provider: service.to_string(),
                stage,
                source: err,
            });
        }
        warn!(service, stage, error = %err, "skipping provider");
        self.skipped.push(SkippedProvider {
            service: service.to_string(),
            stage: stage.to_string(),
            reason: err.to_string(),
        });
        Ok(())
    }

    pub fn skipped(&self) -> &[SkippedProvider] {
        &self.skipped
    }

    pub fn into_skipped(self) -> Vec<SkippedProvider> {
        self.skipped
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider this build knows about.
    pub fn builtin() -> Self {
        let mut registry = Self::new().register("LocalKey", LocalKeyProvider::boxed);
        for &(name, prefix) in REMOTE_GATEWAYS {
            registry = registry.register(name, move || {
                Ok(Box::new(RemoteSignerProvider::new(name, prefix)) as Box<dyn Provider>)
            });
        }
        registry
    }

    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Provider>, ProviderError> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: name.to_string(),
            factory: Box::new(factory),
        });
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Narrow the registry to a single provider (case-insensitive).
    pub fn only(self, name: &str) -> Result<Self, ConfigurationError> {
        let known = self.names().join(", ");
        let entries: Vec<Entry> = self
            .entries
            .into_iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .collect();
        if entries.is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "provider",
                reason: format!("unknown provider {name:?} (known: {known})"),
            });
        }
        Ok(Self { entries })
    }

    /// Instantiate every registered provider. Factories that fail are skipped.
    pub fn discover(
        &self,
        log: &mut SetupLog,
    ) -> Result<BTreeMap<String, Box<dyn Provider>>, BenchError> {
        let mut providers = BTreeMap::new();
        for entry in &self.entries {
            if providers.contains_key(&entry.name) {
                warn!(service = %entry.name, "duplicate registration ignored");
                continue;
            }
            match (entry.factory)() {
                Ok(provider) => {
                    providers.insert(entry.name.clone(), provider);
                }
                Err(err) => log.drop_provider(&entry.name, "discovery", err)?,
            }
        }
        info!(count = providers.len(), "discovered providers");
        Ok(providers)
    }

    /// Discovery, initialization and wallet provisioning in one go.
    ///
    /// Fails only when nothing usable is left (or on any failure in strict mode).
    pub async fn prepare(
        &self,
        ctx: &ProviderContext,
        log: &mut SetupLog,
    ) -> Result<BTreeMap<String, ReadyProvider>, BenchError> {
        let providers = self.discover(log)?;
        let sessions = initialize_all(&providers, ctx, log).await?;
        let ready = provision_wallets(sessions, log).await?;
        if ready.is_empty() {
            return Err(BenchError::NoUsableProviders);
        }
        Ok(ready)
    }
}

/// Initialize providers one after another.
pub async fn initialize_all(
    providers: &BTreeMap<String, Box<dyn Provider>>,
    ctx: &ProviderContext,
    log: &mut SetupLog,
) -> Result<BTreeMap<String, Box<dyn Session>>, BenchError> {
    let mut sessions = BTreeMap::new();
    for (name, provider) in providers {
        match provider.initialize(ctx).await {
            Ok(session) => {
                info!(service = %name, "initialized");
                sessions.insert(name.clone(), session);
            }
            Err(err) => log.drop_provider(name, "initialization", err)?,
        }
    }
    Ok(sessions)
}

/// Create one wallet per initialized provider.
pub async fn provision_wallets(
    sessions: BTreeMap<String, Box<dyn Session>>,
    log: &mut SetupLog,
) -> Result<BTreeMap<String, ReadyProvider>, BenchError> {
    let mut ready = BTreeMap::new();
    for (name, session) in sessions {
        match session.create_wallet().await {
            Ok(wallet) => {
                info!(service = %name, address = %wallet.address, "wallet ready");
                ready.insert(name, ReadyProvider { session, wallet });
            }
            Err(err) => log.drop_provider(&name, "wallet", err)?,
        }
    }
    Ok(ready)
}
