use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{OperationError, Phase, ProviderError};
use crate::providers::{Operation, Session, Wallet};

/// Per-call wall-clock durations in milliseconds, in call order.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub samples_ms: Vec<f64>,
}

impl Measurement {
    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }
}

/// Time one call of `operation`.
///
/// Transaction construction (reference point fetch, encoding) happens before the clock starts;
/// only the signing call is inside the timed region.
async fn time_call(
    session: &dyn Session,
    wallet: &Wallet,
    operation: &Operation,
) -> Result<Duration, ProviderError> {
    match operation {
        Operation::SignMessage(message) => {
            let start = Instant::now();
            let sig = session.sign_message(wallet, message).await?;
            let elapsed = start.elapsed();
            black_box(sig);
            Ok(elapsed)
        }
        Operation::SignTransaction(transfer) => {
            let tx = session.prepare_transfer(wallet, transfer).await?;
            let start = Instant::now();
            let signed = session.sign_transaction(wallet, &tx).await?;
            let elapsed = start.elapsed();
            black_box(signed);
            Ok(elapsed)
        }
    }
}

/// Run `warmup_iters` untimed calls, then `iters` timed ones.
///
/// Any failure aborts the whole run; samples gathered so far are dropped.
pub async fn run(
    session: &dyn Session,
    wallet: &Wallet,
    operation: &Operation,
    iters: usize,
    warmup_iters: usize,
) -> Result<Measurement, OperationError> {
    let fail = |phase: Phase, iteration: usize, source: ProviderError| OperationError {
        provider: wallet.provider.clone(),
        operation: operation.kind().as_str(),
        phase,
        iteration,
        source,
    };

    for i in 0..warmup_iters {
        time_call(session, wallet, operation)
            .await
            .map_err(|e| fail(Phase::Warmup, i + 1, e))?;
    }

    let mut samples_ms = Vec::with_capacity(iters);
    for i in 0..iters {
        let elapsed = time_call(session, wallet, operation)
            .await
            .map_err(|e| fail(Phase::Measured, i + 1, e))?;
        let ms = elapsed.as_secs_f64() * 1000.0;
        debug!(
            provider = %wallet.provider,
            operation = operation.kind().as_str(),
            iteration = i + 1,
            ms,
            "measured call"
        );
        samples_ms.push(ms);
    }

    Ok(Measurement { samples_ms })
}
