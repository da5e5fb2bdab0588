use serde::{Deserialize, Serialize};

use crate::providers::OperationKind;

pub mod chain;
pub mod config;
pub mod error;
pub mod geo;
pub mod harness;
pub mod providers;
pub mod registry;
pub mod report;
pub mod schema;
pub mod stats;
pub mod suite;

/// Which benchmark variant a run performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkType {
    /// Sign a fixed text message.
    MessageSigning,
    /// Sign a minimal transfer transaction.
    TransactionSigning,
    /// Both operations, message signing first.
    Comprehensive,
}

impl BenchmarkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkType::MessageSigning => "message_signing",
            BenchmarkType::TransactionSigning => "transaction_signing",
            BenchmarkType::Comprehensive => "comprehensive",
        }
    }

    /// Operations in execution order.
    pub fn operations(&self) -> &'static [OperationKind] {
        match self {
            BenchmarkType::MessageSigning => &[OperationKind::MessageSigning],
            BenchmarkType::TransactionSigning => &[OperationKind::TransactionSigning],
            BenchmarkType::Comprehensive => &[
                OperationKind::MessageSigning,
                OperationKind::TransactionSigning,
            ],
        }
    }
}
