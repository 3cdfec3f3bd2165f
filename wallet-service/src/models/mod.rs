//! Domain models for wallet-service.

mod access;
mod account;
mod content;
mod transaction;

pub use access::{AccessDecision, AccessType, ContentView, IdentifierKind, Resolution};
pub use account::{BalanceInfo, CoinSufficiency, WalletAccount};
pub use content::{ContentItem, ShareToken};
pub use transaction::{
    CoinTransaction, CreateTransaction, HistoryQuery, TransactionKind, TransactionPage,
    TransactionReceipt, TransactionStatus,
};
