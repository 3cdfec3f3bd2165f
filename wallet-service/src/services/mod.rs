//! Services module for wallet-service.

pub mod database;
pub mod metrics;
pub mod resolver;
pub mod store;
pub mod unlock;
pub mod wallet;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use resolver::{Classification, IdentifierResolver};
pub use store::{ContentCatalog, LedgerStore};
pub use unlock::{UnlockOutcome, UnlockService};
pub use wallet::WalletService;
