//! Wallet Service - Coin ledger and content access for a creator platform.
//!
//! Three cooperating services over one PostgreSQL store:
//!
//! - [`services::WalletService`]: coin balances and the append-only
//!   transaction ledger. The atomic conditional decrement inside the store
//!   is the only spend authority.
//! - [`services::IdentifierResolver`]: classifies an opaque identifier as
//!   a content id or a share-link token and computes the caller's access.
//! - [`services::UnlockService`]: the paid-unlock orchestrator tying the
//!   two together.
//!
//! The HTTP/gRPC surface, authentication and the content platform itself
//! live elsewhere; embedders construct the services with `Arc`-shared
//! stores and mount them behind their own transport.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
