//! Coordinator-internal services: admission control, durable session bookkeeping,
//! party fanout, and the consumer statistics cache.

pub mod consumer_cache;
pub mod coordinator;
pub mod party_client;
pub mod session_store;
pub mod user_queue;
pub mod voucher_store;
