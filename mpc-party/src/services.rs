//! Internal services a party node is built from.

pub mod party_engine;
