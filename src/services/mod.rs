// src/services/mod.rs
pub mod calculations;
pub mod cash;
pub mod dcf;
pub mod error;
pub mod peers;
pub mod provider;
pub mod returns;
pub mod valuation;
pub mod verdict;
pub mod yahoo;
