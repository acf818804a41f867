//! Points ledger, redemptions, booking accounting and agent onboarding for a
//! travel-agent incentive program.

pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod workflows;
