//! Application layer containing the payment lifecycle orchestration.
//!
//! This module defines the `PaymentEngine`, the primary entry point for
//! creating, progressing, overriding and listing payments, and the member
//! provisioning that runs when a payment completes.

pub mod admin;
pub mod engine;
pub mod provisioning;
