//! Domain model: pricing tables, the payment state machine, member accounts,
//! and the ports the application layer talks to.

pub mod notification;
pub mod payment;
pub mod ports;
pub mod pricing;
pub mod user;
