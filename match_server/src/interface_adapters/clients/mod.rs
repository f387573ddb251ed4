// Outbound clients for remote strategy processes.

pub mod strategy;
pub mod strategy_protocol;

pub use strategy::{RpcStrategy, WsConnector};
