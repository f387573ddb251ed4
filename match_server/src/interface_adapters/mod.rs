// Interface adapters: wire protocol, strategy RPC client and network handling.

pub mod clients;
pub mod field_host;
pub mod http;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
