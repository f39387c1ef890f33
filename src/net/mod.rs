//! Transport: WebSocket connection and the reconnecting session around it

pub mod connector;
pub mod session;

pub use connector::{Connection, ConnectionEvent, Connector, Inbound, WsConnector};
pub use session::{CloseAction, Session};
