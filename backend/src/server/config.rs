//! HTTP server configuration object.

use std::net::SocketAddr;

use irrigation_backend::inbound::http::state::HttpState;

/// Listen address plus the handler state shared by every actix worker.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: HttpState,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, http_state: HttpState) -> Self {
        Self {
            bind_addr,
            http_state,
        }
    }
}
