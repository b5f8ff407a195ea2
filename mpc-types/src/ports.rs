//! Port-window types handed out by the `PortAllocator`.

use serde::{Deserialize, Serialize};

/// A pair of port bases for one MPC session: `N` consecutive ports starting at
/// `server_base` for the parties, and `N` consecutive ports starting at `client_base`
/// for the client handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPair {
    /// First port of the server-side window.
    pub server_base: u16,
    /// First port of the client-side window.
    pub client_base: u16,
}
