//! Submarine swap registration daemon. Issues P2WSH redemption addresses
//! bound to a Lightning payment hash and records each swap exactly once.

pub mod logging;
pub mod server;
pub mod swap;

pub mod proto {
    pub mod v1 {
        tonic::include_proto!("submarine_swap.v1");
    }
}
