//! Generated gRPC types for Warden services.

pub mod trust {
    tonic::include_proto!("warden.trust");
}
