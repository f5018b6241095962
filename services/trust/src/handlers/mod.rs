pub mod device;
pub mod session;
