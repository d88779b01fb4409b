pub mod address;
pub mod interface;
pub mod mac;
pub mod range;

pub use address::NetworkInfo;
