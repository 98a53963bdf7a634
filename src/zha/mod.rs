pub mod client;
pub mod connection;
pub mod ids;
pub mod types;

pub use client::{fetch_devices, fetch_raw_devices, DeviceManager};
pub use connection::{Connection, ConnectionState};
pub use ids::{IdAllocator, RequestId};
pub use types::{DeviceInfo, Neighbor, Nwk, Route};
