pub mod stock;
pub mod monitor;
pub mod response;

pub use stock::*;
pub use monitor::*;
pub use response::*;
