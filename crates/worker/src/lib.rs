pub mod service_time;
pub mod worker;

pub use service_time::ServiceTime;
pub use worker::Worker;
