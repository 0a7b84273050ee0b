pub mod model;
pub mod ports;
pub mod samples;
pub mod session;
