pub mod alert_signal;
pub mod api;
pub mod config;
pub mod feed;
pub mod location;
pub mod model;
pub mod parser;
pub mod regions;
pub mod runtime;
pub mod session;
pub mod sink;
pub mod stats;
pub mod window;
