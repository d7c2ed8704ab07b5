pub mod config;
pub mod k8s;
pub mod split;
pub mod telemetry;
