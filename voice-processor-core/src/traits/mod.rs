pub mod capture_backend;
pub mod capture_observer;
pub mod permission_provider;
