pub mod rest;

pub use rest::SmartApiClient;
