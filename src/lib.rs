pub mod audit;
pub mod error;
pub mod model;
pub mod paths;
pub mod persist;
pub mod registry;
pub mod service;
pub mod settings;
