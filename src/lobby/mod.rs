//! Player registration and arena assignment

pub mod service;

pub use service::LobbyService;
