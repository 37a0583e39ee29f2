//! HTTP and WebSocket handlers for facereg-api

pub mod health;
pub mod recognition;
pub mod registration;
pub mod socket;

pub use health::health_routes;
pub use recognition::recognize_faces;
pub use registration::{all_users, list_registrations, register_face};
pub use socket::ws_handler;
