//! facereg-client library
//!
//! Capture & display side of facereg: samples frames from a camera, submits
//! them to the API server, and turns recognition results into overlays.

pub mod api_client;
pub mod camera;
pub mod capture;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod push;
pub mod transcript;

pub use api_client::ApiClient;
pub use capture::{Camera, CaptureSession, CaptureState, FrameSink, FrameSource};
pub use error::{CaptureError, ClientError, Result};
pub use overlay::Overlay;
pub use push::PushClient;
pub use transcript::Transcript;
