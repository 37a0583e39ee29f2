//! Real-time push channel plumbing, independent of the WebSocket framing

pub mod frame_gate;
pub mod session;

pub use frame_gate::FrameGate;
pub use session::PushSession;
