//! Viewer sessions
//!
//! A session is one viewer looking at one document. It owns the loaded
//! document, the page currently shown, the template lookup and cached OCR
//! results, and cancels its in-flight work when it navigates or closes.

mod error;
mod registry;
mod viewer;

pub use error::{SessionError, SessionResult};
pub use registry::{SessionLimits, SessionRegistry, SessionServices};
pub use viewer::{
    CaptureAreaRequest, OpenSessionRequest, PageView, SessionSummary, ViewerSession,
};
