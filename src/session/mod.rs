//! Recording-session layer: everything around the reconciliation core that
//! the caller contract in the crate docs requires.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      SessionController                         │
//! │                                                                │
//! │  ┌───────────────┐    ┌─────────────────────┐    ┌──────────┐  │
//! │  │ SlidingWindow │───▶│ TranscriptionSource │───▶│Agreement │  │
//! │  │ (offset/trim) │    │ (worker thread)     │    │ Policy   │  │
//! │  └───────────────┘    └─────────────────────┘    └──────────┘  │
//! │          ▲                                            │        │
//! │          │ push_samples                 SessionEvent  ▼        │
//! └────────────────────────────────────────────────────────────────┘
//! ```

mod controller;
mod source;
mod window;

pub use controller::{EventCallback, SessionController, SessionEvent};
pub use source::TranscriptionSource;
pub use window::SlidingWindow;
