//! Generation Backend Abstraction
//!
//! The backend is an opaque producer: it streams framed lesson events,
//! returns complete lessons, and synthesizes one image per prompt. This
//! module defines the trait boundary and the HTTP implementation.

pub mod http;
pub mod traits;

pub use http::{HttpBackend, UNEXPECTED_END};
pub use traits::{ContentBackend, ImageOutcome, Lesson};
