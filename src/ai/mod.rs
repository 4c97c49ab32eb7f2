//! Generative-AI integration
//!
//! [`AnalysisBackend`] is the seam to a model provider; [`AnalysisInvoker`]
//! wraps it with attachment loading and the error-marker convention the
//! pipeline relies on.

pub mod backend;
pub mod error;
pub mod genai_backend;
pub mod invoker;
pub mod mock;

pub use backend::AnalysisBackend;
pub use error::BackendError;
pub use genai_backend::GenAIBackend;
pub use invoker::{is_error_response, AnalysisInvoker, ERROR_MARKER};
pub use mock::{MockBackend, MockResponse, RecordedCall};
