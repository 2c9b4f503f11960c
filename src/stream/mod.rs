pub mod finish;
pub mod sse;
pub mod transformer;
pub mod translated;

pub use sse::{agent_chunk_stream, sse_frame_stream, SseParser};
pub use transformer::{StreamTransformer, TransformerState};
pub use translated::{CancelPolicy, TranslatedStream};

/// A parsed SSE frame from the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}
