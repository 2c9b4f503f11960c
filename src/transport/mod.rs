mod capability;
mod client;
mod provider;

pub use capability::SupportedUrls;
pub use client::{AgentClient, AgentEventStream, CallOptions, StreamResponse, PROVIDER_ID};
pub use provider::{Provider, ProviderSettings};
