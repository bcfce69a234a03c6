//! Streaming client for the livegen code-generation API.
//!
//! The endpoint accepts a JSON [`GenerationRequest`] and answers with newline-delimited
//! `data: <json>` frames terminated by `data: [DONE]`. [`StreamingResponse`] turns the
//! response body into [`StreamChunk`]s while keeping the accumulated text.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use livegen_client::{Client, GenerationRequest, Mode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("http://localhost:3000/api/generate")?;
//!     let request = GenerationRequest::new("a slow ambient pad", Mode::New, None, vec![], "session-1");
//!
//!     let mut stream = client.generate(&request).await?;
//!     while let Some(chunk) = stream.next().await {
//!         println!("{:?}", chunk?);
//!     }
//!     println!("{}", stream.into_text());
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod streaming;
mod types;

pub use client::Client;
pub use error::GenerationClientError;
pub use streaming::{parse_payload, FrameDecoder, FrameParse, StreamChunk, StreamingResponse};
pub use types::*;
