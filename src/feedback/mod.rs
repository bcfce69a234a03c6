//! Transient user-facing state: the error banner and the status line.

mod banner;
mod expiring;
mod status;

pub use banner::{BannerError, ErrorBanner};
pub use expiring::Expiring;
pub use status::StatusLine;
