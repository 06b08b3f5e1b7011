pub mod client;

pub use client::{HttpReply, RateLimitedHttpClient};
