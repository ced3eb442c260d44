pub mod base64url;
mod client;
mod error;
mod keys;
mod message;
mod vapid;

pub use client::*;
pub use error::*;
pub use keys::*;
pub use message::*;
pub use vapid::*;
