use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebPushError {
    #[error("InvalidSubscription: {0}")]
    InvalidSubscription(String),
    #[error("InvalidEndpoint: {0}")]
    InvalidEndpoint(String),
    #[error("InvalidVapidKey: {0}")]
    InvalidVapidKey(String),
    #[error("PayloadTooLarge: {size} bytes exceeds the {limit} byte record limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("CryptoError: {0}")]
    Crypto(&'static str),
    #[error("EndpointGone: push service returned {0}")]
    EndpointGone(u16),
    #[error("EndpointError: push service returned {status}")]
    EndpointError { status: u16, body: String },
    #[error("TransportError: {0}")]
    Transport(#[from] reqwest::Error),
}

impl WebPushError {
    /// Terminal errors mean the subscription itself is dead and should be
    /// deactivated rather than retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WebPushError::EndpointGone(_))
    }
}
