use thiserror::Error;

/// Failures talking to the generative service. `Display` is what the user
/// sees in place of a reply.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("CRITICAL: API_KEY missing.")]
    MissingCredential,

    #[error("SYSTEM RESTING: Too many requests. Wait a bit.")]
    RateLimited,

    #[error("UPLINK ERROR: Connection lost.")]
    Upstream { status: u16, message: String },

    #[error("UPLINK ERROR: Connection lost.")]
    Transport(#[from] reqwest::Error),

    #[error("Protocol Timeout: Empty response.")]
    EmptyPayload,

    #[error("Audio payload could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => GatewayError::RateLimited,
            _ => GatewayError::Upstream { status, message },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Username already exists")]
    UsernameExists,

    #[error("User not found or incorrect credentials")]
    UserNotFound,
}
