use thiserror::Error;

type Source = Box<dyn std::error::Error>;

/// Fatal failures of the capture → detect → send → display loop.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to open capture source: {0}")]
    Open(#[source] Source),

    #[error("Capture failed {failures} times in a row: {last}")]
    CaptureFailed {
        failures: usize,
        #[source]
        last: Source,
    },

    #[error("Hand detection failed: {0}")]
    Detect(#[source] Source),

    #[error("Failed to send packet: {0}")]
    Send(#[source] Source),

    #[error("Display failed: {0}")]
    Display(#[source] Source),
}
