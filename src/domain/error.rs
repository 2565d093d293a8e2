use thiserror::Error;

/// replmux unified error type
#[derive(Error, Debug)]
pub enum ReplMuxError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cannot bind to {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Listen failed on {addr}: {message}")]
    Listen { addr: String, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Input queue is full")]
    QueueFull,

    #[error("Input queue is closed")]
    QueueClosed,

    #[error("Output error: {0}")]
    Output(String),
}

impl ReplMuxError {
    /// Bind and listen failures take the network service down with them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReplMuxError::Bind { .. } | ReplMuxError::Listen { .. })
    }
}

pub type ReplMuxResult<T> = Result<T, ReplMuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let bind = ReplMuxError::Bind {
            addr: "0.0.0.0:23".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(bind.is_fatal());
        assert!(bind.to_string().contains("0.0.0.0:23"));

        assert!(!ReplMuxError::QueueFull.is_fatal());
        assert!(!ReplMuxError::Transport { message: "reset".to_string() }.is_fatal());
    }
}
