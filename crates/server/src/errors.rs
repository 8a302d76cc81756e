use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    #[error("failed to build downstream client: {0}")]
    Client(String),
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
