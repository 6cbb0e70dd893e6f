pub type PrintResult<T> = Result<T, PrintError>;

/// Fatal, job-level failures. Anything that reaches the caller is one of
/// these; per-tile trouble stays inside [`TileFetchError`] and never aborts
/// a print.
#[derive(thiserror::Error, Debug)]
pub enum PrintError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("layer configuration error: {0}")]
    LayerConfiguration(String),

    #[error("compositing error: {0}")]
    Compositing(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("print job cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PrintError {
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn layer_configuration(msg: impl Into<String>) -> Self {
        Self::LayerConfiguration(msg.into())
    }

    pub fn compositing(msg: impl Into<String>) -> Self {
        Self::Compositing(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

/// Per-tile failure. Exhausted retries leave a transparent placeholder in
/// the canvas and bump the layer's failure count; the job carries on.
#[derive(thiserror::Error, Debug)]
pub enum TileFetchError {
    #[error("http status {0}")]
    Status(u16),

    #[error("transport: {0}")]
    Transport(String),

    #[error("attempt timed out")]
    Timeout,

    #[error("tile decode failed: {0}")]
    Decode(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PrintError::invalid_geometry("x")
                .to_string()
                .contains("invalid geometry:")
        );
        assert!(
            PrintError::layer_configuration("x")
                .to_string()
                .contains("layer configuration error:")
        );
        assert!(
            PrintError::compositing("x")
                .to_string()
                .contains("compositing error:")
        );
        assert!(PrintError::encode("x").to_string().contains("encode error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PrintError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn tile_fetch_io_converts() {
        let err: TileFetchError = std::io::Error::other("gone").into();
        assert!(err.to_string().contains("gone"));
    }
}
