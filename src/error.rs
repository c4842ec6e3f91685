use thiserror::Error;

/// Library error type for sign construction and rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// Ring layout whose element counts do not sum to the configured total.
    #[error("ring element counts sum to {got}, expected {expected}")]
    RingSum { got: usize, expected: usize },

    /// Brightness mask whose length does not match the frame pixel count.
    #[error("brightness mask has {got} entries for a {expected}-pixel frame")]
    MaskLength { got: usize, expected: usize },

    /// Settings that cannot describe a working sign.
    #[error("invalid settings: {0}")]
    Invalid(String),

    /// No usable font could be resolved for the requested family.
    #[error("no font matches family {0:?}")]
    FontNotFound(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Decode/encode error from the image codec boundary.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
