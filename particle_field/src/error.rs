//! Application-level error type.

use thiserror::Error;

use cloud_shapes::CloudError;

/// Anything that stops the particle field from starting or running.
///
/// Tracking and generation failures are not here: they are reported in the
/// status bar and the session carries on.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("point cloud: {0}")]
    Cloud(#[from] CloudError),
}
