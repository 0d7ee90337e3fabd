use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// `stop` was called more times than `start`. Suppressed when the
    /// configuration allows stop-before-start.
    #[error("stop called more times than start")]
    StopWithoutStart,
}
