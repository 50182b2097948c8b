use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("class {class} is out of range for a network with {num_classes} outputs")]
    ClassOutOfRange { class: usize, num_classes: usize },
    /// Every histogram bin came out empty, so there is no densest bin to normalize against.
    #[error("empty histogram: {samples} samples, {out_of_range} above max input")]
    EmptyHistogram { samples: usize, out_of_range: usize },
    #[error("no destination for network response")]
    NoDestination,
}

pub type Result<T> = std::result::Result<T, Error>;
