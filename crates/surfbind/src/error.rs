/// Failures surfaced by the render-target layer.
///
/// Construction and stack errors abort the caller's frame; backend errors carry
/// the native failure with context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The surface is not a canvas, texture or live render-target handle.
    #[error("render surface is not known to this render target system")]
    UnknownSurface,

    #[error("a render target needs at least one color texture")]
    NoColorTextures,

    /// `pop` without a matching `push`.
    #[error("render target stack is empty")]
    EmptyStack,

    #[error("no render target is bound")]
    NothingBound,

    #[error("backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
