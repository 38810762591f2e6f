//! Error types

use thiserror::Error;

use crate::backend::Backend;
use crate::shaders::ProgramKind;

/// Fatal engine failures.
///
/// Everything here aborts [`Engine::new`](crate::Engine::new) (or
/// canvas creation); GL objects created before the failure are deleted
/// before the error propagates. Draw calls have no recoverable errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create GL object: {0}")]
    CreateObject(String),

    #[error("failed to compile the {kind} {stage} shader: {log}")]
    ShaderCompile {
        kind: ProgramKind,
        stage: &'static str,
        log: String,
    },

    #[error("failed to link the {kind} program: {log}")]
    ProgramLink { kind: ProgramKind, log: String },

    #[error("uniform {name} missing from the {kind} program")]
    MissingUniform {
        kind: ProgramKind,
        name: &'static str,
    },

    #[error("attribute {name} missing from the {kind} program")]
    MissingAttribute {
        kind: ProgramKind,
        name: &'static str,
    },

    #[error("debug output requires the OpenGL 4.3 backend (requested on {0:?})")]
    DebugUnsupported(Backend),

    #[error("canvas framebuffer incomplete (status {0:#06x})")]
    FramebufferIncomplete(u32),
}

/// Canvas termination contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    /// `finish` was called on a canvas that has already been finished
    /// or closed.
    #[error("canvas already closed")]
    AlreadyClosed,

    /// The canvas being terminated is not the innermost open canvas;
    /// canvases must be finished or closed in last-opened-first order.
    #[error("canvas is not the innermost open canvas")]
    OutOfOrder,
}
