//! Backend profile selection
//!
//! The engine supports four GL dialects: two desktop core profiles and
//! two embedded profiles. The profile decides shader syntax, texture
//! format choices, and which optional driver features are available.
//! The host must create a context of the matching profile before
//! constructing the engine.

/// A supported graphics-API dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Desktop OpenGL 3.2 core.
    Gl32,
    /// Desktop OpenGL 4.3 core; the only profile with driver debug
    /// callbacks.
    Gl43,
    /// OpenGL ES 2.0.
    Es20,
    /// OpenGL ES 3.1.
    Es31,
}

impl Backend {
    pub fn is_embedded(self) -> bool {
        matches!(self, Backend::Es20 | Backend::Es31)
    }

    /// ES 2.0 has no vertex array objects; the quad attribute pointer
    /// is rebound per draw there.
    pub fn supports_vertex_arrays(self) -> bool {
        !matches!(self, Backend::Es20)
    }

    pub fn supports_debug_output(self) -> bool {
        matches!(self, Backend::Gl43)
    }

    /// `(internal_format, format)` for single-channel textures. ES 2.0
    /// predates `R8`/`RED` and uses luminance instead.
    pub(crate) fn single_channel_format(self) -> (u32, u32) {
        match self {
            Backend::Es20 => (glow::LUMINANCE, glow::LUMINANCE),
            _ => (glow::R8, glow::RED),
        }
    }

    /// `(internal_format, format)` for RGB textures. ES 2.0 requires
    /// the internal format to match the client format; the other
    /// profiles use sized internal formats.
    pub(crate) fn rgb_format(self) -> (u32, u32) {
        match self {
            Backend::Es20 => (glow::RGB, glow::RGB),
            _ => (glow::RGB8, glow::RGB),
        }
    }

    /// `(internal_format, format)` for RGBA textures.
    pub(crate) fn rgba_format(self) -> (u32, u32) {
        match self {
            Backend::Es20 => (glow::RGBA, glow::RGBA),
            _ => (glow::RGBA8, glow::RGBA),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_gl43_only() {
        assert!(Backend::Gl43.supports_debug_output());
        assert!(!Backend::Gl32.supports_debug_output());
        assert!(!Backend::Es20.supports_debug_output());
        assert!(!Backend::Es31.supports_debug_output());
    }

    #[test]
    fn test_es20_uses_unsized_formats() {
        assert_eq!(Backend::Es20.single_channel_format(), (glow::LUMINANCE, glow::LUMINANCE));
        assert_eq!(Backend::Es20.rgba_format(), (glow::RGBA, glow::RGBA));
        assert_eq!(Backend::Gl32.single_channel_format(), (glow::R8, glow::RED));
        assert_eq!(Backend::Es31.rgba_format(), (glow::RGBA8, glow::RGBA));
    }

    #[test]
    fn test_vertex_arrays_everywhere_but_es20() {
        assert!(Backend::Gl32.supports_vertex_arrays());
        assert!(Backend::Gl43.supports_vertex_arrays());
        assert!(Backend::Es31.supports_vertex_arrays());
        assert!(!Backend::Es20.supports_vertex_arrays());
    }

    #[test]
    fn test_embedded_split() {
        assert!(Backend::Es20.is_embedded());
        assert!(Backend::Es31.is_embedded());
        assert!(!Backend::Gl32.is_embedded());
        assert!(!Backend::Gl43.is_embedded());
    }
}
