//! GLSL dialect generation
//!
//! One logical description of each draw program is rendered into the
//! GLSL dialect of the selected backend profile when the engine starts.
//! The profiles differ only in surface syntax: version pragma,
//! attribute/varying declaration keywords, the fragment output
//! mechanism, the texture sampling function name, and precision
//! qualifiers on the embedded profiles. After compile and link there is
//! no runtime cost to the variation.
//!
//! All programs share a single vertex attribute, `a_position`, fed by
//! the engine's unit-quad buffer holding the corners of `[0,1]²` as a
//! triangle fan. The vertex stage recenters it to ±0.5 so both the
//! device transform and the texture transform operate on the unit
//! square centered at the origin.

use std::fmt;

use crate::backend::Backend;

/// The three programs the engine links.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    /// Flat fill of the transformed unit square.
    Fill,
    /// Textured draw sampling a bound image.
    Image,
    /// Two-color blend keyed on a mask texture's red channel.
    Blend,
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProgramKind::Fill => "fill",
            ProgramKind::Image => "image",
            ProgramKind::Blend => "blend",
        })
    }
}

/// Vertex and fragment source text for one program in one dialect.
#[derive(Clone, Debug)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// The per-profile syntax axes.
struct Dialect {
    version: &'static str,
    attribute: &'static str,
    vertex_out: &'static str,
    fragment_in: &'static str,
    frag_decl: &'static str,
    frag_color: &'static str,
    sample: &'static str,
    vertex_precision: &'static str,
    fragment_precision: &'static str,
}

impl Dialect {
    fn of(backend: Backend) -> Dialect {
        match backend {
            Backend::Gl32 => Dialect {
                version: "#version 150",
                attribute: "in",
                vertex_out: "out",
                fragment_in: "in",
                frag_decl: "out vec4 frag_color;\n",
                frag_color: "frag_color",
                sample: "texture",
                vertex_precision: "",
                fragment_precision: "",
            },
            Backend::Gl43 => Dialect {
                version: "#version 430",
                ..Dialect::of(Backend::Gl32)
            },
            Backend::Es20 => Dialect {
                version: "#version 100",
                attribute: "attribute",
                vertex_out: "varying",
                fragment_in: "varying",
                frag_decl: "",
                frag_color: "gl_FragColor",
                sample: "texture2D",
                vertex_precision: "precision highp float;\n",
                fragment_precision: "precision mediump float;\n",
            },
            Backend::Es31 => Dialect {
                version: "#version 310 es",
                vertex_precision: "precision highp float;\n",
                fragment_precision: "precision mediump float;\n",
                ..Dialect::of(Backend::Gl32)
            },
        }
    }
}

/// Render the vertex+fragment pair for `kind` in the dialect of
/// `backend`.
pub fn generate(backend: Backend, kind: ProgramKind) -> ShaderSource {
    let d = Dialect::of(backend);
    match kind {
        ProgramKind::Fill => ShaderSource {
            vertex: format!(
                "{version}\n\
                 {precision}\
                 {attribute} vec2 a_position;\n\
                 uniform mat3 u_transform;\n\
                 \n\
                 void main() {{\n\
                 \x20   vec3 pos = u_transform * vec3(a_position - vec2(0.5, 0.5), 1.0);\n\
                 \x20   gl_Position = vec4(pos.xy, 0.0, 1.0);\n\
                 }}\n",
                version = d.version,
                precision = d.vertex_precision,
                attribute = d.attribute,
            ),
            fragment: format!(
                "{version}\n\
                 {precision}\
                 uniform vec4 u_color;\n\
                 {frag_decl}\
                 \n\
                 void main() {{\n\
                 \x20   {frag} = u_color;\n\
                 }}\n",
                version = d.version,
                precision = d.fragment_precision,
                frag_decl = d.frag_decl,
                frag = d.frag_color,
            ),
        },
        ProgramKind::Image => ShaderSource {
            vertex: textured_vertex(&d),
            fragment: format!(
                "{version}\n\
                 {precision}\
                 uniform sampler2D u_texture;\n\
                 uniform float u_alpha;\n\
                 {varying} vec2 v_texcoord;\n\
                 {frag_decl}\
                 \n\
                 void main() {{\n\
                 \x20   vec4 texel = {sample}(u_texture, v_texcoord);\n\
                 \x20   {frag} = vec4(texel.rgb, texel.a * u_alpha);\n\
                 }}\n",
                version = d.version,
                precision = d.fragment_precision,
                varying = d.fragment_in,
                frag_decl = d.frag_decl,
                sample = d.sample,
                frag = d.frag_color,
            ),
        },
        ProgramKind::Blend => ShaderSource {
            vertex: textured_vertex(&d),
            fragment: format!(
                "{version}\n\
                 {precision}\
                 uniform sampler2D u_mask;\n\
                 uniform vec4 u_color1;\n\
                 uniform vec4 u_color2;\n\
                 {varying} vec2 v_texcoord;\n\
                 {frag_decl}\
                 \n\
                 void main() {{\n\
                 \x20   float mix_factor = {sample}(u_mask, v_texcoord).r;\n\
                 \x20   {frag} = mix_factor * u_color1 + (1.0 - mix_factor) * u_color2;\n\
                 }}\n",
                version = d.version,
                precision = d.fragment_precision,
                varying = d.fragment_in,
                frag_decl = d.frag_decl,
                sample = d.sample,
                frag = d.frag_color,
            ),
        },
    }
}

/// Shared vertex stage for the textured programs: device position plus
/// a texture coordinate through its own transform.
fn textured_vertex(d: &Dialect) -> String {
    format!(
        "{version}\n\
         {precision}\
         {attribute} vec2 a_position;\n\
         uniform mat3 u_transform;\n\
         uniform mat3 u_tex_transform;\n\
         {out} vec2 v_texcoord;\n\
         \n\
         void main() {{\n\
         \x20   vec3 unit = vec3(a_position - vec2(0.5, 0.5), 1.0);\n\
         \x20   vec3 pos = u_transform * unit;\n\
         \x20   v_texcoord = (u_tex_transform * unit).xy;\n\
         \x20   gl_Position = vec4(pos.xy, 0.0, 1.0);\n\
         }}\n",
        version = d.version,
        precision = d.vertex_precision,
        attribute = d.attribute,
        out = d.vertex_out,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_BACKENDS: [Backend; 4] = [Backend::Gl32, Backend::Gl43, Backend::Es20, Backend::Es31];
    const ALL_KINDS: [ProgramKind; 3] = [ProgramKind::Fill, ProgramKind::Image, ProgramKind::Blend];

    #[test]
    fn test_version_pragma_leads_every_shader() {
        for backend in ALL_BACKENDS {
            for kind in ALL_KINDS {
                let source = generate(backend, kind);
                assert!(source.vertex.starts_with("#version "), "{backend:?}/{kind}");
                assert!(source.fragment.starts_with("#version "), "{backend:?}/{kind}");
            }
        }
    }

    #[test]
    fn test_desktop_dialects() {
        let gl32 = generate(Backend::Gl32, ProgramKind::Image);
        assert!(gl32.vertex.starts_with("#version 150\n"));
        assert!(gl32.vertex.contains("in vec2 a_position;"));
        assert!(gl32.vertex.contains("out vec2 v_texcoord;"));
        assert!(gl32.fragment.contains("in vec2 v_texcoord;"));
        assert!(gl32.fragment.contains("out vec4 frag_color;"));
        assert!(gl32.fragment.contains("texture(u_texture"));
        assert!(!gl32.fragment.contains("texture2D"));
        assert!(!gl32.fragment.contains("precision"));

        let gl43 = generate(Backend::Gl43, ProgramKind::Image);
        assert!(gl43.vertex.starts_with("#version 430\n"));
        // Same dialect as 3.2 core apart from the version pragma.
        assert_eq!(
            gl32.vertex.trim_start_matches("#version 150"),
            gl43.vertex.trim_start_matches("#version 430"),
        );
    }

    #[test]
    fn test_es20_dialect() {
        let source = generate(Backend::Es20, ProgramKind::Image);
        assert!(source.vertex.starts_with("#version 100\n"));
        assert!(source.vertex.contains("attribute vec2 a_position;"));
        assert!(source.vertex.contains("varying vec2 v_texcoord;"));
        assert!(source.vertex.contains("precision highp float;"));
        assert!(source.fragment.contains("precision mediump float;"));
        assert!(source.fragment.contains("varying vec2 v_texcoord;"));
        assert!(source.fragment.contains("gl_FragColor"));
        assert!(source.fragment.contains("texture2D(u_texture"));
        assert!(!source.fragment.contains("out vec4"));
    }

    #[test]
    fn test_es31_dialect() {
        let source = generate(Backend::Es31, ProgramKind::Fill);
        assert!(source.vertex.starts_with("#version 310 es\n"));
        assert!(source.vertex.contains("in vec2 a_position;"));
        assert!(source.fragment.contains("precision mediump float;"));
        assert!(source.fragment.contains("out vec4 frag_color;"));
    }

    #[test]
    fn test_fill_uniforms() {
        let source = generate(Backend::Gl32, ProgramKind::Fill);
        assert!(source.vertex.contains("uniform mat3 u_transform;"));
        assert!(source.fragment.contains("uniform vec4 u_color;"));
        assert!(!source.vertex.contains("u_tex_transform"));
    }

    #[test]
    fn test_image_uniforms() {
        let source = generate(Backend::Gl32, ProgramKind::Image);
        assert!(source.vertex.contains("uniform mat3 u_transform;"));
        assert!(source.vertex.contains("uniform mat3 u_tex_transform;"));
        assert!(source.fragment.contains("uniform sampler2D u_texture;"));
        assert!(source.fragment.contains("uniform float u_alpha;"));
    }

    #[test]
    fn test_blend_samples_red_channel() {
        let source = generate(Backend::Es31, ProgramKind::Blend);
        assert!(source.fragment.contains("uniform sampler2D u_mask;"));
        assert!(source.fragment.contains("uniform vec4 u_color1;"));
        assert!(source.fragment.contains("uniform vec4 u_color2;"));
        assert!(source.fragment.contains(".r;"));
    }

    #[test]
    fn test_vertex_stage_recenters_the_quad() {
        for backend in ALL_BACKENDS {
            for kind in ALL_KINDS {
                let source = generate(backend, kind);
                assert!(
                    source.vertex.contains("a_position - vec2(0.5, 0.5)"),
                    "{backend:?}/{kind}"
                );
            }
        }
    }
}
