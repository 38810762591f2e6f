//! Quadra GL Engine
//!
//! A minimal 2D rendering engine layered directly on OpenGL (desktop
//! core and embedded ES profiles) through [`glow`]. The engine draws
//! colored shapes, bitmaps, and two-color procedurally-blended masks
//! into a window or an off-screen canvas, without per-profile shader
//! boilerplate in the host application.
//!
//! Everything rasterized is a transform of one shared unit quad; all
//! visual variety comes from transform, color, and texture state.
//!
//! # Example
//!
//! ```ignore
//! use quadra_gpu::{Backend, Canvas, Engine};
//! use quadra_paint::{Color, HAlign, Rectangle, VAlign};
//!
//! // The host creates a GL context of the matching profile and makes
//! // it current before constructing the engine.
//! let mut engine = Engine::new(gl, Backend::Gl32, 800, 600, false)?;
//!
//! let mut canvas = Canvas::create(&mut engine, 200, 200, false)?;
//! let area = canvas.rectangle();
//! engine.fill_rect(
//!     area.position(100, 100, HAlign::Left, VAlign::Top),
//!     Color::RED,
//!     true,
//! );
//! let painted = canvas.finish(&mut engine)?;
//!
//! engine.clear(Color::BLACK);
//! painted.draw_all(&mut engine, painted.area(), 255);
//! ```

pub mod backend;
pub mod canvas;
pub mod engine;
pub mod error;
pub mod image;
pub mod shaders;

pub use backend::Backend;
pub use canvas::Canvas;
pub use engine::Engine;
pub use error::{CanvasError, EngineError};
pub use image::Image;
