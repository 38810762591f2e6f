//! Off-screen canvas stacking
//!
//! A canvas redirects the engine's draw target to a texture-backed
//! framebuffer. Canvases nest: the engine keeps an explicit stack of
//! open canvases, and terminating one that is not the innermost is
//! rejected with [`CanvasError::OutOfOrder`] instead of silently
//! corrupting the tracked target state.
//!
//! A canvas ends in exactly one of two ways:
//!
//! - [`Canvas::finish`] commits it and returns the rendered content as
//!   a caller-owned [`Image`]. Finishing twice is an error.
//! - [`Canvas::close`] discards it, releasing the texture. Closing an
//!   already-terminated canvas is a no-op, so an unconditional `close`
//!   at scope exit is safe alongside a `finish` on the success path.

use glow::HasContext;
use quadra_paint::Rectangle;

use crate::engine::{current_framebuffer, set_sampling, Engine};
use crate::error::{CanvasError, EngineError};
use crate::image::Image;

/// One open canvas recorded on the engine's stack.
pub(crate) struct CanvasFrame {
    pub(crate) id: u64,
    pub(crate) previous_framebuffer: Option<glow::Framebuffer>,
    pub(crate) framebuffer: glow::Framebuffer,
    pub(crate) target: Image,
    pub(crate) prev_width: u32,
    pub(crate) prev_height: u32,
}

/// A LIFO-disciplined redirect of the engine's draw target to an
/// off-screen texture.
pub struct Canvas {
    id: u64,
    width: u32,
    height: u32,
    terminated: bool,
}

impl Canvas {
    /// Open a `width`×`height` canvas and make it the engine's draw
    /// target. The backing texture carries an alpha channel when
    /// `with_alpha` is set and starts out cleared to transparent zero.
    pub fn create(
        engine: &mut Engine,
        width: u32,
        height: u32,
        with_alpha: bool,
    ) -> Result<Canvas, EngineError> {
        let (internal, format) = if with_alpha {
            engine.backend().rgba_format()
        } else {
            engine.backend().rgb_format()
        };
        let (prev_width, prev_height) = engine.target_size();

        let (previous_framebuffer, texture, framebuffer) = unsafe {
            let gl = &engine.gl;
            let previous_framebuffer = current_framebuffer(gl);

            let texture = gl.create_texture().map_err(EngineError::CreateObject)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                None,
            );
            set_sampling(gl);

            let framebuffer = match gl.create_framebuffer() {
                Ok(framebuffer) => framebuffer,
                Err(message) => {
                    gl.delete_texture(texture);
                    return Err(EngineError::CreateObject(message));
                }
            };
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(glow::FRAMEBUFFER, previous_framebuffer);
                gl.delete_framebuffer(framebuffer);
                gl.delete_texture(texture);
                return Err(EngineError::FramebufferIncomplete(status));
            }

            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            (previous_framebuffer, texture, framebuffer)
        };

        let id = engine.next_canvas_id;
        engine.next_canvas_id += 1;
        engine.canvas_stack.push(CanvasFrame {
            id,
            previous_framebuffer,
            framebuffer,
            target: Image::from_texture(texture, width, height, false, with_alpha),
            prev_width,
            prev_height,
        });
        engine.retarget(width, height);

        tracing::debug!(id, width, height, with_alpha, "canvas opened");
        Ok(Canvas {
            id,
            width,
            height,
            terminated: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_open(&self) -> bool {
        !self.terminated
    }

    /// The canvas's target area, anchored at the origin.
    pub fn rectangle(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }

    /// Commit the canvas: restore the previous draw target and hand the
    /// rendered texture to the caller.
    ///
    /// Errors with [`CanvasError::AlreadyClosed`] when called a second
    /// time, and with [`CanvasError::OutOfOrder`] when an inner canvas
    /// is still open; no GPU state changes happen in either case.
    pub fn finish(&mut self, engine: &mut Engine) -> Result<Image, CanvasError> {
        if self.terminated {
            return Err(CanvasError::AlreadyClosed);
        }
        let frame = pop_frame(engine, self.id)?;
        self.terminated = true;
        restore(engine, &frame);
        tracing::debug!(id = self.id, "canvas finished");
        Ok(frame.target)
    }

    /// Discard the canvas: restore the previous draw target and release
    /// the target texture. A no-op when already terminated, which makes
    /// it safe to call unconditionally on scope exit.
    pub fn close(&mut self, engine: &mut Engine) -> Result<(), CanvasError> {
        if self.terminated {
            return Ok(());
        }
        let frame = pop_frame(engine, self.id)?;
        self.terminated = true;
        restore(engine, &frame);
        let mut target = frame.target;
        target.release(engine);
        tracing::debug!(id = self.id, "canvas closed");
        Ok(())
    }
}

/// Pop this canvas's frame, refusing when it is not the innermost.
fn pop_frame(engine: &mut Engine, id: u64) -> Result<CanvasFrame, CanvasError> {
    match engine.canvas_stack.pop() {
        Some(frame) if frame.id == id => Ok(frame),
        Some(frame) => {
            engine.canvas_stack.push(frame);
            Err(CanvasError::OutOfOrder)
        }
        None => Err(CanvasError::OutOfOrder),
    }
}

/// Rebind the previous framebuffer, drop this canvas's framebuffer
/// object, and restore the tracked target dimensions: the window when
/// the stack has emptied (the window may have resized while the canvas
/// was open), the recorded pre-creation size otherwise.
fn restore(engine: &mut Engine, frame: &CanvasFrame) {
    unsafe {
        engine
            .gl
            .bind_framebuffer(glow::FRAMEBUFFER, frame.previous_framebuffer);
        engine.gl.delete_framebuffer(frame.framebuffer);
    }
    let (width, height) = if engine.canvas_stack.is_empty() {
        engine.window_size()
    } else {
        (frame.prev_width, frame.prev_height)
    };
    engine.retarget(width, height);
}

#[cfg(test)]
mod tests {
    // Note: canvas behavior is exercised against a live GL context;
    // these tests are ignored by default and document the scenarios.
    // The termination-order bookkeeping itself is pure, but every path
    // through create/finish/close issues GL calls.

    #[test]
    #[ignore]
    fn test_quadrant_fills_land_in_the_right_corners() {
        // Create a 200x200 canvas without alpha, fill 100x100 boxes at
        // all four halign/valign corner combinations with distinct
        // opaque colors, finish, and read back the four quadrant
        // centers: left+top occupies x in [0,100), y in [100,200).
    }

    #[test]
    #[ignore]
    fn test_nested_canvases_restore_window_size_in_lifo_order() {
        // Open two canvases, close inner then outer; the engine's
        // target size must equal the window size again and the
        // viewport must match.
    }

    #[test]
    #[ignore]
    fn test_finish_twice_reports_already_closed() {
        // finish() returns the image; a second finish() must return
        // CanvasError::AlreadyClosed without touching GPU state.
    }

    #[test]
    #[ignore]
    fn test_out_of_order_termination_is_rejected() {
        // Closing the outer of two open canvases must return
        // CanvasError::OutOfOrder and leave both canvases open.
    }

    #[test]
    #[ignore]
    fn test_uniform_masks_blend_to_the_pure_colors() {
        // blend_unit with an all-255 red mask reproduces color1
        // everywhere; an all-0 mask reproduces color2.
    }
}
