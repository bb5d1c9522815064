use image::Rgba;

use crate::constants::surface::CLEAR_COLOR;
use crate::error::{resource_unavailable, LightingResult};
use crate::surface::{BlendMode, Filter, Rect, Surface};

/// Aspect-preserving fit of the internal resolution into a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    /// Largest uniform scale that fits `internal` in `viewport`, centered
    pub fn fit(internal: (u32, u32), viewport: (u32, u32)) -> Self {
        let (iw, ih) = internal;
        let (vw, vh) = viewport;
        if iw == 0 || ih == 0 || vw == 0 || vh == 0 {
            return Self {
                scale: 0.0,
                offset_x: 0,
                offset_y: 0,
                width: 0,
                height: 0,
            };
        }

        let scale = (vw as f32 / iw as f32).min(vh as f32 / ih as f32);
        let width = ((iw as f32 * scale).round() as u32).clamp(1, vw);
        let height = ((ih as f32 * scale).round() as u32).clamp(1, vh);

        Self {
            scale,
            offset_x: ((vw - width) / 2) as i32,
            offset_y: ((vh - height) / 2) as i32,
            width,
            height,
        }
    }

    pub fn dest_rect(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.width, self.height)
    }
}

/// Scales the scene to the display and multiplies the lightmap over it
pub struct Compositor {
    display: Option<Surface>,
    filter: Filter,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Filter::Linear)
    }
}

impl Compositor {
    pub fn new(filter: Filter) -> Self {
        Self {
            display: None,
            filter,
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// The last presented frame
    pub fn display(&self) -> Option<&Surface> {
        self.display.as_ref()
    }

    /// Composite `scene` and `lightmap` into a viewport-sized display surface
    ///
    /// Both blits use the same destination rectangle and filter, so each
    /// scene pixel is multiplied by the lightmap sample at the same position.
    pub fn present(
        &mut self,
        scene: &Surface,
        lightmap: &Surface,
        viewport: (u32, u32),
    ) -> LightingResult<&Surface> {
        if scene.size() != lightmap.size() {
            return Err(resource_unavailable(
                "lightmap",
                format!(
                    "lightmap is {}x{} but scene is {}x{}",
                    lightmap.width(),
                    lightmap.height(),
                    scene.width(),
                    scene.height()
                ),
            ));
        }

        let filter = self.filter;
        let display = self.prepare_display(scene.size(), viewport)?;
        let letterbox = Letterbox::fit(scene.size(), viewport);
        let dest = letterbox.dest_rect();

        display.blit_scaled(scene, dest, filter, BlendMode::Opaque);
        display.blit_scaled(lightmap, dest, filter, BlendMode::Multiply);
        Ok(&*display)
    }

    /// Composite the scene alone, for frames whose lightmap is unavailable
    pub fn present_unlit(&mut self, scene: &Surface, viewport: (u32, u32)) -> LightingResult<&Surface> {
        let filter = self.filter;
        let display = self.prepare_display(scene.size(), viewport)?;
        let dest = Letterbox::fit(scene.size(), viewport).dest_rect();
        display.blit_scaled(scene, dest, filter, BlendMode::Opaque);
        Ok(&*display)
    }

    /// Release the display surface
    pub fn release(&mut self) {
        if let Some(display) = self.display.take() {
            log::info!("[Compositor::release] Disposing display surface {:?}", display.id());
        }
    }

    fn prepare_display(&mut self, internal: (u32, u32), viewport: (u32, u32)) -> LightingResult<&mut Surface> {
        if self.display.as_ref().map(Surface::size) != Some(viewport) {
            let display = Surface::new(viewport.0, viewport.1)?;
            log::debug!(
                "[Compositor::present] Display surface {:?} now {}x{} (internal {}x{})",
                display.id(),
                viewport.0,
                viewport.1,
                internal.0,
                internal.1
            );
            self.display = Some(display);
        }

        let display = self
            .display
            .as_mut()
            .ok_or_else(|| resource_unavailable("display", "display surface not allocated"))?;
        display.clear(Rgba(CLEAR_COLOR));
        Ok(display)
    }
}
