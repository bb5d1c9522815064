use image::Rgba;

use crate::config::LightingConfig;
use crate::constants::surface::CLEAR_COLOR;
use crate::error::LightingResult;
use crate::lighting::{
    DrawOutcome, LightProvider, LightSource, LightmapCompositor, Occluder, OccluderProvider,
};
use crate::renderer::Compositor;
use crate::surface::{Color, Surface};

/// Everything one renderer needs to light a frame
///
/// Built once and passed by reference to frame setup and presentation code.
pub struct LightingContext {
    config: LightingConfig,
    ambient: Color,
    scene: Surface,
    lightmap: LightmapCompositor,
    compositor: Compositor,
    lights: Vec<LightSource>,
    occluders: Vec<Occluder>,
    last_outcome: Option<DrawOutcome>,
}

impl LightingContext {
    pub fn new(config: LightingConfig) -> LightingResult<Self> {
        config.validate()?;
        let scene = Surface::new(config.internal_width, config.internal_height)?;
        let lightmap = LightmapCompositor::from_config(&config)?;
        let compositor = Compositor::new(config.filter);

        log::info!(
            "[LightingContext::new] Internal resolution {}x{}",
            config.internal_width,
            config.internal_height
        );

        Ok(Self {
            ambient: config.ambient_color(),
            config,
            scene,
            lightmap,
            compositor,
            lights: Vec::new(),
            occluders: Vec::new(),
            last_outcome: None,
        })
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: Color) {
        self.ambient = ambient;
    }

    pub fn internal_resolution(&self) -> (u32, u32) {
        self.scene.size()
    }

    /// Clear the scene surface and hand it to the scene renderer
    pub fn begin_frame(&mut self) -> &mut Surface {
        self.scene.clear(Rgba(CLEAR_COLOR));
        &mut self.scene
    }

    pub fn scene(&self) -> &Surface {
        &self.scene
    }

    pub fn lightmap(&self) -> &LightmapCompositor {
        &self.lightmap
    }

    /// How the lightmap pass of the last frame went
    pub fn last_outcome(&self) -> Option<&DrawOutcome> {
        self.last_outcome.as_ref()
    }

    /// Light the scene and composite it into a viewport-sized frame
    ///
    /// A provider that cannot supply its list skips lighting for this frame;
    /// the frame is then presented unlit.
    pub fn end_frame<L, O>(&mut self, lights: &L, occluders: &O, viewport: (u32, u32)) -> LightingResult<&Surface>
    where
        L: LightProvider + ?Sized,
        O: OccluderProvider + ?Sized,
    {
        self.lights.clear();
        self.occluders.clear();
        let lights_ready = report_unavailable(lights.collect_lights(&mut self.lights));
        let occluders_ready = report_unavailable(occluders.collect_occluders(&mut self.occluders));

        let outcome = self.lightmap.draw(
            self.ambient,
            lights_ready.then_some(self.lights.as_slice()),
            occluders_ready.then_some(self.occluders.as_slice()),
        )?;
        let drawn = outcome.is_drawn();
        self.last_outcome = Some(outcome);

        match (drawn, self.lightmap.lightmap()) {
            (true, Some(lightmap)) => self.compositor.present(&self.scene, lightmap, viewport),
            _ => self.compositor.present_unlit(&self.scene, viewport),
        }
    }

    /// Change the internal render resolution
    ///
    /// Recreates the scene surface and the lightmap; allocation failures are
    /// returned to the caller.
    pub fn set_internal_resolution(&mut self, width: u32, height: u32) -> LightingResult<()> {
        if self.scene.size() != (width, height) {
            self.scene = Surface::new(width, height)?;
        }
        self.lightmap.resize(width, height)?;
        self.config.internal_width = width;
        self.config.internal_height = height;
        Ok(())
    }

    /// Release every surface; further frames present nothing lit
    pub fn shutdown(&mut self) {
        self.lightmap.dispose();
        self.compositor.release();
        log::info!("[LightingContext::shutdown] Lighting resources released");
    }
}

/// Recoverable provider errors become "unavailable" for this frame
fn report_unavailable(result: LightingResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("[LightingContext::end_frame] Provider unavailable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::resource_unavailable;
    use crate::lighting::LightmapState;
    use glam::vec2;

    struct NotReady;

    impl LightProvider for NotReady {
        fn collect_lights(&self, _out: &mut Vec<LightSource>) -> LightingResult<()> {
            Err(resource_unavailable("scene", "not loaded"))
        }
    }

    fn small_config() -> LightingConfig {
        LightingConfig {
            internal_width: 32,
            internal_height: 32,
            ambient: [128, 128, 128, 255],
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_lit_by_light() {
        let mut ctx = LightingContext::new(small_config()).unwrap();
        ctx.begin_frame().clear(Rgba([200, 200, 200, 255]));

        let lights = vec![LightSource::new(vec2(16.0, 16.0), 8.0, Rgba([255, 255, 255, 255]), 1.0)];
        let frame = ctx.end_frame(&lights, &(), (32, 32)).unwrap();

        // Far from the light: scene * ambient; at the light: full scene color
        assert_eq!(frame.pixel(0, 0), Some(Rgba([100, 100, 100, 255])));
        assert_eq!(frame.pixel(16, 16), Some(Rgba([200, 200, 200, 255])));
        assert!(ctx.last_outcome().unwrap().is_drawn());
    }

    #[test]
    fn test_unavailable_provider_presents_unlit() {
        let mut ctx = LightingContext::new(small_config()).unwrap();
        ctx.begin_frame().clear(Rgba([200, 200, 200, 255]));

        let frame = ctx.end_frame(&NotReady, &(), (32, 32)).unwrap();
        assert_eq!(frame.pixel(0, 0), Some(Rgba([200, 200, 200, 255])));
        assert!(!ctx.last_outcome().unwrap().is_drawn());
    }

    #[test]
    fn test_set_internal_resolution() {
        let mut ctx = LightingContext::new(small_config()).unwrap();
        ctx.set_internal_resolution(16, 8).unwrap();
        assert_eq!(ctx.internal_resolution(), (16, 8));
        assert_eq!(ctx.lightmap().size(), (16, 8));

        assert!(ctx.set_internal_resolution(0, 8).is_err());
        assert_eq!(ctx.internal_resolution(), (16, 8));
    }

    #[test]
    fn test_shutdown() {
        let mut ctx = LightingContext::new(small_config()).unwrap();
        ctx.shutdown();
        assert_eq!(ctx.lightmap().state(), LightmapState::Disposed);

        let lights: Vec<LightSource> = Vec::new();
        let frame = ctx.end_frame(&lights, &(), (4, 4)).unwrap();
        assert_eq!(frame.size(), (4, 4));
    }
}
