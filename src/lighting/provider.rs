use crate::error::LightingResult;
use crate::lighting::{LightSource, Occluder};

/// Supplies the frame's lights as a plain collection
///
/// Implementors append to `out`; the lighting core never walks the scene
/// itself. Returning `ResourceUnavailable` skips lighting for the frame.
pub trait LightProvider {
    fn collect_lights(&self, out: &mut Vec<LightSource>) -> LightingResult<()>;
}

/// Supplies the frame's occluders as a plain collection
pub trait OccluderProvider {
    fn collect_occluders(&self, out: &mut Vec<Occluder>) -> LightingResult<()>;
}

impl LightProvider for [LightSource] {
    fn collect_lights(&self, out: &mut Vec<LightSource>) -> LightingResult<()> {
        out.extend_from_slice(self);
        Ok(())
    }
}

impl LightProvider for Vec<LightSource> {
    fn collect_lights(&self, out: &mut Vec<LightSource>) -> LightingResult<()> {
        self.as_slice().collect_lights(out)
    }
}

impl OccluderProvider for [Occluder] {
    fn collect_occluders(&self, out: &mut Vec<Occluder>) -> LightingResult<()> {
        out.extend_from_slice(self);
        Ok(())
    }
}

impl OccluderProvider for Vec<Occluder> {
    fn collect_occluders(&self, out: &mut Vec<Occluder>) -> LightingResult<()> {
        self.as_slice().collect_occluders(out)
    }
}

/// No occluders: lights get soft falloff only
impl OccluderProvider for () {
    fn collect_occluders(&self, _out: &mut Vec<Occluder>) -> LightingResult<()> {
        Ok(())
    }
}
