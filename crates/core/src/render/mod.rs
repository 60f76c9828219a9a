use std::fmt;

use crate::{config::LoopGeometry, generator::ValueFunction, PulseError, Result};

/// Output target owned by the host UI: a canvas, a text label, a test probe.
pub trait Surface {
    /// Wipes whatever the previous frame painted.
    fn clear(&mut self) -> Result<()>;
}

/// Paint callback: receives the step, the generated value and the surface.
pub type PaintFn<S> = Box<dyn FnMut(i64, f64, &mut S) -> Result<()>>;

/// Object-safe view of a render unit, which is what an
/// [`Arrangement`](crate::Arrangement) stores. Surface and paint setters need
/// the concrete surface type and live on [`RenderUnit`] only.
pub trait Render {
    fn label(&self) -> &str;

    /// Clears the unit's surface.
    fn clear(&mut self) -> Result<()>;

    /// Evaluates the generator at `step` and paints the result.
    fn render_at(&mut self, step: i64) -> Result<()>;

    fn geometry(&self) -> &LoopGeometry;

    fn set_geometry(&mut self, geometry: LoopGeometry) -> Result<()>;

    fn set_generator(&mut self, generator: Box<dyn ValueFunction>);
}

/// One generator bound to one surface through one paint callback.
pub struct RenderUnit<S> {
    label: String,
    generator: Box<dyn ValueFunction>,
    surface: S,
    paint: PaintFn<S>,
    geometry: LoopGeometry,
}

impl<S: Surface> RenderUnit<S> {
    pub fn builder() -> RenderUnitBuilder<S> {
        RenderUnitBuilder::default()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Replaces the surface, handing back the previous one.
    pub fn set_surface(&mut self, surface: S) -> S {
        std::mem::replace(&mut self.surface, surface)
    }

    pub fn set_paint<F>(&mut self, paint: F)
    where
        F: FnMut(i64, f64, &mut S) -> Result<()> + 'static,
    {
        self.paint = Box::new(paint);
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

impl<S: Surface> Render for RenderUnit<S> {
    fn label(&self) -> &str {
        &self.label
    }

    fn clear(&mut self) -> Result<()> {
        self.surface.clear()
    }

    fn render_at(&mut self, step: i64) -> Result<()> {
        let geometry = &self.geometry;
        let value = self.generator.value(
            step,
            geometry.min_val,
            geometry.max_val,
            geometry.offset,
            geometry,
        )?;
        (self.paint)(step, value, &mut self.surface)
    }

    fn geometry(&self) -> &LoopGeometry {
        &self.geometry
    }

    fn set_geometry(&mut self, geometry: LoopGeometry) -> Result<()> {
        geometry.validate()?;
        self.geometry = geometry;
        Ok(())
    }

    fn set_generator(&mut self, generator: Box<dyn ValueFunction>) {
        self.generator = generator;
    }
}

impl<S: fmt::Debug> fmt::Debug for RenderUnit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderUnit")
            .field("label", &self.label)
            .field("surface", &self.surface)
            .field("geometry", &self.geometry)
            .finish()
    }
}

/// Collects the collaborators of a [`RenderUnit`]. `build` refuses to
/// produce a unit unless generator, surface and paint callback are all set.
pub struct RenderUnitBuilder<S> {
    label: Option<String>,
    generator: Option<Box<dyn ValueFunction>>,
    surface: Option<S>,
    paint: Option<PaintFn<S>>,
    geometry: LoopGeometry,
}

impl<S> Default for RenderUnitBuilder<S> {
    fn default() -> Self {
        Self {
            label: None,
            generator: None,
            surface: None,
            paint: None,
            geometry: LoopGeometry::default(),
        }
    }
}

impl<S: Surface> RenderUnitBuilder<S> {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn generator(mut self, generator: impl ValueFunction + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn surface(mut self, surface: S) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn paint<F>(mut self, paint: F) -> Self
    where
        F: FnMut(i64, f64, &mut S) -> Result<()> + 'static,
    {
        self.paint = Some(Box::new(paint));
        self
    }

    pub fn geometry(mut self, geometry: LoopGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn build(self) -> Result<RenderUnit<S>> {
        let generator = self
            .generator
            .ok_or(PulseError::MissingCollaborator("generator"))?;
        let surface = self
            .surface
            .ok_or(PulseError::MissingCollaborator("surface"))?;
        let paint = self
            .paint
            .ok_or(PulseError::MissingCollaborator("paint callback"))?;
        self.geometry.validate()?;

        Ok(RenderUnit {
            label: self.label.unwrap_or_else(|| "unnamed".to_string()),
            generator,
            surface,
            paint,
            geometry: self.geometry,
        })
    }
}
