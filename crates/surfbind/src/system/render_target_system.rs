use std::collections::HashMap;

use slotmap::{SecondaryMap, SlotMap};

use crate::coords::{ColorRgba, Matrix, PixelRect, Rect};
use crate::error::{Error, Result};
use crate::target::projection::{frame_to_viewport, viewport_projection};
use crate::target::{clamp_copy_region, Clear, CopyRegion, RenderTarget};
use crate::texture::{CanvasTextureCache, CanvasTextureOptions, Texture};

use super::adaptor::{GpuTargetOptions, PassRequest, RenderTargetAdaptor};
use super::surface::{RenderSurface, RenderTargetHandle, SurfaceKey};

/// System configuration.
#[derive(Debug, Clone)]
pub struct RenderTargetSystemConfig {
    /// Used whenever a clear color is not given explicitly.
    pub default_clear_color: ColorRgba,

    /// Options for wrapping canvases into textures.
    pub canvas: CanvasTextureOptions,

    /// Sample count requested for antialiased targets.
    ///
    /// Clamped to what the adaptor supports.
    pub msaa_sample_count: u32,
}

impl Default for RenderTargetSystemConfig {
    fn default() -> Self {
        Self {
            default_clear_color: ColorRgba::transparent(),
            canvas: CanvasTextureOptions::default(),
            msaa_sample_count: 4,
        }
    }
}

/// Parameters of the first bind of a frame.
#[derive(Debug, Copy, Clone)]
pub struct RenderStart<'a> {
    pub target: RenderSurface<'a>,
    pub clear: Clear,
    pub clear_color: Option<ColorRgba>,
    pub frame: Option<Rect>,
}

impl<'a> RenderStart<'a> {
    pub fn new(target: impl Into<RenderSurface<'a>>) -> Self {
        Self {
            target: target.into(),
            clear: Clear::ALL,
            clear_color: None,
            frame: None,
        }
    }
}

/// Callback fired when the bound logical render target changes.
pub type RenderTargetObserver = Box<dyn FnMut(RenderTargetHandle, &RenderTarget)>;

struct TargetEntry {
    target: RenderTarget,
    key: SurfaceKey,
    /// Created by this system (as opposed to registered by the caller).
    synthesized: bool,
    /// Uid of color[0]'s source when the target was created.
    source_uid: u32,
}

impl TargetEntry {
    fn new(target: RenderTarget, key: SurfaceKey, synthesized: bool) -> Self {
        let source_uid = target.color_texture().source().uid();
        Self {
            target,
            key,
            synthesized,
            source_uid,
        }
    }

    // Color[0]'s source was destroyed or swapped out from under the target.
    fn is_stale(&self) -> bool {
        self.target.is_source_destroyed() || self.target.color_texture().source().uid() != self.source_uid
    }
}

struct GpuSlot<G> {
    gpu: G,
    dirty_id: u32,
    pixel_width: u32,
    pixel_height: u32,
}

#[derive(Debug, Copy, Clone)]
struct StackEntry {
    handle: RenderTargetHandle,
    frame: Rect,
}

/// Binds render surfaces for drawing.
///
/// Responsibilities:
/// - maps canvases/textures to canonical render targets (created on first use)
/// - creates the adaptor's GPU object lazily, exactly once per target
/// - reconciles resizes at bind time, before the native pass starts
/// - maintains the push/pop stack and the current viewport/projection
///
/// All native work is delegated to `A`.
pub struct RenderTargetSystem<A: RenderTargetAdaptor> {
    adaptor: A,
    config: RenderTargetSystemConfig,
    canvas_textures: CanvasTextureCache,

    targets: SlotMap<RenderTargetHandle, TargetEntry>,
    surface_targets: HashMap<SurfaceKey, RenderTargetHandle>,
    gpu_targets: SecondaryMap<RenderTargetHandle, GpuSlot<A::GpuTarget>>,

    stack: Vec<StackEntry>,
    render_target: Option<RenderTargetHandle>,
    root_render_target: Option<RenderTargetHandle>,
    rendering_to_screen: bool,

    frame: Rect,
    viewport: PixelRect,
    root_viewport: PixelRect,
    projection_matrix: Matrix,

    observers: Vec<RenderTargetObserver>,
}

impl<A: RenderTargetAdaptor> RenderTargetSystem<A> {
    pub fn new(adaptor: A) -> Self {
        Self::with_config(adaptor, RenderTargetSystemConfig::default())
    }

    pub fn with_config(adaptor: A, config: RenderTargetSystemConfig) -> Self {
        Self {
            adaptor,
            config,
            canvas_textures: CanvasTextureCache::new(),
            targets: SlotMap::with_key(),
            surface_targets: HashMap::new(),
            gpu_targets: SecondaryMap::new(),
            stack: Vec::new(),
            render_target: None,
            root_render_target: None,
            rendering_to_screen: false,
            frame: Rect::default(),
            viewport: PixelRect::default(),
            root_viewport: PixelRect::default(),
            projection_matrix: Matrix::identity(),
            observers: Vec::new(),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn adaptor(&self) -> &A {
        &self.adaptor
    }

    pub fn adaptor_mut(&mut self) -> &mut A {
        &mut self.adaptor
    }

    pub fn config(&self) -> &RenderTargetSystemConfig {
        &self.config
    }

    /// Handle of the currently bound target.
    #[inline]
    pub fn render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target
    }

    pub fn current_render_target(&self) -> Option<&RenderTarget> {
        self.render_target.and_then(|h| self.get(h))
    }

    pub fn get(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.targets.get(handle).map(|e| &e.target)
    }

    /// Mutable access for caller-driven resizes; reconciled at the next bind.
    pub fn get_mut(&mut self, handle: RenderTargetHandle) -> Option<&mut RenderTarget> {
        self.targets.get_mut(handle).map(|e| &mut e.target)
    }

    #[inline]
    pub fn root_render_target(&self) -> Option<RenderTargetHandle> {
        self.root_render_target
    }

    #[inline]
    pub fn is_rendering_to_screen(&self) -> bool {
        self.rendering_to_screen
    }

    #[inline]
    pub fn viewport(&self) -> PixelRect {
        self.viewport
    }

    #[inline]
    pub fn root_viewport(&self) -> PixelRect {
        self.root_viewport
    }

    #[inline]
    pub fn projection_matrix(&self) -> &Matrix {
        &self.projection_matrix
    }

    #[inline]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of registered render targets.
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn has_gpu_render_target(&self, handle: RenderTargetHandle) -> bool {
        self.gpu_targets.contains_key(handle)
    }

    pub fn canvas_texture_cache(&self) -> &CanvasTextureCache {
        &self.canvas_textures
    }

    pub fn add_render_target_observer(&mut self, observer: RenderTargetObserver) {
        self.observers.push(observer);
    }

    // ── registry ──────────────────────────────────────────────────────────

    /// Registers a caller-constructed target.
    ///
    /// The system never destroys the textures of registered targets.
    pub fn register_render_target(&mut self, target: RenderTarget) -> RenderTargetHandle {
        let key = SurfaceKey::Target(target.uid());
        let handle = self.targets.insert(TargetEntry::new(target, key, false));
        self.surface_targets.insert(key, handle);
        handle
    }

    /// Resolves `surface` to its canonical render target, creating it on first use.
    ///
    /// Canvases are wrapped through the canvas texture cache first, so screen and
    /// offscreen surfaces share one creation path. Handles of released targets are
    /// rejected with [`Error::UnknownSurface`].
    pub fn get_render_target<'a>(
        &mut self,
        surface: impl Into<RenderSurface<'a>>,
    ) -> Result<RenderTargetHandle> {
        match surface.into() {
            RenderSurface::Target(handle) => {
                let entry = self.targets.get(handle).ok_or(Error::UnknownSurface)?;
                if entry.is_stale() {
                    self.release(handle);
                    return Err(Error::UnknownSurface);
                }
                Ok(handle)
            }
            RenderSurface::Canvas(canvas) => {
                let texture = self
                    .canvas_textures
                    .get_canvas_texture(canvas, self.config.canvas);
                self.resolve_texture(SurfaceKey::Canvas(canvas.uid()), &texture)
            }
            RenderSurface::Texture(texture) => {
                self.resolve_texture(SurfaceKey::Texture(texture.uid()), texture)
            }
        }
    }

    fn resolve_texture(&mut self, key: SurfaceKey, texture: &Texture) -> Result<RenderTargetHandle> {
        if let Some(&handle) = self.surface_targets.get(&key) {
            let stale = self
                .targets
                .get(handle)
                .is_none_or(|e| e.is_stale() || e.source_uid != texture.source().uid());
            if !stale {
                return Ok(handle);
            }
            self.release(handle);
        }

        let target = RenderTarget::from_texture(texture.clone())?;
        log::debug!(
            "render target {} created for {key:?} ({}x{} px, root: {})",
            target.uid(),
            target.pixel_width(),
            target.pixel_height(),
            target.is_root()
        );

        let handle = self.targets.insert(TargetEntry::new(target, key, true));
        self.surface_targets.insert(key, handle);
        Ok(handle)
    }

    /// Deregisters every target whose color[0] source was destroyed or replaced.
    ///
    /// Returns the number of targets released.
    pub fn prune_destroyed(&mut self) -> usize {
        self.canvas_textures.prune();

        let dead: Vec<RenderTargetHandle> = self
            .targets
            .iter()
            .filter(|(_, e)| e.is_stale())
            .map(|(h, _)| h)
            .collect();

        for &handle in &dead {
            self.release(handle);
        }
        if !dead.is_empty() {
            log::debug!("pruned {} render target(s) with stale sources", dead.len());
        }
        dead.len()
    }

    // Destroys the GPU object first, then the registry entry.
    fn release(&mut self, handle: RenderTargetHandle) {
        if let Some(slot) = self.gpu_targets.remove(handle) {
            self.adaptor.destroy_gpu_render_target(slot.gpu);
        }

        let Some(entry) = self.targets.remove(handle) else { return };
        if self.surface_targets.get(&entry.key) == Some(&handle) {
            self.surface_targets.remove(&entry.key);
        }
        if self.render_target == Some(handle) {
            self.render_target = None;
        }
        if self.root_render_target == Some(handle) {
            self.root_render_target = None;
        }

        log::debug!("render target {} released", entry.target.uid());
        if entry.synthesized {
            entry.target.destroy();
        }
    }

    // ── gpu objects ───────────────────────────────────────────────────────

    /// Returns the backend object for `handle`, creating it on first access.
    pub fn get_gpu_render_target(&mut self, handle: RenderTargetHandle) -> Result<&mut A::GpuTarget> {
        self.ensure_gpu_render_target(handle)?;
        self.gpu_targets
            .get_mut(handle)
            .map(|slot| &mut slot.gpu)
            .ok_or(Error::UnknownSurface)
    }

    // The single place GPU render targets are created.
    fn ensure_gpu_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        if self.gpu_targets.contains_key(handle) {
            return Ok(());
        }
        let entry = self.targets.get(handle).ok_or(Error::UnknownSurface)?;
        let target = &entry.target;

        let options = gpu_target_options(
            target,
            self.config.msaa_sample_count,
            self.adaptor.max_sample_count(),
        );
        let gpu = self.adaptor.init_gpu_render_target(target, options)?;
        log::debug!(
            "gpu render target created for {} (samples: {})",
            target.uid(),
            options.sample_count
        );

        self.gpu_targets.insert(
            handle,
            GpuSlot {
                gpu,
                dirty_id: target.dirty_id(),
                pixel_width: target.pixel_width(),
                pixel_height: target.pixel_height(),
            },
        );
        Ok(())
    }

    // Applies pending resizes (caller- or source-driven) to the GPU object.
    fn reconcile(&mut self, handle: RenderTargetHandle) -> Result<()> {
        let entry = self.targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        if entry.target.sync_with_source() {
            log::debug!("render target {} picked up a source resize", entry.target.uid());
        }

        let target = &entry.target;
        let Some(slot) = self.gpu_targets.get_mut(handle) else { return Ok(()) };

        let (pw, ph) = (target.pixel_width(), target.pixel_height());
        if slot.pixel_width != pw || slot.pixel_height != ph {
            if !target.is_root() {
                self.adaptor.resize_gpu_render_target(target, &mut slot.gpu)?;
                log::debug!("gpu render target {} resized to {pw}x{ph}", target.uid());
            }
            slot.pixel_width = pw;
            slot.pixel_height = ph;
        }
        slot.dirty_id = target.dirty_id();
        Ok(())
    }

    // ── binding ───────────────────────────────────────────────────────────

    /// Makes `surface` the current destination and starts a native pass.
    ///
    /// The viewport comes from `frame`, else from the surface's own frame when it
    /// is a texture, else the full target. Observers are notified only when the
    /// logical target differs from the previously bound one.
    pub fn bind<'a>(
        &mut self,
        surface: impl Into<RenderSurface<'a>>,
        clear: impl Into<Clear>,
        clear_color: Option<ColorRgba>,
        frame: Option<Rect>,
    ) -> Result<RenderTargetHandle> {
        let surface = surface.into();
        let clear = clear.into();

        let handle = self.get_render_target(surface)?;
        let changed = self.render_target != Some(handle);

        self.ensure_gpu_render_target(handle)?;
        self.reconcile(handle)?;

        let target = &self.targets[handle].target;

        let surface_frame = match surface {
            RenderSurface::Texture(texture) => Some(texture.frame()),
            _ => None,
        };
        let frame = frame
            .or(surface_frame)
            .unwrap_or_else(|| Rect::from_size(target.width(), target.height()));

        let resolution = target.resolution();
        let viewport = frame_to_viewport(frame, resolution);

        for texture in target.color_textures() {
            self.adaptor.unbind_texture(texture);
        }

        let pass = PassRequest {
            clear,
            clear_color: clear_color.unwrap_or(self.config.default_clear_color),
            viewport,
        };
        let slot = self.gpu_targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        self.adaptor.start_render_pass(target, &mut slot.gpu, &pass)?;

        // Nothing is committed unless the native pass started.
        self.render_target = Some(handle);
        self.frame = frame;
        self.viewport = viewport;
        self.projection_matrix = viewport_projection(viewport, resolution, target.is_root());

        if changed {
            for observer in &mut self.observers {
                observer(handle, target);
            }
        }

        Ok(handle)
    }

    /// Binds `surface` and records it on the stack.
    pub fn push<'a>(
        &mut self,
        surface: impl Into<RenderSurface<'a>>,
        clear: impl Into<Clear>,
        clear_color: Option<ColorRgba>,
        frame: Option<Rect>,
    ) -> Result<RenderTargetHandle> {
        let handle = self.bind(surface, clear, clear_color, frame)?;
        self.stack.push(StackEntry {
            handle,
            frame: self.frame,
        });
        Ok(handle)
    }

    /// Removes the top entry and restores the one below it without clearing.
    pub fn pop(&mut self) -> Result<()> {
        self.stack.pop().ok_or(Error::EmptyStack)?;

        if let Some(top) = self.stack.last().copied() {
            self.bind(top.handle, Clear::NONE, None, Some(top.frame))?;
        }
        Ok(())
    }

    /// Starts a frame: resets the stack and pushes the root target.
    pub fn render_start(&mut self, start: RenderStart<'_>) -> Result<RenderTargetHandle> {
        self.prune_destroyed();
        self.stack.clear();

        let handle = self.push(start.target, start.clear, start.clear_color, start.frame)?;
        self.root_viewport = self.viewport;
        self.root_render_target = Some(handle);

        let root = &self.targets[handle].target;
        self.rendering_to_screen = root
            .color_texture()
            .source()
            .canvas()
            .is_some_and(|c| c.is_presented());
        self.adaptor.prerender(root);

        Ok(handle)
    }

    pub fn post_render(&mut self) {
        let Some(root) = self.root_render_target else { return };
        if let Some(entry) = self.targets.get(root) {
            self.adaptor.postrender(&entry.target);
        }
    }

    /// Ends the native pass of the current target (resolving MSAA).
    pub fn finish_render_pass(&mut self) -> Result<()> {
        let handle = self.render_target.ok_or(Error::NothingBound)?;
        let target = &self.targets.get(handle).ok_or(Error::UnknownSurface)?.target;
        let slot = self.gpu_targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        self.adaptor.finish_render_pass(target, &mut slot.gpu)?;
        Ok(())
    }

    /// Clears the current target, or `target` if given, within the active viewport.
    pub fn clear<'a>(
        &mut self,
        target: Option<RenderSurface<'a>>,
        clear: impl Into<Clear>,
        clear_color: Option<ColorRgba>,
    ) -> Result<()> {
        let clear = clear.into();
        if clear.is_none() {
            return Ok(());
        }

        let handle = match target {
            Some(surface) => self.get_render_target(surface)?,
            None => self.render_target.ok_or(Error::NothingBound)?,
        };
        self.ensure_gpu_render_target(handle)?;

        let pass = PassRequest {
            clear,
            clear_color: clear_color.unwrap_or(self.config.default_clear_color),
            viewport: self.viewport,
        };
        let target = &self.targets[handle].target;
        let slot = self.gpu_targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        self.adaptor.clear(target, &mut slot.gpu, &pass)?;
        Ok(())
    }

    /// Upgrades the current target to carry depth + stencil.
    ///
    /// Re-issues a non-clearing bind so the adaptor can allocate the attachment.
    /// A target that already has stencil is left untouched.
    pub fn ensure_depth_stencil(&mut self) -> Result<()> {
        let handle = self.render_target.ok_or(Error::NothingBound)?;
        let entry = self.targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        if entry.target.stencil() {
            return Ok(());
        }
        entry.target.set_stencil(true);

        let frame = self.frame;
        self.bind(handle, Clear::NONE, None, Some(frame))?;
        Ok(())
    }

    /// Copies a pixel rectangle of `source`'s resolved color[0] into `destination`.
    ///
    /// The request is clamped to the source bounds first; returns the region that
    /// was copied, or `None` if nothing remained.
    pub fn copy_to_texture<'a>(
        &mut self,
        source: impl Into<RenderSurface<'a>>,
        destination: &Texture,
        origin_src: (i32, i32),
        size: (i32, i32),
        origin_dest: (i32, i32),
    ) -> Result<Option<CopyRegion>> {
        let handle = self.get_render_target(source)?;
        self.ensure_gpu_render_target(handle)?;

        let target = &self.targets[handle].target;
        let bounds = (target.pixel_width(), target.pixel_height());
        let Some(region) = clamp_copy_region(origin_src, size, origin_dest, bounds) else {
            return Ok(None);
        };

        let slot = self.gpu_targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        self.adaptor.copy_to_texture(target, &mut slot.gpu, destination, region)?;
        Ok(Some(region))
    }

    /// Reads back RGBA8 pixels from `surface`'s resolved color[0] attachment.
    pub fn read_pixels<'a>(
        &mut self,
        surface: impl Into<RenderSurface<'a>>,
        rect: PixelRect,
    ) -> Result<Vec<u8>> {
        let handle = self.get_render_target(surface)?;
        self.ensure_gpu_render_target(handle)?;

        let target = &self.targets[handle].target;
        let slot = self.gpu_targets.get_mut(handle).ok_or(Error::UnknownSurface)?;
        Ok(self.adaptor.read_pixels(target, &mut slot.gpu, rect)?)
    }

    /// Forgets the current binding; the next bind starts from scratch.
    pub fn reset_state(&mut self) {
        self.render_target = None;
        self.stack.clear();
    }

    /// Releases every GPU object, destroys the targets this system synthesized
    /// and clears both registries. Caller-registered targets are not destroyed.
    pub fn destroy(&mut self) {
        for (_, slot) in self.gpu_targets.drain() {
            self.adaptor.destroy_gpu_render_target(slot.gpu);
        }
        for (_, entry) in self.targets.drain() {
            if entry.synthesized {
                entry.target.destroy();
            }
        }
        self.surface_targets.clear();
        self.stack.clear();
        self.render_target = None;
        self.root_render_target = None;
    }
}

fn gpu_target_options(target: &RenderTarget, requested: u32, max: u32) -> GpuTargetOptions {
    if !target.antialias() {
        return GpuTargetOptions::default();
    }
    if max < 2 {
        log::warn!(
            "render target {}: antialiasing requested but the backend has no multisampling; rendering without MSAA",
            target.uid()
        );
        return GpuTargetOptions::default();
    }
    GpuTargetOptions {
        sample_count: requested.clamp(1, max),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::system::testing::{Call, RecordingAdaptor};
    use crate::target::{ColorTextures, RenderTargetDescriptor};
    use crate::texture::{Canvas, TextureSourceDescriptor};

    fn system() -> RenderTargetSystem<RecordingAdaptor> {
        RenderTargetSystem::new(RecordingAdaptor::new(4))
    }

    fn texture(w: f32, h: f32) -> Texture {
        Texture::create(TextureSourceDescriptor {
            width: w,
            height: h,
            ..Default::default()
        })
    }

    fn aa_texture(w: f32, h: f32) -> Texture {
        Texture::create(TextureSourceDescriptor {
            width: w,
            height: h,
            antialias: true,
            ..Default::default()
        })
    }

    // ── registry ──────────────────────────────────────────────────────────

    #[test]
    fn same_surface_resolves_to_same_target() {
        let mut sys = system();
        let tex = texture(64.0, 64.0);
        let a = sys.get_render_target(&tex).unwrap();
        let b = sys.get_render_target(&tex).unwrap();
        assert_eq!(a, b);
        assert_eq!(sys.len(), 1);
    }

    #[test]
    fn canvas_goes_through_cache_and_is_root() {
        let mut sys = system();
        let canvas = Canvas::new(800, 600);
        let h = sys.get_render_target(&canvas).unwrap();
        assert!(sys.get(h).unwrap().is_root());
        assert_eq!(sys.get_render_target(&canvas).unwrap(), h);
        assert_eq!(sys.canvas_texture_cache().len(), 1);
    }

    #[test]
    fn released_handle_is_unknown() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let h = sys.get_render_target(&tex).unwrap();
        tex.source().destroy();
        assert!(matches!(sys.get_render_target(h), Err(Error::UnknownSurface)));
        assert!(matches!(sys.bind(h, true, None, None), Err(Error::UnknownSurface)));
    }

    #[test]
    fn destroyed_source_yields_fresh_target() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let first = sys.bind(&tex, true, None, None).unwrap();

        tex.source().destroy();
        tex.set_source(crate::texture::TextureSource::new(TextureSourceDescriptor::default()));
        let second = sys.get_render_target(&tex).unwrap();

        assert_ne!(first, second);
        assert!(sys.get(first).is_none());
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Destroy { .. })), 1);
    }

    #[test]
    fn swapped_source_yields_fresh_target() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let first = sys.bind(&tex, true, None, None).unwrap();

        let replacement = crate::texture::TextureSource::new(TextureSourceDescriptor {
            width: 16.0,
            height: 4.0,
            ..Default::default()
        });
        tex.set_source(replacement.clone());
        let second = sys.bind(&tex, true, None, None).unwrap();

        assert_ne!(first, second);
        assert!(sys.get(first).is_none());
        assert!(!replacement.is_destroyed());
        assert_eq!(sys.get(second).unwrap().pixel_width(), 16);
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Destroy { .. })), 1);
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Init { .. })), 2);
    }

    #[test]
    fn prune_releases_targets_with_swapped_sources() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let h = sys.bind(&tex, true, None, None).unwrap();
        tex.set_source(crate::texture::TextureSource::new(TextureSourceDescriptor::default()));

        assert_eq!(sys.prune_destroyed(), 1);
        assert!(sys.get(h).is_none());
    }

    #[test]
    fn prune_releases_targets_of_destroyed_sources() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let h = sys.bind(&tex, true, None, None).unwrap();
        tex.source().destroy();

        assert_eq!(sys.prune_destroyed(), 1);
        assert!(sys.get(h).is_none());
        assert!(!sys.has_gpu_render_target(h));
        assert!(sys.render_target().is_none());
    }

    // ── lazy gpu objects ──────────────────────────────────────────────────

    #[test]
    fn gpu_target_created_exactly_once() {
        let mut sys = system();
        let tex = texture(32.0, 32.0);
        let h = sys.get_render_target(&tex).unwrap();
        assert!(!sys.has_gpu_render_target(h));

        for _ in 0..5 {
            sys.get_gpu_render_target(h).unwrap();
        }
        sys.bind(&tex, true, None, None).unwrap();
        sys.bind(&tex, false, None, None).unwrap();

        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Init { .. })), 1);
    }

    #[test]
    fn repeated_resizes_reconcile_once_at_next_bind() {
        let mut sys = system();
        let tex = texture(32.0, 32.0);
        let h = sys.bind(&tex, true, None, None).unwrap();

        let target = sys.get_mut(h).unwrap();
        target.resize(40.0, 40.0, None);
        target.resize(50.0, 50.0, None);
        target.resize(64.0, 64.0, None);
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Resize { .. })), 0);

        sys.bind(&tex, false, None, None).unwrap();
        sys.bind(&tex, false, None, None).unwrap();
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Resize { .. })), 1);
        assert_eq!(sys.viewport(), PixelRect::from_size(64, 64));
    }

    #[test]
    fn source_resize_is_reconciled_before_pass_starts() {
        let mut sys = system();
        let tex = texture(32.0, 32.0);
        sys.bind(&tex, true, None, None).unwrap();

        tex.resize(100.0, 50.0, None);
        sys.bind(&tex, true, None, None).unwrap();

        let calls = &sys.adaptor().calls;
        let resize_at = calls.iter().position(|c| matches!(c, Call::Resize { .. })).unwrap();
        let last_start = calls.iter().rposition(|c| matches!(c, Call::Start { .. })).unwrap();
        assert!(resize_at < last_start);
        assert_eq!(sys.viewport(), PixelRect::from_size(100, 50));
    }

    #[test]
    fn root_targets_are_never_resized() {
        let mut sys = system();
        let canvas = Canvas::new(800, 600);
        sys.bind(&canvas, true, None, None).unwrap();
        canvas.set_pixel_size(1024, 768);
        sys.bind(&canvas, true, None, None).unwrap();

        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Resize { .. })), 0);
        assert_eq!(sys.viewport(), PixelRect::from_size(1024, 768));
    }

    #[test]
    fn msaa_requested_and_supported() {
        let mut sys = system();
        let tex = aa_texture(16.0, 16.0);
        sys.bind(&tex, true, None, None).unwrap();
        assert!(sys.adaptor().calls.contains(&Call::Init { target: tex_target_uid(&sys), sample_count: 4 }));
    }

    fn tex_target_uid(sys: &RenderTargetSystem<RecordingAdaptor>) -> u32 {
        sys.current_render_target().unwrap().uid()
    }

    #[test]
    fn msaa_degrades_without_backend_support() {
        let mut sys = RenderTargetSystem::new(RecordingAdaptor::new(1));
        let tex = aa_texture(16.0, 16.0);
        sys.bind(&tex, true, None, None).unwrap();
        let uid = tex_target_uid(&sys);
        assert!(sys.adaptor().calls.contains(&Call::Init { target: uid, sample_count: 1 }));
    }

    // ── bind / viewport / projection ──────────────────────────────────────

    #[test]
    fn bind_computes_viewport_and_projection() {
        let mut sys = system();
        let offscreen = texture(800.0, 600.0);
        sys.bind(&offscreen, true, None, None).unwrap();
        assert_eq!(sys.viewport(), PixelRect::from_size(800, 600));
        assert!((sys.projection_matrix().d - 2.0 / 600.0).abs() < 1e-7);

        let canvas = Canvas::new(800, 600);
        sys.bind(&canvas, true, None, None).unwrap();
        assert!((sys.projection_matrix().a - 2.0 / 800.0).abs() < 1e-7);
        assert!((sys.projection_matrix().d + 2.0 / 600.0).abs() < 1e-7);
    }

    #[test]
    fn viewport_prefers_explicit_then_texture_frame() {
        let mut sys = system();
        let tex = Texture::create(TextureSourceDescriptor {
            width: 100.0,
            height: 100.0,
            resolution: 2.0,
            ..Default::default()
        });
        tex.set_frame(Some(Rect::new(10.0, 10.0, 20.0, 30.0)));

        sys.bind(&tex, true, None, None).unwrap();
        assert_eq!(sys.viewport(), PixelRect::new(20, 20, 40, 60));

        sys.bind(&tex, true, None, Some(Rect::new(0.0, 0.0, 50.0, 50.0))).unwrap();
        assert_eq!(sys.viewport(), PixelRect::new(0, 0, 100, 100));
    }

    #[test]
    fn rebinding_same_target_does_not_notify() {
        let mut sys = system();
        let changes = Rc::new(Cell::new(0));
        let seen = changes.clone();
        sys.add_render_target_observer(Box::new(move |_, _| seen.set(seen.get() + 1)));

        let a = texture(8.0, 8.0);
        let b = texture(8.0, 8.0);
        sys.bind(&a, true, None, None).unwrap();
        sys.bind(&a, false, None, None).unwrap();
        assert_eq!(changes.get(), 1);

        sys.bind(&b, false, None, None).unwrap();
        assert_eq!(changes.get(), 2);

        let starts = sys.adaptor().starts();
        assert_eq!(starts[0].clear, Clear::ALL);
        assert_eq!(starts[1].clear, Clear::NONE);
    }

    #[test]
    fn color_attachments_are_unbound_before_pass() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        sys.bind(&tex, true, None, None).unwrap();
        let calls = &sys.adaptor().calls;
        let unbind = calls.iter().position(|c| *c == Call::Unbind { texture: tex.uid() }).unwrap();
        let start = calls.iter().position(|c| matches!(c, Call::Start { .. })).unwrap();
        assert!(unbind < start);
    }

    #[test]
    fn default_clear_color_fills_in() {
        let config = RenderTargetSystemConfig {
            default_clear_color: ColorRgba::new(0.1, 0.2, 0.3, 1.0),
            ..Default::default()
        };
        let mut sys = RenderTargetSystem::with_config(RecordingAdaptor::new(4), config);
        let tex = texture(8.0, 8.0);
        sys.bind(&tex, true, None, None).unwrap();
        assert_eq!(sys.adaptor().starts()[0].clear_color, ColorRgba::new(0.1, 0.2, 0.3, 1.0));
    }

    // ── stack ─────────────────────────────────────────────────────────────

    #[test]
    fn pop_restores_previous_without_clear() {
        let mut sys = system();
        let a = texture(100.0, 100.0);
        let b = texture(50.0, 50.0);

        let ha = sys.push(&a, true, None, None).unwrap();
        sys.push(&b, true, None, None).unwrap();
        sys.pop().unwrap();

        assert_eq!(sys.render_target(), Some(ha));
        assert_eq!(sys.viewport(), PixelRect::from_size(100, 100));
        let last = *sys.adaptor().starts().last().unwrap();
        assert_eq!(last.clear, Clear::NONE);
        assert_eq!(sys.stack_depth(), 1);
    }

    #[test]
    fn pop_restores_pushed_frame() {
        let mut sys = system();
        let a = texture(100.0, 100.0);
        let b = texture(50.0, 50.0);
        sys.push(&a, true, None, Some(Rect::new(10.0, 10.0, 20.0, 20.0))).unwrap();
        sys.push(&b, true, None, None).unwrap();
        sys.pop().unwrap();
        assert_eq!(sys.viewport(), PixelRect::new(10, 10, 20, 20));
    }

    #[test]
    fn pop_on_empty_stack_is_an_error() {
        let mut sys = system();
        assert!(matches!(sys.pop(), Err(Error::EmptyStack)));
    }

    #[test]
    fn render_start_resets_stack() {
        let mut sys = system();
        let canvas = Canvas::new(640, 480);
        let tex = texture(10.0, 10.0);
        sys.push(&tex, true, None, None).unwrap();
        sys.push(&tex, true, None, None).unwrap();

        let root = sys.render_start(RenderStart::new(&canvas)).unwrap();
        assert_eq!(sys.stack_depth(), 1);
        assert_eq!(sys.root_render_target(), Some(root));
        assert_eq!(sys.root_viewport(), PixelRect::from_size(640, 480));
        assert!(sys.is_rendering_to_screen());
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Prerender)), 1);

        sys.post_render();
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Postrender)), 1);
    }

    // ── clear ─────────────────────────────────────────────────────────────

    #[test]
    fn clear_none_is_a_noop() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        sys.bind(&tex, false, None, None).unwrap();
        sys.clear(None, Clear::NONE, None).unwrap();
        sys.clear(None, false, None).unwrap();
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Clear { .. })), 0);

        sys.clear(None, Clear::COLOR, Some(ColorRgba::black())).unwrap();
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Clear { .. })), 1);
    }

    #[test]
    fn clear_without_binding_is_an_error() {
        let mut sys = system();
        assert!(matches!(sys.clear(None, true, None), Err(Error::NothingBound)));
    }

    // ── copy ──────────────────────────────────────────────────────────────

    #[test]
    fn copy_is_clamped_before_reaching_adaptor() {
        let mut sys = system();
        let src = texture(10.0, 10.0);
        let dst = texture(32.0, 32.0);

        let region = sys.copy_to_texture(&src, &dst, (-5, -5), (20, 20), (0, 0)).unwrap().unwrap();
        assert_eq!((region.src_x, region.src_y), (0, 0));
        assert_eq!((region.dst_x, region.dst_y), (5, 5));
        assert_eq!((region.width, region.height), (10, 10));

        let none = sys.copy_to_texture(&src, &dst, (-50, 0), (20, 20), (0, 0)).unwrap();
        assert!(none.is_none());
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Copy { .. })), 1);
    }

    // ── read back ─────────────────────────────────────────────────────────

    #[test]
    fn msaa_clear_reads_back_after_finish() {
        let mut sys = system();
        let tex = aa_texture(4.0, 4.0);
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);

        sys.bind(&tex, Clear::COLOR, Some(red), None).unwrap();
        sys.finish_render_pass().unwrap();
        let pixels = sys.read_pixels(&tex, PixelRect::new(1, 1, 2, 2)).unwrap();

        assert_eq!(pixels.len(), 16);
        assert!(pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
        let calls = &sys.adaptor().calls;
        let finish = calls.iter().position(|c| matches!(c, Call::Finish { .. })).unwrap();
        let read = calls.iter().position(|c| matches!(c, Call::ReadPixels { .. })).unwrap();
        assert!(finish < read);
    }

    #[test]
    fn finish_without_binding_is_an_error() {
        let mut sys = system();
        assert!(matches!(sys.finish_render_pass(), Err(Error::NothingBound)));
    }

    // ── depth / stencil ───────────────────────────────────────────────────

    #[test]
    fn ensure_depth_stencil_rebinds_once() {
        let mut sys = system();
        let tex = texture(8.0, 8.0);
        let h = sys.bind(&tex, true, None, None).unwrap();

        sys.ensure_depth_stencil().unwrap();
        sys.ensure_depth_stencil().unwrap();

        let target = sys.get(h).unwrap();
        assert!(target.stencil());
        assert!(target.depth_stencil_texture().is_some());
        let starts = sys.adaptor().starts();
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[1].clear, Clear::NONE);
    }

    // ── destroy ───────────────────────────────────────────────────────────

    #[test]
    fn destroy_spares_caller_registered_targets() {
        let mut sys = system();

        let own = RenderTarget::new(RenderTargetDescriptor {
            width: 8.0,
            height: 8.0,
            color_textures: ColorTextures::Count(1),
            ..Default::default()
        })
        .unwrap();
        let own_color = own.color_texture().clone();
        let registered = sys.register_render_target(own);
        sys.bind(registered, true, None, None).unwrap();

        let wrapped = texture(8.0, 8.0);
        let h = sys.bind(&wrapped, true, None, None).unwrap();
        sys.ensure_depth_stencil().unwrap();
        let depth = sys.get(h).unwrap().depth_stencil_texture().unwrap().clone();

        sys.destroy();

        assert!(sys.is_empty());
        assert_eq!(sys.adaptor().count(|c| matches!(c, Call::Destroy { .. })), 2);
        assert!(!own_color.source().is_destroyed());
        assert!(!wrapped.source().is_destroyed());
        assert!(depth.source().is_destroyed());
    }
}
