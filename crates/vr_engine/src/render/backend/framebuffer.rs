//! Per-eye render targets over compositor swap chains
//!
//! Each eye owns a [`FrameBufferObject`]: a compositor-allocated ring of
//! color textures with one framebuffer per ring slot, plus whatever depth
//! and multisampling plumbing the chosen [`MsaaMode`] needs. The frame loop
//! is bind, draw, resolve, advance.

use log::{debug, warn};

use super::api::{
    FramebufferId, FramebufferTarget, GlApi, RenderTextureFormat, RenderbufferId, SwapChain,
    TextureId, FRAMEBUFFER_COMPLETE,
};
use super::deleter::DeleterHandle;
use crate::render::error::{RenderError, RenderResult};

/// How multisampling is realized for a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsaaMode {
    /// Single-sampled rendering straight into the swap-chain texture
    Off,
    /// Implicit resolve through the multisampled-render-to-texture extension
    RenderToTexture,
    /// Explicit multisampled renderbuffer resolved with a blit
    Blit,
}

/// Creation parameters for a [`FrameBufferObject`]
#[derive(Debug, Clone, Copy)]
pub struct RenderTextureInfo {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Requested sample count; 0 or 1 disables multisampling
    pub multisamples: u32,
    /// Allocate a depth swap chain so depth survives the resolve
    pub resolve_depth: bool,
    /// Color format for the swap-chain images
    pub format: RenderTextureFormat,
    /// Format for depth storage, chains and renderbuffers alike
    pub depth_format: RenderTextureFormat,
    /// Texture array layers; 2 for multiview stereo, otherwise 1
    pub layers: u32,
}

/// A swap-chain-backed render target for one eye
pub struct FrameBufferObject {
    width: u32,
    height: u32,
    samples: u32,
    mode: MsaaMode,
    color_format: RenderTextureFormat,
    depth_format: RenderTextureFormat,
    color_chain: Option<SwapChain>,
    depth_chain: Option<SwapChain>,
    // One per ring slot; the target drawn into when msaa is Off or implicit
    resolve_fbos: Vec<FramebufferId>,
    // Single multisampled intermediate shared by every slot, Blit mode only
    render_fbo: FramebufferId,
    color_rb: RenderbufferId,
    depth_rbs: Vec<RenderbufferId>,
    index: usize,
    deleter: DeleterHandle,
}

impl FrameBufferObject {
    /// Allocate the swap chains and attach a framebuffer per ring slot.
    ///
    /// The sampling strategy is chosen here: the implicit extension is used
    /// whenever it is present and depth does not need to survive the
    /// resolve, otherwise an explicit blit chain is built.
    pub fn create(
        gl: &dyn GlApi,
        deleter: DeleterHandle,
        info: &RenderTextureInfo,
    ) -> RenderResult<Self> {
        let samples = info.multisamples.max(1);
        let mode = if samples <= 1 {
            MsaaMode::Off
        } else if gl.has_multisampled_render_to_texture() && !info.resolve_depth {
            MsaaMode::RenderToTexture
        } else {
            MsaaMode::Blit
        };
        debug!(
            "creating {}x{} render target, {} samples, mode {:?}",
            info.width, info.height, samples, mode
        );

        let color_chain =
            gl.create_color_swap_chain(info.format, info.width, info.height, info.layers, 3)?;
        let depth_chain = if info.resolve_depth {
            Some(gl.create_depth_swap_chain(
                info.depth_format,
                info.width,
                info.height,
                info.layers,
                color_chain.length(),
            )?)
        } else {
            None
        };

        let mut fbo = Self {
            width: info.width,
            height: info.height,
            samples,
            mode,
            color_format: info.format,
            depth_format: info.depth_format,
            color_chain: Some(color_chain),
            depth_chain,
            resolve_fbos: Vec::new(),
            render_fbo: FramebufferId::NONE,
            color_rb: RenderbufferId::NONE,
            depth_rbs: Vec::new(),
            index: 0,
            deleter,
        };
        fbo.attach_all(gl)?;
        Ok(fbo)
    }

    fn attach_all(&mut self, gl: &dyn GlApi) -> RenderResult<()> {
        let images: Vec<TextureId> = self
            .color_chain
            .as_ref()
            .map(|c| c.images.clone())
            .unwrap_or_default();
        for (i, image) in images.iter().enumerate() {
            let resolve = gl.gen_framebuffer();
            gl.bind_framebuffer(FramebufferTarget::Both, resolve);
            match self.mode {
                MsaaMode::RenderToTexture => {
                    gl.framebuffer_color_texture_multisample(*image, 0, self.samples);
                }
                MsaaMode::Off | MsaaMode::Blit => {
                    gl.framebuffer_color_texture(*image, 0);
                }
            }
            if let Some(depth) = &self.depth_chain {
                gl.framebuffer_depth_texture(depth.images[i], 0);
            } else if self.mode != MsaaMode::Blit {
                let rb = gl.gen_renderbuffer();
                let rb_samples = if self.mode == MsaaMode::RenderToTexture {
                    self.samples
                } else {
                    1
                };
                gl.renderbuffer_storage_multisample(
                    rb,
                    self.depth_format,
                    self.width,
                    self.height,
                    rb_samples,
                );
                gl.framebuffer_depth_renderbuffer(rb);
                self.depth_rbs.push(rb);
            }
            let status = gl.check_framebuffer_status();
            if status != FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(FramebufferTarget::Both, FramebufferId::NONE);
                return Err(RenderError::FramebufferIncomplete(status));
            }
            self.resolve_fbos.push(resolve);
        }

        // The multisampled intermediate is slot-independent; one is enough
        // for the whole ring.
        if self.mode == MsaaMode::Blit {
            let render = gl.gen_framebuffer();
            gl.bind_framebuffer(FramebufferTarget::Both, render);

            let color_rb = gl.gen_renderbuffer();
            gl.renderbuffer_storage_multisample(
                color_rb,
                self.color_format,
                self.width,
                self.height,
                self.samples,
            );
            gl.framebuffer_color_renderbuffer(color_rb);
            self.color_rb = color_rb;

            let depth_rb = gl.gen_renderbuffer();
            gl.renderbuffer_storage_multisample(
                depth_rb,
                self.depth_format,
                self.width,
                self.height,
                self.samples,
            );
            gl.framebuffer_depth_renderbuffer(depth_rb);
            self.depth_rbs.push(depth_rb);

            let status = gl.check_framebuffer_status();
            if status != FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(FramebufferTarget::Both, FramebufferId::NONE);
                return Err(RenderError::FramebufferIncomplete(status));
            }
            self.render_fbo = render;
        }
        gl.bind_framebuffer(FramebufferTarget::Both, FramebufferId::NONE);
        Ok(())
    }

    /// Sampling strategy in effect
    pub fn mode(&self) -> MsaaMode {
        self.mode
    }

    /// Number of ring slots
    pub fn length(&self) -> usize {
        self.resolve_fbos.len()
    }

    /// Current ring position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Color texture for the current ring slot
    pub fn current_color_texture(&self) -> TextureId {
        self.color_chain
            .as_ref()
            .map(|c| c.images[self.index])
            .unwrap_or(TextureId::NONE)
    }

    /// Bind the current slot's draw target and set the viewport
    pub fn bind(&self, gl: &dyn GlApi) {
        let fbo = match self.mode {
            MsaaMode::Blit => self.render_fbo,
            _ => self.resolve_fbos[self.index],
        };
        gl.bind_framebuffer(FramebufferTarget::Both, fbo);
        gl.viewport(self.width, self.height);
    }

    /// Finish the current slot: resolve samples if needed, discard what the
    /// compositor will never read, and restore the default framebuffer.
    ///
    /// When a depth swap chain exists the blit carries depth along with
    /// color and depth is kept; otherwise depth is invalidated. The
    /// multisampled intermediate's color is always discardable once the
    /// blit has landed.
    pub fn resolve(&self, gl: &dyn GlApi) {
        if self.mode == MsaaMode::Blit {
            gl.bind_framebuffer(FramebufferTarget::Read, self.render_fbo);
            gl.bind_framebuffer(FramebufferTarget::Draw, self.resolve_fbos[self.index]);
            gl.blit_framebuffer(self.width, self.height, self.depth_chain.is_some());
            gl.invalidate_color();
        }
        if self.depth_chain.is_none() {
            gl.invalidate_depth();
        }
        gl.bind_framebuffer(FramebufferTarget::Both, FramebufferId::NONE);
    }

    /// Step to the next ring slot, wrapping at the chain length
    pub fn advance(&mut self) {
        if !self.resolve_fbos.is_empty() {
            self.index = (self.index + 1) % self.resolve_fbos.len();
        }
    }

    /// Release every driver object and both swap chains.
    ///
    /// Needs the live context for the compositor handles; anything left when
    /// the wrapper is dropped instead goes through the deferred deleter.
    pub fn destroy(&mut self, gl: &dyn GlApi) {
        self.queue_gl_objects();
        if let Some(chain) = self.color_chain.take() {
            gl.destroy_swap_chain(chain.handle);
        }
        if let Some(chain) = self.depth_chain.take() {
            gl.destroy_swap_chain(chain.handle);
        }
    }

    fn queue_gl_objects(&mut self) {
        for fbo in self.resolve_fbos.drain(..) {
            self.deleter.queue_framebuffer(fbo);
        }
        if self.render_fbo.is_valid() {
            self.deleter.queue_framebuffer(self.render_fbo);
            self.render_fbo = FramebufferId::NONE;
        }
        if self.color_rb.is_valid() {
            self.deleter.queue_renderbuffer(self.color_rb);
            self.color_rb = RenderbufferId::NONE;
        }
        for rb in self.depth_rbs.drain(..) {
            self.deleter.queue_renderbuffer(rb);
        }
    }
}

impl Drop for FrameBufferObject {
    fn drop(&mut self) {
        self.queue_gl_objects();
        if self.color_chain.is_some() || self.depth_chain.is_some() {
            // Compositor handles cannot go through the GL deleter
            warn!("render target dropped without destroy(), leaking swap chain");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::deleter::GlDeleter;
    use crate::render::backend::recording::RecordingGl;

    fn info(samples: u32, resolve_depth: bool) -> RenderTextureInfo {
        RenderTextureInfo {
            width: 1024,
            height: 1024,
            multisamples: samples,
            resolve_depth,
            format: RenderTextureFormat::Rgba8,
            depth_format: RenderTextureFormat::Depth24,
            layers: 1,
        }
    }

    #[test]
    fn test_single_sampled_mode_selection() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(1, false)).unwrap();
        assert_eq!(fbo.mode(), MsaaMode::Off);
        assert_eq!(fbo.length(), 3);
    }

    #[test]
    fn test_extension_preferred_when_depth_not_resolved() {
        let gl = RecordingGl::new();
        gl.has_msaa_rtt_ext.set(true);
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(4, false)).unwrap();
        assert_eq!(fbo.mode(), MsaaMode::RenderToTexture);
    }

    #[test]
    fn test_blit_forced_by_depth_resolve() {
        let gl = RecordingGl::new();
        gl.has_msaa_rtt_ext.set(true);
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(4, true)).unwrap();
        assert_eq!(fbo.mode(), MsaaMode::Blit);
        // Depth chain allocated alongside color
        assert!(fbo.depth_chain.is_some());
    }

    #[test]
    fn test_blit_fallback_without_extension() {
        let gl = RecordingGl::new();
        gl.has_msaa_rtt_ext.set(false);
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(2, false)).unwrap();
        assert_eq!(fbo.mode(), MsaaMode::Blit);
        assert!(fbo.render_fbo.is_valid());
        assert_eq!(fbo.resolve_fbos.len(), 3);
    }

    #[test]
    fn test_resolve_blits_only_in_blit_mode() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();

        let single = FrameBufferObject::create(&gl, deleter.handle(), &info(1, false)).unwrap();
        single.bind(&gl);
        single.resolve(&gl);
        assert_eq!(gl.blit_count.get(), 0);

        let msaa = FrameBufferObject::create(&gl, deleter.handle(), &info(4, false)).unwrap();
        assert_eq!(msaa.mode(), MsaaMode::Blit);
        msaa.bind(&gl);
        msaa.resolve(&gl);
        assert_eq!(gl.blit_count.get(), 1);
    }

    #[test]
    fn test_resolve_without_depth_chain_discards_depth() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(4, false)).unwrap();
        fbo.bind(&gl);
        fbo.resolve(&gl);

        // Color-only blit, multisampled color discarded, depth discarded
        assert_eq!(gl.depth_blit_count.get(), 0);
        assert_eq!(gl.invalidate_color_count.get(), 1);
        assert_eq!(gl.invalidate_depth_count.get(), 1);
    }

    #[test]
    fn test_resolve_carries_depth_into_depth_chain() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(4, true)).unwrap();
        assert_eq!(fbo.mode(), MsaaMode::Blit);
        fbo.bind(&gl);
        fbo.resolve(&gl);

        // Depth rides the blit into the depth chain and survives the frame
        assert_eq!(gl.depth_blit_count.get(), 1);
        assert_eq!(gl.invalidate_depth_count.get(), 0);
        assert_eq!(gl.invalidate_color_count.get(), 1);
    }

    #[test]
    fn test_requested_formats_reach_renderbuffer_storage() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let hdr = RenderTextureInfo {
            format: RenderTextureFormat::Rgba16f,
            depth_format: RenderTextureFormat::Depth24Stencil8,
            ..info(4, false)
        };
        let _fbo = FrameBufferObject::create(&gl, deleter.handle(), &hdr).unwrap();

        let formats = gl.renderbuffer_formats.borrow();
        assert!(formats.contains(&RenderTextureFormat::Rgba16f));
        assert!(formats.contains(&RenderTextureFormat::Depth24Stencil8));
        assert!(!formats.contains(&RenderTextureFormat::Rgba8));
        assert!(!formats.contains(&RenderTextureFormat::Depth24));
    }

    #[test]
    fn test_depth_chain_allocated_only_on_request() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let _fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(1, false)).unwrap();
        assert_eq!(gl.created_swap_chains.borrow().len(), 1);

        let _fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(1, true)).unwrap();
        assert_eq!(gl.created_swap_chains.borrow().len(), 3);
    }

    #[test]
    fn test_advance_wraps_to_start() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut fbo = FrameBufferObject::create(&gl, deleter.handle(), &info(1, false)).unwrap();

        let first = fbo.current_color_texture();
        for _ in 0..fbo.length() {
            fbo.advance();
        }
        assert_eq!(fbo.index(), 0);
        assert_eq!(fbo.current_color_texture(), first);
    }

    #[test]
    fn test_incomplete_framebuffer_is_an_error() {
        let gl = RecordingGl::new();
        gl.framebuffer_status.set(0x8CD6);
        let deleter = GlDeleter::new();
        let err = FrameBufferObject::create(&gl, deleter.handle(), &info(1, false))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, RenderError::FramebufferIncomplete(0x8CD6)));
    }

    #[test]
    fn test_destroy_releases_chains_and_queues_objects() {
        let gl = RecordingGl::new();
        let mut deleter = GlDeleter::new();
        let mut fbo =
            FrameBufferObject::create(&gl, deleter.handle(), &info(1, true)).unwrap();
        fbo.destroy(&gl);
        drop(fbo);

        assert_eq!(gl.destroyed_swap_chains.borrow().len(), 2);
        deleter.process_queues(&gl);
        assert_eq!(gl.deleted_framebuffers.borrow().len(), 1);
    }
}
