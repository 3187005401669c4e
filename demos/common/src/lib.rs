//! Free-look rendering demos.
//!
//! This crate provides a set of OpenGL demos that can be run by any platform runner. The demos are platform-agnostic
//! on purpose: window creation, event polling and file access live in the runner, which hands the demos abstract
//! [`InputAction`]s and a [`PlatformServices`] implementation.
//!
//! # Demo architecture
//!
//! Every demo is a module exposing a `LocalExample` type implementing [`Example`]. Two pieces are shared by all of
//! them:
//!
//! - [`camera::Camera`], a free-look camera driven by keyboard, mouse and scroll input through
//!   [`input::drive_camera`], with frame-rate independent movement computed from a [`clock::FrameClock`].
//! - [`graph::FrameGraph`], an ordered, validated list of render passes executed once per frame. The shadow demo uses
//!   the full depth capture → color → resolve → post-process sequence; the simpler demos use a single pass.
//!
//! # Error handling
//!
//! Setting a demo up can fail (shader compilation, framebuffer creation, …); those failures are reported as
//! [`DemoError`] by [`Example::bootstrap`]. A frame that cannot be rendered stops the demo with
//! [`LoopFeedback::Abort`]. Missing textures and models are not fatal: they are logged and replaced by placeholders so
//! that the demo keeps running.

use luminance_front::{
  context::GraphicsContext, framebuffer::Framebuffer, framebuffer::FramebufferError,
  pipeline::PipelineError, shader::ProgramError, tess::TessError, texture::Dim2,
  texture::TextureError, Backend,
};
use std::{error::Error, fmt};

pub mod asteroids;
pub mod camera;
pub mod clock;
pub mod geometry;
pub mod graph;
pub mod input;
pub mod mesh;
pub mod parallax_mapping;
pub mod shadow;
pub mod shadow_cubemap;
pub mod shared;
pub mod skybox;
pub mod textured_cubes;

#[cfg(feature = "funtest")]
pub mod funtest_resolve_solid_color;

use crate::{camera::Movement, graph::GraphError};

/// Initial window size, in pixels. Demos use it as their viewport until the first resize notification.
pub const WINDOW_SIZE: [u32; 2] = [1280, 720];

/// Demo interface.
pub trait Example: Sized {
  /// Resources the demo wants the platform to preload.
  fn features() -> Features {
    Features::none()
  }

  /// Bootstrap the demo.
  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError>;

  /// Render a frame of the demo.
  ///
  /// `time` is the number of seconds elapsed since the runner started.
  fn render_frame(
    self,
    time: f32,
    back_buffer: Framebuffer<Dim2, (), ()>,
    actions: impl Iterator<Item = InputAction>,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> LoopFeedback<Self>;
}

/// A type used to pass “inputs” to demos.
#[derive(Clone, Debug, PartialEq)]
pub enum InputAction {
  /// Quit the application.
  Quit,

  /// Main action. Typically used to switch an effect on and off.
  MainToggle,

  /// A movement key is held down this frame.
  Move(Movement),

  /// The cursor moved to the given window-space position.
  CursorMoved { x: f32, y: f32 },

  /// The cursor position is no longer continuous with the previous samples (focus regained, cursor re-captured).
  CursorReset,

  /// Vertical scroll.
  VScroll { amount: f32 },

  /// Framebuffer size changed.
  Resized { width: u32, height: u32 },
}

/// What to do after a frame.
#[derive(Debug)]
pub enum LoopFeedback<T> {
  Continue(T),
  Exit,
  /// Stop because the demo cannot go on; the runner reports the error and exits with a failure status.
  Abort(DemoError),
}

/// Services the platform must provide to the demos.
pub trait PlatformServices {
  type FetchError: fmt::Display;

  /// Get a 2D texture image, already flipped so that its first row is the bottom one.
  fn fetch_texture(&mut self, name: &str) -> Result<&image::RgbaImage, Self::FetchError>;

  /// Get a cubemap face image, in its natural (top-down) orientation.
  fn fetch_cubemap_face(&mut self, name: &str) -> Result<&image::RgbImage, Self::FetchError>;

  /// Get the source of a Wavefront OBJ model.
  fn fetch_model(&mut self, name: &str) -> Result<&str, Self::FetchError>;

  /// Get the raw content of a binary model file, such as a glTF document or one of its buffers.
  fn fetch_model_data(&mut self, name: &str) -> Result<&[u8], Self::FetchError>;
}

/// Resources a demo asks the platform to load before bootstrapping it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Features {
  textures: Vec<String>,
  cubemap_faces: Vec<String>,
  models: Vec<String>,
}

impl Features {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn texture(mut self, name: impl Into<String>) -> Self {
    self.textures.push(name.into());
    self
  }

  pub fn cubemap_face(mut self, name: impl Into<String>) -> Self {
    self.cubemap_faces.push(name.into());
    self
  }

  pub fn model(mut self, name: impl Into<String>) -> Self {
    self.models.push(name.into());
    self
  }

  pub fn textures(&self) -> &[String] {
    &self.textures
  }

  pub fn cubemap_faces(&self) -> &[String] {
    &self.cubemap_faces
  }

  pub fn models(&self) -> &[String] {
    &self.models
  }
}

/// Everything that can go wrong while setting up or resizing a demo.
#[derive(Debug)]
pub enum DemoError {
  Program(ProgramError),
  Tess(TessError),
  Framebuffer(FramebufferError),
  Texture(TextureError),
  Pipeline(PipelineError),
  Graph(GraphError),
  InvalidCubemapFace {
    name: String,
    width: u32,
    height: u32,
  },
  TexelMismatch {
    count: usize,
    first: usize,
    expected: [f32; 4],
    found: [f32; 4],
  },
}

impl fmt::Display for DemoError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      DemoError::Program(ref e) => write!(f, "cannot create shader program: {}", e),
      DemoError::Tess(ref e) => write!(f, "cannot create tessellation: {}", e),
      DemoError::Framebuffer(ref e) => write!(f, "framebuffer is not complete: {}", e),
      DemoError::Texture(ref e) => write!(f, "cannot create texture: {}", e),
      DemoError::Pipeline(ref e) => write!(f, "cannot render: {}", e),
      DemoError::Graph(ref e) => write!(f, "invalid render graph: {}", e),
      DemoError::InvalidCubemapFace {
        ref name,
        width,
        height,
      } => write!(
        f,
        "cubemap face {} must be square and match the other faces (got {}×{})",
        name, width, height
      ),
      DemoError::TexelMismatch {
        count,
        first,
        expected,
        found,
      } => write!(
        f,
        "{} texels differ from {:?}; texel {} is {:?}",
        count, expected, first, found
      ),
    }
  }
}

impl Error for DemoError {}

impl From<ProgramError> for DemoError {
  fn from(e: ProgramError) -> Self {
    DemoError::Program(e)
  }
}

impl From<TessError> for DemoError {
  fn from(e: TessError) -> Self {
    DemoError::Tess(e)
  }
}

impl From<FramebufferError> for DemoError {
  fn from(e: FramebufferError) -> Self {
    DemoError::Framebuffer(e)
  }
}

impl From<TextureError> for DemoError {
  fn from(e: TextureError) -> Self {
    DemoError::Texture(e)
  }
}

impl From<PipelineError> for DemoError {
  fn from(e: PipelineError) -> Self {
    DemoError::Pipeline(e)
  }
}

impl From<GraphError> for DemoError {
  fn from(e: GraphError) -> Self {
    DemoError::Graph(e)
  }
}
