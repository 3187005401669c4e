//! A brick wall and a cube with parallax mapping.
//!
//! On top of normal mapping, a depth map shifts the texture coordinates along the view direction, so that the bricks
//! seem to stick out of the flat geometry. Lighting is computed in tangent space, with the tangents generated from
//! the mesh texture coordinates.
//!
//! Press enter to cycle between no parallax, steep parallax and parallax occlusion mapping.

use cgmath::{Deg, Matrix4, Vector3};
use luminance::UniformInterface;
use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::{PipelineError, PipelineState, TextureBinding},
  pixel::NormUnsigned,
  render_state::RenderState,
  shader::{
    types::{Mat44, Vec3},
    Program, Uniform,
  },
  tess::Tess,
  texture::Dim2,
  Backend,
};

use crate::{
  camera::Camera,
  clock::FrameClock,
  geometry::{CUBE, PLANE},
  graph::{skip_pass, FrameGraph, PassKind},
  input::drive_camera,
  shared::{load_texture, mesh_tess, RGBATexture, SceneVertex, Semantics},
  DemoError, Example, Features, InputAction, LoopFeedback, PlatformServices, WINDOW_SIZE,
};

const VS: &str = include_str!("shaders/parallax-vs.glsl");
const FS: &str = include_str!("shaders/parallax-fs.glsl");

const DIFFUSE_TEXTURE: &str = "bricks2.jpg";
const NORMAL_TEXTURE: &str = "bricks2_normal.jpg";
const DEPTH_TEXTURE: &str = "bricks2_disp.jpg";

/// Depth of the deepest texel of the depth map, in texture coordinate units.
pub const HEIGHT_SCALE: f32 = 0.1;

/// Depth layers stepped through when looking straight at a surface.
pub const MIN_LAYERS: f32 = 8.;

/// Depth layers stepped through when looking at a surface from a grazing angle.
pub const MAX_LAYERS: f32 = 32.;

const LIGHT_POSITION: [f32; 3] = [0.5, 1., 0.3];

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.;

/// How texture coordinates are shifted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParallaxMode {
  /// Plain normal mapping.
  Off,
  /// Step through depth layers until the depth map is crossed.
  Steep,
  /// Steep parallax, refined by interpolating between the two layers around the crossing.
  Occlusion,
}

impl ParallaxMode {
  pub fn next(self) -> Self {
    match self {
      ParallaxMode::Off => ParallaxMode::Steep,
      ParallaxMode::Steep => ParallaxMode::Occlusion,
      ParallaxMode::Occlusion => ParallaxMode::Off,
    }
  }

  /// Value of the `mode` uniform.
  pub fn shader_mode(self) -> i32 {
    match self {
      ParallaxMode::Off => 0,
      ParallaxMode::Steep => 1,
      ParallaxMode::Occlusion => 2,
    }
  }
}

/// Model matrix of the wall: the unit plane stood up, facing +Z.
pub fn wall_transform() -> Matrix4<f32> {
  Matrix4::from_angle_x(Deg(90.))
}

/// Model matrix of the cube, next to the wall.
pub fn cube_transform() -> Matrix4<f32> {
  Matrix4::from_translation(Vector3::new(1.8, 0., 0.5)) * Matrix4::from_scale(0.5)
}

#[derive(UniformInterface)]
struct ShaderInterface {
  #[uniform(unbound)]
  projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  diffuse_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  normal_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  depth_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  light_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  view_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  height_scale: Uniform<f32>,
  #[uniform(unbound)]
  min_layers: Uniform<f32>,
  #[uniform(unbound)]
  max_layers: Uniform<f32>,
  #[uniform(unbound)]
  mode: Uniform<i32>,
}

pub struct LocalExample {
  program: Program<Semantics, (), ShaderInterface>,
  wall: Tess<SceneVertex>,
  cube: Tess<SceneVertex>,
  diffuse: RGBATexture,
  normal: RGBATexture,
  depth: RGBATexture,
  mode: ParallaxMode,
  graph: FrameGraph,
  camera: Camera,
  clock: FrameClock,
  aspect_ratio: f32,
}

impl Example for LocalExample {
  fn features() -> Features {
    Features::none()
      .texture(DIFFUSE_TEXTURE)
      .texture(NORMAL_TEXTURE)
      .texture(DEPTH_TEXTURE)
  }

  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let program = context
      .new_shader_program::<Semantics, (), ShaderInterface>()
      .from_strings(VS, None, None, FS)?
      .ignore_warnings();

    let wall = mesh_tess(context, &PLANE)?;
    let cube = mesh_tess(context, &CUBE)?;

    let diffuse = load_texture(context, platform, DIFFUSE_TEXTURE)?;
    let normal = load_texture(context, platform, NORMAL_TEXTURE)?;
    let depth = load_texture(context, platform, DEPTH_TEXTURE)?;

    let camera = Camera::new(
      Vector3::new(0., 0., 3.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      WINDOW_SIZE,
    );

    Ok(LocalExample {
      program,
      wall,
      cube,
      diffuse,
      normal,
      depth,
      mode: ParallaxMode::Occlusion,
      graph: FrameGraph::single_pass(),
      camera,
      clock: FrameClock::new(0.),
      aspect_ratio: WINDOW_SIZE[0] as f32 / WINDOW_SIZE[1] as f32,
    })
  }

  fn render_frame(
    mut self,
    time: f32,
    back_buffer: Framebuffer<Dim2, (), ()>,
    actions: impl Iterator<Item = InputAction>,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> LoopFeedback<Self> {
    let delta = self.clock.tick(time);

    for action in actions {
      if drive_camera(&mut self.camera, &action, delta) {
        continue;
      }

      match action {
        InputAction::Quit => return LoopFeedback::Exit,

        InputAction::MainToggle => {
          self.mode = self.mode.next();
          log::info!("parallax mode: {:?}", self.mode);
        }

        InputAction::Resized { width, height } if width > 0 && height > 0 => {
          log::debug!("resized: {}×{}", width, height);
          self.aspect_ratio = width as f32 / height as f32;
        }

        _ => (),
      }
    }

    let projection = Mat44::new(self.camera.projection(self.aspect_ratio, Z_NEAR, Z_FAR));
    let view = Mat44::new(self.camera.view_matrix());
    let eye = self.camera.position();
    let view_pos = Vec3::new(eye.x, eye.y, eye.z);
    let light_pos = Vec3::new(LIGHT_POSITION[0], LIGHT_POSITION[1], LIGHT_POSITION[2]);
    let models = [
      (&self.wall, Mat44::new(wall_transform())),
      (&self.cube, Mat44::new(cube_transform())),
    ];
    let mode = self.mode.shader_mode();

    let program = &mut self.program;
    let diffuse = &mut self.diffuse;
    let normal = &mut self.normal;
    let depth = &mut self.depth;
    let mut pipeline_gate = context.new_pipeline_gate();

    let render: Result<(), PipelineError> = self.graph.run(|pass| match pass.kind {
      PassKind::Color => pipeline_gate
        .pipeline(
          &back_buffer,
          &PipelineState::default().set_clear_color([0.1, 0.1, 0.1, 1.]),
          |pipeline, mut shd_gate| {
            let diffuse = pipeline.bind_texture(diffuse)?;
            let normal = pipeline.bind_texture(normal)?;
            let depth = pipeline.bind_texture(depth)?;

            shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.diffuse_map, diffuse.binding());
              iface.set(&uni.normal_map, normal.binding());
              iface.set(&uni.depth_map, depth.binding());
              iface.set(&uni.light_pos, light_pos);
              iface.set(&uni.view_pos, view_pos);
              iface.set(&uni.height_scale, HEIGHT_SCALE);
              iface.set(&uni.min_layers, MIN_LAYERS);
              iface.set(&uni.max_layers, MAX_LAYERS);
              iface.set(&uni.mode, mode);

              for &(tess, model) in &models {
                iface.set(&uni.model, model);
                rdr_gate.render(&RenderState::default(), |mut tess_gate| tess_gate.render(tess))?;
              }

              Ok(())
            })
          },
        )
        .assume()
        .into_result(),

      _ => skip_pass(pass),
    });

    match render {
      Ok(()) => LoopFeedback::Continue(self),
      Err(e) => LoopFeedback::Abort(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cgmath::{InnerSpace as _, Vector4};

  #[test]
  fn modes_cycle_through_all_techniques() {
    let mut mode = ParallaxMode::Off;
    let mut seen = Vec::new();

    for _ in 0..3 {
      seen.push(mode.shader_mode());
      mode = mode.next();
    }

    assert_eq!(mode, ParallaxMode::Off);
    assert_eq!(seen, [0, 1, 2]);
  }

  #[test]
  fn wall_faces_the_camera() {
    let n = wall_transform() * Vector4::new(0., 1., 0., 0.);
    let t = wall_transform() * Vector4::new(1., 0., 0., 0.);

    assert!((n - Vector4::new(0., 0., 1., 0.)).magnitude() < 1e-6);
    // the tangent stays in the wall plane, so that tangent space matches the depth map
    assert!((t - Vector4::new(1., 0., 0., 0.)).magnitude() < 1e-6);
  }

  #[test]
  fn layers_are_ordered() {
    assert!(MIN_LAYERS >= 1. && MIN_LAYERS < MAX_LAYERS);
    assert!(HEIGHT_SCALE > 0.);
  }

  #[test]
  fn depth_map_is_requested() {
    let features = LocalExample::features();

    assert_eq!(
      features.textures(),
      [DIFFUSE_TEXTURE, NORMAL_TEXTURE, DEPTH_TEXTURE]
    );
  }
}
