//! Ten rotated cubes sampling two blended textures, seen through the free-look camera.
//!
//! Move with WASD, go up and down with space and left shift, look around with the mouse and zoom with the wheel.

use cgmath::{Deg, InnerSpace as _, Matrix4, Vector3};
use luminance::UniformInterface;
use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::{PipelineError, PipelineState, TextureBinding},
  pixel::NormUnsigned,
  render_state::RenderState,
  shader::{types::Mat44, Program, Uniform},
  tess::Tess,
  texture::Dim2,
  Backend,
};

use crate::{
  camera::Camera,
  clock::FrameClock,
  geometry::CUBE,
  graph::{skip_pass, FrameGraph, PassKind},
  input::drive_camera,
  shared::{load_texture, mesh_tess, RGBATexture, SceneVertex, Semantics},
  DemoError, Example, Features, InputAction, LoopFeedback, PlatformServices, WINDOW_SIZE,
};

const VS: &str = include_str!("shaders/textured-cubes-vs.glsl");
const FS: &str = include_str!("shaders/textured-cubes-fs.glsl");

const CONTAINER_TEXTURE: &str = "container.jpg";
const FACE_TEXTURE: &str = "awesomeface.png";

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.;

#[rustfmt::skip]
const CUBE_POSITIONS: [[f32; 3]; 10] = [
  [ 0.0,  0.0,   0.0],
  [ 2.0,  5.0, -15.0],
  [-1.5, -2.2,  -2.5],
  [-3.8, -2.0, -12.3],
  [ 2.4, -0.4,  -3.5],
  [-1.7,  3.0,  -7.5],
  [ 1.3, -2.0,  -2.5],
  [ 1.5,  2.0,  -2.5],
  [ 1.5,  0.2,  -1.5],
  [-1.3,  1.0,  -1.5],
];

#[derive(UniformInterface)]
struct ShaderInterface {
  #[uniform(unbound)]
  projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  container: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  face: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

/// Model matrices of the cubes: each one is translated, then tilted by 20° more than the previous one.
pub fn cube_transforms() -> Vec<Matrix4<f32>> {
  let axis = Vector3::new(1., 0.3, 0.5).normalize();

  CUBE_POSITIONS
    .iter()
    .enumerate()
    .map(|(i, &p)| {
      Matrix4::from_translation(p.into()) * Matrix4::from_axis_angle(axis, Deg(20. * i as f32))
    })
    .collect()
}

pub struct LocalExample {
  program: Program<Semantics, (), ShaderInterface>,
  cube: Tess<SceneVertex>,
  container: RGBATexture,
  face: RGBATexture,
  transforms: Vec<Matrix4<f32>>,
  graph: FrameGraph,
  camera: Camera,
  clock: FrameClock,
  aspect_ratio: f32,
}

impl Example for LocalExample {
  fn features() -> Features {
    Features::none()
      .texture(CONTAINER_TEXTURE)
      .texture(FACE_TEXTURE)
  }

  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let program = context
      .new_shader_program::<Semantics, (), ShaderInterface>()
      .from_strings(VS, None, None, FS)?
      .ignore_warnings();

    let cube = mesh_tess(context, &CUBE)?;
    let container = load_texture(context, platform, CONTAINER_TEXTURE)?;
    let face = load_texture(context, platform, FACE_TEXTURE)?;

    let camera = Camera::new(
      Vector3::new(0., 0., 3.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      WINDOW_SIZE,
    );

    Ok(LocalExample {
      program,
      cube,
      container,
      face,
      transforms: cube_transforms(),
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

        InputAction::Resized { width, height } if width > 0 && height > 0 => {
          log::debug!("resized: {}×{}", width, height);
          self.aspect_ratio = width as f32 / height as f32;
        }

        _ => (),
      }
    }

    let projection = Mat44::new(self.camera.projection(self.aspect_ratio, Z_NEAR, Z_FAR));
    let view = Mat44::new(self.camera.view_matrix());
    let program = &mut self.program;
    let cube = &self.cube;
    let container = &mut self.container;
    let face = &mut self.face;
    let transforms = &self.transforms;
    let mut pipeline_gate = context.new_pipeline_gate();

    let render: Result<(), PipelineError> = self.graph.run(|pass| match pass.kind {
      PassKind::Color => pipeline_gate
        .pipeline(
          &back_buffer,
          &PipelineState::default().set_clear_color([0.2, 0.3, 0.3, 1.]),
          |pipeline, mut shd_gate| {
            let container = pipeline.bind_texture(container)?;
            let face = pipeline.bind_texture(face)?;

            shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.container, container.binding());
              iface.set(&uni.face, face.binding());

              for model in transforms {
                iface.set(&uni.model, Mat44::new(*model));

                rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                  tess_gate.render(cube)
                })?;
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
