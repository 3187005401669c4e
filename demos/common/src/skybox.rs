//! A skybox around an environment-mapped cube.
//!
//! The skybox is a cubemap assembled from six face images, in right, left, top, bottom, front and back order. Face
//! images are uploaded as they are stored on disk, without the vertical flip applied to regular textures.
//!
//! The skybox is rendered first, as a full screen quad whose fragments look up the cubemap along the view ray. It
//! writes no depth, so the cube drawn afterwards always ends up in front of it. The cube reflects the skybox around
//! it.

use cgmath::{Matrix4, SquareMatrix as _, Vector3, Vector4};
use luminance::UniformInterface;
use luminance_front::{
  context::GraphicsContext,
  depth_stencil::Write,
  framebuffer::Framebuffer,
  pipeline::{PipelineError, PipelineState, TextureBinding},
  pixel::NormUnsigned,
  render_state::RenderState,
  shader::{
    types::{Mat44, Vec3},
    Program, Uniform,
  },
  tess::Tess,
  texture::{Cubemap, Dim2},
  Backend,
};

use crate::{
  camera::Camera,
  clock::FrameClock,
  geometry::CUBE,
  graph::{skip_pass, FrameGraph, PassKind},
  input::drive_camera,
  shared::{fullscreen_quad, load_cubemap, mesh_tess, RGBCubemap, SceneVertex, Semantics},
  DemoError, Example, Features, InputAction, LoopFeedback, PlatformServices, WINDOW_SIZE,
};

const SKYBOX_VS: &str = include_str!("shaders/skybox-vs.glsl");
const SKYBOX_FS: &str = include_str!("shaders/skybox-fs.glsl");
const ENV_MAP_VS: &str = include_str!("shaders/env-mapping-vs.glsl");
const ENV_MAP_FS: &str = include_str!("shaders/env-mapping-fs.glsl");

/// Face images, in cubemap face order.
pub const SKYBOX_FACES: [&str; 6] = [
  "right.jpg",
  "left.jpg",
  "top.jpg",
  "bottom.jpg",
  "front.jpg",
  "back.jpg",
];

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.;

#[derive(UniformInterface)]
struct SkyboxShaderInterface {
  #[uniform(unbound)]
  inv_view_projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  skybox: Uniform<TextureBinding<Cubemap, NormUnsigned>>,
}

#[derive(UniformInterface)]
struct EnvironmentMappingShaderInterface {
  #[uniform(unbound)]
  projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  environment: Uniform<TextureBinding<Cubemap, NormUnsigned>>,
}

/// Matrix bringing clip space back to world-space directions, ignoring where the camera stands.
///
/// The skybox is infinitely far away: only the camera orientation matters, so the translation of `view` is dropped
/// before inverting. A non-invertible matrix yields the identity.
pub fn skybox_inverse_view_projection(
  projection: Matrix4<f32>,
  view: Matrix4<f32>,
) -> Matrix4<f32> {
  let mut rotation = view;
  rotation.w = Vector4::new(0., 0., 0., 1.);

  (projection * rotation)
    .invert()
    .unwrap_or_else(Matrix4::identity)
}

pub struct LocalExample {
  skybox: RGBCubemap,
  skybox_program: Program<(), (), SkyboxShaderInterface>,
  env_map_program: Program<Semantics, (), EnvironmentMappingShaderInterface>,
  fullscreen_quad: Tess<()>,
  cube: Tess<SceneVertex>,
  graph: FrameGraph,
  camera: Camera,
  clock: FrameClock,
  aspect_ratio: f32,
}

impl Example for LocalExample {
  fn features() -> Features {
    SKYBOX_FACES
      .iter()
      .fold(Features::none(), |features, face| features.cubemap_face(*face))
  }

  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let skybox = load_cubemap(context, platform, &SKYBOX_FACES)?;

    let skybox_program = context
      .new_shader_program::<(), (), SkyboxShaderInterface>()
      .from_strings(SKYBOX_VS, None, None, SKYBOX_FS)?
      .ignore_warnings();

    let env_map_program = context
      .new_shader_program::<Semantics, (), EnvironmentMappingShaderInterface>()
      .from_strings(ENV_MAP_VS, None, None, ENV_MAP_FS)?
      .ignore_warnings();

    let fullscreen_quad = fullscreen_quad(context)?;
    let cube = mesh_tess(context, &CUBE)?;

    let camera = Camera::new(
      Vector3::new(0., 0., 3.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      WINDOW_SIZE,
    );

    Ok(LocalExample {
      skybox,
      skybox_program,
      env_map_program,
      fullscreen_quad,
      cube,
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

    let projection = self.camera.projection(self.aspect_ratio, Z_NEAR, Z_FAR);
    let view = self.camera.view_matrix();
    let inv_view_projection = Mat44::new(skybox_inverse_view_projection(projection, view));
    let projection = Mat44::new(projection);
    let view = Mat44::new(view);
    let eye = self.camera.position();
    let view_pos = Vec3::new(eye.x, eye.y, eye.z);

    let skybox = &mut self.skybox;
    let skybox_program = &mut self.skybox_program;
    let env_map_program = &mut self.env_map_program;
    let fullscreen_quad = &self.fullscreen_quad;
    let cube = &self.cube;
    let mut pipeline_gate = context.new_pipeline_gate();

    // the skybox lies behind everything, so it neither tests nor writes depth
    let skybox_state = RenderState::default()
      .set_depth_test(None)
      .set_depth_write(Write::Off);

    let render: Result<(), PipelineError> = self.graph.run(|pass| match pass.kind {
      PassKind::Color => pipeline_gate
        .pipeline(
          &back_buffer,
          &PipelineState::default(),
          |pipeline, mut shd_gate| {
            let environment_map = pipeline.bind_texture(skybox)?;

            shd_gate.shade(skybox_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.inv_view_projection, inv_view_projection);
              iface.set(&uni.skybox, environment_map.binding());

              rdr_gate.render(&skybox_state, |mut tess_gate| {
                tess_gate.render(fullscreen_quad)
              })
            })?;

            shd_gate.shade(env_map_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.model, Mat44::new(Matrix4::identity()));
              iface.set(&uni.view_pos, view_pos);
              iface.set(&uni.environment, environment_map.binding());

              rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                tess_gate.render(cube)
              })
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
  use cgmath::{perspective, Deg, InnerSpace as _, Point3, SquareMatrix as _};

  #[test]
  fn faces_are_requested_in_order() {
    let features = LocalExample::features();

    assert_eq!(features.cubemap_faces(), &SKYBOX_FACES[..]);
    assert!(features.textures().is_empty());
  }

  #[test]
  fn camera_translation_does_not_move_the_sky() {
    let projection = perspective(Deg(45.), 16. / 9., 0.1, 100.);
    let target = Vector3::new(1., 0.5, -1.);

    let look_from = |eye: Point3<f32>| Matrix4::look_at_rh(eye, eye + target, Vector3::unit_y());

    let a = skybox_inverse_view_projection(projection, look_from(Point3::new(0., 0., 0.)));
    let b = skybox_inverse_view_projection(projection, look_from(Point3::new(10., -3., 7.)));

    for (ca, cb) in [(a.x, b.x), (a.y, b.y), (a.z, b.z), (a.w, b.w)] {
      assert!((ca - cb).magnitude() < 1e-4);
    }
  }

  #[test]
  fn screen_centre_looks_forward() {
    let projection = perspective(Deg(45.), 1., 0.1, 100.);
    let front = Vector3::new(0., 0., -1.);
    let view = Matrix4::look_at_rh(
      Point3::new(2., 2., 2.),
      Point3::new(2., 2., 1.),
      Vector3::unit_y(),
    );

    let far = skybox_inverse_view_projection(projection, view) * Vector4::new(0., 0., 1., 1.);
    let dir = (far.truncate() / far.w).normalize();

    assert!((dir - front).magnitude() < 1e-4, "{:?}", dir);
  }

  #[test]
  fn singular_matrix_falls_back_to_identity() {
    let m = skybox_inverse_view_projection(Matrix4::from_scale(0.), Matrix4::identity());

    assert_eq!(m, Matrix4::identity());
  }
}
