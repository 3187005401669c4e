//! A planet surrounded by a ring of asteroids.
//!
//! The rocks are drawn with a single instanced draw call: every rock shares the same mesh and gets its model matrix
//! from per-instance vertex attributes. The field is generated once at bootstrap from a seeded random generator, so
//! two runs show the exact same ring.
//!
//! Both meshes are loaded from model files. If a model cannot be loaded, a cube is drawn in its place.

use cgmath::{Deg, InnerSpace as _, Matrix4, Rad, Vector3};
use luminance::UniformInterface;
use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::{PipelineError, PipelineState, TextureBinding},
  pixel::NormUnsigned,
  render_state::RenderState,
  shader::{types::Mat44, Program, Uniform},
  tess::{Mode, Tess, TessError},
  texture::Dim2,
  Backend,
};
use rand::{rngs::StdRng, Rng as _, SeedableRng as _};

use crate::{
  camera::Camera,
  clock::FrameClock,
  geometry::{MeshVertex, CUBE},
  graph::{skip_pass, FrameGraph, PassKind},
  input::drive_camera,
  mesh::load_model,
  shared::{
    load_texture, mesh_tess, scene_vertices, ModelInstance, RGBATexture, SceneVertex, Semantics,
  },
  DemoError, Example, Features, InputAction, LoopFeedback, PlatformServices, WINDOW_SIZE,
};

const ROCK_VS: &str = include_str!("shaders/asteroids-vs.glsl");
const PLANET_VS: &str = include_str!("shaders/planet-vs.glsl");
const FS: &str = include_str!("shaders/asteroids-fs.glsl");

const PLANET_MODEL: &str = "planet.obj";
const ROCK_MODEL: &str = "rock.obj";
const PLANET_TEXTURE: &str = "planet.png";
const ROCK_TEXTURE: &str = "rock.png";

/// Number of rocks in the field.
pub const ASTEROID_COUNT: usize = 100_000;

/// Distance from the planet centre to the middle of the ring.
pub const RING_RADIUS: f32 = 150.;

/// Maximum displacement of a rock away from the ring, on each axis.
pub const RING_OFFSET: f32 = 25.;

// the ring is flatter than it is wide
const RING_HEIGHT_FACTOR: f32 = 0.4;

const MIN_ROCK_SCALE: f32 = 0.05;
const MAX_ROCK_SCALE: f32 = 0.25;

const PLANET_SCALE: f32 = 4.;

const FIELD_SEED: u64 = 0x5eed;

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.;

/// Model matrices of `count` rocks spread around a ring.
///
/// Rocks are evenly spaced by angle, then pushed off the ring by a random displacement in `[-offset, offset)` on
/// each axis (the vertical one being squashed). Each rock is also randomly scaled and rotated around a fixed axis.
pub fn asteroid_field(count: usize, radius: f32, offset: f32, seed: u64) -> Vec<Matrix4<f32>> {
  let mut rng = StdRng::seed_from_u64(seed);
  let axis = Vector3::new(0.4, 0.6, 0.8).normalize();
  let mut transforms = Vec::with_capacity(count);

  for i in 0..count {
    let angle: Rad<f32> = Deg(i as f32 / count as f32 * 360.).into();
    let (sin, cos) = angle.0.sin_cos();

    let mut displacement = || {
      if offset > 0. {
        rng.gen_range(-offset..offset)
      } else {
        0.
      }
    };

    let x = sin * radius + displacement();
    let y = displacement() * RING_HEIGHT_FACTOR;
    let z = cos * radius + displacement();

    let scale = rng.gen_range(MIN_ROCK_SCALE..MAX_ROCK_SCALE);
    let rotation = Deg(rng.gen_range(0f32..360.));

    transforms.push(
      Matrix4::from_translation(Vector3::new(x, y, z))
        * Matrix4::from_scale(scale)
        * Matrix4::from_axis_angle(axis, rotation),
    );
  }

  transforms
}

#[derive(UniformInterface)]
struct PlanetShaderInterface {
  #[uniform(unbound)]
  projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  diffuse_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

#[derive(UniformInterface)]
struct RockShaderInterface {
  #[uniform(unbound)]
  projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  diffuse_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

// Load a model by name, falling back to a cube.
fn load_mesh(platform: &mut impl PlatformServices, name: &str) -> Vec<MeshVertex> {
  load_model(platform, name).unwrap_or_else(|e| {
    log::error!("cannot load model {}: {}; using a cube", name, e);
    CUBE.to_vec()
  })
}

fn rock_tess(
  context: &mut impl GraphicsContext<Backend = Backend>,
  vertices: &[MeshVertex],
  transforms: &[Matrix4<f32>],
) -> Result<Tess<SceneVertex, (), ModelInstance>, TessError> {
  let instances: Vec<ModelInstance> = transforms
    .iter()
    .map(|&m| ModelInstance::from(Into::<[[f32; 4]; 4]>::into(m)))
    .collect();

  context
    .new_tess()
    .set_vertices(scene_vertices(vertices))
    .set_instances(instances)
    .set_mode(Mode::Triangle)
    .build()
}

pub struct LocalExample {
  planet_program: Program<Semantics, (), PlanetShaderInterface>,
  rock_program: Program<Semantics, (), RockShaderInterface>,
  planet: Tess<SceneVertex>,
  rocks: Tess<SceneVertex, (), ModelInstance>,
  planet_texture: RGBATexture,
  rock_texture: RGBATexture,
  graph: FrameGraph,
  camera: Camera,
  clock: FrameClock,
  aspect_ratio: f32,
}

impl Example for LocalExample {
  fn features() -> Features {
    Features::none()
      .model(PLANET_MODEL)
      .model(ROCK_MODEL)
      .texture(PLANET_TEXTURE)
      .texture(ROCK_TEXTURE)
  }

  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let planet_program = context
      .new_shader_program::<Semantics, (), PlanetShaderInterface>()
      .from_strings(PLANET_VS, None, None, FS)?
      .ignore_warnings();

    let rock_program = context
      .new_shader_program::<Semantics, (), RockShaderInterface>()
      .from_strings(ROCK_VS, None, None, FS)?
      .ignore_warnings();

    let planet_mesh = load_mesh(platform, PLANET_MODEL);
    let rock_mesh = load_mesh(platform, ROCK_MODEL);

    let transforms = asteroid_field(ASTEROID_COUNT, RING_RADIUS, RING_OFFSET, FIELD_SEED);
    log::info!("generated {} asteroids", transforms.len());

    let planet = mesh_tess(context, &planet_mesh)?;
    let rocks = rock_tess(context, &rock_mesh, &transforms)?;

    let planet_texture = load_texture(context, platform, PLANET_TEXTURE)?;
    let rock_texture = load_texture(context, platform, ROCK_TEXTURE)?;

    let camera = Camera::new(
      Vector3::new(0., 30., 220.),
      Vector3::new(0., -0.15, -1.),
      Vector3::unit_y(),
      WINDOW_SIZE,
    );

    Ok(LocalExample {
      planet_program,
      rock_program,
      planet,
      rocks,
      planet_texture,
      rock_texture,
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
    let planet_model = Mat44::new(Matrix4::from_scale(PLANET_SCALE));
    let planet_program = &mut self.planet_program;
    let rock_program = &mut self.rock_program;
    let planet = &self.planet;
    let rocks = &self.rocks;
    let planet_texture = &mut self.planet_texture;
    let rock_texture = &mut self.rock_texture;
    let mut pipeline_gate = context.new_pipeline_gate();

    let render: Result<(), PipelineError> = self.graph.run(|pass| match pass.kind {
      PassKind::Color => pipeline_gate
        .pipeline(
          &back_buffer,
          &PipelineState::default().set_clear_color([0.05, 0.05, 0.05, 1.]),
          |pipeline, mut shd_gate| {
            let planet_texture = pipeline.bind_texture(planet_texture)?;

            shd_gate.shade(planet_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.model, planet_model);
              iface.set(&uni.diffuse_map, planet_texture.binding());

              rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                tess_gate.render(planet)
              })
            })?;

            let rock_texture = pipeline.bind_texture(rock_texture)?;

            shd_gate.shade(rock_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.diffuse_map, rock_texture.binding());

              rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                tess_gate.render(rocks)
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
  use cgmath::{InnerSpace as _, Vector4};

  #[test]
  fn field_has_requested_size() {
    assert_eq!(asteroid_field(1000, RING_RADIUS, RING_OFFSET, 1).len(), 1000);
    assert!(asteroid_field(0, RING_RADIUS, RING_OFFSET, 1).is_empty());
  }

  #[test]
  fn field_is_deterministic() {
    let a = asteroid_field(100, RING_RADIUS, RING_OFFSET, 42);
    let b = asteroid_field(100, RING_RADIUS, RING_OFFSET, 42);
    let c = asteroid_field(100, RING_RADIUS, RING_OFFSET, 43);

    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn rocks_stay_around_the_ring() {
    // each horizontal axis is displaced by at most the offset
    let slack = RING_OFFSET * std::f32::consts::SQRT_2 + 1e-3;

    for m in asteroid_field(5000, RING_RADIUS, RING_OFFSET, 7) {
      let centre = m * Vector4::new(0., 0., 0., 1.);
      let distance = (centre.x * centre.x + centre.z * centre.z).sqrt();

      assert!((distance - RING_RADIUS).abs() <= slack, "{}", distance);
      assert!(centre.y.abs() <= RING_OFFSET * RING_HEIGHT_FACTOR + 1e-3);
    }
  }

  #[test]
  fn rocks_are_scaled_within_bounds() {
    for m in asteroid_field(5000, RING_RADIUS, RING_OFFSET, 7) {
      // rotation keeps column lengths, so they all equal the scale
      let scale = m.x.truncate().magnitude();

      assert!(scale >= MIN_ROCK_SCALE - 1e-5 && scale < MAX_ROCK_SCALE + 1e-5, "{}", scale);
      assert!((m.y.truncate().magnitude() - scale).abs() < 1e-4);
    }
  }

  #[test]
  fn flat_ring_without_offset() {
    for m in asteroid_field(360, 10., 0., 3) {
      let centre = m * Vector4::new(0., 0., 0., 1.);

      assert!(centre.y.abs() < 1e-6);
      assert!(((centre.x * centre.x + centre.z * centre.z).sqrt() - 10.).abs() < 1e-3);
    }
  }
}
