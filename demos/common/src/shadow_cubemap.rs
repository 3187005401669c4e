//! A normal-mapped room lit by a point light casting omnidirectional shadows.
//!
//! The room holds two cubes and a glTF scene model. The room is still drawn if the model cannot be loaded.
//!
//! Every frame runs the same sequence of passes:
//!
//! 1. The scene depth is captured from the light into a cubemap, all six faces at once thanks to a geometry shader
//!    routing each triangle to every layer.
//! 2. The scene is shaded (Blinn-Phong, normal maps, shadow test against the cubemap) into an offscreen HDR target.
//!    That target is supersampled: it is `SUPERSAMPLE_GRID` times larger than the window on each axis.
//! 3. The supersampled target is resolved (box filtered) into a window-sized texture.
//! 4. The resolved texture is tone mapped and gamma corrected onto the screen.
//!
//! Press enter to switch supersampling on and off. When it’s off, the color pass renders at window size and the
//! resolve pass is skipped entirely.

use cgmath::{Deg, Matrix4, Vector3};
use luminance::UniformInterface;
use luminance_front::{
  context::GraphicsContext,
  face_culling::{FaceCulling, FaceCullingMode, FaceCullingOrder},
  framebuffer::Framebuffer,
  pipeline::{PipelineState, TextureBinding},
  pixel::{Depth32F, Floating, NormUnsigned, RGBA32F},
  render_state::RenderState,
  shader::{
    types::{Mat44, Vec3},
    Program, Uniform,
  },
  tess::Tess,
  texture::{Cubemap, Dim2, Sampler},
  Backend,
};

use crate::{
  camera::Camera,
  clock::FrameClock,
  geometry::{CUBE, PLANE},
  graph::{FrameGraph, PassKind, Resource},
  input::drive_camera,
  mesh::load_model,
  shadow::{PointShadow, SHADOW_SIZE},
  shared::{
    fullscreen_quad, load_texture, mesh_tess, nearest_sampler, RGBATexture, SceneVertex, Semantics,
  },
  DemoError, Example, Features, InputAction, LoopFeedback, PlatformServices, WINDOW_SIZE,
};

const DEPTH_VS: &str = include_str!("shaders/shadow-depth-vs.glsl");
const DEPTH_GS: &str = include_str!("shaders/shadow-depth-gs.glsl");
const DEPTH_FS: &str = include_str!("shaders/shadow-depth-fs.glsl");
const LIT_VS: &str = include_str!("shaders/lit-vs.glsl");
const LIT_FS: &str = include_str!("shaders/lit-fs.glsl");
const FULLSCREEN_VS: &str = include_str!("shaders/fullscreen-vs.glsl");
const RESOLVE_FS: &str = include_str!("shaders/resolve-fs.glsl");
const POST_PROCESS_FS: &str = include_str!("shaders/post-process-fs.glsl");

const DIFFUSE_TEXTURE: &str = "brickwall.jpg";
const NORMAL_TEXTURE: &str = "brickwall_normal.jpg";
const SCENE_MODEL: &str = "shadow/scene.gltf";
const SCENE_BUFFER: &str = "shadow/scene.bin";

/// Samples per pixel along each axis of the supersampled color target.
pub const SUPERSAMPLE_GRID: u32 = 2;

const LIGHT_POSITION: [f32; 3] = [0., 5., 0.];
const SHADOW_NEAR: f32 = 1.;
const SHADOW_FAR: f32 = 25.;

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.;

const CLEAR_COLOR: [f32; 4] = [1., 1., 1., 1.];
const EXPOSURE: f32 = 1.;

// Each room wall is the unit plane, moved in place, rotated to face inwards and scaled to a 10×10 square.
const ROOM: [([f32; 3], f32, [f32; 3]); 6] = [
  ([5., 5., 0.], 90., [0., 0., 1.]),
  ([-5., 5., 0.], 90., [0., 0., -1.]),
  ([0., 10., 0.], 180., [1., 0., 0.]),
  ([0., 0., 0.], 0., [1., 0., 0.]),
  ([0., 5., -5.], 90., [1., 0., 0.]),
  ([0., 5., 5.], 90., [-1., 0., 0.]),
];

const ROOM_SCALE: f32 = 5.;

/// Model matrices of the six walls of the room.
pub fn room_transforms() -> Vec<Matrix4<f32>> {
  ROOM
    .iter()
    .map(|&(translation, angle, axis)| {
      Matrix4::from_translation(translation.into())
        * Matrix4::from_axis_angle(axis.into(), Deg(angle))
        * Matrix4::from_scale(ROOM_SCALE)
    })
    .collect()
}

/// Model matrices of the two cubes standing in the room.
pub fn cube_transforms() -> Vec<Matrix4<f32>> {
  vec![
    Matrix4::from_translation(Vector3::new(3., 0.5, 0.)),
    Matrix4::from_translation(Vector3::new(0., 2.5, 0.)) * Matrix4::from_scale(0.5),
  ]
}

/// Model matrix of the scene model.
///
/// The scene is exported upside down and twenty times larger than the room.
pub fn scene_model_transform() -> Matrix4<f32> {
  Matrix4::from_scale(0.05) * Matrix4::from_angle_x(Deg(180.))
}

#[derive(UniformInterface)]
struct DepthShaderInterface {
  #[uniform(unbound)]
  model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_pxp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_nxp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_pyp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_nyp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_pzp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  shadow_nzp: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  light_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  far_plane: Uniform<f32>,
}

#[derive(UniformInterface)]
struct LitShaderInterface {
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
  shadow_map: Uniform<TextureBinding<Cubemap, Floating>>,
  #[uniform(unbound)]
  light_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  view_pos: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  far_plane: Uniform<f32>,
}

#[derive(UniformInterface)]
pub struct ResolveShaderInterface {
  #[uniform(unbound)]
  scene: Uniform<TextureBinding<Dim2, Floating>>,
  #[uniform(unbound)]
  grid: Uniform<i32>,
}

#[derive(UniformInterface)]
struct PostProcessShaderInterface {
  #[uniform(unbound)]
  color: Uniform<TextureBinding<Dim2, Floating>>,
  #[uniform(unbound)]
  exposure: Uniform<f32>,
}

/// Supersampled scene color.
pub type SceneTarget = Framebuffer<Dim2, RGBA32F, Depth32F>;

/// Window-sized, single-sample color.
pub type ResolvedTarget = Framebuffer<Dim2, RGBA32F, ()>;

/// The window-size dependent render targets.
pub struct ColorTargets {
  pub scene: SceneTarget,
  pub resolved: ResolvedTarget,
  pub grid: u32,
}

impl ColorTargets {
  /// Create the targets for a `size` window; the scene target is `grid` times larger on each axis.
  pub fn new(
    context: &mut impl GraphicsContext<Backend = Backend>,
    size: [u32; 2],
    grid: u32,
  ) -> Result<Self, DemoError> {
    let grid = grid.max(1);
    let size = [size[0].max(1), size[1].max(1)];

    log::info!(
      "creating {}×{} color targets with {}×{} samples per pixel",
      size[0],
      size[1],
      grid,
      grid
    );

    let scene = context.new_framebuffer::<Dim2, RGBA32F, Depth32F>(
      [size[0] * grid, size[1] * grid],
      0,
      nearest_sampler(),
    )?;
    let resolved = context.new_framebuffer::<Dim2, RGBA32F, ()>(size, 0, nearest_sampler())?;

    Ok(ColorTargets {
      scene,
      resolved,
      grid,
    })
  }

  /// Samples per window pixel.
  pub fn samples(&self) -> u32 {
    self.grid * self.grid
  }
}

/// Box-filter shader used by the resolve pass.
pub fn resolve_program(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<Program<(), (), ResolveShaderInterface>, DemoError> {
  let program = context
    .new_shader_program::<(), (), ResolveShaderInterface>()
    .from_strings(FULLSCREEN_VS, None, None, RESOLVE_FS)?
    .ignore_warnings();

  Ok(program)
}

/// Issue the resolve pass: average every `grid`×`grid` block of the scene target into the resolved target.
pub fn resolve(
  context: &mut impl GraphicsContext<Backend = Backend>,
  program: &mut Program<(), (), ResolveShaderInterface>,
  quad: &Tess<()>,
  targets: &mut ColorTargets,
) -> Result<(), luminance_front::pipeline::PipelineError> {
  let grid = targets.grid as i32;
  let scene = &mut targets.scene;

  context
    .new_pipeline_gate()
    .pipeline(
      &targets.resolved,
      &PipelineState::default(),
      |pipeline, mut shd_gate| {
        let scene = pipeline.bind_texture(scene.color_slot())?;

        shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
          iface.set(&uni.scene, scene.binding());
          iface.set(&uni.grid, grid);

          rdr_gate.render(&RenderState::default().set_depth_test(None), |mut tess_gate| {
            tess_gate.render(quad)
          })
        })
      },
    )
    .assume()
    .into_result()
}

pub struct LocalExample {
  depth_program: Program<Semantics, (), DepthShaderInterface>,
  lit_program: Program<Semantics, (), LitShaderInterface>,
  resolve_program: Program<(), (), ResolveShaderInterface>,
  post_process_program: Program<(), (), PostProcessShaderInterface>,
  plane: Tess<SceneVertex>,
  cube: Tess<SceneVertex>,
  scene_model: Option<Tess<SceneVertex>>,
  quad: Tess<()>,
  diffuse: RGBATexture,
  normal: RGBATexture,
  shadow_map: Framebuffer<Cubemap, (), Depth32F>,
  targets: ColorTargets,
  graph: FrameGraph,
  shadow: PointShadow,
  room: Vec<Matrix4<f32>>,
  cubes: Vec<Matrix4<f32>>,
  camera: Camera,
  clock: FrameClock,
  window_size: [u32; 2],
}

impl LocalExample {
  // Recreate the color targets and the graph for a new window size or sample count. On failure, everything is kept
  // as is.
  fn reconfigure(
    &mut self,
    context: &mut impl GraphicsContext<Backend = Backend>,
    size: [u32; 2],
    grid: u32,
  ) {
    let reconfigured = ColorTargets::new(context, size, grid).and_then(|targets| {
      let graph = FrameGraph::shadowed_post_process(targets.samples())?;
      Ok((targets, graph))
    });

    match reconfigured {
      Ok((targets, graph)) => {
        self.targets = targets;
        self.graph = graph;
        self.window_size = size;
      }

      Err(e) => log::error!("cannot recreate render targets, keeping the previous ones: {}", e),
    }
  }
}

impl Example for LocalExample {
  fn features() -> Features {
    Features::none()
      .texture(DIFFUSE_TEXTURE)
      .texture(NORMAL_TEXTURE)
      .model(SCENE_MODEL)
      .model(SCENE_BUFFER)
  }

  fn bootstrap(
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let depth_program = context
      .new_shader_program::<Semantics, (), DepthShaderInterface>()
      .from_strings(DEPTH_VS, None, Some(DEPTH_GS), DEPTH_FS)?
      .ignore_warnings();

    let lit_program = context
      .new_shader_program::<Semantics, (), LitShaderInterface>()
      .from_strings(LIT_VS, None, None, LIT_FS)?
      .ignore_warnings();

    let resolve_program = resolve_program(context)?;

    let post_process_program = context
      .new_shader_program::<(), (), PostProcessShaderInterface>()
      .from_strings(FULLSCREEN_VS, None, None, POST_PROCESS_FS)?
      .ignore_warnings();

    let plane = mesh_tess(context, &PLANE)?;
    let cube = mesh_tess(context, &CUBE)?;
    let quad = fullscreen_quad(context)?;

    let scene_model = match load_model(platform, SCENE_MODEL) {
      Ok(vertices) => Some(mesh_tess(context, &vertices)?),

      Err(e) => {
        log::error!("cannot load model {}: {}; leaving it out", SCENE_MODEL, e);
        None
      }
    };

    let diffuse = load_texture(context, platform, DIFFUSE_TEXTURE)?;
    let normal = load_texture(context, platform, NORMAL_TEXTURE)?;

    // the six faces are attached as layers; the geometry shader picks the layer
    let shadow_map =
      context.new_framebuffer::<Cubemap, (), Depth32F>(SHADOW_SIZE, 0, Sampler::default())?;

    let targets = ColorTargets::new(context, WINDOW_SIZE, SUPERSAMPLE_GRID)?;
    let graph = FrameGraph::shadowed_post_process(targets.samples())?;

    let camera = Camera::new(
      Vector3::new(0., 3., 4.),
      Vector3::new(0., -0.5, -1.),
      Vector3::unit_y(),
      WINDOW_SIZE,
    );

    Ok(LocalExample {
      depth_program,
      lit_program,
      resolve_program,
      post_process_program,
      plane,
      cube,
      scene_model,
      quad,
      diffuse,
      normal,
      shadow_map,
      targets,
      graph,
      shadow: PointShadow::new(LIGHT_POSITION.into(), SHADOW_NEAR, SHADOW_FAR),
      room: room_transforms(),
      cubes: cube_transforms(),
      camera,
      clock: FrameClock::new(0.),
      window_size: WINDOW_SIZE,
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
          let grid = if self.targets.grid > 1 {
            1
          } else {
            SUPERSAMPLE_GRID
          };

          log::info!("switching to {}×{} samples per pixel", grid, grid);
          self.reconfigure(context, self.window_size, grid);
        }

        InputAction::Resized { width, height } if width > 0 && height > 0 => {
          log::debug!("resized: {}×{}", width, height);
          let grid = self.targets.grid;
          self.reconfigure(context, [width, height], grid);
        }

        _ => (),
      }
    }

    let aspect_ratio = self.window_size[0] as f32 / self.window_size[1] as f32;
    let projection = Mat44::new(self.camera.projection(aspect_ratio, Z_NEAR, Z_FAR));
    let view = Mat44::new(self.camera.view_matrix());
    let eye = self.camera.position();
    let view_pos = Vec3::new(eye.x, eye.y, eye.z);
    let light = self.shadow.light_position;
    let light_pos = Vec3::new(light.x, light.y, light.z);
    let far_plane = self.shadow.far;
    let [pxp, nxp, pyp, nyp, pzp, nzp] = self.shadow.face_transforms();

    let depth_program = &mut self.depth_program;
    let lit_program = &mut self.lit_program;
    let resolve_program = &mut self.resolve_program;
    let post_process_program = &mut self.post_process_program;
    let plane = &self.plane;
    let cube = &self.cube;
    let scene_model = self.scene_model.as_ref();
    let scene_model_transform = Mat44::new(scene_model_transform());
    let quad = &self.quad;
    let diffuse = &mut self.diffuse;
    let normal = &mut self.normal;
    let shadow_map = &mut self.shadow_map;
    let targets = &mut self.targets;
    let room = &self.room;
    let cubes = &self.cubes;

    let lit_state = RenderState::default()
      .set_face_culling(FaceCulling::new(FaceCullingOrder::CCW, FaceCullingMode::Back));
    let fullscreen_state = RenderState::default().set_depth_test(None);

    let render = self.graph.run(|pass| match pass.kind {
      PassKind::DepthCapture => context
        .new_pipeline_gate()
        .pipeline(
          &*shadow_map,
          &PipelineState::default(),
          |_, mut shd_gate| {
            shd_gate.shade(depth_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.shadow_pxp, Mat44::new(pxp));
              iface.set(&uni.shadow_nxp, Mat44::new(nxp));
              iface.set(&uni.shadow_pyp, Mat44::new(pyp));
              iface.set(&uni.shadow_nyp, Mat44::new(nyp));
              iface.set(&uni.shadow_pzp, Mat44::new(pzp));
              iface.set(&uni.shadow_nzp, Mat44::new(nzp));
              iface.set(&uni.light_pos, light_pos);
              iface.set(&uni.far_plane, far_plane);

              for model in room {
                iface.set(&uni.model, Mat44::new(*model));
                rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                  tess_gate.render(plane)
                })?;
              }

              for model in cubes {
                iface.set(&uni.model, Mat44::new(*model));
                rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                  tess_gate.render(cube)
                })?;
              }

              if let Some(scene_model) = scene_model {
                iface.set(&uni.model, scene_model_transform);
                rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                  tess_gate.render(scene_model)
                })?;
              }

              Ok(())
            })
          },
        )
        .assume()
        .into_result(),

      PassKind::Color => context
        .new_pipeline_gate()
        .pipeline(
          &targets.scene,
          &PipelineState::default().set_clear_color(CLEAR_COLOR),
          |pipeline, mut shd_gate| {
            let shadow_map = pipeline.bind_texture(shadow_map.depth_stencil_slot())?;
            let diffuse = pipeline.bind_texture(diffuse)?;
            let normal = pipeline.bind_texture(normal)?;

            shd_gate.shade(lit_program, |mut iface, uni, mut rdr_gate| {
              iface.set(&uni.projection, projection);
              iface.set(&uni.view, view);
              iface.set(&uni.diffuse_map, diffuse.binding());
              iface.set(&uni.normal_map, normal.binding());
              iface.set(&uni.shadow_map, shadow_map.binding());
              iface.set(&uni.light_pos, light_pos);
              iface.set(&uni.view_pos, view_pos);
              iface.set(&uni.far_plane, far_plane);

              for model in room {
                iface.set(&uni.model, Mat44::new(*model));
                rdr_gate.render(&lit_state, |mut tess_gate| tess_gate.render(plane))?;
              }

              for model in cubes {
                iface.set(&uni.model, Mat44::new(*model));
                rdr_gate.render(&lit_state, |mut tess_gate| tess_gate.render(cube))?;
              }

              // the model winding is unknown, so it is not culled
              if let Some(scene_model) = scene_model {
                iface.set(&uni.model, scene_model_transform);
                rdr_gate.render(&RenderState::default(), |mut tess_gate| {
                  tess_gate.render(scene_model)
                })?;
              }

              Ok(())
            })
          },
        )
        .assume()
        .into_result(),

      PassKind::Resolve => resolve(context, resolve_program, quad, targets),

      PassKind::PostProcess => {
        let ColorTargets {
          scene, resolved, ..
        } = &mut *targets;

        let source = match pass.reads.first() {
          Some(Resource::ResolvedColor) => resolved.color_slot(),
          _ => scene.color_slot(),
        };

        context
          .new_pipeline_gate()
          .pipeline(
            &back_buffer,
            &PipelineState::default().set_clear_color(CLEAR_COLOR),
            |pipeline, mut shd_gate| {
              let color = pipeline.bind_texture(source)?;

              shd_gate.shade(post_process_program, |mut iface, uni, mut rdr_gate| {
                iface.set(&uni.color, color.binding());
                iface.set(&uni.exposure, EXPOSURE);

                rdr_gate.render(&fullscreen_state, |mut tess_gate| tess_gate.render(quad))
              })
            },
          )
          .assume()
          .into_result()
      }
    });

    match render {
      Ok(()) => LoopFeedback::Continue(self),
      Err(e) => LoopFeedback::Abort(e.into()),
    }
  }
}
