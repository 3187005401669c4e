//! Check that resolving a uniformly colored supersampled target yields the same color at every texel.
//!
//! The scene target is only cleared, then resolved; the resolved texels are read back and compared to the clear
//! color. The test exits after its first frame, failing if any texel differs.

use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::{PipelineError, PipelineState},
  shader::Program,
  tess::Tess,
  texture::Dim2,
  Backend,
};

use crate::{
  graph::{FrameGraph, PassDesc, PassKind, Resource, Target},
  shadow_cubemap::{resolve, resolve_program, ColorTargets, ResolveShaderInterface},
  shared::fullscreen_quad,
  DemoError, Example, InputAction, LoopFeedback, PlatformServices,
};

// exactly representable, so that averaging loses nothing
const CLEAR_COLOR: [f32; 4] = [0.25, 0.5, 0.75, 1.];

const TARGET_SIZE: [u32; 2] = [64, 32];
const GRID: u32 = 2;

pub struct LocalExample {
  program: Program<(), (), ResolveShaderInterface>,
  quad: Tess<()>,
  targets: ColorTargets,
  graph: FrameGraph,
}

/// Texels of `texels` (RGBA, flattened) that differ from `color`, as `(index, texel)`.
pub fn mismatching_texels(texels: &[f32], color: [f32; 4]) -> Vec<(usize, [f32; 4])> {
  texels
    .chunks(4)
    .enumerate()
    .filter_map(|(i, texel)| {
      let matches =
        texel.len() == 4 && texel.iter().zip(&color).all(|(a, b)| (a - b).abs() <= 1e-6);

      if matches {
        None
      } else {
        let mut t = [0.; 4];
        t[..texel.len()].copy_from_slice(texel);
        Some((i, t))
      }
    })
    .collect()
}

/// Check that every texel of `texels` equals `color`, returning the number of texels checked.
pub fn check_texels(texels: &[f32], color: [f32; 4]) -> Result<usize, DemoError> {
  let mismatches = mismatching_texels(texels, color);

  match mismatches.first() {
    None => Ok(texels.len() / 4),

    Some(&(first, found)) => Err(DemoError::TexelMismatch {
      count: mismatches.len(),
      first,
      expected: color,
      found,
    }),
  }
}

impl Example for LocalExample {
  fn bootstrap(
    _: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, DemoError> {
    let program = resolve_program(context)?;
    let quad = fullscreen_quad(context)?;
    let targets = ColorTargets::new(context, TARGET_SIZE, GRID)?;

    let graph = FrameGraph::builder()
      .pass(
        PassDesc::new(
          "clear",
          PassKind::Color,
          Target::Offscreen {
            samples: targets.samples(),
          },
        )
        .writing(Resource::SceneColor),
      )
      .pass(
        PassDesc::new("resolve", PassKind::Resolve, Target::Resolved)
          .reading(Resource::SceneColor)
          .writing(Resource::ResolvedColor),
      )
      .build()?;

    Ok(LocalExample {
      program,
      quad,
      targets,
      graph,
    })
  }

  fn render_frame(
    mut self,
    _: f32,
    _: Framebuffer<Dim2, (), ()>,
    _: impl Iterator<Item = InputAction>,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> LoopFeedback<Self> {
    let program = &mut self.program;
    let quad = &self.quad;
    let targets = &mut self.targets;

    let render = self.graph.run(|pass| match pass.kind {
      PassKind::Resolve => resolve(context, program, quad, targets),

      _ => context
        .new_pipeline_gate()
        .pipeline(
          &targets.scene,
          &PipelineState::default().set_clear_color(CLEAR_COLOR),
          |_, _| Ok::<_, PipelineError>(()),
        )
        .assume()
        .into_result(),
    });

    if let Err(e) = render {
      return LoopFeedback::Abort(e.into());
    }

    let checked = self
      .targets
      .resolved
      .color_slot()
      .get_raw_texels()
      .map_err(DemoError::from)
      .and_then(|texels| check_texels(&texels, CLEAR_COLOR));

    match checked {
      Ok(count) => {
        log::info!("all {} resolved texels equal {:?}", count, CLEAR_COLOR);
        LoopFeedback::Exit
      }

      Err(e) => LoopFeedback::Abort(e),
    }
  }
}
