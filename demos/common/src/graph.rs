//! Per-frame render pass sequencing.
//!
//! A [`FrameGraph`] is an ordered list of [`PassDesc`]s. Each pass declares the resources it reads and writes; the
//! graph is validated once, when built, so that at run time passes can simply be issued in declaration order. The
//! graph only orders command submission: the GPU driver takes care of synchronising a write with a later read.

use log::{trace, warn};
use std::fmt;

/// Resources passes exchange within a frame.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Resource {
  /// Depth cubemap captured from the light.
  ShadowDepth,
  /// Lit scene color, possibly supersampled.
  SceneColor,
  /// Single-sample copy of the scene color.
  ResolvedColor,
  /// The visible window surface.
  Surface,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PassKind {
  DepthCapture,
  Color,
  Resolve,
  PostProcess,
}

/// Where a pass renders to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Target {
  DepthCubemap,
  Offscreen { samples: u32 },
  Resolved,
  Surface,
}

/// Description of a single render pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PassDesc {
  pub name: &'static str,
  pub kind: PassKind,
  pub target: Target,
  pub reads: Vec<Resource>,
  pub writes: Vec<Resource>,
}

impl PassDesc {
  pub fn new(name: &'static str, kind: PassKind, target: Target) -> Self {
    PassDesc {
      name,
      kind,
      target,
      reads: Vec::new(),
      writes: Vec::new(),
    }
  }

  pub fn reading(mut self, resource: Resource) -> Self {
    self.reads.push(resource);
    self
  }

  pub fn writing(mut self, resource: Resource) -> Self {
    self.writes.push(resource);
    self
  }
}

/// Reasons a list of passes cannot form a frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GraphError {
  Empty,
  ReadBeforeWrite {
    pass: &'static str,
    resource: Resource,
  },
  MultipleWriters {
    resource: Resource,
    first: &'static str,
    second: &'static str,
  },
  SurfaceNotLast {
    pass: &'static str,
  },
}

impl fmt::Display for GraphError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      GraphError::Empty => f.write_str("a frame needs at least one pass"),

      GraphError::ReadBeforeWrite { pass, resource } => write!(
        f,
        "pass {} reads {:?}, which no earlier pass writes",
        pass, resource
      ),

      GraphError::MultipleWriters {
        resource,
        first,
        second,
      } => write!(
        f,
        "{:?} is written by both {} and {}",
        resource, first, second
      ),

      GraphError::SurfaceNotLast { pass } => {
        write!(f, "pass {} writes the surface but is not the last pass", pass)
      }
    }
  }
}

impl std::error::Error for GraphError {}

#[derive(Debug, Default)]
pub struct FrameGraphBuilder {
  passes: Vec<PassDesc>,
}

impl FrameGraphBuilder {
  pub fn pass(mut self, pass: PassDesc) -> Self {
    self.passes.push(pass);
    self
  }

  /// Validate the pass ordering and produce the graph.
  pub fn build(self) -> Result<FrameGraph, GraphError> {
    if self.passes.is_empty() {
      return Err(GraphError::Empty);
    }

    let last = self.passes.len() - 1;
    let mut writers: Vec<(Resource, &'static str)> = Vec::new();

    for (i, pass) in self.passes.iter().enumerate() {
      for &resource in &pass.reads {
        if !writers.iter().any(|&(r, _)| r == resource) {
          return Err(GraphError::ReadBeforeWrite {
            pass: pass.name,
            resource,
          });
        }
      }

      for &resource in &pass.writes {
        if let Some(&(_, first)) = writers.iter().find(|&&(r, _)| r == resource) {
          return Err(GraphError::MultipleWriters {
            resource,
            first,
            second: pass.name,
          });
        }

        if resource == Resource::Surface && i != last {
          return Err(GraphError::SurfaceNotLast { pass: pass.name });
        }

        writers.push((resource, pass.name));
      }
    }

    Ok(FrameGraph {
      passes: self.passes,
    })
  }
}

/// A validated, ordered list of passes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameGraph {
  passes: Vec<PassDesc>,
}

impl FrameGraph {
  pub fn builder() -> FrameGraphBuilder {
    FrameGraphBuilder::default()
  }

  /// A single color pass straight to the surface.
  pub fn single_pass() -> Self {
    FrameGraph {
      passes: vec![
        PassDesc::new("color", PassKind::Color, Target::Surface).writing(Resource::Surface)
      ],
    }
  }

  /// Depth capture, then color into an offscreen target with `samples` samples per pixel, then resolve (only if
  /// `samples > 1`), then post-process to the surface.
  pub fn shadowed_post_process(samples: u32) -> Result<Self, GraphError> {
    let samples = samples.max(1);

    let mut builder = FrameGraph::builder()
      .pass(
        PassDesc::new("depth capture", PassKind::DepthCapture, Target::DepthCubemap)
          .writing(Resource::ShadowDepth),
      )
      .pass(
        PassDesc::new("color", PassKind::Color, Target::Offscreen { samples })
          .reading(Resource::ShadowDepth)
          .writing(Resource::SceneColor),
      );

    let post_input = if samples > 1 {
      builder = builder.pass(
        PassDesc::new("resolve", PassKind::Resolve, Target::Resolved)
          .reading(Resource::SceneColor)
          .writing(Resource::ResolvedColor),
      );

      Resource::ResolvedColor
    } else {
      Resource::SceneColor
    };

    builder
      .pass(
        PassDesc::new("post process", PassKind::PostProcess, Target::Surface)
          .reading(post_input)
          .writing(Resource::Surface),
      )
      .build()
  }

  pub fn passes(&self) -> &[PassDesc] {
    &self.passes
  }

  pub fn contains(&self, kind: PassKind) -> bool {
    self.passes.iter().any(|pass| pass.kind == kind)
  }

  /// Issue every pass in order, stopping at the first failure.
  pub fn run<E>(&self, mut issue: impl FnMut(&PassDesc) -> Result<(), E>) -> Result<(), E> {
    for pass in &self.passes {
      trace!("issuing pass {} ({:?} → {:?})", pass.name, pass.kind, pass.target);
      issue(pass)?;
    }

    Ok(())
  }
}

/// Issue nothing for `pass`, for demos that have nothing to draw in passes of its kind.
pub fn skip_pass<E>(pass: &PassDesc) -> Result<(), E> {
  warn!("nothing to issue for pass {} ({:?})", pass.name, pass.kind);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn empty_graph_is_rejected() {
    assert_eq!(FrameGraph::builder().build(), Err(GraphError::Empty));
  }

  #[test]
  fn read_before_write_is_rejected() {
    let graph = FrameGraph::builder()
      .pass(
        PassDesc::new("color", PassKind::Color, Target::Offscreen { samples: 1 })
          .reading(Resource::ShadowDepth)
          .writing(Resource::SceneColor),
      )
      .pass(
        PassDesc::new("depth", PassKind::DepthCapture, Target::DepthCubemap)
          .writing(Resource::ShadowDepth),
      )
      .build();

    assert_eq!(
      graph,
      Err(GraphError::ReadBeforeWrite {
        pass: "color",
        resource: Resource::ShadowDepth
      })
    );
  }

  #[test]
  fn double_write_is_rejected() {
    let graph = FrameGraph::builder()
      .pass(PassDesc::new("a", PassKind::Color, Target::Resolved).writing(Resource::SceneColor))
      .pass(PassDesc::new("b", PassKind::Color, Target::Resolved).writing(Resource::SceneColor))
      .build();

    assert_eq!(
      graph,
      Err(GraphError::MultipleWriters {
        resource: Resource::SceneColor,
        first: "a",
        second: "b"
      })
    );
  }

  #[test]
  fn surface_must_be_written_last() {
    let graph = FrameGraph::builder()
      .pass(PassDesc::new("a", PassKind::Color, Target::Surface).writing(Resource::Surface))
      .pass(
        PassDesc::new("b", PassKind::DepthCapture, Target::DepthCubemap)
          .writing(Resource::ShadowDepth),
      )
      .build();

    assert_eq!(graph, Err(GraphError::SurfaceNotLast { pass: "a" }));
  }

  #[test]
  fn single_pass_is_one_color_pass_to_the_surface() {
    let graph = FrameGraph::single_pass();

    assert_eq!(
      graph.passes(),
      [PassDesc::new("color", PassKind::Color, Target::Surface).writing(Resource::Surface)]
    );
    assert!(!graph.contains(PassKind::PostProcess));
  }

  #[test]
  fn skipped_passes_succeed() {
    let graph = FrameGraph::shadowed_post_process(1).unwrap();
    let mut issued = Vec::new();

    let r: Result<(), ()> = graph.run(|pass| match pass.kind {
      PassKind::Color => {
        issued.push(pass.name);
        Ok(())
      }

      _ => skip_pass(pass),
    });

    assert_eq!(r, Ok(()));
    assert_eq!(issued, ["color"]);
  }

  #[test]
  fn resolve_only_when_multisampled() {
    let multi = FrameGraph::shadowed_post_process(4).unwrap();
    let kinds: Vec<_> = multi.passes().iter().map(|p| p.kind).collect();

    assert_eq!(
      kinds,
      [
        PassKind::DepthCapture,
        PassKind::Color,
        PassKind::Resolve,
        PassKind::PostProcess
      ]
    );

    let single = FrameGraph::shadowed_post_process(1).unwrap();
    let kinds: Vec<_> = single.passes().iter().map(|p| p.kind).collect();

    assert_eq!(
      kinds,
      [PassKind::DepthCapture, PassKind::Color, PassKind::PostProcess]
    );
    assert_eq!(single.passes()[2].reads, [Resource::SceneColor]);
  }

  #[test]
  fn zero_samples_means_single_sample() {
    let graph = FrameGraph::shadowed_post_process(0).unwrap();

    assert!(!graph.contains(PassKind::Resolve));
    assert_eq!(graph.passes()[1].target, Target::Offscreen { samples: 1 });
  }

  #[test]
  fn run_stops_at_first_error() {
    let graph = FrameGraph::shadowed_post_process(4).unwrap();
    let mut issued = Vec::new();

    let r = graph.run(|pass| {
      issued.push(pass.name);

      if pass.kind == PassKind::Resolve {
        Err("boom")
      } else {
        Ok(())
      }
    });

    assert_eq!(r, Err("boom"));
    assert_eq!(issued, ["depth capture", "color", "resolve"]);
  }

  // A CPU stand-in for the GPU: every resource is a texel value, stamped with the frame that wrote it.
  #[derive(Default)]
  struct TextureStore {
    texels: HashMap<Resource, (u32, f32)>,
  }

  #[test]
  fn color_pass_samples_depth_of_the_same_frame() {
    let graph = FrameGraph::shadowed_post_process(4).unwrap();
    let mut store = TextureStore::default();

    // first frame: nothing exists before the graph runs
    for frame in 0..3u32 {
      let depth = 1. + frame as f32;

      graph
        .run(|pass| -> Result<(), String> {
          let mut sampled = 0.;

          for r in &pass.reads {
            match store.texels.get(r) {
              Some(&(written_in, value)) if written_in == frame => sampled += value,
              Some(&(written_in, _)) => {
                return Err(format!(
                  "{} sampled {:?} from frame {} during frame {}",
                  pass.name, r, written_in, frame
                ))
              }
              None => return Err(format!("{} sampled uninitialized {:?}", pass.name, r)),
            }
          }

          let out = match pass.kind {
            PassKind::DepthCapture => depth,
            _ => sampled,
          };

          for &w in &pass.writes {
            store.texels.insert(w, (frame, out));
          }

          Ok(())
        })
        .unwrap();

      assert_eq!(store.texels[&Resource::SceneColor], (frame, depth));
      assert_eq!(store.texels[&Resource::Surface], (frame, depth));
    }
  }
}
