use luminance::{Semantics, Vertex};
use luminance_front::{
  context::GraphicsContext,
  pixel::{NormRGB8UI, NormRGBA8UI},
  tess::{Mode, Tess, TessError},
  texture::{CubeFace, Cubemap, Dim2, MagFilter, MinFilter, Sampler, TexelUpload, Texture, Wrap},
  Backend,
};

use crate::{
  geometry::{compute_tangents, MeshVertex},
  DemoError, PlatformServices,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Semantics)]
pub enum Semantics {
  #[sem(name = "position", repr = "[f32; 3]", wrapper = "VertexPosition")]
  Position,
  #[sem(name = "normal", repr = "[f32; 3]", wrapper = "VertexNormal")]
  Normal,
  #[sem(name = "uv", repr = "[f32; 2]", wrapper = "VertexUv")]
  Uv,
  #[sem(name = "tangent", repr = "[f32; 3]", wrapper = "VertexTangent")]
  Tangent,
  // per-instance model matrix, one column per attribute
  #[sem(name = "model_c0", repr = "[f32; 4]", wrapper = "InstanceModelC0")]
  ModelC0,
  #[sem(name = "model_c1", repr = "[f32; 4]", wrapper = "InstanceModelC1")]
  ModelC1,
  #[sem(name = "model_c2", repr = "[f32; 4]", wrapper = "InstanceModelC2")]
  ModelC2,
  #[sem(name = "model_c3", repr = "[f32; 4]", wrapper = "InstanceModelC3")]
  ModelC3,
}

/// Vertex used by every lit or textured mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics")]
pub struct SceneVertex {
  pub position: VertexPosition,
  pub normal: VertexNormal,
  pub uv: VertexUv,
  pub tangent: VertexTangent,
}

// definition of a single instance
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics", instanced = "true")]
pub struct ModelInstance {
  pub c0: InstanceModelC0,
  pub c1: InstanceModelC1,
  pub c2: InstanceModelC2,
  pub c3: InstanceModelC3,
}

impl From<[[f32; 4]; 4]> for ModelInstance {
  fn from(m: [[f32; 4]; 4]) -> Self {
    ModelInstance {
      c0: m[0].into(),
      c1: m[1].into(),
      c2: m[2].into(),
      c3: m[3].into(),
    }
  }
}

/// RGBA texture, as loaded from image files.
pub type RGBATexture = Texture<Dim2, NormRGBA8UI>;

/// RGB cubemap, as assembled from six face images.
pub type RGBCubemap = Texture<Cubemap, NormRGB8UI>;

/// Turn a triangle list into GPU vertices, generating tangents on the way.
pub fn scene_vertices(vertices: &[MeshVertex]) -> Vec<SceneVertex> {
  vertices
    .iter()
    .zip(compute_tangents(vertices))
    .map(|(v, tangent)| SceneVertex {
      position: v.position.into(),
      normal: v.normal.into(),
      uv: v.uv.into(),
      tangent: tangent.into(),
    })
    .collect()
}

/// Non-indexed triangle tessellation of a mesh.
pub fn mesh_tess(
  context: &mut impl GraphicsContext<Backend = Backend>,
  vertices: &[MeshVertex],
) -> Result<Tess<SceneVertex>, TessError> {
  context
    .new_tess()
    .set_vertices(scene_vertices(vertices))
    .set_mode(Mode::Triangle)
    .build()
}

// The vertex shaders of full screen passes spawn the vertices on the fly with gl_VertexID.
pub fn fullscreen_quad(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<Tess<()>, TessError> {
  context
    .new_tess()
    .set_mode(Mode::TriangleStrip)
    .set_render_vertex_nb(4)
    .build()
}

/// Sampler for tiled, filtered textures.
pub fn repeat_sampler() -> Sampler {
  Sampler {
    wrap_r: Wrap::Repeat,
    wrap_s: Wrap::Repeat,
    wrap_t: Wrap::Repeat,
    min_filter: MinFilter::Linear,
    mag_filter: MagFilter::Linear,
    ..Sampler::default()
  }
}

/// Sampler fetching exact texels, for intermediate render targets.
pub fn nearest_sampler() -> Sampler {
  Sampler {
    min_filter: MinFilter::Nearest,
    mag_filter: MagFilter::Nearest,
    ..Sampler::default()
  }
}

/// Load a texture fetched by the platform.
///
/// If the image cannot be fetched, the error is logged and a single black texel is used instead, so that sampling
/// the texture yields black.
pub fn load_texture(
  context: &mut impl GraphicsContext<Backend = Backend>,
  platform: &mut impl PlatformServices,
  name: &str,
) -> Result<RGBATexture, DemoError> {
  let texture: RGBATexture = match platform.fetch_texture(name) {
    Ok(img) => {
      let (width, height) = img.dimensions();
      log::debug!("uploading texture {} ({}×{})", name, width, height);

      context.new_texture_raw(
        [width, height],
        repeat_sampler(),
        TexelUpload::base_level(img.as_raw().as_slice(), 0),
      )?
    }

    Err(e) => {
      log::error!("cannot load texture {}: {}; using a black texel", name, e);

      let black: [u8; 4] = [0, 0, 0, 255];
      context.new_texture_raw(
        [1, 1],
        repeat_sampler(),
        TexelUpload::base_level(&black[..], 0),
      )?
    }
  };

  Ok(texture)
}

/// Cubemap faces, in +X, -X, +Y, -Y, +Z, -Z order.
pub const CUBEMAP_FACES: [CubeFace; 6] = [
  CubeFace::PositiveX,
  CubeFace::NegativeX,
  CubeFace::PositiveY,
  CubeFace::NegativeY,
  CubeFace::PositiveZ,
  CubeFace::NegativeZ,
];

/// Check that six face images can form a cubemap and return the face size.
///
/// Faces must be square and all have the same size.
pub fn cubemap_face_size(faces: &[(&str, [u32; 2]); 6]) -> Result<u32, DemoError> {
  let size = faces[0].1[0];

  for &(name, [width, height]) in faces {
    if width != height || width != size || size == 0 {
      return Err(DemoError::InvalidCubemapFace {
        name: name.to_owned(),
        width,
        height,
      });
    }
  }

  Ok(size)
}

/// Number of bytes of an RGB cubemap face of `size`×`size` texels.
pub fn face_texel_bytes(size: u32) -> usize {
  size as usize * size as usize * 3
}

/// Assemble a cubemap from six faces fetched by the platform, named in [`CUBEMAP_FACES`] order.
///
/// Face images are uploaded as is, without any vertical flip. A face that cannot be fetched is replaced by a black
/// face.
pub fn load_cubemap(
  context: &mut impl GraphicsContext<Backend = Backend>,
  platform: &mut impl PlatformServices,
  names: &[&str; 6],
) -> Result<RGBCubemap, DemoError> {
  let mut faces: Vec<Option<image::RgbImage>> = Vec::with_capacity(6);

  for name in names {
    match platform.fetch_cubemap_face(name) {
      Ok(img) => faces.push(Some(img.clone())),
      Err(e) => {
        log::error!("cannot load cubemap face {}: {}; using a black face", name, e);
        faces.push(None);
      }
    }
  }

  // missing faces take the size of the first available one
  let fallback = faces
    .iter()
    .flatten()
    .next()
    .map(|img| img.width())
    .unwrap_or(1);

  let mut dims = [("", [0, 0]); 6];
  for (i, face) in faces.iter().enumerate() {
    let dim = face
      .as_ref()
      .map(|img| [img.width(), img.height()])
      .unwrap_or([fallback, fallback]);
    dims[i] = (names[i], dim);
  }

  let size = cubemap_face_size(&dims)?;

  // two mipmaps, regenerated after each face upload
  let mut texture: RGBCubemap = context.new_texture(
    size,
    Sampler::default(),
    TexelUpload::base_level(&[], 2),
  )?;

  let black = vec![0u8; face_texel_bytes(size)];

  for (face, img) in CUBEMAP_FACES.iter().zip(&faces) {
    log::info!("uploading the {:?} face", face);

    let texels = img
      .as_ref()
      .map(|img| img.as_raw().as_slice())
      .unwrap_or(black.as_slice());

    texture.upload_part_raw(
      ([0, 0], *face),
      size,
      TexelUpload::base_level(texels, 2),
    )?;
  }

  Ok(texture)
}
