//! Model loading.
//!
//! Models are flattened into a non-indexed triangle list of [`MeshVertex`], whatever their format:
//!
//! - Wavefront OBJ: every object and every geometry group of the file end up in the same list; points and lines are
//!   ignored.
//! - glTF: every mesh instantiated by the scene is flattened with its node transform applied; primitives that are not
//!   triangle lists are skipped.
//!
//! Missing normals are replaced by face normals in both cases.

use cgmath::{Matrix as _, Matrix3, Matrix4, SquareMatrix as _, Vector3, Vector4};
use gltf::{buffer, mesh::Mode, Gltf};
use std::{fmt, path::Path};
use wavefront_obj::obj::{self, Object, Primitive, VTNIndex};

use crate::{geometry::MeshVertex, PlatformServices};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MeshError {
  Parse { line: usize, message: String },
  IndexOutOfRange { index: usize },
  NoTriangles,
  Gltf { message: String },
  MissingBuffer { index: usize },
  UnsupportedBuffer { uri: String },
  MissingPositions { mesh: usize },
  Fetch { name: String, message: String },
}

impl fmt::Display for MeshError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      MeshError::Parse { line, ref message } => {
        write!(f, "OBJ parse error at line {}: {}", line, message)
      }
      MeshError::IndexOutOfRange { index } => write!(f, "index {} is out of range", index),
      MeshError::NoTriangles => f.write_str("model has no triangle"),
      MeshError::Gltf { ref message } => write!(f, "glTF error: {}", message),
      MeshError::MissingBuffer { index } => write!(f, "glTF buffer {} has no data", index),
      MeshError::UnsupportedBuffer { ref uri } => {
        write!(f, "glTF buffer {} cannot be loaded", uri)
      }
      MeshError::MissingPositions { mesh } => write!(f, "glTF mesh {} has no positions", mesh),
      MeshError::Fetch {
        ref name,
        ref message,
      } => write!(f, "cannot fetch {}: {}", name, message),
    }
  }
}

impl std::error::Error for MeshError {}

fn fetch_failed(name: &str, e: impl fmt::Display) -> MeshError {
  MeshError::Fetch {
    name: name.to_owned(),
    message: e.to_string(),
  }
}

/// Whether `name` designates a glTF model (`.gltf` or `.glb`).
pub fn is_gltf(name: &str) -> bool {
  let ext = Path::new(name)
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase);

  matches!(ext.as_deref(), Some("gltf") | Some("glb"))
}

/// Name of the resource `uri` refers to, `uri` being relative to the resource `name`.
pub fn sibling_resource(name: &str, uri: &str) -> String {
  match name.rfind('/') {
    Some(i) => format!("{}/{}", &name[..i], uri),
    None => uri.to_owned(),
  }
}

/// Load a model fetched by the platform, picking the format from its extension.
///
/// External glTF buffers are fetched from the directory of the model, and must be declared as models as well.
pub fn load_model(
  platform: &mut impl PlatformServices,
  name: &str,
) -> Result<Vec<MeshVertex>, MeshError> {
  if is_gltf(name) {
    let data = platform
      .fetch_model_data(name)
      .map_err(|e| fetch_failed(name, e))?
      .to_vec();

    parse_gltf(&data, |uri| {
      let path = sibling_resource(name, uri);

      platform
        .fetch_model_data(&path)
        .map(<[u8]>::to_vec)
        .map_err(|e| fetch_failed(&path, e))
    })
  } else {
    let src = platform
      .fetch_model(name)
      .map_err(|e| fetch_failed(name, e))?;
    parse_obj(src)
  }
}

/// Parse an OBJ source into a triangle list.
pub fn parse_obj(src: &str) -> Result<Vec<MeshVertex>, MeshError> {
  let set = obj::parse(src.to_owned()).map_err(|e| MeshError::Parse {
    line: e.line_number,
    message: e.message,
  })?;

  let mut vertices = Vec::new();

  for object in &set.objects {
    for geometry in &object.geometry {
      for shape in &geometry.shapes {
        if let Primitive::Triangle(a, b, c) = shape.primitive {
          let mut tri = [
            object_vertex(object, a)?,
            object_vertex(object, b)?,
            object_vertex(object, c)?,
          ];

          if a.2.is_none() || b.2.is_none() || c.2.is_none() {
            let n = face_normal(&tri);

            for v in &mut tri {
              v.normal = n;
            }
          }

          vertices.extend_from_slice(&tri);
        }
      }
    }
  }

  if vertices.is_empty() {
    return Err(MeshError::NoTriangles);
  }

  log::debug!("loaded OBJ model with {} triangles", vertices.len() / 3);

  Ok(vertices)
}

fn object_vertex(object: &Object, (vi, ti, ni): VTNIndex) -> Result<MeshVertex, MeshError> {
  let p = object
    .vertices
    .get(vi)
    .ok_or(MeshError::IndexOutOfRange { index: vi })?;

  let uv = match ti {
    Some(ti) => {
      let t = object
        .tex_vertices
        .get(ti)
        .ok_or(MeshError::IndexOutOfRange { index: ti })?;
      [t.u as f32, t.v as f32]
    }

    None => [0., 0.],
  };

  let normal = match ni {
    Some(ni) => {
      let n = object
        .normals
        .get(ni)
        .ok_or(MeshError::IndexOutOfRange { index: ni })?;
      [n.x as f32, n.y as f32, n.z as f32]
    }

    None => [0., 0., 0.],
  };

  Ok(MeshVertex {
    position: [p.x as f32, p.y as f32, p.z as f32],
    normal,
    uv,
  })
}

fn face_normal(tri: &[MeshVertex; 3]) -> [f32; 3] {
  let [a, b, c] = [tri[0].position, tri[1].position, tri[2].position];
  let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
  let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
  let n = [
    e1[1] * e2[2] - e1[2] * e2[1],
    e1[2] * e2[0] - e1[0] * e2[2],
    e1[0] * e2[1] - e1[1] * e2[0],
  ];
  let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();

  if len > 0. {
    [n[0] / len, n[1] / len, n[2] / len]
  } else {
    [0., 1., 0.]
  }
}

/// Parse a glTF document (JSON or binary) into a triangle list.
///
/// The meshes of the default scene (or of the first scene) are flattened in world space. Buffers living outside of
/// the document are fetched with `load_buffer`, given the buffer URI; embedded `data:` URIs are not supported.
pub fn parse_gltf(
  data: &[u8],
  mut load_buffer: impl FnMut(&str) -> Result<Vec<u8>, MeshError>,
) -> Result<Vec<MeshVertex>, MeshError> {
  let gltf = Gltf::from_slice(data).map_err(|e| MeshError::Gltf {
    message: e.to_string(),
  })?;

  let mut buffers = Vec::new();

  for buf in gltf.buffers() {
    let bytes = match buf.source() {
      buffer::Source::Bin => gltf
        .blob
        .clone()
        .ok_or(MeshError::MissingBuffer { index: buf.index() })?,

      buffer::Source::Uri(uri) if uri.starts_with("data:") => {
        return Err(MeshError::UnsupportedBuffer {
          uri: uri.chars().take(32).collect(),
        });
      }

      buffer::Source::Uri(uri) => load_buffer(uri)?,
    };

    if bytes.len() < buf.length() {
      return Err(MeshError::MissingBuffer { index: buf.index() });
    }

    buffers.push(bytes);
  }

  let mut vertices = Vec::new();

  match gltf.default_scene().or_else(|| gltf.scenes().next()) {
    Some(scene) => {
      for node in scene.nodes() {
        flatten_node(&node, Matrix4::identity(), &buffers, &mut vertices)?;
      }
    }

    // a document without scenes still carries meshes
    None => {
      for mesh in gltf.meshes() {
        flatten_mesh(&mesh, Matrix4::identity(), &buffers, &mut vertices)?;
      }
    }
  }

  if vertices.is_empty() {
    return Err(MeshError::NoTriangles);
  }

  log::debug!("loaded glTF model with {} triangles", vertices.len() / 3);

  Ok(vertices)
}

fn flatten_node(
  node: &gltf::Node,
  parent: Matrix4<f32>,
  buffers: &[Vec<u8>],
  vertices: &mut Vec<MeshVertex>,
) -> Result<(), MeshError> {
  let transform = parent * Matrix4::from(node.transform().matrix());

  if let Some(mesh) = node.mesh() {
    flatten_mesh(&mesh, transform, buffers, vertices)?;
  }

  for child in node.children() {
    flatten_node(&child, transform, buffers, vertices)?;
  }

  Ok(())
}

fn flatten_mesh(
  mesh: &gltf::Mesh,
  transform: Matrix4<f32>,
  buffers: &[Vec<u8>],
  vertices: &mut Vec<MeshVertex>,
) -> Result<(), MeshError> {
  let linear = Matrix3::from_cols(
    transform.x.truncate(),
    transform.y.truncate(),
    transform.z.truncate(),
  );
  let normal_matrix = linear.invert().map(|m| m.transpose()).unwrap_or(linear);

  for primitive in mesh.primitives() {
    if primitive.mode() != Mode::Triangles {
      log::warn!("skipping {:?} primitive of mesh {}", primitive.mode(), mesh.index());
      continue;
    }

    let reader = primitive.reader(|buf| buffers.get(buf.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
      .read_positions()
      .ok_or(MeshError::MissingPositions { mesh: mesh.index() })?
      .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|normals| normals.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|uvs| uvs.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
      Some(indices) => indices.into_u32().collect(),
      None => (0..positions.len() as u32).collect(),
    };

    let vertex = |i: u32| -> Result<MeshVertex, MeshError> {
      let i = i as usize;
      let p = positions
        .get(i)
        .ok_or(MeshError::IndexOutOfRange { index: i })?;
      let position = transform * Vector4::new(p[0], p[1], p[2], 1.);

      let normal = match normals {
        Some(ref normals) => {
          let n = normals
            .get(i)
            .ok_or(MeshError::IndexOutOfRange { index: i })?;
          let n = normal_matrix * Vector3::new(n[0], n[1], n[2]);
          let len = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();

          if len > 0. {
            [n.x / len, n.y / len, n.z / len]
          } else {
            [0., 0., 0.]
          }
        }

        None => [0., 0., 0.],
      };

      // glTF puts the texture origin at the top left corner, uploaded textures have it at the bottom left one
      let uv = match uvs {
        Some(ref uvs) => {
          let uv = uvs.get(i).ok_or(MeshError::IndexOutOfRange { index: i })?;
          [uv[0], 1. - uv[1]]
        }

        None => [0., 0.],
      };

      Ok(MeshVertex {
        position: [position.x, position.y, position.z],
        normal,
        uv,
      })
    };

    for tri in indices.chunks_exact(3) {
      let mut tri = [vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?];

      if normals.is_none() {
        let n = face_normal(&tri);

        for v in &mut tri {
          v.normal = n;
        }
      }

      vertices.extend_from_slice(&tri);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const QUAD: &str = "
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

  #[test]
  fn quad_is_flattened() {
    let vertices = parse_obj(QUAD).unwrap();

    assert_eq!(vertices.len(), 6);
    assert_eq!(vertices[1].position, [1., 0., 0.]);
    assert_eq!(vertices[2].uv, [1., 1.]);
    assert!(vertices.iter().all(|v| v.normal == [0., 0., 1.]));
  }

  #[test]
  fn missing_normals_are_generated() {
    let src = "
o tri
v 0 0 0
v 1 0 0
v 0 0 -1
f 1 2 3
";

    let vertices = parse_obj(src).unwrap();

    assert_eq!(vertices.len(), 3);
    assert!(vertices.iter().all(|v| v.normal == [0., 1., 0.]));
    assert!(vertices.iter().all(|v| v.uv == [0., 0.]));
  }

  #[test]
  fn no_faces_is_an_error() {
    let src = "
o empty
v 0 0 0
";

    assert_eq!(parse_obj(src), Err(MeshError::NoTriangles));
  }

  // one triangle, in an external buffer, under a translated node
  const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
  "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
  "buffers": [{ "uri": "triangle.bin", "byteLength": 36 }],
  "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
  "accessors": [{
    "bufferView": 0,
    "componentType": 5126,
    "count": 3,
    "type": "VEC3",
    "min": [0.0, 0.0, -1.0],
    "max": [1.0, 0.0, 0.0]
  }]
}"#;

  fn triangle_buffer() -> Vec<u8> {
    [0f32, 0., 0., 1., 0., 0., 0., 0., -1.]
      .iter()
      .flat_map(|x| x.to_le_bytes())
      .collect()
  }

  #[test]
  fn gltf_meshes_are_flattened_in_world_space() {
    let mut asked = Vec::new();
    let vertices = parse_gltf(TRIANGLE_GLTF.as_bytes(), |uri| {
      asked.push(uri.to_owned());
      Ok(triangle_buffer())
    })
    .unwrap();

    assert_eq!(asked, vec!["triangle.bin".to_owned()]);
    assert_eq!(vertices.len(), 3);
    assert_eq!(vertices[0].position, [0., 1., 0.]);
    assert_eq!(vertices[1].position, [1., 1., 0.]);
    assert_eq!(vertices[2].position, [0., 1., -1.]);
    assert!(vertices.iter().all(|v| v.normal == [0., 1., 0.]));
    assert!(vertices.iter().all(|v| v.uv == [0., 0.]));
  }

  #[test]
  fn gltf_buffer_errors_are_propagated() {
    let missing = parse_gltf(TRIANGLE_GLTF.as_bytes(), |uri| {
      Err(MeshError::Fetch {
        name: uri.to_owned(),
        message: "no such file".to_owned(),
      })
    });

    assert!(matches!(missing, Err(MeshError::Fetch { ref name, .. }) if name == "triangle.bin"));

    let short = parse_gltf(TRIANGLE_GLTF.as_bytes(), |_| Ok(vec![0; 12]));
    assert_eq!(short, Err(MeshError::MissingBuffer { index: 0 }));
  }

  #[test]
  fn embedded_gltf_buffers_are_refused() {
    let src = TRIANGLE_GLTF.replace("triangle.bin", "data:application/octet-stream;base64,AAAA");
    let parsed = parse_gltf(src.as_bytes(), |_| Ok(triangle_buffer()));

    assert!(matches!(parsed, Err(MeshError::UnsupportedBuffer { .. })));
  }

  #[test]
  fn invalid_gltf_is_an_error() {
    let parsed = parse_gltf(b"{ not json", |_| Ok(Vec::new()));

    assert!(matches!(parsed, Err(MeshError::Gltf { .. })));
  }

  #[test]
  fn model_formats_follow_extensions() {
    assert!(is_gltf("shadow/scene.gltf"));
    assert!(is_gltf("ROCK.GLB"));
    assert!(!is_gltf("rock.obj"));
    assert!(!is_gltf("gltf"));
  }

  #[test]
  fn buffers_are_next_to_their_model() {
    assert_eq!(sibling_resource("shadow/scene.gltf", "scene.bin"), "shadow/scene.bin");
    assert_eq!(sibling_resource("scene.gltf", "scene.bin"), "scene.bin");
  }

  // Serves models from memory.
  struct Models(Vec<(&'static str, Vec<u8>, String)>);

  impl PlatformServices for Models {
    type FetchError = String;

    fn fetch_texture(&mut self, name: &str) -> Result<&image::RgbaImage, String> {
      Err(format!("no texture {}", name))
    }

    fn fetch_cubemap_face(&mut self, name: &str) -> Result<&image::RgbImage, String> {
      Err(format!("no cubemap face {}", name))
    }

    fn fetch_model(&mut self, name: &str) -> Result<&str, String> {
      self
        .0
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, _, src)| src.as_str())
        .ok_or_else(|| format!("no model {}", name))
    }

    fn fetch_model_data(&mut self, name: &str) -> Result<&[u8], String> {
      self
        .0
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, data, _)| data.as_slice())
        .ok_or_else(|| format!("no model {}", name))
    }
  }

  #[test]
  fn models_are_loaded_by_format() {
    let mut models = Models(vec![
      ("quad.obj", Vec::new(), QUAD.to_owned()),
      ("shadow/triangle.gltf", TRIANGLE_GLTF.as_bytes().to_vec(), String::new()),
      ("shadow/triangle.bin", triangle_buffer(), String::new()),
    ]);

    assert_eq!(load_model(&mut models, "quad.obj").unwrap().len(), 6);
    assert_eq!(load_model(&mut models, "shadow/triangle.gltf").unwrap().len(), 3);

    assert!(matches!(
      load_model(&mut models, "missing.glb"),
      Err(MeshError::Fetch { ref name, .. }) if name == "missing.glb"
    ));
  }
}
