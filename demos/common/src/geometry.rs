//! Procedural geometry shared by the demos.
//!
//! Everything in here is plain CPU data. Conversion to GPU vertex types happens in [`crate::shared`].

/// A vertex with a position, a normal and texture coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshVertex {
  pub position: [f32; 3],
  pub normal: [f32; 3],
  pub uv: [f32; 2],
}

const fn v(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> MeshVertex {
  MeshVertex {
    position,
    normal,
    uv,
  }
}

/// A unit cube centred on the origin, as 12 counter-clockwise triangles.
#[rustfmt::skip]
pub const CUBE: [MeshVertex; 36] = [
  // back
  v([ 0.5,  0.5, -0.5], [ 0.,  0., -1.], [0., 0.]),
  v([ 0.5, -0.5, -0.5], [ 0.,  0., -1.], [1., 0.]),
  v([-0.5, -0.5, -0.5], [ 0.,  0., -1.], [1., 1.]),
  v([-0.5, -0.5, -0.5], [ 0.,  0., -1.], [1., 1.]),
  v([-0.5,  0.5, -0.5], [ 0.,  0., -1.], [0., 1.]),
  v([ 0.5,  0.5, -0.5], [ 0.,  0., -1.], [0., 0.]),
  // front
  v([-0.5, -0.5,  0.5], [ 0.,  0.,  1.], [0., 0.]),
  v([ 0.5, -0.5,  0.5], [ 0.,  0.,  1.], [1., 0.]),
  v([ 0.5,  0.5,  0.5], [ 0.,  0.,  1.], [1., 1.]),
  v([ 0.5,  0.5,  0.5], [ 0.,  0.,  1.], [1., 1.]),
  v([-0.5,  0.5,  0.5], [ 0.,  0.,  1.], [0., 1.]),
  v([-0.5, -0.5,  0.5], [ 0.,  0.,  1.], [0., 0.]),
  // left
  v([-0.5,  0.5,  0.5], [-1.,  0.,  0.], [0., 0.]),
  v([-0.5,  0.5, -0.5], [-1.,  0.,  0.], [1., 0.]),
  v([-0.5, -0.5, -0.5], [-1.,  0.,  0.], [1., 1.]),
  v([-0.5, -0.5, -0.5], [-1.,  0.,  0.], [1., 1.]),
  v([-0.5, -0.5,  0.5], [-1.,  0.,  0.], [0., 1.]),
  v([-0.5,  0.5,  0.5], [-1.,  0.,  0.], [0., 0.]),
  // right
  v([ 0.5, -0.5, -0.5], [ 1.,  0.,  0.], [0., 0.]),
  v([ 0.5,  0.5, -0.5], [ 1.,  0.,  0.], [1., 0.]),
  v([ 0.5,  0.5,  0.5], [ 1.,  0.,  0.], [1., 1.]),
  v([ 0.5,  0.5,  0.5], [ 1.,  0.,  0.], [1., 1.]),
  v([ 0.5, -0.5,  0.5], [ 1.,  0.,  0.], [0., 1.]),
  v([ 0.5, -0.5, -0.5], [ 1.,  0.,  0.], [0., 0.]),
  // bottom
  v([-0.5, -0.5, -0.5], [ 0., -1.,  0.], [0., 0.]),
  v([ 0.5, -0.5, -0.5], [ 0., -1.,  0.], [1., 0.]),
  v([ 0.5, -0.5,  0.5], [ 0., -1.,  0.], [1., 1.]),
  v([ 0.5, -0.5,  0.5], [ 0., -1.,  0.], [1., 1.]),
  v([-0.5, -0.5,  0.5], [ 0., -1.,  0.], [0., 1.]),
  v([-0.5, -0.5, -0.5], [ 0., -1.,  0.], [0., 0.]),
  // top
  v([ 0.5,  0.5,  0.5], [ 0.,  1.,  0.], [0., 0.]),
  v([ 0.5,  0.5, -0.5], [ 0.,  1.,  0.], [1., 0.]),
  v([-0.5,  0.5, -0.5], [ 0.,  1.,  0.], [1., 1.]),
  v([-0.5,  0.5, -0.5], [ 0.,  1.,  0.], [1., 1.]),
  v([-0.5,  0.5,  0.5], [ 0.,  1.,  0.], [0., 1.]),
  v([ 0.5,  0.5,  0.5], [ 0.,  1.,  0.], [0., 0.]),
];

/// A 2×2 plane in the XZ plane, facing +Y, with texture coordinates repeating twice.
#[rustfmt::skip]
pub const PLANE: [MeshVertex; 6] = [
  v([-1., 0.,  1.], [0., 1., 0.], [0., 0.]),
  v([ 1., 0.,  1.], [0., 1., 0.], [2., 0.]),
  v([ 1., 0., -1.], [0., 1., 0.], [2., 2.]),
  v([-1., 0.,  1.], [0., 1., 0.], [0., 0.]),
  v([ 1., 0., -1.], [0., 1., 0.], [2., 2.]),
  v([-1., 0., -1.], [0., 1., 0.], [0., 2.]),
];

/// Compute one tangent per vertex of a triangle list.
///
/// The tangent is constant over a triangle and points along increasing `u` in object space. Triangles with degenerate
/// texture coordinates get an arbitrary tangent orthogonal to their first vertex’s normal. Trailing vertices that do
/// not form a whole triangle get the same fallback.
pub fn compute_tangents(vertices: &[MeshVertex]) -> Vec<[f32; 3]> {
  let mut tangents = Vec::with_capacity(vertices.len());

  for tri in vertices.chunks(3) {
    let tangent = match tri {
      [a, b, c] => triangle_tangent(a, b, c),
      _ => fallback_tangent(tri[0].normal),
    };

    tangents.extend(std::iter::repeat(tangent).take(tri.len()));
  }

  tangents
}

fn triangle_tangent(a: &MeshVertex, b: &MeshVertex, c: &MeshVertex) -> [f32; 3] {
  let e1 = sub3(b.position, a.position);
  let e2 = sub3(c.position, a.position);
  let duv1 = [b.uv[0] - a.uv[0], b.uv[1] - a.uv[1]];
  let duv2 = [c.uv[0] - a.uv[0], c.uv[1] - a.uv[1]];

  let det = duv1[0] * duv2[1] - duv2[0] * duv1[1];

  if det.abs() <= f32::EPSILON {
    return fallback_tangent(a.normal);
  }

  let f = 1. / det;

  [
    f * (duv2[1] * e1[0] - duv1[1] * e2[0]),
    f * (duv2[1] * e1[1] - duv1[1] * e2[1]),
    f * (duv2[1] * e1[2] - duv1[1] * e2[2]),
  ]
}

// any unit vector orthogonal to the normal
fn fallback_tangent(n: [f32; 3]) -> [f32; 3] {
  let axis = if n[0].abs() < 0.9 {
    [1., 0., 0.]
  } else {
    [0., 1., 0.]
  };

  // axis - n * dot(axis, n)
  let d = axis[0] * n[0] + axis[1] * n[1] + axis[2] * n[2];
  let t = [axis[0] - n[0] * d, axis[1] - n[1] * d, axis[2] - n[2] * d];
  let len = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();

  if len > 0. {
    [t[0] / len, t[1] / len, t[2] / len]
  } else {
    axis
  }
}

fn sub3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
  [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
