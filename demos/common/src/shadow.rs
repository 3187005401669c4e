//! Omnidirectional shadow transforms.

use cgmath::{perspective, Deg, EuclideanSpace as _, Matrix4, Point3, Vector3};

/// Edge of each depth cubemap face, in texels.
pub const SHADOW_SIZE: u32 = 1024;

/// A point light casting shadows in every direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointShadow {
  pub light_position: Vector3<f32>,
  pub near: f32,
  pub far: f32,
}

impl PointShadow {
  pub fn new(light_position: Vector3<f32>, near: f32, far: f32) -> Self {
    PointShadow {
      light_position,
      near,
      far,
    }
  }

  /// Square 90° projection shared by all six faces.
  pub fn projection(&self) -> Matrix4<f32> {
    perspective(Deg(90.), 1., self.near, self.far)
  }

  /// Light-space transforms for the six cubemap faces, in the +X, -X, +Y, -Y, +Z, -Z layer order.
  pub fn face_transforms(&self) -> [Matrix4<f32>; 6] {
    let proj = self.projection();
    let eye = Point3::from_vec(self.light_position);
    let face = |dir: Vector3<f32>, up: Vector3<f32>| proj * Matrix4::look_at_rh(eye, eye + dir, up);

    [
      face(Vector3::unit_x(), -Vector3::unit_y()),
      face(-Vector3::unit_x(), -Vector3::unit_y()),
      face(Vector3::unit_y(), Vector3::unit_z()),
      face(-Vector3::unit_y(), -Vector3::unit_z()),
      face(Vector3::unit_z(), -Vector3::unit_y()),
      face(-Vector3::unit_z(), -Vector3::unit_y()),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cgmath::Vector4;

  fn ndc(m: &Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
    let clip = m * Vector4::new(p.x, p.y, p.z, 1.);
    Vector3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
  }

  #[test]
  fn faces_look_along_axes() {
    let shadow = PointShadow::new(Vector3::new(0., 5., 0.), 1., 25.);
    let dirs = [
      Vector3::unit_x(),
      -Vector3::unit_x(),
      Vector3::unit_y(),
      -Vector3::unit_y(),
      Vector3::unit_z(),
      -Vector3::unit_z(),
    ];

    for (m, dir) in shadow.face_transforms().iter().zip(dirs.iter()) {
      let p = ndc(m, shadow.light_position + dir * 5.);

      assert!(p.x.abs() < 1e-4, "{:?}", p);
      assert!(p.y.abs() < 1e-4, "{:?}", p);
      assert!(p.z > -1. && p.z < 1.);
    }
  }

  #[test]
  fn depth_range_matches_planes() {
    let shadow = PointShadow::new(Vector3::new(1., 2., 3.), 1., 25.);
    let m = shadow.face_transforms()[0];

    let near = ndc(&m, shadow.light_position + Vector3::unit_x());
    let far = ndc(&m, shadow.light_position + Vector3::unit_x() * 25.);

    assert!((near.z + 1.).abs() < 1e-4);
    assert!((far.z - 1.).abs() < 1e-4);
  }
}
