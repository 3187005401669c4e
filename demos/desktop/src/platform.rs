//! Platform services implementation.
//!
//! Resources are read from a root directory laid out as follows:
//!
//! ```text
//! <root>/textures/<name>          2D textures
//! <root>/textures/skybox/<name>   cubemap faces
//! <root>/objects/<name>           models (Wavefront OBJ, glTF and glTF buffers)
//! ```

use freelook_demos::{Features, PlatformServices};
use image::ImageError;
use std::{
  collections::HashMap,
  env,
  error::Error,
  fmt, fs, io,
  path::{Path, PathBuf},
};

/// Name of the resource directory, next to the executable.
pub const RESOURCE_DIR: &str = "resources";

/// Resource root derived from the path the executable was started with.
///
/// `argv0` is resolved against `cwd` when relative; the root is the `resources` directory sitting next to the
/// executable.
pub fn resource_root_from_argv0(argv0: &Path, cwd: &Path) -> PathBuf {
  let exe_dir = if argv0.as_os_str().is_empty() {
    cwd.to_path_buf()
  } else {
    cwd
      .join(argv0)
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| cwd.to_path_buf())
  };

  exe_dir.join(RESOURCE_DIR)
}

/// Resource root of the running process.
pub fn default_resource_root() -> PathBuf {
  let argv0 = env::args_os().next().map(PathBuf::from).unwrap_or_default();
  let cwd = env::current_dir().unwrap_or_default();

  resource_root_from_argv0(&argv0, &cwd)
}

/// Desktop implementation of the [`PlatformServices`] API.
///
/// Only the resources declared in the demo [`Features`] can be fetched. They are read from disk the first time
/// they’re asked for and cached afterwards.
#[derive(Debug)]
pub struct DesktopPlatformServices {
  root: PathBuf,
  features: Features,
  textures: HashMap<String, image::RgbaImage>,
  cubemap_faces: HashMap<String, image::RgbImage>,
  models: HashMap<String, String>,
  model_data: HashMap<String, Vec<u8>>,
}

impl DesktopPlatformServices {
  pub fn new(root: PathBuf, features: Features) -> Self {
    log::info!("reading resources from {}", root.display());

    Self {
      root,
      features,
      textures: HashMap::new(),
      cubemap_faces: HashMap::new(),
      models: HashMap::new(),
      model_data: HashMap::new(),
    }
  }

  pub fn texture_path(&self, name: &str) -> PathBuf {
    self.root.join("textures").join(name)
  }

  pub fn cubemap_face_path(&self, name: &str) -> PathBuf {
    self.root.join("textures").join("skybox").join(name)
  }

  pub fn model_path(&self, name: &str) -> PathBuf {
    self.root.join("objects").join(name)
  }
}

#[derive(Debug)]
pub enum DesktopFetchError {
  Undeclared { kind: &'static str, name: String },
  ImageError { path: PathBuf, source: ImageError },
  IoError { path: PathBuf, source: io::Error },
}

impl fmt::Display for DesktopFetchError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      DesktopFetchError::Undeclared { kind, ref name } => {
        write!(f, "{} {} was not declared by the demo", kind, name)
      }

      DesktopFetchError::ImageError { ref path, ref source } => {
        write!(f, "cannot load image {}: {}", path.display(), source)
      }

      DesktopFetchError::IoError { ref path, ref source } => {
        write!(f, "cannot read {}: {}", path.display(), source)
      }
    }
  }
}

impl Error for DesktopFetchError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      DesktopFetchError::Undeclared { .. } => None,
      DesktopFetchError::ImageError { ref source, .. } => Some(source),
      DesktopFetchError::IoError { ref source, .. } => Some(source),
    }
  }
}

fn declared(names: &[String], kind: &'static str, name: &str) -> Result<(), DesktopFetchError> {
  if names.iter().any(|n| n == name) {
    Ok(())
  } else {
    Err(DesktopFetchError::Undeclared {
      kind,
      name: name.to_owned(),
    })
  }
}

fn open_image(path: PathBuf) -> Result<image::DynamicImage, DesktopFetchError> {
  log::debug!("loading {}", path.display());
  image::open(&path).map_err(|source| DesktopFetchError::ImageError { path, source })
}

impl PlatformServices for DesktopPlatformServices {
  type FetchError = DesktopFetchError;

  fn fetch_texture(&mut self, name: &str) -> Result<&image::RgbaImage, Self::FetchError> {
    declared(self.features.textures(), "texture", name)?;

    if !self.textures.contains_key(name) {
      // OpenGL expects the first row to be the bottom one
      let img = open_image(self.texture_path(name))?.flipv().to_rgba8();
      self.textures.insert(name.to_owned(), img);
    }

    self
      .textures
      .get(name)
      .ok_or_else(|| DesktopFetchError::Undeclared {
        kind: "texture",
        name: name.to_owned(),
      })
  }

  fn fetch_cubemap_face(&mut self, name: &str) -> Result<&image::RgbImage, Self::FetchError> {
    declared(self.features.cubemap_faces(), "cubemap face", name)?;

    if !self.cubemap_faces.contains_key(name) {
      let img = open_image(self.cubemap_face_path(name))?.to_rgb8();
      self.cubemap_faces.insert(name.to_owned(), img);
    }

    self
      .cubemap_faces
      .get(name)
      .ok_or_else(|| DesktopFetchError::Undeclared {
        kind: "cubemap face",
        name: name.to_owned(),
      })
  }

  fn fetch_model(&mut self, name: &str) -> Result<&str, Self::FetchError> {
    declared(self.features.models(), "model", name)?;

    if !self.models.contains_key(name) {
      let path = self.model_path(name);
      log::debug!("loading {}", path.display());

      let src =
        fs::read_to_string(&path).map_err(|source| DesktopFetchError::IoError { path, source })?;
      self.models.insert(name.to_owned(), src);
    }

    self
      .models
      .get(name)
      .map(String::as_str)
      .ok_or_else(|| DesktopFetchError::Undeclared {
        kind: "model",
        name: name.to_owned(),
      })
  }

  fn fetch_model_data(&mut self, name: &str) -> Result<&[u8], Self::FetchError> {
    declared(self.features.models(), "model", name)?;

    if !self.model_data.contains_key(name) {
      let path = self.model_path(name);
      log::debug!("loading {}", path.display());

      let data = fs::read(&path).map_err(|source| DesktopFetchError::IoError { path, source })?;
      self.model_data.insert(name.to_owned(), data);
    }

    self
      .model_data
      .get(name)
      .map(Vec::as_slice)
      .ok_or_else(|| DesktopFetchError::Undeclared {
        kind: "model",
        name: name.to_owned(),
      })
  }
}
