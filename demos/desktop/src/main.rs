mod input;
mod platform;

use freelook_demos::{DemoError, Example, InputAction, LoopFeedback, WINDOW_SIZE};
use glfw::{Action, Context as _, CursorMode, SwapInterval, WindowEvent, WindowMode};
use luminance_front::framebuffer::FramebufferError;
use luminance_glfw::{GlfwSurface, GlfwSurfaceError};
use platform::DesktopPlatformServices;
use std::{fmt, iter, path::PathBuf, process, sync::mpsc::Receiver, time::Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct CLIOpts {
  #[structopt(short, long)]
  /// Directory where to pick textures, cubemap faces and models from. Defaults to the `resources` directory next to
  /// the executable.
  resources: Option<PathBuf>,

  #[structopt(short, long)]
  /// List available examples.
  list_examples: bool,

  /// Example to run.
  example: Option<String>,
}

/// The window could not be opened.
#[derive(Debug)]
pub struct NoWindow;

impl fmt::Display for NoWindow {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("cannot open the window")
  }
}

impl std::error::Error for NoWindow {}

// What can go wrong while running an example.
#[derive(Debug)]
enum AppError {
  Surface(GlfwSurfaceError<NoWindow>),
  BackBuffer(FramebufferError),
  Bootstrap(DemoError),
  Run(DemoError),
  UnknownExample(String),
}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      AppError::Surface(ref e) => write!(f, "cannot create the GLFW surface: {}", e),
      AppError::BackBuffer(ref e) => write!(f, "cannot get the back buffer: {}", e),
      AppError::Bootstrap(ref e) => write!(f, "cannot bootstrap the example: {}", e),
      AppError::Run(ref e) => write!(f, "the example failed: {}", e),
      AppError::UnknownExample(ref name) => write!(f, "no example named {}", name),
    }
  }
}

impl From<GlfwSurfaceError<NoWindow>> for AppError {
  fn from(e: GlfwSurfaceError<NoWindow>) -> Self {
    AppError::Surface(e)
  }
}

impl From<FramebufferError> for AppError {
  fn from(e: FramebufferError) -> Self {
    AppError::BackBuffer(e)
  }
}

impl From<DemoError> for AppError {
  fn from(e: DemoError) -> Self {
    AppError::Bootstrap(e)
  }
}

/// Macro to declaratively add examples.
macro_rules! examples {
  (
    examples: $($ex_name:literal, $test_ident:ident),* ,
    funtests: $($fun_name:literal, $fun_ident:ident),* $(,)?
  ) => {
    fn show_available_examples() {
      println!("available examples:");
      $( println!("  - {}", $ex_name); )*

      #[cfg(feature = "funtest")]
      {
        println!("\navailable functional tests:");
        $( println!("  - {}", $fun_name); )*
      }
    }

    // create a function that will run an example based on its name
    fn pick_and_run_example(cli_opts: CLIOpts) -> Result<(), AppError> {
      let example_name = cli_opts.example.as_deref();
      match example_name {
        $(
          Some($ex_name) => {
            run_example::<freelook_demos::$test_ident::LocalExample>(cli_opts, $ex_name)
          }
        ),*

        $(
          #[cfg(feature = "funtest")]
          Some($fun_name) => {
            run_example::<freelook_demos::$fun_ident::LocalExample>(cli_opts, $fun_name)
          }
        ),*

        Some(name) => Err(AppError::UnknownExample(name.to_owned())),

        None => {
          log::error!("no example given");
          show_available_examples();
          Ok(())
        }
      }
    }
  }
}

// Open a captured-cursor window with vsync off.
fn create_surface(name: &str) -> Result<GlfwSurface, GlfwSurfaceError<NoWindow>> {
  GlfwSurface::new(|glfw| {
    let (mut window, events) = glfw
      .create_window(WINDOW_SIZE[0], WINDOW_SIZE[1], name, WindowMode::Windowed)
      .ok_or(GlfwSurfaceError::UserError(NoWindow))?;

    window.make_current();
    window.set_all_polling(true);
    window.set_cursor_mode(CursorMode::Disabled);
    glfw.set_swap_interval(SwapInterval::None);

    Ok((window, events))
  })
}

// Keep running the example, stop, or fail.
fn step<E>(feedback: LoopFeedback<E>) -> Result<Option<E>, AppError> {
  match feedback {
    LoopFeedback::Continue(example) => Ok(Some(example)),
    LoopFeedback::Exit => Ok(None),
    LoopFeedback::Abort(e) => Err(AppError::Run(e)),
  }
}

// Run an example.
fn run_example<E>(cli_opts: CLIOpts, name: &str) -> Result<(), AppError>
where
  E: Example,
{
  let root = cli_opts
    .resources
    .unwrap_or_else(platform::default_resource_root);

  // Check the features so that we know what we are allowed to load.
  let mut services = DesktopPlatformServices::new(root, E::features());

  let surface = create_surface(name)?;
  let mut context = surface.context;
  let events: Receiver<(f64, WindowEvent)> = surface.events_rx;

  log::info!("bootstrapping {}", name);
  let example = E::bootstrap(&mut services, &mut context)?;
  let start_t = Instant::now();

  // render a first frame with the actual framebuffer size; the window manager may have picked another size than the
  // one asked for
  let (fb_w, fb_h) = context.window.get_framebuffer_size();
  let back_buffer = context.back_buffer()?;
  let feedback = example.render_frame(
    0.,
    back_buffer,
    iter::once(InputAction::Resized {
      width: fb_w.max(0) as _,
      height: fb_h.max(0) as _,
    }),
    &mut context,
  );
  let mut example = match step(feedback)? {
    Some(example) => example,
    None => return Ok(()),
  };

  'app: loop {
    // handle events
    context.window.glfw.poll_events();

    let window = &context.window;
    let mut actions = input::held_movements(|key| window.get_key(key) == Action::Press);
    let adapted = glfw::flush_messages(&events).flat_map(|(_, event)| input::adapt_event(event));
    actions.extend(adapted);

    let t = start_t.elapsed().as_secs_f32();
    let back_buffer = context.back_buffer()?;
    let feedback = example.render_frame(t, back_buffer, actions.into_iter(), &mut context);

    match step(feedback)? {
      Some(stepped) => {
        example = stepped;
        context.window.swap_buffers();
      }

      None => break 'app,
    }
  }

  Ok(())
}

examples! {
  examples:
  "textured-cubes", textured_cubes,
  "shadow-cubemap", shadow_cubemap,
  "asteroids", asteroids,
  "parallax-mapping", parallax_mapping,
  "skybox", skybox,

  // functional tests
  funtests:
  "funtest-resolve-solid-color", funtest_resolve_solid_color,
}

fn main() {
  env_logger::builder()
    .filter_level(log::LevelFilter::Info)
    .parse_default_env()
    .init();
  let cli_opts = CLIOpts::from_args();

  if cli_opts.list_examples {
    show_available_examples();
  } else if let Err(e) = pick_and_run_example(cli_opts) {
    log::error!("{}", e);
    process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn feedback_decides_the_next_frame() {
    assert!(matches!(step(LoopFeedback::Continue(3)), Ok(Some(3))));
    assert!(matches!(step::<u8>(LoopFeedback::Exit), Ok(None)));
  }

  #[test]
  fn aborting_example_fails_the_run() {
    let feedback = LoopFeedback::<u8>::Abort(DemoError::TexelMismatch {
      count: 1,
      first: 0,
      expected: [0.; 4],
      found: [1.; 4],
    });

    match step(feedback) {
      Err(e @ AppError::Run(DemoError::TexelMismatch { .. })) => {
        assert!(e.to_string().starts_with("the example failed: 1 texels differ"));
      }

      r => panic!("unexpected result: {:?}", r.map(|_| ())),
    }
  }
}
