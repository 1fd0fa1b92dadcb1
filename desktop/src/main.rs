use std::cell::RefCell;
use std::env;
use std::rc::Rc;

use zxart_core::{
    application::Application,
    display::{HEIGHT, WIDTH},
    framebuffer::FrameBuffer,
    net::CancelToken,
};
use zxart_desktop::{
    DesktopError,
    cli::{self, Command},
    display::MinifbDisplay,
    net::TcpConnector,
    render,
    storage::DirStorage,
};

const BUILD_VERSION: &str = env!("ZXART_VERSION");
const BUILD_TIME: &str = env!("ZXART_BUILD_TIME");

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let command = match cli::parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}\n\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    let result = match command {
        Command::Version => {
            println!("zxart-desktop {BUILD_VERSION} ({BUILD_TIME})");
            Ok(())
        }
        Command::Render {
            input,
            output,
            mode,
        } => render::render_file(&input, &output, mode),
        Command::View { config, cache_dir } => run_viewer(config, cache_dir),
    };

    if let Err(err) = result {
        eprintln!("zxart-desktop: {err}");
        std::process::exit(1);
    }
}

fn run_viewer(
    config: zxart_core::config::ViewerConfig,
    cache_dir: std::path::PathBuf,
) -> Result<(), DesktopError> {
    let mut storage = DirStorage::new(cache_dir).map_err(|err| err.0)?;
    log::info!(
        "ZX Art viewer {BUILD_VERSION} started, cache in {}",
        storage.root().display()
    );

    let mut window = minifb::Window::new(
        "ZX Art Viewer",
        WIDTH,
        HEIGHT,
        minifb::WindowOptions {
            scale: minifb::Scale::X2,
            ..minifb::WindowOptions::default()
        },
    )?;
    window.set_target_fps(60);

    let display = Rc::new(RefCell::new(MinifbDisplay::new(window)));
    let cancel = CancelToken::new();
    let mut connector = TcpConnector::with_interrupt({
        let display = Rc::clone(&display);
        let cancel = cancel.clone();
        Rc::new(move || {
            let Ok(mut display) = display.try_borrow_mut() else {
                return cancel.is_cancelled();
            };
            if display.interrupt_requested() {
                cancel.cancel();
            }
            cancel.is_cancelled()
        })
    });

    let mut display_buffers = Box::new(FrameBuffer::new());
    let mut application = Application::new(
        &mut *display_buffers,
        &mut connector,
        &mut storage,
        config,
        cancel,
    );

    application.start();
    application.draw(&mut *display.borrow_mut());
    while display.borrow().is_open() {
        display.borrow_mut().update();
        let buttons = display.borrow().get_buttons();
        application.update(&buttons);
        application.draw(&mut *display.borrow_mut());
    }
    Ok(())
}
