use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use engine_logging::{engine_info, engine_warn};
use viewer3d_app::command::{parse_command, Command};
use viewer3d_app::session::Session;
use viewer3d_app::shape::{ShapeBuilder, Structure};
use viewer3d_app::{config, persistence, render};
use workbench_jobs::{DefaultResourceLoader, JobManager, ResourceLoader, ViewBinding};

use super::logging;

/// How long the owner loop waits for input before applying finished loads.
const TICK: Duration = Duration::from_millis(50);

pub fn run_app() -> anyhow::Result<()> {
    let config = config::load(&config::config_path())?;
    logging::initialize(config.log_destination, config.level_filter());

    let state_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let session = Rc::new(RefCell::new(persistence::load_session(&state_dir)));

    let jobs = JobManager::new(config.job_manager_config()).context("starting job manager")?;
    let loader: Arc<dyn ResourceLoader> =
        Arc::new(DefaultResourceLoader::new(config.fetch_settings()));
    let sink = session.clone();
    let mut view = ViewBinding::new(
        config.binding_config(),
        jobs.clone(),
        loader,
        Arc::new(ShapeBuilder),
    )
    .with_set_input(move |resource| {
        sink.borrow_mut().set_input(resource, Utc::now().to_rfc3339());
    });

    let initial = std::env::args()
        .nth(1)
        .or_else(|| session.borrow().resource().map(ToOwned::to_owned));
    if let Some(resource) = initial {
        engine_info!("Opening initial resource {}", resource);
        open_initial(&mut view, resource);
    }

    let commands = spawn_input_reader();
    let mut out = io::stdout();
    render::render_help(&mut out)?;
    render_view(&mut out, &session.borrow(), &view)?;

    loop {
        match commands.recv_timeout(TICK) {
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => handle_command(&mut out, &mut view, &session, command)?,
            Err(RecvTimeoutError::Timeout) => {}
        }

        view.process_pending();
        if view.consume_dirty() {
            render_view(&mut out, &session.borrow(), &view)?;
        }
    }

    persistence::save_session(&state_dir, &session.borrow());
    jobs.shutdown();
    Ok(())
}

/// Existing paths go through the file chooser route so they are shown as `file:` URIs.
fn open_initial(view: &mut ViewBinding<Structure>, resource: String) {
    if Path::new(&resource).exists() {
        view.choose_file(resource);
    } else {
        view.load(resource);
    }
}

fn handle_command(
    out: &mut impl Write,
    view: &mut ViewBinding<Structure>,
    session: &RefCell<Session>,
    command: Command,
) -> io::Result<()> {
    // Dispatching may call back into the session, so it is only borrowed to render history.
    match command {
        Command::Open(path) => view.choose_file(path),
        Command::Load(text) => view.submit_input(text),
        Command::Refresh => view.refresh(),
        Command::Clear => view.clear(),
        Command::History => render::render_history(out, &session.borrow())?,
        Command::Help => render::render_help(out)?,
        Command::Invalid(reason) => writeln!(out, "{reason}")?,
        Command::Empty | Command::Quit => {}
    }
    out.flush()
}

fn render_view(
    out: &mut impl Write,
    session: &Session,
    view: &ViewBinding<Structure>,
) -> io::Result<()> {
    render::render(out, session, &view.view(), view.structure())?;
    out.flush()
}

/// Reads stdin on its own thread so the owner loop never blocks on the terminal.
fn spawn_input_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    engine_warn!("Reading stdin failed: {}", err);
                    break;
                }
            };
            if tx.send(parse_command(&line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}
