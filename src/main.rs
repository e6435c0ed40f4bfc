use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{bail, Context, Result};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use sortie_core::error::BotError;
use sortie_core::landmarks::Landmarks;
use sortie_core::notify::create_notifier;
use sortie_core::platform::create_platform;
use sortie_core::poll::CancelToken;
use sortie_core::probe::Screen;
use sortie_core::session::Session;
use sortie_core::settings::Settings;
use sortie_core::supervisor::{RunEnd, Supervisor};
use sortie_core::types::shared_status;
use sortie_core::{flows, logger};

struct Args {
    force_stub: bool,
    headless: bool,
    settings: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args { force_stub: false, headless: false, settings: None };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--stub" => args.force_stub = true,
            "--headless" => args.headless = true,
            "--settings" => {
                let path = it.next().context("--settings needs a path")?;
                args.settings = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument: {} (expected --stub, --headless, --settings <path>)", other),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if let Err(e) = logger::init(&cwd.join("logs")) {
        eprintln!("log file disabled: {:#}", e);
    }

    let settings_path = args.settings.unwrap_or_else(|| cwd.join("settings.json"));
    let settings = Settings::load(&settings_path);
    if !settings_path.exists() {
        match settings.save(&settings_path) {
            Ok(()) => logger::info(&format!("wrote default settings to {}", settings_path.display())),
            Err(e) => logger::warn(&format!("could not write default settings: {:#}", e)),
        }
    }
    settings.validate().with_context(|| format!("invalid settings in {}", settings_path.display()))?;

    let status = shared_status();
    if let Ok(mut st) = status.lock() {
        st.flow = settings.flow;
    }
    let cancel = CancelToken::new();

    let (log_tx, log_rx) = mpsc::channel::<String>();
    if args.headless {
        logger::set_echo(true);
    } else {
        logger::set_tui_sender(log_tx);
    }
    logger::info(&format!(
        "{} started: {} flow, assets {}",
        settings.program_name,
        settings.flow,
        settings.assets_dir.display()
    ));

    let missing = Landmarks::new(&settings.assets_dir).missing().len();
    if missing > 0 {
        logger::warn(&format!("{} landmark image(s) missing under {}", missing, settings.assets_dir.display()));
    }

    // The runner owns the platform and session; the UI only sees the
    // shared status and the cancel token.
    let runner = {
        let status = Arc::clone(&status);
        let cancel = cancel.clone();
        let settings = settings.clone();
        let force_stub = args.force_stub;
        thread::spawn(move || -> Result<RunEnd, BotError> {
            let mut screen = Screen::new(create_platform(&settings, force_stub), cancel);
            let mut session = Session::new(settings.retry_limit, status);
            let mut cycle = flows::build_cycle(&settings);
            let mut supervisor = Supervisor::new(
                settings.program_name.clone(),
                create_notifier(settings.notify.as_ref()),
                Landmarks::new(&settings.assets_dir).client_icon,
                settings.max_cycles,
            );
            supervisor.run(&mut screen, &mut session, cycle.as_mut())
        })
    };

    if !args.headless {
        run_tui(status, log_rx, cancel.clone())?;
        // leaving the UI always stops the run
        cancel.cancel();
    }

    let outcome = runner.join().map_err(|_| anyhow::anyhow!("runner thread panicked"))?;
    match outcome {
        Ok(RunEnd::Completed { cycles }) => logger::info(&format!("finished after {} cycle(s)", cycles)),
        Ok(RunEnd::Cancelled) => logger::info("stopped"),
        Err(e) => {
            logger::error(&format!("run failed: {}", e));
            return Err(e.into());
        }
    }
    Ok(())
}

fn run_tui(status: sortie_core::types::SharedStatus, log_rx: mpsc::Receiver<String>, cancel: CancelToken) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = sortie_tui::App::new(status, log_rx, cancel);
    let result = sortie_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
