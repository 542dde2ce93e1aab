use std::io;
use std::time::{Duration, Instant};

use crate::app::App;
use crate::config::Config;
use crate::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use crate::drivers::{InputDriver, OutputDriver};
use crate::event_loop::{ControlFlow, EventLoop};
use crate::keybindings::Action;
use crate::tracing_sub;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Run gridmux on the controlling terminal until the user quits. The terminal
/// is restored before this returns, including on error.
pub fn run(config: Config) -> crate::Result<()> {
    let logs = tracing_sub::init(config.log_level, config.log_file.as_deref())?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");
    let mut app = App::new(config, logs);

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let (width, height) = output.size()?;
    app.resize(width, height, Instant::now());
    app.run_action(Action::NewTerminal);

    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;
    let result = run_app(&mut app, &mut input, &mut output);
    output.exit()?;
    result?;
    tracing::info!("exiting");
    Ok(())
}

/// Pump events into `app` and redraw once per tick.
pub fn run_app<I, O>(app: &mut App, input: I, output: &mut O) -> io::Result<()>
where
    I: InputDriver,
    O: OutputDriver,
{
    let mut event_loop = EventLoop::new(input, POLL_INTERVAL);
    event_loop.run(|_, event| {
        let now = Instant::now();
        if let Some(event) = event {
            return Ok(app.handle_event(event, now));
        }
        if app.tick(now) == ControlFlow::Quit {
            return Ok(ControlFlow::Quit);
        }
        output.draw(|mut frame| {
            let area = frame.area();
            app.resize(area.width, area.height, now);
            app.render(&mut frame);
        })?;
        Ok(ControlFlow::Continue)
    })
}
