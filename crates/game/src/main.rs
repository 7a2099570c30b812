mod app;

use tracing::{error, info};

fn main() {
    let wiring = match app::build_app() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "config_failed");
            std::process::exit(1);
        }
    };

    match app::run_session(&wiring) {
        Ok(report) => info!(
            frames = report.summary.frames,
            ticks = report.summary.ticks,
            draw_calls = report.draw_calls,
            "shutdown"
        ),
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(1);
        }
    }
}
