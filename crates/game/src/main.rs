use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    match app::build_app() {
        Ok(wiring) => app::run(wiring),
        Err(message) => {
            eprintln!("handsim startup failed: {message}");
            ExitCode::FAILURE
        }
    }
}
