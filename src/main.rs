use flowsim::context::Environment;
use flowsim::status::ExitStatus;
use flowsim::{core, signals};
use tokio_util::sync::CancellationToken;

/// Entry point - installs the Ctrl+C handler and calls core::run()
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    // Ctrl+C cancels the token instead of exiting, so a run stops between steps
    let cancel = CancellationToken::new();
    signals::install(cancel.clone());

    let args: Vec<String> = std::env::args().collect();
    let env = Environment::init();

    let status = core::run(args, env, cancel);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }

    status
}
