pub mod add_machine;
pub mod bootstrap;
pub mod destroy;
pub mod list;
pub mod terminate;

use colored::Colorize;
use juju_docean_core::OperationError;

/// Print per-machine failures with enough detail to clean up by hand
pub(crate) fn print_failures<'a>(
    failures: impl IntoIterator<Item = (&'a str, &'a OperationError)>,
) {
    for (label, error) in failures {
        eprintln!("{} {}: {}", "✗".red(), label.bold(), error);
        if let Some(id) = error.orphaned_instance() {
            eprintln!("  {} instance {} may need to be destroyed manually", "!".yellow(), id);
        }
    }
}
