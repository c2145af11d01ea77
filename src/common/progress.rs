use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TICKS: &str = "⠁⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚";

pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICKS);
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Bar measured in percent, for long-running jobs that report coarse progress.
pub fn create_percent_bar(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars(SPINNER_TICKS)
        .progress_chars("█▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a spinner and print a success message with a checkmark
/// This clears the spinner line entirely and prints a clean message
pub fn finish_spinner_with_success(pb: ProgressBar, message: impl Into<String>) {
    pb.finish_and_clear();
    println!("✓ {}", message.into());
}
