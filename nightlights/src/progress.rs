use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Returns a download progress bar, drawn only when `visible`.
pub fn bar(header: String, length: u64, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(
        Some(length),
        if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        },
    );
    pb.set_prefix(header);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len}")
            .expect("incorrect progress bar format string")
            .progress_chars("#>-"),
    );
    pb
}
