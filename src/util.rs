//! Utility functions

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress bar for `len` steps, drawn on stderr only if `draw_progress`.
pub(crate) fn progress_bar(len: usize, message: &'static str, draw_progress: bool) -> ProgressBar {
    let draw_target = if draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let progress = ProgressBar::with_draw_target(Some(len as u64), draw_target);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:3}% ({eta:5})")
    {
        progress.set_style(style.progress_chars("=> "));
    }
    progress.set_message(message);
    progress
}

/// Format a list of values as a short, comma separated string, eliding the middle.
pub fn fmt_elided<T: std::fmt::Display>(values: &[T], max: usize) -> String {
    if values.len() <= max || max < 2 {
        return values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
    }
    let head = max / 2;
    let tail = max - head;
    let mut parts: Vec<String> = values[..head].iter().map(ToString::to_string).collect();
    parts.push("...".into());
    parts.extend(values[values.len() - tail..].iter().map(ToString::to_string));
    parts.join(", ")
}
