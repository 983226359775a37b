//! Remaining-file reporting for the operator.

use std::io::Write;

use indicatif::{ProgressBar, ProgressStyle};

/// How the remaining-file count is shown.
pub enum Progress {
    /// Progress bar over the total file count
    Bar(ProgressBar),
    /// `\rFiles remaining: N` on stderr
    Plain,
    /// Nothing shown (tests, embedding)
    Hidden,
}

impl Progress {
    pub fn new(total: usize, show_bar: bool) -> Self {
        if !show_bar {
            return Progress::Plain;
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message("files reduced");
        Progress::Bar(pb)
    }

    /// Report a file finishing with `remaining` still outstanding.
    pub fn update(&self, remaining: usize) {
        match self {
            Progress::Bar(pb) => pb.inc(1),
            Progress::Plain => {
                let mut stderr = std::io::stderr().lock();
                let _ = write!(stderr, "\rFiles remaining: {remaining:3}");
                let _ = stderr.flush();
            }
            Progress::Hidden => {}
        }
    }

    pub fn finish(&self) {
        match self {
            Progress::Bar(pb) => pb.finish_with_message("files reduced"),
            Progress::Plain => eprintln!(),
            Progress::Hidden => {}
        }
    }
}
