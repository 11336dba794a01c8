use std::env;
use std::io::{self, Write};
use std::time::Instant;

/// Progress bar styles for downloads.
#[derive(Debug, Clone)]
pub enum ProgressBar {
    /// Pretty, verbose progress bars.
    Full,
    /// Minimal output, suitable when stderr is captured to a file.
    Light,
}

impl Default for ProgressBar {
    fn default() -> Self {
        ProgressBar::Full
    }
}

impl ProgressBar {
    /// `None` when progress rendering is disabled via the environment.
    pub(crate) fn from_env() -> Option<ProgressBar> {
        if env::var_os("MINATO_DISABLE_PROGRESSBAR").is_some() {
            None
        } else {
            Some(ProgressBar::default())
        }
    }

    pub(crate) fn wrap_write<W: Write>(
        &self,
        resource: &str,
        content_length: Option<u64>,
        writer: W,
    ) -> DownloadWrapper<W> {
        let bar: Box<dyn DownloadBar + Send> = match self {
            ProgressBar::Full => Box::new(FullDownloadBar::new(content_length)),
            ProgressBar::Light => Box::new(LightDownloadBar::new(resource, content_length)),
        };
        DownloadWrapper { bar, writer }
    }
}

pub(crate) struct DownloadWrapper<W: Write> {
    bar: Box<dyn DownloadBar + Send>,
    writer: W,
}

impl<W: Write> DownloadWrapper<W> {
    pub(crate) fn finish(&self) {
        self.bar.finish();
    }
}

impl<W: Write> Write for DownloadWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.bar.tick(written);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

trait DownloadBar {
    fn tick(&mut self, chunk_size: usize);

    fn finish(&self);
}

struct FullDownloadBar {
    bar: indicatif::ProgressBar,
}

impl FullDownloadBar {
    fn new(content_length: Option<u64>) -> Self {
        let bar = match content_length {
            Some(length) => {
                let bar = indicatif::ProgressBar::new(length);
                bar.set_style(
                    indicatif::ProgressStyle::default_bar()
                        .progress_chars("=>-")
                        .template(
                            "{msg:.bold.cyan/blue} [{bar:20.cyan/blue}][{percent}%] {bytes}/{total_bytes:.bold} |{bytes_per_sec}|",
                        )
                        .expect("static progress template"),
                );
                bar
            }
            None => {
                let bar = indicatif::ProgressBar::new_spinner();
                bar.set_style(
                    indicatif::ProgressStyle::default_spinner()
                        .template("{msg:.bold.cyan/blue} {spinner:.cyan/blue} {bytes:.bold} |{bytes_per_sec}|")
                        .expect("static progress template"),
                );
                bar
            }
        };
        bar.set_message("Downloading");
        Self { bar }
    }
}

impl DownloadBar for FullDownloadBar {
    fn tick(&mut self, chunk_size: usize) {
        self.bar.inc(chunk_size as u64);
    }

    fn finish(&self) {
        self.bar.set_message("Downloaded");
        self.bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{msg:.green.bold} {total_bytes:.bold} in {elapsed}")
                .expect("static progress template"),
        );
        self.bar.finish_using_style();
    }
}

struct LightDownloadBar {
    start_time: Instant,
    bytes_since_last_update: usize,
}

impl LightDownloadBar {
    fn new(resource: &str, content_length: Option<u64>) -> Self {
        if let Some(size) = content_length {
            eprint!(
                "Downloading {} [{}]...",
                resource,
                indicatif::HumanBytes(size)
            );
        } else {
            eprint!("Downloading {}...", resource);
        }
        io::stderr().flush().ok();
        Self {
            start_time: Instant::now(),
            bytes_since_last_update: 0,
        }
    }
}

impl DownloadBar for LightDownloadBar {
    fn tick(&mut self, chunk_size: usize) {
        self.bytes_since_last_update += chunk_size;
        // Print a dot every 100 MBs.
        if self.bytes_since_last_update > 100_000_000 {
            eprint!(".");
            io::stderr().flush().ok();
            self.bytes_since_last_update = 0;
        }
    }

    fn finish(&self) {
        let duration = Instant::now().duration_since(self.start_time);
        eprintln!(" done in {}", indicatif::HumanDuration(duration));
        io::stderr().flush().ok();
    }
}
