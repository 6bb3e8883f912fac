//! Progress bar for the map traversal

use indicatif::{ProgressBar, ProgressStyle};
use vmap_extractor::TileProgress;
use vmap_extractor::formats::MAP_SIZE;

/// One bar per map, advanced once per grid column
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl ProgressReporter {
    pub fn new(hidden: bool) -> Self {
        Self { bar: None, hidden }
    }
}

impl TileProgress for ProgressReporter {
    fn begin_map(&mut self, map_id: u32, name: &str) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            create_progress_bar(MAP_SIZE as u64, &format!("Map {map_id} ({name})"))
        };
        self.bar = Some(bar);
    }

    fn row_done(&mut self, _x: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn end_map(&mut self, _map_id: u32) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
