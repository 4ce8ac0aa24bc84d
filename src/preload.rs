// Startup image preloading and per-image carousel load state.
// Load errors count as "done": nothing is retried and nothing is surfaced.

use std::collections::HashSet;

use serde::Serialize;

/// Preloading force-completes after this long regardless of progress.
pub const PRELOAD_TIMEOUT_MS: f64 = 8000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreloadStatus {
    Loading,
    Complete,
    TimedOut,
}

/// Tracks the startup preload of every site image.
#[derive(Debug, Clone)]
pub struct ImagePreloader {
    pending: HashSet<String>,
    total: usize,
    failed: usize,
    started_at_ms: f64,
    status: PreloadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreloadProgress {
    pub finished: usize,
    pub failed: usize,
    pub total: usize,
    /// 0.0..=1.0, suitable for a loading bar width.
    pub fraction: f32,
    pub status: PreloadStatus,
}

impl ImagePreloader {
    pub fn new<'a>(urls: impl IntoIterator<Item = &'a str>, started_at_ms: f64) -> Self {
        let pending: HashSet<String> = urls.into_iter().map(str::to_string).collect();
        let total = pending.len();
        ImagePreloader {
            pending,
            total,
            failed: 0,
            started_at_ms,
            status: if total == 0 {
                PreloadStatus::Complete
            } else {
                PreloadStatus::Loading
            },
        }
    }

    /// Mark `url` as loaded. Returns true if this finished the preload.
    pub fn mark_loaded(&mut self, url: &str) -> bool {
        self.finish(url, false)
    }

    /// Mark `url` as failed; treated the same as loaded.
    pub fn mark_failed(&mut self, url: &str) -> bool {
        self.finish(url, true)
    }

    fn finish(&mut self, url: &str, failed: bool) -> bool {
        if self.status != PreloadStatus::Loading || !self.pending.remove(url) {
            return false;
        }
        if failed {
            self.failed += 1;
        }
        if self.pending.is_empty() {
            self.status = PreloadStatus::Complete;
            return true;
        }
        false
    }

    /// Advance the clock. Returns true if this call forced completion.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.status == PreloadStatus::Loading && now_ms - self.started_at_ms >= PRELOAD_TIMEOUT_MS {
            log::info!(
                "Image preload timed out with {} of {} images outstanding",
                self.pending.len(),
                self.total
            );
            self.status = PreloadStatus::TimedOut;
            return true;
        }
        false
    }

    pub fn is_done(&self) -> bool {
        self.status != PreloadStatus::Loading
    }

    pub fn progress(&self) -> PreloadProgress {
        let finished = self.total - self.pending.len();
        let fraction = match self.status {
            PreloadStatus::Loading => finished as f32 / self.total as f32,
            _ => 1.0,
        };
        PreloadProgress {
            finished,
            failed: self.failed,
            total: self.total,
            fraction,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselSlide {
    pub url: String,
    /// Skeleton shown until the image fires load or error.
    pub loading: bool,
}

/// Side panel image carousel for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Carousel {
    slides: Vec<CarouselSlide>,
    index: usize,
}

impl Carousel {
    pub fn new(images: &[String]) -> Self {
        Carousel {
            slides: images
                .iter()
                .map(|url| CarouselSlide {
                    url: url.clone(),
                    loading: true,
                })
                .collect(),
            index: 0,
        }
    }

    pub fn slides(&self) -> &[CarouselSlide] {
        &self.slides
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&CarouselSlide> {
        self.slides.get(self.index)
    }

    /// Load and error both clear the skeleton.
    pub fn settle(&mut self, slide: usize) {
        if let Some(s) = self.slides.get_mut(slide) {
            s.loading = false;
        }
    }

    pub fn next(&mut self) {
        if !self.slides.is_empty() {
            self.index = (self.index + 1) % self.slides.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.slides.is_empty() {
            self.index = (self.index + self.slides.len() - 1) % self.slides.len();
        }
    }

    pub fn go_to(&mut self, slide: usize) {
        if slide < self.slides.len() {
            self.index = slide;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_when_all_settle() {
        let mut preload = ImagePreloader::new(["a.jpg", "b.jpg", "a.jpg"], 0.0);
        assert_eq!(preload.progress().total, 2);

        assert!(!preload.mark_loaded("a.jpg"));
        assert!(!preload.mark_loaded("a.jpg"));
        assert_eq!(preload.progress().fraction, 0.5);

        assert!(preload.mark_failed("b.jpg"));
        assert!(preload.is_done());
        let progress = preload.progress();
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.status, PreloadStatus::Complete);
    }

    #[test]
    fn times_out_after_eight_seconds() {
        let mut preload = ImagePreloader::new(["a.jpg", "b.jpg"], 1000.0);
        preload.mark_loaded("a.jpg");
        assert!(!preload.tick(8999.0));
        assert!(preload.tick(9000.0));
        assert!(!preload.tick(9500.0));
        assert_eq!(preload.progress().status, PreloadStatus::TimedOut);
        assert_eq!(preload.progress().fraction, 1.0);

        // Late arrivals change nothing.
        assert!(!preload.mark_loaded("b.jpg"));
    }

    #[test]
    fn empty_preload_is_immediately_done() {
        let preload = ImagePreloader::new(std::iter::empty(), 0.0);
        assert!(preload.is_done());
        assert_eq!(preload.progress().fraction, 1.0);
    }

    #[test]
    fn carousel_wraps_and_settles() {
        let mut carousel = Carousel::new(&["1.jpg".to_string(), "2.jpg".to_string()]);
        assert!(carousel.current().unwrap().loading);

        carousel.settle(0);
        assert!(!carousel.current().unwrap().loading);

        carousel.previous();
        assert_eq!(carousel.index(), 1);
        carousel.next();
        assert_eq!(carousel.index(), 0);
        carousel.go_to(5);
        assert_eq!(carousel.index(), 0);
        carousel.settle(9);
        assert!(carousel.slides()[1].loading);
    }
}
