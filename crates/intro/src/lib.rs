//! Timed reveal of the intro overlay.
//!
//! `play` locks page scrolling, then schedules every beat against the moment it
//! was called. Beats are independent one-shot timers, so a late beat never
//! shifts the ones after it.

use std::time::Duration;

use futures::future::join_all;
use tokio::{
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, warn};

mod page;

pub use page::{Element, Page, SharedPage};

use page::lock_page;

pub const OVERLAY_ID: &str = "Intro_Overlay";

pub const TEXT_PATH_CLASS: &str = "path-text";
pub const LEFT_BRACKET_CLASS: &str = "path-symbol-left";
pub const SLASH_CLASS: &str = "path-symbol-slash";
pub const RIGHT_BRACKET_CLASS: &str = "path-symbol-right";

pub const ANIM_TEXT_CLASS: &str = "anim-text";
pub const ANIM_SYMBOL_CLASS: &str = "anim-symbol";
pub const FADE_OUT_CLASS: &str = "fade-out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    RevealText,
    RevealLeftBracket,
    RevealSlash,
    RevealRightBracket,
    FadeOut,
}

/// Offsets are measured from the `play` call, not from the previous beat.
pub const BEATS: [(Duration, Beat); 5] = [
    (Duration::from_millis(200), Beat::RevealText),
    (Duration::from_millis(600), Beat::RevealLeftBracket),
    (Duration::from_millis(800), Beat::RevealSlash),
    (Duration::from_millis(1000), Beat::RevealRightBracket),
    (Duration::from_millis(1500), Beat::FadeOut),
];

impl Beat {
    /// Applies this beat and returns how many nodes it marked. Missing nodes are skipped.
    pub fn apply(self, page: &mut Page) -> usize {
        let touched = match page.element_by_id_mut(OVERLAY_ID) {
            Some(overlay) => match self {
                Beat::RevealText => overlay.for_each_matching(TEXT_PATH_CLASS, &mut |path: &mut Element| {
                    path.add_class(ANIM_TEXT_CLASS);
                }),
                Beat::RevealLeftBracket => reveal_symbol(overlay, LEFT_BRACKET_CLASS),
                Beat::RevealSlash => reveal_symbol(overlay, SLASH_CLASS),
                Beat::RevealRightBracket => reveal_symbol(overlay, RIGHT_BRACKET_CLASS),
                Beat::FadeOut => {
                    overlay.add_class(FADE_OUT_CLASS);
                    1
                }
            },
            None => 0,
        };

        if self == Beat::FadeOut {
            page.scroll_locked = false;
        }
        touched
    }
}

fn reveal_symbol(overlay: &mut Element, class: &str) -> usize {
    match overlay.query_first_mut(class) {
        Some(symbol) => {
            symbol.add_class(ANIM_SYMBOL_CLASS);
            1
        }
        None => 0,
    }
}

/// Beats scheduled by one `play` call. Dropping it does not cancel them.
#[derive(Debug)]
pub struct Playback {
    started_at: Instant,
    handles: Vec<JoinHandle<()>>,
}

impl Playback {
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Waits until every beat, including the fade-out, has fired.
    pub async fn finished(self) {
        for result in join_all(self.handles).await {
            if let Err(error) = result {
                warn!(%error, "intro beat task failed");
            }
        }
    }
}

/// Starts the intro sequence. Must be called inside a tokio runtime.
///
/// Returns `None`, leaving the page untouched, when it has no overlay.
pub fn play(page: &SharedPage) -> Option<Playback> {
    let started_at = Instant::now();
    {
        let mut guard = lock_page(page);
        if guard.element_by_id(OVERLAY_ID).is_none() {
            debug!(overlay = OVERLAY_ID, "no intro overlay on page");
            return None;
        }
        guard.scroll_locked = true;
    }

    let handles = BEATS
        .iter()
        .map(|&(offset, beat)| {
            let page = page.clone();
            tokio::spawn(async move {
                sleep_until(started_at + offset).await;
                let touched = beat.apply(&mut lock_page(&page));
                debug!(?beat, offset_ms = offset.as_millis() as u64, touched, "intro beat fired");
            })
        })
        .collect();

    Some(Playback {
        started_at,
        handles,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
