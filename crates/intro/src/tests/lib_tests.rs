use super::*;
use tokio::time::advance;

fn overlay(text_paths: usize) -> Element {
    let mut svg = Element::new();
    for _ in 0..text_paths {
        svg = svg.with_child(Element::new().with_class(TEXT_PATH_CLASS));
    }
    Element::new().with_id(OVERLAY_ID).with_child(
        svg.with_child(Element::new().with_class(LEFT_BRACKET_CLASS))
            .with_child(Element::new().with_class(SLASH_CLASS))
            .with_child(Element::new().with_class(RIGHT_BRACKET_CLASS)),
    )
}

fn page_with(overlay: Element) -> SharedPage {
    Page::new(Element::new().with_child(overlay)).into_shared()
}

fn snapshot(page: &SharedPage) -> Page {
    lock_page(page).clone()
}

fn texts_revealed(page: &Page) -> Vec<bool> {
    page.element_by_id(OVERLAY_ID)
        .expect("overlay")
        .query_all(TEXT_PATH_CLASS)
        .iter()
        .map(|path| path.has_class(ANIM_TEXT_CLASS))
        .collect()
}

fn symbol_revealed(page: &Page, class: &str) -> bool {
    page.element_by_id(OVERLAY_ID)
        .expect("overlay")
        .query_all(class)
        .first()
        .is_some_and(|symbol| symbol.has_class(ANIM_SYMBOL_CLASS))
}

fn faded(page: &Page) -> bool {
    page.element_by_id(OVERLAY_ID)
        .expect("overlay")
        .has_class(FADE_OUT_CLASS)
}

// Moves the paused clock forward and lets the woken beats run.
async fn advance_ms(ms: u64) {
    advance(Duration::from_millis(ms)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn absent_overlay_is_a_no_op() {
    let page = Page::new(Element::new().with_child(Element::new().with_id("Main"))).into_shared();
    let before = snapshot(&page);

    assert!(play(&page).is_none());
    advance_ms(2000).await;

    assert_eq!(snapshot(&page), before);
    assert!(!snapshot(&page).scroll_locked);
}

#[tokio::test(start_paused = true)]
async fn scroll_locks_immediately() {
    let page = page_with(overlay(2));
    let playback = play(&page).expect("playback");
    let now = snapshot(&page);
    assert!(now.scroll_locked);
    assert!(texts_revealed(&now).iter().all(|revealed| !revealed));
    drop(playback);
}

#[tokio::test(start_paused = true)]
async fn each_beat_fires_at_its_offset() {
    let page = page_with(overlay(3));
    let _playback = play(&page).expect("playback");

    advance_ms(199).await;
    assert!(texts_revealed(&snapshot(&page)).iter().all(|r| !r));

    advance_ms(2).await;
    assert_eq!(texts_revealed(&snapshot(&page)), vec![true, true, true]);
    assert!(!symbol_revealed(&snapshot(&page), LEFT_BRACKET_CLASS));

    advance_ms(400).await; // 601
    let now = snapshot(&page);
    assert!(symbol_revealed(&now, LEFT_BRACKET_CLASS));
    assert!(!symbol_revealed(&now, SLASH_CLASS));

    advance_ms(200).await; // 801
    let now = snapshot(&page);
    assert!(symbol_revealed(&now, SLASH_CLASS));
    assert!(!symbol_revealed(&now, RIGHT_BRACKET_CLASS));

    advance_ms(200).await; // 1001
    let now = snapshot(&page);
    assert!(symbol_revealed(&now, RIGHT_BRACKET_CLASS));
    assert!(!faded(&now));
    assert!(now.scroll_locked);

    advance_ms(500).await; // 1501
    let now = snapshot(&page);
    assert!(faded(&now));
    assert!(!now.scroll_locked);
}

#[tokio::test(start_paused = true)]
async fn deadlines_are_taken_from_the_play_call() {
    let page = page_with(overlay(1));
    let _playback = play(&page).expect("playback");

    // No beat task has been polled yet; all deadlines still count from `play`.
    advance_ms(1001).await;
    let now = snapshot(&page);
    assert_eq!(texts_revealed(&now), vec![true]);
    assert!(symbol_revealed(&now, RIGHT_BRACKET_CLASS));
    assert!(!faded(&now));

    advance_ms(500).await;
    assert!(faded(&snapshot(&page)));
}

#[tokio::test(start_paused = true)]
async fn missing_symbols_are_skipped_and_scroll_still_unlocks() {
    let bare = Element::new()
        .with_id(OVERLAY_ID)
        .with_child(Element::new().with_class(TEXT_PATH_CLASS));
    let page = page_with(bare);

    play(&page).expect("playback").finished().await;

    let now = snapshot(&page);
    assert_eq!(texts_revealed(&now), vec![true]);
    assert!(faded(&now));
    assert!(!now.scroll_locked);
}

#[tokio::test(start_paused = true)]
async fn finished_waits_for_the_fade_out() {
    let page = page_with(overlay(2));
    let playback = play(&page).expect("playback");
    let started = playback.started_at();

    playback.finished().await;

    assert!(Instant::now() - started >= Duration::from_millis(1500));
    let now = snapshot(&page);
    assert!(faded(&now));
    assert!(!now.scroll_locked);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_playback_does_not_cancel_beats() {
    let page = page_with(overlay(1));
    drop(play(&page).expect("playback"));

    advance_ms(1501).await;
    assert!(faded(&snapshot(&page)));
}

#[test]
fn fade_out_without_overlay_only_releases_scroll() {
    let mut page = Page::new(Element::new());
    page.scroll_locked = true;
    assert_eq!(Beat::FadeOut.apply(&mut page), 0);
    assert!(!page.scroll_locked);
}

#[test]
fn reveal_beats_are_monotonic() {
    let mut page = Page::new(Element::new().with_child(overlay(2)));
    assert_eq!(Beat::RevealText.apply(&mut page), 2);
    assert_eq!(Beat::RevealText.apply(&mut page), 2);
    let overlay = page.element_by_id(OVERLAY_ID).expect("overlay");
    let paths = overlay.query_all(TEXT_PATH_CLASS);
    assert_eq!(
        paths[0].classes,
        vec![TEXT_PATH_CLASS.to_string(), ANIM_TEXT_CLASS.to_string()]
    );
}

#[test]
fn beat_offsets_are_absolute_and_ordered() {
    let offsets: Vec<u64> = BEATS.iter().map(|(d, _)| d.as_millis() as u64).collect();
    assert_eq!(offsets, vec![200, 600, 800, 1000, 1500]);
    assert_eq!(BEATS[4].1, Beat::FadeOut);
}
