use anyhow::Result;
use clap::Parser;
use intro::{
    play, Element, Page, LEFT_BRACKET_CLASS, OVERLAY_ID, RIGHT_BRACKET_CLASS, SLASH_CLASS,
    TEXT_PATH_CLASS,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Plays the intro sequence against a generated overlay and prints the result.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value_t = 6)]
    text_paths: usize,
    #[arg(long)]
    without_symbols: bool,
    #[arg(long)]
    without_overlay: bool,
}

fn demo_overlay(text_paths: usize, with_symbols: bool) -> Element {
    let mut logo = Element::new().with_id("Intro_Logo");
    for _ in 0..text_paths {
        logo = logo.with_child(Element::new().with_class(TEXT_PATH_CLASS));
    }
    if with_symbols {
        for class in [LEFT_BRACKET_CLASS, SLASH_CLASS, RIGHT_BRACKET_CLASS] {
            logo = logo.with_child(Element::new().with_class(class));
        }
    }
    Element::new().with_id(OVERLAY_ID).with_child(logo)
}

fn print_tree(element: &Element, depth: usize) {
    let id = element.id.as_deref().unwrap_or("-");
    println!("{}#{id} [{}]", "  ".repeat(depth), element.classes.join(" "));
    for child in &element.children {
        print_tree(child, depth + 1);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();
    let args = Args::parse();

    let mut body = Element::new().with_id("Body");
    if !args.without_overlay {
        body = body.with_child(demo_overlay(args.text_paths, !args.without_symbols));
    }
    let page = Page::new(body).into_shared();

    let Some(playback) = play(&page) else {
        info!("page has no intro overlay, nothing to play");
        return Ok(());
    };
    let started_at = playback.started_at();
    playback.finished().await;
    info!(elapsed_ms = started_at.elapsed().as_millis() as u64, "intro finished");

    let page = page
        .lock()
        .map_err(|_| anyhow::anyhow!("page lock poisoned"))?;
    println!("scroll_locked={}", page.scroll_locked);
    print_tree(&page.body, 0);
    Ok(())
}
