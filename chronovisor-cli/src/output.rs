//! Human-readable rendering of results, plus file output.

use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use chronovisor_core::{Era, EventMatch, HistoricalEvent, TravelResult};
use std::{fs, path::Path};

const DATA_URL_PREFIX: &str = "data:";

pub fn print_event(event: &HistoricalEvent) {
    println!("{} [{}]", event.title, event.id);
    println!("  Where: {}", event.coordinates);
    println!("  When:  {} ({})", event.time.format_long(), Era::of(event.time.year));
    println!("  {}", event.description);
}

pub fn print_match(found: &EventMatch) {
    println!("Target locked: {}", found.title);
    println!("  Where: {}", found.coordinates);
    println!("  When:  {} ({})", found.time.format_long(), Era::of(found.time.year));
}

pub fn print_result(result: &TravelResult) {
    println!();
    println!("== {} ==", result.location_name);
    println!("{} | {}", result.time.format_long(), Era::of(result.time.year));
    println!();
    println!("{}", result.description);
    println!();
    println!("Visual feed: {}", describe_image(result.image_url.as_deref()));
}

/// One-line summary of an image URL without dumping base64 to the terminal.
pub fn describe_image(url: Option<&str>) -> String {
    match url {
        None => "unavailable (text-only result)".to_string(),
        Some(url) => match decode_data_url(url) {
            Some(Ok(bytes)) => format!("inline image, {} KB", bytes.len().div_ceil(1024)),
            Some(Err(_)) => "inline image (undecodable)".to_string(),
            None => url.to_string(),
        },
    }
}

/// `None` when `url` is not a base64 data URL.
fn decode_data_url(url: &str) -> Option<Result<Vec<u8>>> {
    let rest = url.strip_prefix(DATA_URL_PREFIX)?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    Some(STANDARD.decode(payload.trim()).context("Image data URL is not valid base64"))
}

/// Write the raw visual of a result to `path`. Only inline images can be written.
pub fn write_image(result: &TravelResult, path: &Path) -> Result<()> {
    let Some(url) = result.image_url.as_deref() else {
        bail!("This result has no visual feed to save");
    };
    let Some(bytes) = decode_data_url(url) else {
        bail!("Visual feed is not an inline image: {url}");
    };
    let bytes = bytes?;
    fs::write(path, bytes)
        .with_context(|| format!("Failed to write image: {}", path.display()))?;
    Ok(())
}
