use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use photomatch::{
    config::{self, Config},
    intake,
    matcher::{Matcher, Outcome},
    reply,
    storage::{ReferenceStore, StoredImage},
};
use std::io::Cursor;

fn photo(width: u32, height: u32, value: u8) -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(width, height, Rgb([value; 3]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[test]
fn test_first_submission_has_nothing_to_compare() -> Result<()> {
    env_logger::try_init().ok();
    let dir = tempfile::tempdir()?;
    let store = ReferenceStore::open(dir.path());

    let outcome = Matcher::default().evaluate(&photo(4, 4, 255)?, &store.load()?)?;
    assert_eq!(outcome, Outcome::NoReferences);
    assert_eq!(reply::render(&outcome), reply::NOTHING_TO_COMPARE);
    Ok(())
}

#[test]
fn test_saved_photo_matches_itself() -> Result<()> {
    env_logger::try_init().ok();
    let dir = tempfile::tempdir()?;
    let store = ReferenceStore::open(dir.path());

    store.append(&photo(4, 4, 0)?)?;
    let saved = store.append(&photo(4, 4, 255)?)?;

    let outcome = Matcher::default().evaluate(&photo(4, 4, 255)?, &store.load()?)?;
    let Outcome::Decided {
        ref decision,
        ref reference_id,
    } = outcome
    else {
        panic!("expected a decision, got {:?}", outcome);
    };
    assert!(decision.is_match);
    assert_eq!(reference_id, &saved.id);
    assert_eq!(
        reply::render(&outcome),
        "The images matched! Match rate: 100.00%"
    );
    Ok(())
}

#[test]
fn test_broken_entries_do_not_abort_comparison() -> Result<()> {
    env_logger::try_init().ok();
    let dir = tempfile::tempdir()?;
    let store = ReferenceStore::open(dir.path());

    store.push(StoredImage {
        id: "no-buffer".into(),
        buffer: None,
    })?;
    store.append(b"corrupt bytes")?;
    store.append(&photo(4, 4, 1)?)?;

    let outcome = Matcher::default().evaluate(&photo(4, 4, 2)?, &store.load()?)?;
    assert_eq!(
        reply::render(&outcome),
        "The images did not match. Match rate: 0.00%"
    );
    Ok(())
}

#[test]
fn test_json_outcome_shape() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ReferenceStore::open(dir.path());
    store.append(&photo(2, 2, 7)?)?;

    let outcome = Matcher::default().evaluate(&photo(2, 2, 7)?, &store.load()?)?;
    let value = serde_json::to_value(&outcome)?;
    assert_eq!(value["outcome"], "decided");
    assert_eq!(value["is_match"], true);
    assert_eq!(value["score"], 1.0);
    assert_eq!(value["percent_text"], "100.00");

    let empty = serde_json::to_value(Outcome::NoReferences)?;
    assert_eq!(empty["outcome"], "no_references");
    Ok(())
}

#[test]
fn test_matcher_follows_config_and_stream_intake() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg_path = dir.path().join("config.toml");
    config::save_config(
        &Config {
            threshold: 0.2,
            strict_geometry: true,
        },
        Some(&cfg_path),
    )?;
    let matcher = Matcher::from_config(&config::load_config(Some(&cfg_path))?);
    assert_eq!(matcher.threshold, 0.2);
    assert!(matcher.strict_geometry);

    let store = ReferenceStore::open(dir.path().join("refs"));
    store.append(&photo(3, 3, 5)?)?;
    // different size is skipped in strict mode
    store.append(&photo(6, 6, 5)?)?;

    let candidate = intake::read_stream(Cursor::new(photo(3, 3, 5)?))?;
    let outcome = matcher.evaluate(&candidate, &store.load()?)?;
    let Outcome::Decided { reference_id, .. } = outcome else {
        panic!("expected a decision");
    };
    assert_eq!(reference_id, store.load()?[0].id);
    Ok(())
}
