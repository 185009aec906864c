use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

fn solid_png(dir: &Path, name: &str, color: [u8; 3]) -> Result<PathBuf> {
    let path = dir.join(name);
    RgbImage::from_pixel(100, 100, Rgb(color)).save(&path)?;
    Ok(path)
}

#[test]
fn add_and_search_self() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;
    solid_png(dataset.path(), "blue.png", [0, 0, 255])?;

    cargo_run!(
        "visearch",
        "-c",
        conf_dir.path(),
        "add",
        dataset.path(),
        "--category",
        "test",
        "--seed",
        "42"
    )
    .success();

    // 与自身比较的相似度应该为 1
    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red, "--seed", "42")
        .success()
        .stdout(predicate::str::starts_with("1.0000"));

    Ok(())
}

#[test]
fn search_empty_database() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;

    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red)
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn search_with_category_filter() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let fruits = assert_fs::TempDir::new()?;
    let skies = assert_fs::TempDir::new()?;

    let red = solid_png(fruits.path(), "red.png", [255, 0, 0])?;
    solid_png(skies.path(), "blue.png", [0, 0, 255])?;

    cargo_run!("visearch", "-c", conf_dir.path(), "add", fruits.path(), "--category", "fruits")
        .success();
    cargo_run!("visearch", "-c", conf_dir.path(), "add", skies.path(), "--category", "skies")
        .success();

    // 限定分类后只返回该分类下的图片
    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red, "--category", "fruits")
        .success()
        .stdout(predicate::str::contains("fruits").and(predicate::str::contains("skies").not()));

    Ok(())
}

#[test]
fn add_category_from_directory() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;
    let dir_name = dataset.path().file_name().unwrap().to_str().unwrap().to_string();

    // 不指定分类时使用目录名
    cargo_run!("visearch", "-c", conf_dir.path(), "add", dataset.path()).success();

    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red)
        .success()
        .stdout(predicate::str::contains(dir_name));

    Ok(())
}

#[test]
fn add_overwrite_updates_category() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;

    cargo_run!("visearch", "-c", conf_dir.path(), "add", dataset.path(), "--category", "old")
        .success();
    cargo_run!(
        "visearch",
        "-c",
        conf_dir.path(),
        "add",
        dataset.path(),
        "--category",
        "new",
        "--overwrite"
    )
    .success();

    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red)
        .success()
        .stdout(predicate::str::contains("new").and(predicate::str::contains("old").not()));

    Ok(())
}

#[test]
fn add_skips_corrupt_images() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;
    fs::write(dataset.path().join("bogus.png"), b"not an image")?;

    cargo_run!("visearch", "-c", conf_dir.path(), "add", dataset.path(), "--category", "test")
        .success();

    cargo_run!("visearch", "-c", conf_dir.path(), "search", &red)
        .success()
        .stdout(predicate::str::starts_with("1.0000"));

    Ok(())
}

#[test]
fn search_rejects_corrupt_image() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let bogus = dataset.path().join("bogus.png");
    fs::write(&bogus, b"not an image")?;

    cargo_run!("visearch", "-c", conf_dir.path(), "search", &bogus)
        .failure()
        .stderr(predicate::str::contains("无法解码图片"));

    Ok(())
}

#[rstest]
#[case::table("table")]
#[case::json("json")]
fn search_output_format(#[case] format: &str) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;

    cargo_run!("visearch", "-c", conf_dir.path(), "add", dataset.path(), "--category", "test")
        .success();

    let assert = cargo_run!(
        "visearch",
        "-c",
        conf_dir.path(),
        "search",
        &red,
        "--output-format",
        format
    )
    .success();
    match format {
        "json" => assert.stdout(predicate::str::contains("\"score\"")),
        _ => assert.stdout(predicate::str::starts_with("1.0000")),
    };

    Ok(())
}

#[test]
fn show_prints_descriptors() -> Result<()> {
    let dataset = assert_fs::TempDir::new()?;

    let red = solid_png(dataset.path(), "red.png", [255, 0, 0])?;

    cargo_run!("visearch", "show", &red)
        .success()
        .stdout(predicate::str::contains("主色"));

    Ok(())
}

#[test]
fn export_writes_npy() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let dataset = assert_fs::TempDir::new()?;

    solid_png(dataset.path(), "red.png", [255, 0, 0])?;

    cargo_run!("visearch", "-c", conf_dir.path(), "add", dataset.path(), "--category", "test")
        .success();

    let output = conf_dir.path().join("features.npy");
    cargo_run!("visearch", "-c", conf_dir.path(), "export", "--output", &output).success();

    assert!(output.exists());

    Ok(())
}
