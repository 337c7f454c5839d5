mod utils;

use anyhow::Result;
use flotilla_chart_fs::{ChartFs, EmbeddedTarball, OverlayError};
use utils::{populate_local, tarball};

#[test]
fn embedded_layer_shadows_local() -> Result<()> {
    let embedded = tarball(&[("charts/a/Chart.yaml", "name: a-embedded\n")]);
    let local = tempfile::tempdir()?;
    populate_local(
        local.path(),
        &[
            ("charts/a/Chart.yaml", "name: a-local\n"),
            ("charts/b/Chart.yaml", "name: b-local\n"),
        ],
    );

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    assert_eq!(
        fs.read_to_string("charts/a/Chart.yaml")?,
        "name: a-embedded\n"
    );
    assert_eq!(fs.read_to_string("charts/b/Chart.yaml")?, "name: b-local\n");
    Ok(())
}

#[test]
fn listing_is_the_union_of_both_layers() -> Result<()> {
    let embedded = tarball(&[("charts/a/Chart.yaml", "name: a\n")]);
    let local = tempfile::tempdir()?;
    populate_local(local.path(), &[("charts/b/Chart.yaml", "name: b\n")]);

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    let names: Vec<String> = fs
        .read_dir("charts")?
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    Ok(())
}

#[test]
fn lookup_fails_only_when_both_layers_miss() -> Result<()> {
    let embedded = tarball(&[("values.yaml.tpl", "{}\n")]);
    let local = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    assert!(fs.exists("values.yaml.tpl"));
    assert!(matches!(
        fs.read("missing.yaml"),
        Err(OverlayError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn writes_are_rejected() -> Result<()> {
    let local = tempfile::tempdir()?;
    let fs = ChartFs::new(
        EmbeddedTarball::from_bytes(tarball(&[])),
        local.path(),
    );
    assert!(matches!(
        fs.write("config.yaml", b"nope"),
        Err(OverlayError::ReadOnly(_))
    ));
    Ok(())
}

#[test]
fn escaping_archive_entries_are_rejected() -> Result<()> {
    let embedded = tarball(&[("../evil.sh", "#!/bin/sh\n")]);
    let local = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    assert!(matches!(
        fs.read("evil.sh"),
        Err(OverlayError::PathEscape(_))
    ));
    Ok(())
}

#[test]
fn extraction_writes_the_embedded_tree() -> Result<()> {
    let embedded = tarball(&[
        ("config.yaml", "settings: {}\nproducts: []\n"),
        ("charts/a/Chart.yaml", "name: a\n"),
    ]);
    let local = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let fs = ChartFs::new(EmbeddedTarball::from_bytes(embedded), local.path());
    fs.extract_embedded(out.path())?;
    assert!(out.path().join("config.yaml").is_file());
    assert!(out.path().join("charts/a/Chart.yaml").is_file());
    Ok(())
}
