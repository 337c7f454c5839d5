use std::path::Path;
use std::process::Command;

use flate2::Compression;
use flate2::write::GzEncoder;

// Packages embedded/ into a gzip'd tarball included in the binary, and
// injects build metadata. Symlinks are dereferenced here, at packaging
// time, so the runtime tree never contains any.
fn main() {
    let version = git(&["describe", "--tags", "--always"]).unwrap_or_else(|| "v0.0.0-snapshot".into());
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=FLOTILLA_VERSION={version}");
    println!("cargo:rustc-env=FLOTILLA_COMMIT={commit}");

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR is not defined");
    let tarball_path = Path::new(&out_dir).join("installer.tar.gz");
    let embedded = Path::new("embedded");
    println!("cargo:rerun-if-changed=embedded");

    let file = std::fs::File::create(&tarball_path).expect("failed creating installer tarball");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(true);
    append_dir(&mut builder, embedded, Path::new(""));
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .expect("failed writing installer tarball");
}

fn append_dir<W: std::io::Write>(builder: &mut tar::Builder<W>, dir: &Path, prefix: &Path) {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed reading {}: {err}", dir.display()))
        .map(|entry| entry.expect("failed reading embedded entry"))
        .collect();
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        if path.is_dir() {
            append_dir(builder, &path, &name);
        } else {
            builder
                .append_path_with_name(&path, &name)
                .unwrap_or_else(|err| panic!("failed appending {}: {err}", path.display()));
        }
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!value.is_empty()).then_some(value)
}
