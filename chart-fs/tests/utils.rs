use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Builds a gzip'd tarball from (path, content) pairs, the same shape the
/// installer packaging step produces.
pub fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        header.set_size(content.len() as u64);
        // `set_path`/`append_data` reject `..` components, but some tests need
        // to construct a malicious archive entry to exercise that rejection
        // on the reading side, so the name bytes are written directly.
        let name_bytes = path.as_bytes();
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name[..name_bytes.len()].copy_from_slice(name_bytes);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Writes (path, content) pairs under `root` to act as the local layer.
pub fn populate_local(root: &std::path::Path, entries: &[(&str, &str)]) {
    for (path, content) in entries {
        let dest = root.join(path);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(dest).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }
}
