use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 16 * 1024;

/// MD5 and SHA-256 of one file, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    pub md5: String,
    pub sha256: String,
}

pub fn digest_file(path: &Path) -> io::Result<FileDigests> {
    let file = File::open(path)?;
    digest_reader(file)
}

/// Feeds both hashers from the same fixed-size chunks.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<FileDigests> {
    let mut md5 = md5::Context::new();
    let mut sha256 = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        md5.consume(&buffer[..bytes_read]);
        sha256.update(&buffer[..bytes_read]);
    }
    Ok(FileDigests {
        md5: format!("{:x}", md5.compute()),
        sha256: hex::encode(sha256.finalize()),
    })
}
