use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// SHA-256 of the source extract, hex encoded. Two runs reporting the same
/// fingerprint were fed identical input and should converge on the same graph.
pub fn source_fingerprint(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fingerprint_stable_and_content_sensitive() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        write!(a, "ID\nPO1\n").unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        write!(b, "ID\nPO2\n").unwrap();

        let fa = source_fingerprint(a.path()).unwrap();
        assert_eq!(fa.len(), 64);
        assert_eq!(fa, source_fingerprint(a.path()).unwrap());
        assert_ne!(fa, source_fingerprint(b.path()).unwrap());
    }
}
