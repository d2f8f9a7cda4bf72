//! Common time/period/file helpers for deskcoach_core.
use std::{fs, io::Write, path::Path};

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (1_000_000u64 / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (1000u64 / u64::from(hz.max(1))).max(1)
}

/// Write `bytes` to `path` atomically: write to a sibling `.tmp` file, fsync,
/// then rename over the target. Readers never observe a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_us_clamps_zero_hz() {
        assert_eq!(period_us(0), 1_000_000);
    }

    #[test]
    fn write_atomic_leaves_no_tmp_file(/* uses tempdir in integration tests */) {
        let dir = std::env::temp_dir().join(format!("deskcoach-util-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let target = dir.join("out.json");
        write_atomic(&target, b"{}").unwrap();
        assert!(target.exists());
        assert!(!target.with_extension("tmp").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
