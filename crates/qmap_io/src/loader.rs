use anyhow::{Context, Result, bail, ensure};
use bitvec::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// On-disk layout of sampled measurement rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Bit-packed little endian, each shot padded to a whole byte.
    B8,
    /// One line of `0`/`1` characters per shot.
    Text01,
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "b8" => Ok(SampleFormat::B8),
            "01" => Ok(SampleFormat::Text01),
            other => Err(format!("unknown sample format {other:?} (expected b8 or 01)")),
        }
    }
}

/// Loads sampled shots of `bits_per_shot` measurements each.
pub fn load_samples<P: AsRef<Path>>(
    path: P,
    format: SampleFormat,
    bits_per_shot: usize,
) -> Result<Vec<Vec<bool>>> {
    match format {
        SampleFormat::B8 => {
            let raw_bits = load_b8_file(path)?;
            slice_shots(&raw_bits, bits_per_shot)
        }
        SampleFormat::Text01 => {
            let shots = load_01_file(path)?;
            if let Some(first) = shots.first() {
                ensure!(
                    first.len() == bits_per_shot,
                    "samples have {} bits per shot, circuit measures {}",
                    first.len(),
                    bits_per_shot
                );
            }
            Ok(shots)
        }
    }
}

/// Loads a Stim .b8 file (binary measurement data).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let mut file = File::open(path).context("Failed to open .b8 file")?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    // Stim packs bits little endian within each byte
    let bits = BitVec::<u8, Lsb0>::from_vec(buffer);
    Ok(bits)
}

/// Cuts packed sampler output into one row per shot.
///
/// Each shot occupies `bits_per_shot.div_ceil(8)` bytes; the padding bits are
/// dropped. Trailing bytes that do not form a whole shot are an error.
pub fn slice_shots(raw_bits: &BitSlice<u8, Lsb0>, bits_per_shot: usize) -> Result<Vec<Vec<bool>>> {
    ensure!(bits_per_shot > 0, "cannot slice shots of zero width");

    let bytes_per_shot = bits_per_shot.div_ceil(8);
    let stride_bits = bytes_per_shot * 8;

    if raw_bits.len() % stride_bits != 0 {
        bail!(
            "{} bytes of samples is not a whole number of {}-byte shots",
            raw_bits.len() / 8,
            bytes_per_shot
        );
    }

    let shots = raw_bits
        .chunks(stride_bits)
        .map(|chunk| chunk[..bits_per_shot].iter().by_vals().collect())
        .collect();

    Ok(shots)
}

/// Loads a Stim `01` file.
pub fn load_01_file<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<bool>>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    parse_01(&text)
}

/// Parses `01` text. Blank lines are skipped; all rows must have equal width.
pub fn parse_01(text: &str) -> Result<Vec<Vec<bool>>> {
    let mut shots: Vec<Vec<bool>> = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let row = line
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(other),
            })
            .collect::<std::result::Result<Vec<bool>, char>>()
            .map_err(|c| anyhow::anyhow!("line {}: unexpected character {:?}", n + 1, c))?;

        if let Some(first) = shots.first() {
            ensure!(
                row.len() == first.len(),
                "line {}: {} bits, previous shots have {}",
                n + 1,
                row.len(),
                first.len()
            );
        }
        shots.push(row);
    }

    Ok(shots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slice_shots_drops_padding() {
        // two shots of 10 bits, 2 bytes each
        let bytes = vec![0b0000_0101u8, 0b0000_0010, 0b1000_0000, 0b1111_1101];
        let bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        let shots = slice_shots(&bits, 10).unwrap();

        assert_eq!(shots.len(), 2);
        assert_eq!(
            shots[0],
            vec![true, false, true, false, false, false, false, false, false, true]
        );
        assert_eq!(
            shots[1],
            vec![false, false, false, false, false, false, false, true, true, false]
        );
    }

    #[test]
    fn test_slice_shots_rejects_partial_shot() {
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0u8; 3]);
        assert!(slice_shots(&bits, 10).is_err());
        assert!(slice_shots(&bits, 0).is_err());
    }

    #[test]
    fn test_parse_01() {
        let shots = parse_01("0110\n\n1001\n").unwrap();
        assert_eq!(shots, vec![vec![false, true, true, false], vec![true, false, false, true]]);
        assert!(parse_01("01\n012\n").is_err());
        assert!(parse_01("01\n011\n").is_err());
    }

    #[test]
    fn test_load_b8_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0x01, 0x00, 0x00]).unwrap();

        let shots = load_samples(file.path(), SampleFormat::B8, 9).unwrap();
        assert_eq!(shots.len(), 2);
        assert!(shots[0].iter().all(|&b| b));
        assert!(shots[1].iter().all(|&b| !b));
    }

    #[test]
    fn test_load_01_width_mismatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0101").unwrap();
        assert!(load_samples(file.path(), SampleFormat::Text01, 5).is_err());
        assert_eq!(load_samples(file.path(), SampleFormat::Text01, 4).unwrap().len(), 1);
    }

    #[test]
    fn test_sample_format_from_str() {
        assert_eq!("b8".parse::<SampleFormat>(), Ok(SampleFormat::B8));
        assert_eq!("01".parse::<SampleFormat>(), Ok(SampleFormat::Text01));
        assert!("ptb64".parse::<SampleFormat>().is_err());
    }
}
