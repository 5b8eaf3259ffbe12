//! # ESC/POS 1D Barcodes
//!
//! Linear barcode printing with `GS k`, preceded by the height, module width
//! and human-readable (HRI) settings.
//!
//! | Symbology | `m` | Form | Data |
//! |-----------|-----|------|------|
//! | UPC-A | 65 | B | 11-12 digits |
//! | UPC-E | 66 | B | 6-8, 11-12 digits |
//! | EAN13 | 67 | B | 12-13 digits |
//! | EAN8 | 68 | B | 7-8 digits |
//! | CODE39 | 69 | B | `0-9 A-Z space $ % * + - . /` |
//! | ITF | 70 | B | even number of digits |
//! | NW7 (Codabar) | 71 | B | `0-9 $ + - . / :` with `A-D` start/stop |
//! | CODE93 | 72 | B | ASCII |
//! | CODE128 | 73 | B | ASCII, code set prefix `{A`/`{B`/`{C` |
//!
//! Function B (`GS k m n d1..dn`) carries an explicit length, so the data may
//! contain any byte.

use std::str::FromStr;

use super::commands::GS;

/// Supported symbologies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Nw7,
    Code93,
    Code128,
}

impl Symbology {
    fn code(self) -> u8 {
        match self {
            Symbology::UpcA => 65,
            Symbology::UpcE => 66,
            Symbology::Ean13 => 67,
            Symbology::Ean8 => 68,
            Symbology::Code39 => 69,
            Symbology::Itf => 70,
            Symbology::Nw7 => 71,
            Symbology::Code93 => 72,
            Symbology::Code128 => 73,
        }
    }

    /// Check `data` against the symbology's character set and length rules.
    pub fn validate(self, data: &str) -> Result<(), String> {
        let digits = data.bytes().all(|b| b.is_ascii_digit());
        let len = data.len();
        let ok = match self {
            Symbology::UpcA => digits && (11..=12).contains(&len),
            Symbology::UpcE => digits && ((6..=8).contains(&len) || (11..=12).contains(&len)),
            Symbology::Ean13 => digits && (12..=13).contains(&len),
            Symbology::Ean8 => digits && (7..=8).contains(&len),
            Symbology::Itf => digits && len >= 2 && len % 2 == 0,
            Symbology::Code39 => {
                len > 0
                    && data
                        .bytes()
                        .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase() || b" $%*+-./".contains(&b))
            }
            Symbology::Nw7 => {
                len > 0
                    && data
                        .bytes()
                        .all(|b| b.is_ascii_digit() || b"ABCDabcd$+-./:".contains(&b))
            }
            Symbology::Code93 | Symbology::Code128 => len > 0 && data.is_ascii(),
        };
        if !ok {
            return Err(format!("'{}' is not valid {:?} data", data, self));
        }
        if len > 253 {
            return Err(format!("{:?} data is too long ({} bytes)", self, len));
        }
        Ok(())
    }
}

impl FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace(['-', '_'], "").as_str() {
            "UPCA" => Ok(Symbology::UpcA),
            "UPCE" => Ok(Symbology::UpcE),
            "EAN13" => Ok(Symbology::Ean13),
            "EAN8" => Ok(Symbology::Ean8),
            "CODE39" => Ok(Symbology::Code39),
            "ITF" => Ok(Symbology::Itf),
            "NW7" | "CODABAR" => Ok(Symbology::Nw7),
            "CODE93" => Ok(Symbology::Code93),
            "CODE128" => Ok(Symbology::Code128),
            other => Err(format!("unknown barcode encoding '{}'", other)),
        }
    }
}

/// Bar height in dots used for receipts.
pub const DEFAULT_HEIGHT: u8 = 64;

/// Module (narrow bar) width in dots.
pub const DEFAULT_MODULE_WIDTH: u8 = 3;

/// # Print Barcode
///
/// Emits `GS h` (height), `GS w` (module width), `GS H 2` (HRI below),
/// `GS f 0` (HRI font A) and the function B `GS k` command.
///
/// CODE128 data without an explicit code set gets the `{B` prefix.
///
/// ```
/// use tillprint::protocol::barcode::{barcode, Symbology};
///
/// let cmd = barcode(Symbology::Ean13, "4006381333931").unwrap();
/// assert_eq!(&cmd[12..14], &[0x1D, 0x6B]);
/// ```
pub fn barcode(symbology: Symbology, data: &str) -> Result<Vec<u8>, String> {
    symbology.validate(data)?;

    let payload: Vec<u8> = if symbology == Symbology::Code128 && !data.starts_with('{') {
        let mut p = b"{B".to_vec();
        p.extend_from_slice(data.as_bytes());
        p
    } else {
        data.as_bytes().to_vec()
    };

    let len = u8::try_from(payload.len())
        .map_err(|_| format!("{:?} data is too long ({} bytes)", symbology, payload.len()))?;

    let mut cmd = Vec::with_capacity(16 + payload.len());
    cmd.extend_from_slice(&[GS, b'h', DEFAULT_HEIGHT]);
    cmd.extend_from_slice(&[GS, b'w', DEFAULT_MODULE_WIDTH]);
    cmd.extend_from_slice(&[GS, b'H', 2]);
    cmd.extend_from_slice(&[GS, b'f', 0]);
    cmd.extend_from_slice(&[GS, b'k', symbology.code(), len]);
    cmd.extend_from_slice(&payload);
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encodings() {
        assert_eq!("EAN13".parse::<Symbology>(), Ok(Symbology::Ean13));
        assert_eq!("ean-13".parse::<Symbology>(), Ok(Symbology::Ean13));
        assert_eq!("upc_a".parse::<Symbology>(), Ok(Symbology::UpcA));
        assert_eq!("codabar".parse::<Symbology>(), Ok(Symbology::Nw7));
        assert!("qr".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_ean13_command() {
        let cmd = barcode(Symbology::Ean13, "4006381333931").unwrap();
        assert_eq!(&cmd[..12], &[
            0x1D, 0x68, DEFAULT_HEIGHT,
            0x1D, 0x77, DEFAULT_MODULE_WIDTH,
            0x1D, 0x48, 2,
            0x1D, 0x66, 0,
        ]);
        assert_eq!(&cmd[12..16], &[0x1D, 0x6B, 67, 13]);
        assert_eq!(&cmd[16..], b"4006381333931");
    }

    #[test]
    fn test_code128_gets_code_set_prefix() {
        let cmd = barcode(Symbology::Code128, "Order-42").unwrap();
        assert_eq!(&cmd[12..16], &[0x1D, 0x6B, 73, 10]);
        assert_eq!(&cmd[16..], b"{BOrder-42");
    }

    #[test]
    fn test_code128_explicit_code_set_untouched() {
        let cmd = barcode(Symbology::Code128, "{C1234").unwrap();
        assert_eq!(&cmd[16..], b"{C1234");
    }

    #[test]
    fn test_rejects_invalid_data() {
        assert!(barcode(Symbology::Ean13, "12345").is_err());
        assert!(barcode(Symbology::Ean8, "1234abc").is_err());
        assert!(barcode(Symbology::Itf, "123").is_err());
        assert!(barcode(Symbology::Code39, "lower").is_err());
        assert!(barcode(Symbology::Code128, "").is_err());
    }
}
