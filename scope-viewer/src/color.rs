use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::ViewerError;

/// A sprite tint. Parsed from and formatted as six hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const NEUTRAL: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Random 24-bit color, used for new lasso selections.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_u32(rng.gen_range(0..=0x00ff_ffff))
    }

    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_css(self) -> String {
        format!("#{}", self.to_hex())
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ViewerError;

    /// Accepts `rrggbb`, the server's compressed `rgb` form, and either with a
    /// `#` or `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ViewerError::InvalidColor(s.to_string()));
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| ViewerError::InvalidColor(s.to_string()))?;
        match digits.len() {
            6 => Ok(Rgb::from_u32(value)),
            3 => {
                let expand = |nibble: u32| (nibble << 4 | nibble) as u8;
                Ok(Rgb::new(
                    expand(value >> 8 & 0xf),
                    expand(value >> 4 & 0xf),
                    expand(value & 0xf),
                ))
            }
            _ => Err(ViewerError::InvalidColor(s.to_string())),
        }
    }
}

/// Parses a whole color vector, failing on the first bad entry.
pub fn parse_color_vector<S: AsRef<str>>(colors: &[S]) -> Result<Vec<Rgb>, ViewerError> {
    colors.iter().map(|c| c.as_ref().parse()).collect()
}

// Categorical palette for annotation coloring
pub const CATEGORY_PALETTE: [Rgb; 20] = [
    Rgb::from_u32(0x1f77b4),
    Rgb::from_u32(0xff7f0e),
    Rgb::from_u32(0x2ca02c),
    Rgb::from_u32(0xd62728),
    Rgb::from_u32(0x9467bd),
    Rgb::from_u32(0x8c564b),
    Rgb::from_u32(0xe377c2),
    Rgb::from_u32(0x7f7f7f),
    Rgb::from_u32(0xbcbd22),
    Rgb::from_u32(0x17becf),
    Rgb::from_u32(0xaec7e8),
    Rgb::from_u32(0xffbb78),
    Rgb::from_u32(0x98df8a),
    Rgb::from_u32(0xff9896),
    Rgb::from_u32(0xc5b0d5),
    Rgb::from_u32(0xc49c94),
    Rgb::from_u32(0xf7b6d2),
    Rgb::from_u32(0xc7c7c7),
    Rgb::from_u32(0xdbdb8d),
    Rgb::from_u32(0x9edae5),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parses_full_and_prefixed_hex() {
        assert_eq!("ff00aa".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 170));
        assert_eq!("#0A0B0C".parse::<Rgb>().unwrap(), Rgb::new(10, 11, 12));
        assert_eq!("0x000000".parse::<Rgb>().unwrap(), Rgb::NEUTRAL);
    }

    #[test]
    fn expands_compressed_hex() {
        // one nibble per channel, as produced by the server's compressor
        assert_eq!("f0a".parse::<Rgb>().unwrap(), Rgb::new(0xff, 0x00, 0xaa));
    }

    #[test]
    fn rejects_bad_colors() {
        assert!(matches!("ff00".parse::<Rgb>(), Err(ViewerError::InvalidColor(_))));
        assert!(matches!("gg0000".parse::<Rgb>(), Err(ViewerError::InvalidColor(_))));
        assert!(matches!("".parse::<Rgb>(), Err(ViewerError::InvalidColor(_))));
    }

    #[test]
    fn formats_six_lowercase_digits() {
        assert_eq!(Rgb::new(1, 0xab, 0xff).to_hex(), "01abff");
        assert_eq!(Rgb::new(1, 0xab, 0xff).to_css(), "#01abff");
        assert_eq!(Rgb::from_u32(0x123456).to_u32(), 0x123456);
    }

    #[test]
    fn random_colors_stay_in_24_bits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(Rgb::random(&mut rng).to_u32() <= 0xff_ffff);
        }
    }

    #[test]
    fn color_vector_fails_on_first_bad_entry() {
        let ok = parse_color_vector(&["000000", "fff"]).unwrap();
        assert_eq!(ok, vec![Rgb::NEUTRAL, Rgb::new(255, 255, 255)]);
        assert!(parse_color_vector(&["000000", "nope"]).is_err());
    }
}
