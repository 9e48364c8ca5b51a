//! Note mapping: quantize a color into a pitch class and octave.
//!
//! Lightness selects one of seven octave bands and hue selects one of
//! twelve 30° pitch sectors. Saturation and chroma are intentionally
//! unused by the mapping, a known limitation of the scheme rather than
//! a bug.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{Hsl, Rgb, rgb_to_hsl};

/// Selects how a color becomes a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteMethod {
    /// Quantize hue/lightness of the HSL cone representation.
    #[default]
    HslCone,
}

impl NoteMethod {
    /// The wire/CLI name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HslCone => "hsl-cone",
        }
    }
}

impl fmt::Display for NoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoteMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hsl-cone" => Ok(Self::HslCone),
            other => Err(format!("unknown note method: {other}")),
        }
    }
}

/// One of the twelve pitch classes, spelled with flats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    /// C natural.
    C,
    /// D natural.
    D,
    /// D flat.
    DFlat,
    /// E natural.
    E,
    /// E flat.
    EFlat,
    /// F natural.
    F,
    /// G natural.
    G,
    /// G flat.
    GFlat,
    /// A natural.
    A,
    /// A flat.
    AFlat,
    /// B natural.
    B,
    /// B flat.
    BFlat,
}

impl PitchClass {
    /// Pitch classes in hue-sector order: sector `i` (hues
    /// `[30i°, 30(i+1)°)`) maps to `ORDERED[i]`.
    pub const ORDERED: [Self; 12] = [
        Self::C,
        Self::D,
        Self::DFlat,
        Self::E,
        Self::EFlat,
        Self::F,
        Self::G,
        Self::GFlat,
        Self::A,
        Self::AFlat,
        Self::B,
        Self::BFlat,
    ];

    /// Flat-spelled name, e.g. `"Db"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::D => "D",
            Self::DFlat => "Db",
            Self::E => "E",
            Self::EFlat => "Eb",
            Self::F => "F",
            Self::G => "G",
            Self::GFlat => "Gb",
            Self::A => "A",
            Self::AFlat => "Ab",
            Self::B => "B",
            Self::BFlat => "Bb",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDERED
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown pitch class: {s}"))
    }
}

/// A pitch class with its octave, e.g. `Ab4`.
///
/// Serializes as the compact string form used by samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    /// The pitch class.
    pub pitch: PitchClass,
    /// Octave number, `1..=7`.
    pub octave: u8,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

impl FromStr for Note {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let octave = chars
            .next_back()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| format!("invalid octave in note: {s}"))?;
        Ok(Self {
            pitch: chars.as_str().parse()?,
            octave,
        })
    }
}

impl Serialize for Note {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Quantize an HSL color into `(pitch sector, octave band)`.
///
/// The pitch sector indexes [`PitchClass::ORDERED`]; the octave band is
/// 0-based (`0..=6`), with full lightness clamped into the top band.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(hsl: Hsl) -> (usize, usize) {
    let sector = ((hsl.h / 30.0).floor() as usize) % 12;
    let band = ((hsl.l * 7.0).floor() as usize).min(6);
    (sector, band)
}

/// Map a color to its note.
#[must_use]
pub fn note_for(color: Rgb, method: NoteMethod) -> Note {
    match method {
        NoteMethod::HslCone => {
            let (sector, band) = quantize(rgb_to_hsl(color));
            Note {
                pitch: PitchClass::ORDERED[sector],
                // The band is at most 6, so the octave is 1..=7.
                octave: u8::try_from(band).unwrap_or(6) + 1,
            }
        }
    }
}

/// Rewrite sharps as their flat equivalents, e.g. `"A#4"` to `"Bb4"`.
#[must_use]
pub fn sharp_to_flat(text: &str) -> String {
    respell(text, &['A', 'C', 'D', 'F', 'G'], '#', 1, 'b')
}

/// Rewrite flats as their sharp equivalents, e.g. `"Bb4"` to `"A#4"`.
#[must_use]
pub fn flat_to_sharp(text: &str) -> String {
    respell(text, &['A', 'B', 'D', 'E', 'G'], 'b', -1, '#')
}

/// Replace `letter+accidental` pairs by the neighboring letter with the
/// opposite accidental.
fn respell(text: &str, letters: &[char], accidental: char, step: i8, replacement: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let upper = c.to_ascii_uppercase();
        if letters.contains(&upper)
            && chars
                .get(i + 1)
                .is_some_and(|&next| next.eq_ignore_ascii_case(&accidental))
        {
            let shifted = (c as u8).wrapping_add_signed(step);
            out.push(shifted as char);
            out.push(replacement);
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}
