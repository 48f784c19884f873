//! Key and chord relations
//!
//! Parses key spellings into pitch classes (enharmonic spellings collapse: `C#` == `Db`)
//! and classifies how two keys relate. The related-key table is tonic, relative, fourth
//! and fifth.

use crate::types::Mode;

/// Sharp spellings indexed by pitch class
pub const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parsed key: tonic pitch class plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey {
    pub pitch_class: u8,
    pub mode: Mode,
}

/// How a candidate key relates to the performance key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRelation {
    /// Same spelling
    Exact,
    /// Same tonic pitch class, different spelling or mode
    SamePitchClass,
    /// Relative, fourth or fifth
    Related,
    /// No relation found, or key unknown
    Unrelated,
}

fn letter_pitch_class(letter: char) -> Option<u8> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Pitch class of a note name's leading letter and accidental ("F#m7" → 6)
pub fn pitch_class(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let base = letter_pitch_class(chars.next()?)?;
    let offset: i8 = match chars.next() {
        Some('#') | Some('♯') => 1,
        Some('b') | Some('♭') => -1,
        _ => 0,
    };
    Some(((base as i8 + offset).rem_euclid(12)) as u8)
}

/// First whitespace-separated token of a key signature ("G major" → "G")
pub fn key_token(key: &str) -> &str {
    key.split_whitespace().next().unwrap_or("")
}

/// Parse a key signature
///
/// Accepts "G", "Em", "F#m", "G major", "E minor", "Bb min". `fallback_mode` applies when
/// the spelling carries no mode.
pub fn parse_key(key: &str, fallback_mode: Mode) -> Option<ParsedKey> {
    let pitch_class = pitch_class(key)?;
    let lowered = key.trim().to_lowercase();
    let token = key_token(&lowered);

    // Strip tonic letter and accidental, leaving any mode suffix on the first token
    let mut suffix = token.chars();
    suffix.next();
    let rest: String = suffix.collect();
    let rest = rest.trim_start_matches(['#', 'b', '♯', '♭']);

    let mode = if lowered.contains("minor") || lowered.contains(" min") || rest.starts_with('m') && !rest.starts_with("maj") {
        Mode::Minor
    } else if lowered.contains("major") || lowered.contains(" maj") || rest.starts_with("maj") {
        Mode::Major
    } else {
        fallback_mode
    };

    Some(ParsedKey { pitch_class, mode })
}

/// Keys related to a key: relative (opposite mode), fourth and fifth (same mode)
///
/// G major → E minor, C major, D major.
pub fn related_keys(key: ParsedKey) -> [ParsedKey; 3] {
    let relative = match key.mode {
        Mode::Major => ParsedKey {
            pitch_class: (key.pitch_class + 9) % 12,
            mode: Mode::Minor,
        },
        Mode::Minor => ParsedKey {
            pitch_class: (key.pitch_class + 3) % 12,
            mode: Mode::Major,
        },
    };
    let transposed = |semitones: u8| ParsedKey {
        pitch_class: (key.pitch_class + semitones) % 12,
        mode: key.mode,
    };
    [relative, transposed(5), transposed(7)]
}

/// Classify the relation between the performance key and a candidate key
pub fn classify_key(query_key: &str, query_mode: Mode, candidate_key: Option<&str>) -> KeyRelation {
    let Some(candidate_key) = candidate_key else {
        return KeyRelation::Unrelated;
    };

    if key_token(query_key).eq_ignore_ascii_case(key_token(candidate_key))
        && !key_token(query_key).is_empty()
    {
        return KeyRelation::Exact;
    }

    let (Some(query), Some(candidate)) = (
        parse_key(query_key, query_mode),
        parse_key(candidate_key, Mode::Major),
    ) else {
        return KeyRelation::Unrelated;
    };

    if query.pitch_class == candidate.pitch_class {
        return KeyRelation::SamePitchClass;
    }

    if related_keys(query).contains(&candidate) {
        KeyRelation::Related
    } else {
        KeyRelation::Unrelated
    }
}

/// Chord root with accidentals and extensions stripped ("Em7" → 'E', "Bb/D" → 'B')
pub fn chord_root(chord: &str) -> Option<char> {
    let first = chord.trim().chars().next()?.to_ascii_uppercase();
    letter_pitch_class(first).map(|_| first)
}

/// Spotify-style key number to sharp spelling
pub fn pitch_name(pitch_class: i64) -> Option<&'static str> {
    usize::try_from(pitch_class)
        .ok()
        .and_then(|idx| PITCH_NAMES.get(idx))
        .copied()
}
