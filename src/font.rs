use crate::error::GalleyError;
use crate::types::Px;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CharWidthKey {
    font_index: usize,
    size_milli: i64,
    ch: char,
}

#[derive(Debug)]
struct CharWidthCache {
    map: HashMap<CharWidthKey, Px>,
    order: VecDeque<CharWidthKey>,
    max_entries: usize,
}

impl CharWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &CharWidthKey) -> Option<Px> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: CharWidthKey, value: Px) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
}

impl RegisteredFont {
    fn line_height(&self, font_size: Px) -> Px {
        let span = (self.ascent as i32 - self.descent as i32 + self.line_gap as i32).max(0);
        font_size.mul_ratio(span, self.units_per_em as i32)
    }
}

#[derive(Debug)]
pub(crate) struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
    width_cache: Mutex<CharWidthCache>,
}

impl FontRegistry {
    pub(crate) fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
            width_cache: Mutex::new(CharWidthCache::new(20_000)),
        }
    }

    pub(crate) fn register_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
                continue;
            };
            let ext = ext.to_ascii_lowercase();
            if ext != "ttf" && ext != "otf" {
                continue;
            }
            let Ok(data) = fs::read(&path) else {
                continue;
            };
            let _ = self.register_bytes(data, None);
        }
    }

    pub(crate) fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String, GalleyError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        self.register_bytes(data, path.file_stem().and_then(|v| v.to_str()))
    }

    pub(crate) fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, GalleyError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(GalleyError::Font(format!("invalid font data for {source}")));
        };

        let (name, aliases) = face_names(&face, source);
        let units_per_em = face.units_per_em().max(1);
        let ascent = face.ascender();
        let descent = face.descender();
        let line_gap = face.line_gap();
        let index = self.fonts.len();
        self.fonts.push(RegisteredFont {
            name: name.clone(),
            data,
            units_per_em,
            ascent,
            descent,
            line_gap,
        });

        let mut all_aliases = vec![name.clone()];
        all_aliases.extend(aliases);
        for alias in all_aliases {
            self.lookup.entry(normalize_name(&alias)).or_insert(index);
        }
        Ok(name)
    }

    pub(crate) fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub(crate) fn font_names(&self) -> Vec<String> {
        self.fonts.iter().map(|font| font.name.clone()).collect()
    }

    fn resolve(&self, name: &str) -> Option<&RegisteredFont> {
        let index = self.lookup.get(&normalize_name(name)).copied()?;
        self.fonts.get(index)
    }

    /// Maps a family plus bold/italic flags onto a registered variant face,
    /// falling back to the base family name when no variant is present.
    pub(crate) fn resolve_variant(&self, family: &str, bold: bool, italic: bool) -> String {
        if !bold && !italic {
            return family.to_string();
        }
        let mut candidates = Vec::new();
        if bold && italic {
            candidates.push(format!("{family} Bold Italic"));
        }
        if bold {
            candidates.push(format!("{family} Bold"));
        }
        if italic {
            candidates.push(format!("{family} Italic"));
        }
        for candidate in &candidates {
            if self.lookup.contains_key(&normalize_name(candidate)) {
                return candidate.clone();
            }
        }
        family.to_string()
    }

    /// Advance width of one character at `font_size`. Unregistered fonts fall
    /// back to a 0.6em heuristic so layout stays total.
    pub(crate) fn char_width(&self, name: &str, font_size: Px, ch: char) -> Px {
        let Some(index) = self.lookup.get(&normalize_name(name)).copied() else {
            return fallback_char_width(font_size);
        };
        let key = CharWidthKey {
            font_index: index,
            size_milli: font_size.to_milli_i64(),
            ch,
        };
        if let Ok(cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let Some(font) = self.fonts.get(index) else {
            return fallback_char_width(font_size);
        };
        let value =
            shaped_char_width(font, font_size, ch).unwrap_or_else(|| fallback_char_width(font_size));
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }

    pub(crate) fn line_height(&self, name: &str, font_size: Px) -> Px {
        let Some(font) = self.resolve(name) else {
            return font_size.mul_ratio(6, 5);
        };
        font.line_height(font_size).max(font_size)
    }
}

fn fallback_char_width(font_size: Px) -> Px {
    (font_size * 0.6).max(Px::from_f32(1.0))
}

fn shaped_char_width(font: &RegisteredFont, font_size: Px, ch: char) -> Option<Px> {
    let face = HbFace::from_slice(&font.data, 0)?;
    let units_per_em = face.units_per_em().max(1) as i64;

    let mut utf8 = [0u8; 4];
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(ch.encode_utf8(&mut utf8));
    let output = rustybuzz::shape(&face, &[], buffer);
    let positions = output.glyph_positions();
    if positions.is_empty() {
        return None;
    }
    let mut total_units: i32 = 0;
    for pos in positions {
        let adv = (((pos.x_advance as i64) * 1000 + (units_per_em / 2)) / units_per_em) as i32;
        total_units = total_units.saturating_add(adv);
    }
    if total_units <= 0 {
        return Some(Px::ZERO);
    }
    Some(font_size.mul_ratio(total_units, 1000))
}

fn face_names(face: &ttf_parser::Face<'_>, source: &str) -> (String, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;

    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            _ => {}
        }
    }

    let primary = family
        .clone()
        .or_else(|| full.clone())
        .unwrap_or_else(|| source.to_string());
    let mut aliases = Vec::new();
    for alias in [family, full] {
        if let Some(alias) = alias {
            if alias != primary {
                aliases.push(alias);
            }
        }
    }
    (primary, aliases)
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

/// Unicode blocks rendered with the East-Asian font: Hangul jamo and
/// syllables, CJK radicals, kana, unified and compatibility ideographs,
/// full/half-width forms, and the supplementary ideographic planes.
pub(crate) fn east_asian_codepoint(code: u32) -> bool {
    matches!(
        code,
        0x1100..=0x11FF
            | 0x2E80..=0x2FFF
            | 0x3000..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA960..=0xA97F
            | 0xAC00..=0xD7FF
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFFEF
            | 0x1B000..=0x1B16F
            | 0x20000..=0x3134F
    )
}

/// Basic Latin always takes the ASCII font; Latin-1 Supplement follows the
/// run's East-Asian hint; the listed East-Asian blocks take the East-Asian
/// font; everything else defaults to the ASCII font.
pub(crate) fn wants_east_asian_font(ch: char, east_asian_hint: bool) -> bool {
    let code = ch as u32;
    if code <= 0x7F {
        return false;
    }
    if code <= 0xFF {
        return east_asian_hint;
    }
    east_asian_codepoint(code)
}
