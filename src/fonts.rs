use lopdf::{Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{BTreeMap, HashMap},
    mem,
    path::Path,
    sync::Arc,
};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;

/// The directory the font files are read from when no other location is given.
pub const DEFAULT_FONTS_DIRECTORY: &str = "fonts";

/// The file names of the three weights composing a `FontSet`, relative to the fonts directory.
/// The DejaVu family ships no demi cut, so the condensed bold stands in for the semibold weight.
pub const REGULAR_FONT_FILE: &str = "DejaVuSans.ttf";
pub const SEMIBOLD_FONT_FILE: &str = "DejaVuSansCondensed-Bold.ttf";
pub const BOLD_FONT_FILE: &str = "DejaVuSans-Bold.ttf";

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font.
    pub descent: i16,
    /// The gap the font requests between two consecutive lines.
    pub line_gap: i16,
    /// The number of units per em of the font.
    pub units_per_em: u16,
}

/// The (insofar) relevant metrics associated to a single glyph of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    /// The width of the glyph.
    pub width: u32,
    /// The height of the glyph.
    pub height: u32,
}

/// A font face loaded once from a TTF file and shared by reference afterwards. Cloning only
/// bumps the reference counts, so registering the same face into many per-request documents
/// stays cheap.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    /// The byte data the font was loaded from, kept around because the PDF document embeds it.
    bytes: Arc<Vec<u8>>,
    /// The underlying font face which is represented through the `ttf_parser` crate.
    face: Arc<OwnedFace>,
    /// The number of units per em of the font face.
    units_per_em: u16,
}

impl LoadedFont {
    /// Constructs a font face from the raw data of a TTF font file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.clone(), 0)
            .map_err(|error| ContextError::with_error("Failed to parse the font", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            bytes: Arc::new(data),
            face: Arc::new(face),
            units_per_em,
        })
    }

    /// Reads a TTF font from the given path. A missing or malformed file is an error, which is
    /// fatal to whichever render required the font.
    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                format!("Failed to read the font {:?}", font_path),
                &error,
            )
        })?;
        Self::from_bytes(font_bytes)
    }

    /// Retrieve the underlying font face as a reference.
    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    /// Retrieve the font metrics from the associated font face.
    pub(crate) fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            line_gap: self.face().line_gap(),
            units_per_em: self.units_per_em,
        }
    }

    /// Retrieve the glyph ID of a specific codepoint, which in our case is just a `char`.
    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// Retrieve the mapping between the glyph IDs and the characters (codepoints), that
    /// specifically contains exactly the number of unicode glyphs present in the font.
    fn glyph_ids(&self) -> HashMap<u16, char> {
        // Retrieve all the unicode subtables of the font face
        let font_subtables = self.face().tables().cmap.map(|cmap| {
            cmap.subtables
                .into_iter()
                .filter(|font_subtable| font_subtable.is_unicode())
        });
        // If no suitable subtables have been found, then return an empty association between
        // glyph IDs and characters
        let Some(font_subtables) = font_subtables else {
            return HashMap::new();
        };

        let mut gid_to_codepoint_map =
            HashMap::with_capacity(self.face().number_of_glyphs().into());
        for font_subtable in font_subtables {
            font_subtable.codepoints(|codepoint| {
                use std::convert::TryFrom as _;

                if let Ok(character) = char::try_from(codepoint) {
                    // Only valid UTF-8 codepoints with a positive glyph index are registered
                    if let Some(glyph_index) = font_subtable
                        .glyph_index(codepoint)
                        .filter(|index| index.0 > 0)
                    {
                        gid_to_codepoint_map
                            .entry(glyph_index.0)
                            .or_insert(character);
                    }
                }
            })
        }

        gid_to_codepoint_map
    }

    /// Retrieve the total number of glyphs present in the font face.
    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    /// Attempt to calculate the metrics of a glyph from the associated glyph ID, taken as input.
    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);

        if let Some(width) = self.face().glyph_hor_advance(glyph_id) {
            let width = width as u32;
            // The height of the glyph is corrected by employing the descender vertical metric
            // of the font face (this is supposedly valid only for horizontally-laid fonts).
            let height = self
                .face()
                .glyph_bounding_box(glyph_id)
                .map(|bounding_box| {
                    bounding_box.y_max - bounding_box.y_min - self.face().descender()
                })
                .unwrap_or(1000) as u32;

            Some(GlyphMetrics { width, height })
        } else {
            None
        }
    }

    /// Converts the text, normalized in the NFC form, into the big-endian glyph ID bytes the PDF
    /// `Tj` operator expects for an Identity-H encoded font. Characters missing from the font are
    /// skipped and logged.
    pub fn encode_glyphs(&self, text: &str) -> Vec<u8> {
        let mut glyph_id_bytes = Vec::with_capacity(text.len() * 2);
        for character in text.nfc() {
            if let Some(glyph_id) = self.glyph_id(character) {
                glyph_id_bytes.push((glyph_id >> 8) as u8);
                glyph_id_bytes.push((glyph_id & 255) as u8);
            } else {
                log::warn!("Unable to find the character {:?} in the font", character);
            }
        }

        glyph_id_bytes
    }

    /// Measures the width in points of the given text at the given font size by summing the glyph
    /// advances. The advances go through the same 1000-units-per-em truncation that builds the
    /// font's `W` array, so the measurement agrees exactly with what PDF viewers draw; kerning is
    /// ignored for the same reason, as Identity-H `Tj` rendering positions glyphs purely by those
    /// widths.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let percentage_font_scaling = 1000.0 / f32::from(self.units_per_em);
        let mut total_width: i64 = 0;
        for character in text.nfc() {
            let Some(glyph_id) = self.glyph_id(character) else {
                continue;
            };
            if let Some(glyph_metrics) = self.glyph_metrics(glyph_id) {
                total_width += (glyph_metrics.width as f32 * percentage_font_scaling) as i64;
            }
        }

        total_width as f32 * font_size / 1000.0
    }

    /// The vertical advance between two consecutive baselines at the given font size.
    pub fn line_height(&self, font_size: f32) -> f32 {
        let font_metrics = self.font_metrics();
        let advance_units =
            font_metrics.ascent - font_metrics.descent + font_metrics.line_gap;
        f32::from(advance_units) * font_size / f32::from(font_metrics.units_per_em)
    }

    /// The distance between the top of a line and its baseline at the given font size.
    pub fn ascent(&self, font_size: f32) -> f32 {
        let font_metrics = self.font_metrics();
        f32::from(font_metrics.ascent) * font_size / f32::from(font_metrics.units_per_em)
    }

    /// Takes the font and inserts it into the PDF document under the given face identifier,
    /// returning the associated PDF dictionary. The embedding follows the composite font layout
    /// of the PDF specification: a `Type0` font wrapping a `CIDFontType2` descendant with the
    /// glyph widths `W` array, plus a `ToUnicode` character map so the text stays extractable.
    pub(crate) fn embed_into_document(
        &self,
        face_identifier: &str,
        inner_document: &mut lopdf::Document,
    ) -> lopdf::Dictionary {
        use lopdf::Object::*;

        let face_metrics = self.font_metrics();

        // The PDF specification requests the length in bytes of the font data to be set on the
        // stream because the PDF format mixes text and byte data
        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.to_vec(),
        )
        .with_compression(false);

        // Begin setting the required font attributes
        let mut font_vector: Vec<(::std::string::String, lopdf::Object)> = vec![
            ("Type".into(), Name("Font".into())),
            ("Subtype".into(), Name("Type0".into())),
            ("BaseFont".into(), Name(face_identifier.into())),
            // `Identity-H` is used for horizontal writing, while `Identity-V` for vertical writing
            ("Encoding".into(), Name("Identity-H".into())),
            // `DescendantFonts` and `ToUnicode` are still missing, they will be inserted later on
        ];

        // Specify the font properties which will be used by PDF renderers to position the glyphs
        let mut font_descriptor_vector: Vec<(::std::string::String, lopdf::Object)> = vec![
            ("Type".into(), Name("FontDescriptor".into())),
            ("FontName".into(), Name(face_identifier.into())),
            ("Ascent".into(), Integer(i64::from(face_metrics.ascent))),
            ("Descent".into(), Integer(i64::from(face_metrics.descent))),
            ("CapHeight".into(), Integer(i64::from(face_metrics.ascent))),
            ("ItalicAngle".into(), Integer(0)),
            // The font uses the Adobe standard Latin character set or a subset of it
            ("Flags".into(), Integer(32)),
            // 80 is the customary approximation, the actual stem width is not recoverable here
            ("StemV".into(), Integer(80)),
        ];

        // Maximum height of a single character in the font
        let mut maximum_character_height = 0;
        // Total width of all characters
        let mut total_width = 0;

        // An association between glyph IDs and triplets of Unicode IDs, character widths and
        // character heights; the ordered map keeps the `ToUnicode` blocks byte-stable between runs
        let mut gid_to_glyph_properties_map = BTreeMap::<u32, (u32, u32, u32)>::new();
        gid_to_glyph_properties_map.insert(0, (0, 1000, 1000));

        for (glyph_id, character) in self.glyph_ids() {
            if let Some(glyph_metrics) = self.glyph_metrics(glyph_id) {
                if glyph_metrics.height > maximum_character_height {
                    maximum_character_height = glyph_metrics.height;
                }

                total_width += glyph_metrics.width;
                gid_to_glyph_properties_map.insert(
                    glyph_id as u32,
                    (character as u32, glyph_metrics.width, glyph_metrics.height),
                );
            }
        }

        // The glyph IDs have to be grouped into segments where the first byte of the first and
        // last element are the same: a range from 0x1000 to 0x10FF is valid, one from 0x1000 to
        // 0x12FF is not. On top of that a single segment holds at most 100 glyph IDs, so the
        // sorted map is enumerated into buckets respecting both limits.
        let mut current_first_bit: u16 = 0;
        let mut all_gid_to_character_blocks = Vec::new();
        let mut current_gid_to_character_block = Vec::new();
        for (glyph_id, (character, _glyph_width, _glyph_height)) in
            gid_to_glyph_properties_map.iter()
        {
            if (*glyph_id >> 8) as u16 != current_first_bit
                || current_gid_to_character_block.len() >= 100
            {
                // End the current (beginbfchar endbfchar) block
                all_gid_to_character_blocks.push(current_gid_to_character_block.clone());
                current_gid_to_character_block = Vec::new();
                current_first_bit = (*glyph_id >> 8) as u16;
            }

            current_gid_to_character_block.push((*glyph_id, *character));
        }
        all_gid_to_character_blocks.push(current_gid_to_character_block);

        // Generate the mapping between the character IDs and the Unicode equivalents, then
        // construct the associated PDF stream and register it for later reference
        let cid_to_unicode_map =
            generate_cid_to_unicode_map(face_identifier, all_gid_to_character_blocks);
        let cid_to_unicode_map_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            cid_to_unicode_map.as_bytes().to_vec(),
        );
        let cid_to_unicode_map_stream_id = inner_document.add_object(cid_to_unicode_map_stream);

        // Encode the glyph widths the way page 439 of the PDF 1.7 reference expects: entries
        // like `20 [21 99 34]` mean that the glyph with ID 20 is 21 units wide, glyph 21 is 99
        // units wide and so on. Runs of consecutive glyph IDs share one entry.
        let percentage_font_scaling = 1000.0 / (face_metrics.units_per_em as f32);
        let mut width_objects = Vec::<Object>::new();
        let mut current_block_start: u16 = 0;
        let mut expected_glyph_id: u16 = 0;
        let mut current_widths_vector = Vec::<Object>::new();
        for glyph_id in 0..self.glyph_count() {
            let Some(GlyphMetrics { width, .. }) = self.glyph_metrics(glyph_id) else {
                // If the width is not available, then we just skip the glyph and log it
                log::warn!(
                    "Glyph ID {} for the font {:?} has no width, skipping it when adding it to the document from the font",
                    glyph_id,
                    face_identifier
                );
                continue;
            };

            if current_widths_vector.is_empty() {
                current_block_start = glyph_id;
            } else if glyph_id != expected_glyph_id {
                // The run of consecutive glyph IDs broke, drain the accumulated widths
                width_objects.push(Integer(i64::from(current_block_start)));
                width_objects.push(Array(mem::take(&mut current_widths_vector)));
                current_block_start = glyph_id;
            }

            current_widths_vector
                .push(Integer((width as f32 * percentage_font_scaling) as i64));
            expected_glyph_id = glyph_id + 1;
        }
        if !current_widths_vector.is_empty() {
            width_objects.push(Integer(i64::from(current_block_start)));
            width_objects.push(Array(mem::take(&mut current_widths_vector)));
        }

        // Configure the descriptors of the font for it to adhere to the PDF specification
        let mut font_descriptors = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(face_identifier.into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
        ]);

        let font_bounding_box = vec![
            Integer(0),
            Integer(maximum_character_height as i64),
            Integer(total_width as i64),
            Integer(maximum_character_height as i64),
        ];
        font_descriptor_vector.push((
            "FontFile2".into(),
            Reference(inner_document.add_object(font_stream)),
        ));
        // Although the bounding box is technically not needed, Adobe Reader requires it
        font_descriptor_vector.push(("FontBBox".into(), Array(font_bounding_box)));

        let font_descriptor_vector_id =
            inner_document.add_object(lopdf::Dictionary::from_iter(font_descriptor_vector));
        font_descriptors.set("FontDescriptor", Reference(font_descriptor_vector_id));

        // Chain in the fields that had to be calculated before they could be attached
        font_vector.push((
            "DescendantFonts".into(),
            Array(vec![Dictionary(font_descriptors)]),
        ));
        font_vector.push(("ToUnicode".into(), Reference(cid_to_unicode_map_stream_id)));

        lopdf::Dictionary::from_iter(font_vector)
    }
}

/// The three font weights the document layouts draw with, loaded eagerly and consumed by
/// reference afterwards; the render path never mutates the set. The server loads one set at
/// process startup, the buffer entry point loads a fresh set per call so that a font failure
/// rejects that operation alone.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub regular: LoadedFont,
    pub semibold: LoadedFont,
    pub bold: LoadedFont,
}

impl FontSet {
    /// Reads the three font weights from their fixed file names inside the given directory.
    pub fn load(fonts_directory: &Path) -> Result<Self, ContextError> {
        log::info!("Loading the font set from {:?}", fonts_directory);
        Ok(Self {
            regular: LoadedFont::from_path(&fonts_directory.join(REGULAR_FONT_FILE))?,
            semibold: LoadedFont::from_path(&fonts_directory.join(SEMIBOLD_FONT_FILE))?,
            bold: LoadedFont::from_path(&fonts_directory.join(BOLD_FONT_FILE))?,
        })
    }
}

type GlyphId = u32;
type UnicodeCodePoint = u32;
type CmapBlock = Vec<(GlyphId, UnicodeCodePoint)>;

/// Generates a CMAP (character map) from valid cmap blocks by iterating over them. This function
/// adheres to the PDF specification by employing a predefined beginning and end section which is
/// inserted at compile time.
fn generate_cid_to_unicode_map(face_name: &str, all_cmap_blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map = format!(
        include_str!("../assets/cid_to_unicode_begin.txt"),
        face_name
    );

    for cmap_block in all_cmap_blocks
        .into_iter()
        .filter(|block| !block.is_empty())
    {
        cid_to_unicode_map.push_str(format!("{} beginbfchar\r\n", cmap_block.len()).as_str());
        for (glyph_id, unicode) in cmap_block {
            cid_to_unicode_map.push_str(format!("<{glyph_id:04x}> <{unicode:04x}>\n").as_str());
        }
        cid_to_unicode_map.push_str("endbfchar\r\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/cid_to_unicode_end.txt"));

    cid_to_unicode_map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular_font() -> LoadedFont {
        LoadedFont::from_path(&Path::new(DEFAULT_FONTS_DIRECTORY).join(REGULAR_FONT_FILE))
            .unwrap()
    }

    #[test]
    fn text_measurement_grows_with_the_text() {
        let font = regular_font();
        let short_width = font.text_width("Booking", 11.0);
        let long_width = font.text_width("Booking Confirmation", 11.0);
        assert!(short_width > 0.0);
        assert!(long_width > short_width);
    }

    #[test]
    fn line_height_exceeds_the_ascent() {
        let font = regular_font();
        assert!(font.line_height(11.0) > font.ascent(11.0));
    }

    #[test]
    fn encoded_glyphs_are_two_bytes_per_character() {
        let font = regular_font();
        let glyph_id_bytes = font.encode_glyphs("Dear");
        assert_eq!(glyph_id_bytes.len(), 8);
    }

    #[test]
    fn loading_a_missing_font_fails() {
        let result = LoadedFont::from_path(Path::new("fonts/NoSuchFont.ttf"));
        assert!(result.is_err());
    }
}
