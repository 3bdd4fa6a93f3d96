use lopdf::{content::Operation, Object, StringFormat};
use nalgebra_glm as glm;
use std::{collections::BTreeMap, io::BufWriter, mem};
use time::OffsetDateTime;

use crate::error::ContextError;
use crate::fonts::LoadedFont;

/// One layer of PDF data. Usually, one layer equals to one content stream.
#[derive(Debug, Clone)]
pub struct PdfLayer {
    /// Name of the layer. Must be present for the optional content group.
    pub(crate) name: String,
    /// Stream operations in this layer.
    pub(crate) operations: Vec<Operation>,
}

impl PdfLayer {
    /// Encodes the operations of the layer into an uncompressed `lopdf::Stream`.
    fn into_stream(self) -> Result<lopdf::Stream, ContextError> {
        let stream_content = lopdf::content::Content {
            operations: self.operations,
        };
        let encoded_content = stream_content.encode().map_err(|error| {
            ContextError::with_error("Failed to encode the PDF layer content", &error)
        })?;

        // Page contents should not be compressed
        Ok(lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content).with_compression(false))
    }
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels (original width, not scaled width).
    pub width: u32,
    /// Height of the image in pixels (original height, not scaled height).
    pub height: u32,
    /// Bits per color component: 1 for black/white, 8 for greyscale and RGB.
    pub bits_per_component: u16,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The raw `DeviceRGB` samples of the image.
    pub image_data: Vec<u8>,
    /// SoftMask for transparency, if `None` assumes no transparency. See page 444 of the
    /// Adobe PDF 1.4 reference.
    pub soft_mask: Option<lopdf::ObjectId>,
}

impl From<ImageXObject> for lopdf::Object {
    fn from(value: ImageXObject) -> Self {
        use lopdf::Object::*;

        let mut dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(i64::from(value.width))),
            ("Height", Integer(i64::from(value.height))),
            ("ColorSpace", Name("DeviceRGB".into())),
            ("BitsPerComponent", Integer(i64::from(value.bits_per_component))),
            ("Interpolate", Boolean(value.interpolate)),
        ]);
        if let Some(soft_mask) = value.soft_mask {
            dictionary.set("SMask", Reference(soft_mask));
        }

        Stream(lopdf::Stream::new(dictionary, value.image_data))
    }
}

/// `XObject`s are parts of the PDF specification. They allow for complex behavior to be
/// inserted into the PDF document: this comprises bookmarks, annotations and even images.
/// This implementation is only partial as it allows only for images.
#[derive(Debug, Clone)]
pub enum XObject {
    /// The `XObject` interface for an image. It can be converted into a `lopdf::Object`.
    Image(ImageXObject),
}

impl From<XObject> for lopdf::Object {
    fn from(value: XObject) -> Self {
        match value {
            XObject::Image(image_xobject) => image_xobject.into(),
        }
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }
}

/// The association between the `XObject` names and the actual `XObject`s themselves. The ordered
/// map keeps the insertion into the document byte-stable between identical renders.
#[derive(Default, Debug, Clone)]
pub struct XObjectMap(BTreeMap<String, XObject>);

impl XObjectMap {
    /// Registers an image under the next free name, returning the reference to be used by the
    /// `Do` operator.
    pub fn add_image(&mut self, image_xobject: ImageXObject) -> XObjectReference {
        let xobject_reference = XObjectReference::new(self.0.len());
        self.0
            .insert(xobject_reference.0.clone(), XObject::Image(image_xobject));

        xobject_reference
    }

    /// Inserts the `XObject`s into the document, simultaneously constructing a PDF dictionary
    /// of them.
    pub fn into_with_document(&self, document: &mut lopdf::Document) -> lopdf::Dictionary {
        self.0
            .iter()
            .map(|(name, xobject)| {
                let object: lopdf::Object = xobject.clone().into();
                let object_reference = document.add_object(object);
                (name.clone(), lopdf::Object::Reference(object_reference))
            })
            .collect()
    }
}

/// A named reference to an OCG (Optional Content Group), which is part of the PDF specification.
#[derive(Debug, Clone)]
pub struct OcgReference(String);

impl OcgReference {
    /// Creates a new OCG reference from an index.
    pub fn new(index: usize) -> Self {
        Self(format!("MC{index}"))
    }
}

/// The association between the OCG references and the actual PDF objects.
#[derive(Default, Debug, Clone)]
pub struct OcgLayersMap(Vec<(OcgReference, lopdf::Object)>);

impl OcgLayersMap {
    /// Adds a PDF object to the map for the OCG layers. Returns the reference to the added object.
    pub fn add_ocg(&mut self, object: lopdf::Object) -> OcgReference {
        let length = self.0.len();
        let ocg_reference = OcgReference::new(length);
        self.0.push((ocg_reference.clone(), object));

        ocg_reference
    }
}

impl From<OcgLayersMap> for lopdf::Dictionary {
    fn from(value: OcgLayersMap) -> Self {
        let mut dictionary = lopdf::Dictionary::new();

        for entry in value.0 {
            dictionary.set((entry.0).0, entry.1);
        }

        dictionary
    }
}

/// Struct for storing the PDF Resources, to be used on a PDF page.
#[derive(Default, Debug, Clone)]
pub(crate) struct PdfResources {
    /// External graphics objects.
    pub xobjects: XObjectMap,
    /// Layers / optional content ("Properties") in the resource dictionary.
    pub ocg_layers: OcgLayersMap,
}

impl PdfResources {
    /// Inserts the resources into the document, simultaneously constructing a PDF dictionary of
    /// them. Returns the constructed dictionary and the vector of the OCG references.
    pub(crate) fn with_document_and_layers(
        &self,
        inner_document: &mut lopdf::Document,
        layers: Vec<lopdf::Object>,
    ) -> (lopdf::Dictionary, Vec<OcgReference>) {
        let mut dictionary = lopdf::Dictionary::new();

        let mut ocg_layers_dictionary = self.ocg_layers.clone();
        let mut ocg_references = Vec::<OcgReference>::new();

        let xobjects_dictionary: lopdf::Dictionary =
            self.xobjects.into_with_document(inner_document);

        if !layers.is_empty() {
            for layer in layers {
                ocg_references.push(ocg_layers_dictionary.add_ocg(layer));
            }

            let current_ocg_dictionary: lopdf::Dictionary = ocg_layers_dictionary.into();

            if !current_ocg_dictionary.is_empty() {
                dictionary.set(
                    "Properties",
                    lopdf::Object::Dictionary(current_ocg_dictionary),
                );
            }
        }

        if !xobjects_dictionary.is_empty() {
            dictionary.set("XObject", lopdf::Object::Dictionary(xobjects_dictionary));
        }

        (dictionary, ocg_references)
    }
}

/// The representation of a PDF page. Utility functions are implemented for this struct
/// so that its content can be inserted into the underlying PDF document.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The index of the page in the document.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Page layers.
    pub layers: Vec<PdfLayer>,
    /// Resources used in this page.
    pub(crate) resources: PdfResources,
    /// Extend the page with custom ad-hoc attributes, as an escape hatch to the low level lopdf
    /// library. Can be used to add annotations to a page. If the dictionary is wrong it will
    /// produce a broken PDF without warning or useful messages.
    pub(crate) extend_with: Option<lopdf::Dictionary>,
}

impl PdfPage {
    /// Iterates over all the layers in order to construct the dictionary for the PDF resources
    /// and the PDF streams contained into the page so that they can be inserted in to the
    /// document. Returns the dictionary of the resources and the vector containing all the
    /// streams associated to the layers.
    pub(crate) fn collect_resources_and_streams(
        &mut self,
        inner_document: &mut lopdf::Document,
        layers: &[(usize, lopdf::Object)],
    ) -> Result<(lopdf::Dictionary, Vec<lopdf::Stream>), ContextError> {
        let current_layers = layers.iter().map(|layer| layer.1.clone()).collect();
        let (resource_dictionary, ocg_references) = self
            .resources
            .with_document_and_layers(inner_document, current_layers);

        let mut layer_streams = Vec::<lopdf::Stream>::new();
        use lopdf::Object::*;

        for (index, layer) in self.layers.iter_mut().enumerate() {
            // In the PDF specification the q/Q pair creates an isolated graphics state block,
            // while BDC/EMC delimit a marked-content sequence tied to the optional content group
            layer.operations.insert(0, Operation::new("q", vec![]));
            layer.operations.insert(
                0,
                Operation::new(
                    "BDC",
                    vec![
                        Name("OC".into()),
                        Name(
                            ocg_references
                                .get(index)
                                .ok_or(ContextError::with_context(
                                    "Unable to find the index in the OCG references",
                                ))?
                                .0
                                .clone()
                                .into(),
                        ),
                    ],
                ),
            );

            layer.operations.push(Operation::new("Q", vec![]));
            layer.operations.push(Operation::new("EMC", vec![]));

            let layer_stream = layer.clone().into_stream()?;
            layer_streams.push(layer_stream);
        }

        Ok((resource_dictionary, layer_streams))
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// actual underlying `lopdf::Document` with the addition of the PDF pages, the document ID and
/// the fonts used in the document.
///
/// All positions and sizes taken by the convenience functions are expressed in PDF points,
/// measured from the lower-left corner of the page as the PDF specification mandates. The
/// output is deterministic: the creation timestamps are fixed and the document and instance
/// identifiers are chosen by the caller, so identical inputs produce identical bytes.
pub struct PdfDocument {
    /// The association between the font identifiers, the objects they are represented by and
    /// their face data.
    fonts: BTreeMap<String, (lopdf::ObjectId, EmbeddedFont)>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly
    /// interacted with unless strictly necessary, anyway this is why it is exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
}

/// A font face registered into one document together with its face identifier. Cloning is cheap
/// because the face data is shared by reference.
#[derive(Debug, Clone)]
struct EmbeddedFont {
    face: LoadedFont,
    face_identifier: String,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
        }
    }

    /// Adds a page of the given width and height in points with an empty layer for contents to
    /// be added to. The function returns the index of the page and of the layer in the page,
    /// these are to be passed to the other functions when calling them. Working with indices
    /// notably simplifies the handling of the pages and the layers.
    pub fn add_page_with_layer(&mut self, page_width: f32, page_height: f32) -> (usize, usize) {
        let mut pdf_page = PdfPage {
            number: self.pages.len() + 1,
            width: page_width,
            height: page_height,
            layers: Vec::new(),
            resources: PdfResources::default(),
            extend_with: None,
        };

        let pdf_layer = PdfLayer {
            name: "Layer0".into(),
            operations: Vec::new(),
        };
        pdf_page.layers.push(pdf_layer);
        self.pages.push(pdf_page);

        let page_index = self.pages.len() - 1;
        let layer_index_in_page = 0;
        (page_index, layer_index_in_page)
    }

    /// Registers an already loaded font face into the document. The returned index is to be
    /// passed to `write_text_to_layer_in_page`; the face data itself is shared by reference, so
    /// registering the same face into many documents does not copy the font bytes.
    pub fn add_font_face(&mut self, font_face: &LoadedFont) -> usize {
        let font = EmbeddedFont {
            face: font_face.clone(),
            face_identifier: format!("F{}", self.fonts.len()),
        };
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font.face_identifier.clone(), (font_object_id, font));

        self.fonts.len() - 1
    }

    /// Writes the text in the specified font and color at the caret position to the PDF
    /// document. The information is inserted onto the given layer of the specified page (refer
    /// to the other functions documentation for more details). If the operation is successful,
    /// then return nothing.
    ///
    /// This function might appear to have too many arguments, but this is on purpose in order
    /// to keep the API of this library quite on the simpler side. Any external algorithm for
    /// layouting text should take into consideration the way in which text is inserted into
    /// the PDF. Checkout the PDF specification for more details.
    #[allow(clippy::too_many_arguments)]
    pub fn write_text_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        color: [f32; 3],
        text: String,
        font_index: usize,
        font_size: f32,
        caret_position: [f32; 2],
    ) -> Result<(), ContextError> {
        let font = self.get_font(font_index)?.1.clone();
        let glyph_id_bytes = font.face.encode_glyphs(&text);

        self.add_operations_to_layer_in_page(
            layer_index,
            page_index,
            vec![
                // Begin the text section, set the font, the caret and the filling color
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![font.face_identifier.clone().into(), font_size.into()],
                ),
                Operation::new("Td", {
                    let [x, y] = caret_position;
                    vec![x.into(), y.into()]
                }),
                Operation::new("rg", {
                    let [red, green, blue] = color;
                    vec![red, green, blue]
                        .into_iter()
                        .map(lopdf::Object::Real)
                        .collect()
                }),
                // The actual text content is inserted as big-endian glyph ID bytes
                Operation::new(
                    "Tj",
                    vec![lopdf::Object::String(
                        glyph_id_bytes,
                        StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        )
    }

    /// Strokes a straight line of the given color and width between the two endpoints.
    pub fn draw_line_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        color: [f32; 3],
        stroke_width: f32,
        from: [f32; 2],
        to: [f32; 2],
    ) -> Result<(), ContextError> {
        self.add_operations_to_layer_in_page(
            layer_index,
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new("RG", {
                    let [red, green, blue] = color;
                    vec![red, green, blue]
                        .into_iter()
                        .map(lopdf::Object::Real)
                        .collect()
                }),
                Operation::new("w", vec![stroke_width.into()]),
                Operation::new("m", vec![from[0].into(), from[1].into()]),
                Operation::new("l", vec![to[0].into(), to[1].into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Fills an axis-aligned rectangle with the given color. The position is the lower-left
    /// corner of the rectangle.
    pub fn fill_rectangle_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        color: [f32; 3],
        lower_left: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        self.add_operations_to_layer_in_page(
            layer_index,
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new("rg", {
                    let [red, green, blue] = color;
                    vec![red, green, blue]
                        .into_iter()
                        .map(lopdf::Object::Real)
                        .collect()
                }),
                Operation::new(
                    "re",
                    vec![
                        lower_left[0].into(),
                        lower_left[1].into(),
                        size[0].into(),
                        size[1].into(),
                    ],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Decodes the given encoded image (a PNG in this service), embeds it into the page
    /// resources as an Image XObject and places it scaled to `target_width` while preserving
    /// the aspect ratio. If the image carries an alpha channel it is split off into a
    /// `DeviceGray` soft mask so the transparency survives the embedding.
    ///
    /// `top_left` is the position of the upper-left corner of the placed image in PDF user
    /// space; the function returns the height the image was drawn with, so that callers laying
    /// content out top to bottom can advance past it.
    pub fn add_image_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        image_bytes: &[u8],
        top_left: [f32; 2],
        target_width: f32,
    ) -> Result<f32, ContextError> {
        let decoded_image = image::load_from_memory(image_bytes)
            .map_err(|error| ContextError::with_error("Failed to decode the image", &error))?;
        let (pixel_width, pixel_height) = (decoded_image.width(), decoded_image.height());
        if pixel_width == 0 || pixel_height == 0 {
            return Err(ContextError::with_context("The image contains no pixels"));
        }
        let target_height = target_width * pixel_height as f32 / pixel_width as f32;

        let soft_mask = if decoded_image.color().has_alpha() {
            let alpha_channel: Vec<u8> = decoded_image
                .to_rgba8()
                .pixels()
                .map(|pixel| pixel.0[3])
                .collect();
            let mask_stream = lopdf::Stream::new(
                lopdf::Dictionary::from_iter(vec![
                    ("Type", Object::Name("XObject".into())),
                    ("Subtype", Object::Name("Image".into())),
                    ("Width", Object::Integer(i64::from(pixel_width))),
                    ("Height", Object::Integer(i64::from(pixel_height))),
                    ("ColorSpace", Object::Name("DeviceGray".into())),
                    ("BitsPerComponent", Object::Integer(8)),
                ]),
                alpha_channel,
            );
            Some(self.inner_document.add_object(mask_stream))
        } else {
            None
        };

        let image_xobject = ImageXObject {
            width: pixel_width,
            height: pixel_height,
            bits_per_component: 8,
            interpolate: false,
            image_data: decoded_image.to_rgb8().into_raw(),
            soft_mask,
        };

        let pdf_page = self
            .pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))?;
        let xobject_reference = pdf_page.resources.xobjects.add_image(image_xobject);

        // The `Do` operator paints the XObject into the unit square, so the placement matrix
        // scales the square up to the target size and translates it into position
        let placement = glm::translation2d(&glm::vec2(top_left[0], top_left[1] - target_height))
            * glm::scaling2d(&glm::vec2(target_width, target_height));
        self.add_operations_to_layer_in_page(
            layer_index,
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement[(0, 0)].into(),
                        placement[(1, 0)].into(),
                        placement[(0, 1)].into(),
                        placement[(1, 1)].into(),
                        placement[(0, 2)].into(),
                        placement[(1, 2)].into(),
                    ],
                ),
                Operation::new(
                    "Do",
                    vec![Object::Name(xobject_reference.0.clone().into_bytes())],
                ),
                Operation::new("Q", vec![]),
            ],
        )?;

        Ok(target_height)
    }

    /// Write the operations so far specified to the PDF file and finalize it.
    ///
    /// One mandatory argument needed by the PDF specification is the instance ID, which needs
    /// to be a 32 characters-long string. The creation and modification dates are pinned to the
    /// UNIX epoch so that rendering the same content twice yields the same bytes.
    pub fn write_all(&mut self, instance_id: String) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        // Construct all the general info that the PDF document needs in order to be parsed
        // correctly and insert it into the PDF document itself
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(
                    to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH).into_bytes(),
                    Literal,
                ),
            ),
            (
                "ModDate",
                String(
                    to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH).into_bytes(),
                    Literal,
                ),
            ),
            (
                "GTS_PDFX_Version",
                String("PDF/A-3:2012".to_string().into_bytes(), Literal),
            ),
            ("Title", String("Unknown".to_string().into_bytes(), Literal)),
            (
                "Author",
                String("Unknown".to_string().into_bytes(), Literal),
            ),
            (
                "Creator",
                String("bookpress".to_string().into_bytes(), Literal),
            ),
            (
                "Producer",
                String("bookpress".to_string().into_bytes(), Literal),
            ),
            (
                "Subject",
                String("Unknown".to_string().into_bytes(), Literal),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
            ("Keywords", String("".to_string().into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let mut catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);

        // Begin constructing the pages dictionary
        let mut pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
        ]);

        // Construct the dictionary which clarifies the OCG usage and insert it into the document
        let ocg_usage_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("OCG".into())),
            (
                "CreatorInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Creator", String("bookpress".into(), Literal)),
                    ("Subtype", Name("Artwork".into())),
                ])),
            ),
        ]);
        let usage_ocg_dictionary_id = self.inner_document.add_object(ocg_usage_dictionary);

        // Construct the array which explains the intents
        let intent_array = Array(vec![Name("View".into()), Name("Design".into())]);
        let intent_array_id = self.inner_document.add_object(intent_array);

        let page_layer_numbers_and_names: Vec<(usize, Vec<::std::string::String>)> = self
            .pages
            .iter()
            .map(|page| {
                (
                    page.number,
                    page.layers.iter().map(|layer| layer.name.clone()).collect(),
                )
            })
            .collect();

        // For each page number and layer name in each page, collect the layer index and the
        // reference to the OCG dictionary inserted into the document
        let ocg_association: Vec<(usize, Vec<(usize, lopdf::Object)>)> =
            page_layer_numbers_and_names
                .into_iter()
                .map(|(page_index, layer_names)| {
                    let layer_indices_and_dictionary_references = layer_names
                        .into_iter()
                        .enumerate()
                        .map(|(layer_index, layer_name)| {
                            let ocg_dictionary = lopdf::Dictionary::from_iter(vec![
                                ("Type", Name("OCG".into())),
                                ("Name", String(layer_name.into(), Literal)),
                                ("Intent", Reference(intent_array_id)),
                                ("Usage", Reference(usage_ocg_dictionary_id)),
                            ]);
                            let ocg_dictionary_id =
                                self.inner_document.add_object(Dictionary(ocg_dictionary));

                            (layer_index, Reference(ocg_dictionary_id))
                        })
                        .collect();

                    (page_index, layer_indices_and_dictionary_references)
                })
                .collect();

        let ocg_dictionary_references: Vec<lopdf::Object> = ocg_association
            .iter()
            .flat_map(|(_, layers)| {
                layers
                    .iter()
                    .map(|(_, dictionary_reference)| dictionary_reference.clone())
            })
            .collect();

        // Update the PDF catalog with the OCGs just inserted into the document
        catalog.set(
            "OCProperties",
            Dictionary(lopdf::Dictionary::from_iter(vec![
                ("OCGs", Array(ocg_dictionary_references.clone())),
                (
                    "D",
                    Dictionary(lopdf::Dictionary::from_iter(vec![
                        ("Order", Array(ocg_dictionary_references.clone())),
                        ("RBGroups", Array(vec![])),
                        ("ON", Array(ocg_dictionary_references)),
                    ])),
                ),
            ])),
        );

        // Save the catalog after inserting it into the PDF document
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );

        // Load the set fonts and insert them into the PDF document
        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<lopdf::Object>::new();

        for (index, page) in self.pages.iter_mut().enumerate() {
            // Construct the dictionary which specifies all the page information
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                (
                    "MediaBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                (
                    "TrimBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                (
                    "CropBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                ("Annots", vec![].into()),
                ("Parent", Reference(pages_id)),
            ]);

            // If present, extend the page dictionary with further settings
            if let Some(extension) = &page.extend_with {
                for (key, value) in extension.iter() {
                    page_dictionary.set(key.to_vec(), value.clone())
                }
            }

            // Collect the layers of the OCG associated to the current document page
            let unmerged_layer = ocg_association.iter().find(|ocg| ocg.0 - 1 == index).ok_or({
                let comparisons = ocg_association.iter().map(|ocg| ocg.0 - 1).collect::<Vec<_>>();
                ContextError::with_context(
                    format!("Unable to collect the resources needed for rendering the page: can't find {:?} in {:?}", index, comparisons),
                )
            })?;

            // Collect the streams and the resources associated to the current layer
            let (mut resource_dictionary, layer_streams) =
                page.collect_resources_and_streams(&mut self.inner_document, &unmerged_layer.1)?;

            // Set the fonts for the resource associated to the current layer, insert it into the
            // PDF document and then insert the resource dictionary into the one for the pages
            resource_dictionary.set("Font", Reference(fonts_dictionary_id));
            let resources_page_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));
            page_dictionary.set("Resources", Reference(resources_page_id));

            // Merge all streams of the individual layers into one unified stream, then insert it
            // into the PDF document as a whole by setting the "Contents" field
            let mut merged_layer_streams = Vec::<u8>::new();
            for mut stream in layer_streams {
                merged_layer_streams.append(&mut stream.content);
            }
            let merged_layer_stream =
                lopdf::Stream::new(lopdf::Dictionary::new(), merged_layer_streams);
            let page_content_id = self.inner_document.add_object(merged_layer_stream);
            page_dictionary.set("Contents", Reference(page_content_id));

            // Inserts the page dictionary into the document and save the associated reference
            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id))
        }

        // Use all the collected page references in order to set the "Kids" field of the PDF
        // document and then insert the pages dictionary into the document itself
        pages.set::<_, lopdf::Object>("Kids".to_string(), page_ids.into());
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file, streamed as an
    /// HTTP response body or attached elsewhere.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_id, font) in self.fonts.iter_mut() {
            let collected_font_dictionary = font
                .1
                .face
                .embed_into_document(&font.1.face_identifier, &mut self.inner_document);

            self.inner_document
                .objects
                .insert(font.0, lopdf::Object::Dictionary(collected_font_dictionary));
            font_dictionary.set(font_id.clone(), lopdf::Object::Reference(font.0));
        }
        font_dictionary
    }

    /// This function is responsible for adding the given operations to the specified layer and
    /// page.
    fn add_operations_to_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_layer_reference = self.get_mut_layer_in_page(layer_index, page_index)?;
        pdf_layer_reference.operations.extend(operations);

        Ok(())
    }

    // Retrieve the font at the given font index.
    fn get_font(&mut self, font_index: usize) -> Result<&(lopdf::ObjectId, EmbeddedFont), ContextError> {
        self.fonts
            .get(&format!("F{font_index}"))
            .ok_or(ContextError::with_context(format!(
                "Failed to find font {} into the fonts map",
                font_index
            )))
    }

    // Retrieve the specified layer in the given page via the respective indices.
    fn get_mut_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
    ) -> Result<&mut PdfLayer, ContextError> {
        let pdf_page = self
            .pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))?;
        let pdf_layer = pdf_page
            .layers
            .get_mut(layer_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the layer with index {}",
                layer_index
            )))?;

        Ok(pdf_layer)
    }
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
