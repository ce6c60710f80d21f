//! In-memory PDF construction for integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// An image XObject to embed.
pub enum ImageData {
    /// Uncompressed 8-bit DeviceGray samples.
    Gray { width: u32, height: u32 },
    /// DCTDecode stream.
    Jpeg { width: u32, height: u32 },
}

pub struct ImageSpec {
    pub data: ImageData,
    /// `(x, y, width, height)` in PDF user space, origin bottom-left.
    pub placement: Option<(f32, f32, f32, f32)>,
}

/// A line of text shown with `Tj` at `(x, y)` in PDF user space.
pub struct TextSpec {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

#[derive(Default)]
pub struct PageSpec {
    pub text: Vec<TextSpec>,
    pub images: Vec<ImageSpec>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, x: f32, y: f32, size: f32, text: &str) -> Self {
        self.text.push(TextSpec {
            x,
            y,
            size,
            text: text.to_string(),
        });
        self
    }

    pub fn gray(mut self, width: u32, height: u32, placement: (f32, f32, f32, f32)) -> Self {
        self.images.push(ImageSpec {
            data: ImageData::Gray { width, height },
            placement: Some(placement),
        });
        self
    }

    pub fn jpeg(mut self, width: u32, height: u32, placement: (f32, f32, f32, f32)) -> Self {
        self.images.push(ImageSpec {
            data: ImageData::Jpeg { width, height },
            placement: Some(placement),
        });
        self
    }
}

fn image_stream(data: &ImageData) -> Stream {
    match data {
        ImageData::Gray { width, height } => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => *width as i64,
                "Height" => *height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            (0..width * height).map(|i| (i % 251) as u8).collect(),
        ),
        ImageData::Jpeg { width, height } => {
            let mut buf = Cursor::new(Vec::new());
            DynamicImage::new_rgb8(*width, *height)
                .write_to(&mut buf, ImageFormat::Jpeg)
                .unwrap();
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => *width as i64,
                    "Height" => *height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                buf.into_inner(),
            )
        }
    }
}

/// Build a US Letter PDF with the given pages.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        for line in &page.text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), line.size.into()]),
                Operation::new("Td", vec![line.x.into(), line.y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line.text.as_str())]),
                Operation::new("ET", vec![]),
            ]);
        }

        let mut xobjects = Dictionary::new();
        for (i, image) in page.images.iter().enumerate() {
            let name = format!("Im{}", i + 1);
            let id = doc.add_object(image_stream(&image.data));
            xobjects.set(name.as_bytes().to_vec(), id);
            if let Some((x, y, w, h)) = image.placement {
                operations.extend([
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
                    ),
                    Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                    Operation::new("Q", vec![]),
                ]);
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Write a PDF into `dir` and return its path.
pub fn write_pdf(dir: &Path, name: &str, pages: &[PageSpec]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    path
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
