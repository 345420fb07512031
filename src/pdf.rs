use crate::canvas::{Command, Document, Page};
use crate::debug::DebugLogger;
use crate::error::ReportError;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use image::GenericImageView;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

const PDF_HEADER: &[u8] = b"%PDF-1.7\n";

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_INFO_ID: usize = 4;
const FIRST_FREE_ID: usize = 5;

const DEFAULT_FONT: &str = "Helvetica";

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    bits_per_component: u8,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<AlphaData>,
}

struct AlphaData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Running tally of characters the base-14 WinAnsi fonts cannot show.
#[derive(Default)]
struct TextFallbacks {
    replaced: usize,
    dropped: usize,
    samples: Vec<String>,
}

/// Serializes a laid-out document. Output depends only on `document`: no
/// timestamps, object ids assigned in a fixed order, resources sorted.
pub(crate) fn document_to_pdf(
    document: &Document,
    debug: Option<&DebugLogger>,
) -> Result<Vec<u8>, ReportError> {
    let mut objects: Vec<String> = vec![String::new(); FIRST_FREE_ID - 1];
    let mut next_id = FIRST_FREE_ID;
    let mut push = |objects: &mut Vec<String>, body: String| -> usize {
        objects.push(body);
        let id = next_id;
        next_id += 1;
        id
    };

    let font_names = collect_font_names(document);
    let mut font_map: BTreeMap<String, String> = BTreeMap::new();
    let mut font_ids: Vec<(String, usize)> = Vec::new();
    for (idx, name) in font_names.iter().enumerate() {
        let resource = format!("F{}", idx + 1);
        let id = push(&mut objects, font_object(name));
        font_map.insert(name.clone(), resource.clone());
        font_ids.push((resource, id));
    }

    let mut image_map: BTreeMap<String, String> = BTreeMap::new();
    let mut image_ids: Vec<(String, usize)> = Vec::new();
    for (idx, (resource_id, data)) in document.images.iter().enumerate() {
        let image = decode_image_bytes(data).ok_or_else(|| {
            ReportError::Serialization(format!(
                "image {} is not a decodable PNG or JPEG",
                resource_id
            ))
        })?;
        let smask_id = image
            .alpha
            .as_ref()
            .map(|alpha| push(&mut objects, image_smask_object(alpha)));
        let id = push(&mut objects, image_object(&image, smask_id));
        let name = format!("Im{}", idx + 1);
        image_map.insert(resource_id.clone(), name.clone());
        image_ids.push((name, id));
    }

    let page_height = document.page_size.height;
    let mut fallbacks = TextFallbacks::default();
    let mut page_ids: Vec<usize> = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_page(page, page_height, &font_map, &image_map, &mut fallbacks);
        let content_id = push(&mut objects, stream_object(&content));
        let annot_ids: Vec<usize> = link_annotations(page, page_height)
            .into_iter()
            .map(|annot| push(&mut objects, annot))
            .collect();
        let annots = if annot_ids.is_empty() {
            String::new()
        } else {
            format!(" /Annots [{}]", object_refs(&annot_ids))
        };
        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R{} >>",
            PDF_PAGES_ID,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            PDF_RESOURCES_ID,
            content_id,
            annots
        );
        page_ids.push(push(&mut objects, page_obj));
    }

    objects[PDF_CATALOG_ID - 1] = format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID);
    objects[PDF_PAGES_ID - 1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        object_refs(&page_ids),
        page_ids.len()
    );
    let mut resources = format!("<< /Font {}", named_refs(&font_ids));
    if !image_ids.is_empty() {
        resources.push_str(&format!(" /XObject {}", named_refs(&image_ids)));
    }
    resources.push_str(" >>");
    objects[PDF_RESOURCES_ID - 1] = resources;
    objects[PDF_INFO_ID - 1] = "<< /Producer (valuation_report) >>".to_string();

    if let Some(logger) = debug {
        if fallbacks.replaced > 0 || fallbacks.dropped > 0 {
            logger.event(
                "pdf.text_fallback",
                json!({
                    "replaced": fallbacks.replaced,
                    "dropped": fallbacks.dropped,
                    "samples": fallbacks.samples,
                }),
            );
            logger.increment("pdf.text_fallback", (fallbacks.replaced + fallbacks.dropped) as u64);
        }
    }

    Ok(build_pdf(objects, PDF_CATALOG_ID, PDF_INFO_ID))
}

fn collect_font_names(document: &Document) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    names.insert(DEFAULT_FONT.to_string());
    for page in &document.pages {
        for command in &page.commands {
            if let Command::SetFontName(name) = command {
                names.insert(name.clone());
            }
        }
    }
    names
}

fn render_page(
    page: &Page,
    page_height: Pt,
    font_map: &BTreeMap<String, String>,
    image_map: &BTreeMap<String, String>,
    fallbacks: &mut TextFallbacks,
) -> String {
    let mut out = String::new();
    let mut font_size = Pt::from_f32(12.0);
    let mut font_name = DEFAULT_FONT.to_string();
    // q/Q restores font selection along with the rest of the graphics state.
    let mut saved_fonts: Vec<(Pt, String)> = Vec::new();

    for command in &page.commands {
        match command {
            Command::SaveState => {
                saved_fonts.push((font_size, font_name.clone()));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((size, name)) = saved_fonts.pop() {
                    font_size = size;
                    font_name = name;
                }
                out.push_str("Q\n");
            }
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => out.push_str(&format!("{} w\n", fmt_pt(*width))),
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::ClipRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nW\nn\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawString { x, y, text } => {
                let encoded = encode_winansi_pdf_string(text);
                if encoded.replaced > 0 || encoded.dropped > 0 {
                    fallbacks.replaced += encoded.replaced;
                    fallbacks.dropped += encoded.dropped;
                    if fallbacks.samples.len() < 8 {
                        fallbacks.samples.push(truncate_preview(text, 40));
                    }
                }
                if encoded.text.is_empty() {
                    continue;
                }
                let resource = font_map
                    .get(&font_name)
                    .or_else(|| font_map.get(DEFAULT_FONT))
                    .map(String::as_str)
                    .unwrap_or("F1");
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encoded.text));
                out.push_str("ET\n");
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nS\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some(name) = image_map.get(resource_id) {
                    let draw_y = page_height - *y - *height;
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(draw_y)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
            }
            Command::LinkArea { .. } => {}
        }
    }

    out
}

fn link_annotations(page: &Page, page_height: Pt) -> Vec<String> {
    page.commands
        .iter()
        .filter_map(|command| match command {
            Command::LinkArea {
                x,
                y,
                width,
                height,
                uri,
            } => {
                let bottom = page_height - *y - *height;
                Some(format!(
                    "<< /Type /Annot /Subtype /Link /Rect [{} {} {} {}] /Border [0 0 0] /A << /Type /Action /S /URI /URI ({}) >> >>",
                    fmt_pt(*x),
                    fmt_pt(bottom),
                    fmt_pt(*x + *width),
                    fmt_pt(bottom + *height),
                    escape_pdf_string(uri)
                ))
            }
            _ => None,
        })
        .collect()
}

fn decode_image_bytes(data: &[u8]) -> Option<ImageData> {
    let format = image::guess_format(data).ok()?;
    if !matches!(format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
        return None;
    }
    let decoded = image::load_from_memory_with_format(data, format).ok()?;
    let (width, height) = decoded.dimensions();

    if format == image::ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Some(ImageData {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(AlphaData {
            width,
            height,
            data: flate_compress(&alpha),
        })
    } else {
        None
    };
    Some(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb),
        alpha,
    })
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        alpha.width,
        alpha.height,
        stream_data.len(),
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn named_refs(entries: &[(String, usize)]) -> String {
    let refs: Vec<String> = entries
        .iter()
        .map(|(resource, id)| format!("/{} {} 0 R", resource, id))
        .collect();
    format!("<< {} >>", refs.join(" "))
}

fn object_refs(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        DEFAULT_FONT.to_string()
    } else {
        out
    }
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn build_pdf(objects: Vec<String>, catalog_id: usize, info_id: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(PDF_HEADER);
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            catalog_id,
            info_id,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
    dropped: usize,
}

fn push_byte(out: &mut String, byte: u8) {
    match byte {
        b'\\' => out.push_str("\\\\"),
        b'(' => out.push_str("\\("),
        b')' => out.push_str("\\)"),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
        b => out.push(b as char),
    }
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut dropped = 0usize;
    for ch in input.chars() {
        // ASCII spellings for symbols outside WinAnsi.
        let substitute = match ch {
            '\u{20B9}' => Some("RS."),
            '\u{2265}' => Some(">="),
            '\u{2264}' => Some("<="),
            _ => None,
        };
        if let Some(text) = substitute {
            for byte in text.bytes() {
                push_byte(&mut out, byte);
            }
            replaced += 1;
            continue;
        }

        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            // Emoji and other glyphs the standard fonts lack are left out.
            _ => {
                dropped += 1;
                continue;
            }
        };
        push_byte(&mut out, byte);
    }

    WinAnsiEncoded {
        text: out,
        replaced,
        dropped,
    }
}

fn truncate_preview(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::pdfinspect::inspect_pdf_bytes;
    use crate::types::Size;
    use std::io::Cursor;
    use std::sync::Arc;

    fn png_bytes(alpha: u8) -> Arc<[u8]> {
        let img = image::RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, alpha]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        Arc::from(buf)
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    #[test]
    fn winansi_encoding_substitutes_rupee_and_drops_emoji() {
        let encoded = encode_winansi_pdf_string("\u{20B9}40,000 \u{1F697} (ok)");
        assert_eq!(encoded.text, "RS.40,000  \\(ok\\)");
        assert_eq!(encoded.replaced, 1);
        assert_eq!(encoded.dropped, 1);
        let encoded = encode_winansi_pdf_string("Model \u{2013} 2019");
        assert_eq!(encoded.text, "Model \\226 2019");
    }

    #[test]
    fn format_milli_trims_trailing_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-841_890), "-841.89");
        assert_eq!(format_milli(20_000), "20");
    }

    #[test]
    fn pages_text_and_links_are_written() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font("Helvetica-Bold", Pt::from_f32(14.0));
        canvas.draw_string(Pt::from_f32(20.0), Pt::from_f32(20.0), "VALUATION REPORT");
        canvas.link_area(
            Pt::from_f32(20.0),
            Pt::from_f32(20.0),
            Pt::from_f32(50.0),
            Pt::from_f32(10.0),
            "https://cdn.example/a.jpg",
        );
        canvas.show_page();
        canvas.draw_string(Pt::from_f32(20.0), Pt::from_f32(20.0), "Page 2 of 2");
        let document = canvas.finish();

        let bytes = document_to_pdf(&document, None).expect("pdf");
        let report = inspect_pdf_bytes(&bytes).expect("parses");
        assert_eq!(report.page_count, 2);
        assert!(contains(&bytes, "(VALUATION REPORT) Tj"));
        assert!(contains(&bytes, "/BaseFont /Helvetica-Bold"));
        assert!(contains(&bytes, "/URI (https://cdn.example/a.jpg)"));
        assert!(contains(&bytes, "20 807.89 Td"));
    }

    #[test]
    fn images_become_xobjects_with_soft_masks() {
        let mut canvas = Canvas::new(Size::a4());
        let opaque = canvas.register_image(&png_bytes(255));
        let translucent = canvas.register_image(&png_bytes(128));
        for id in [opaque, translucent] {
            canvas.draw_image(
                Pt::ZERO,
                Pt::ZERO,
                Pt::from_f32(40.0),
                Pt::from_f32(30.0),
                id,
            );
        }
        let bytes = document_to_pdf(&canvas.finish(), None).expect("pdf");
        assert!(inspect_pdf_bytes(&bytes).is_ok());
        assert!(contains(&bytes, "/Im1 Do"));
        assert!(contains(&bytes, "/Im2 Do"));
        assert!(contains(&bytes, "/SMask"));
    }

    #[test]
    fn undecodable_image_is_a_serialization_error() {
        let mut canvas = Canvas::new(Size::a4());
        let id = canvas.register_image(&Arc::from(b"GIF89a-not-really".to_vec()));
        canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(1.0), Pt::from_f32(1.0), id);
        let err = document_to_pdf(&canvas.finish(), None).expect_err("bad image");
        assert!(matches!(err, ReportError::Serialization(_)));
    }

    #[test]
    fn identical_documents_serialize_identically() {
        let build = || {
            let mut canvas = Canvas::new(Size::a4());
            let id = canvas.register_image(&png_bytes(255));
            canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(8.0), Pt::from_f32(6.0), id);
            canvas.set_fill_color(Color::hex(0x1976D2));
            canvas.draw_rect(Pt::ZERO, Pt::ZERO, Pt::from_f32(5.0), Pt::from_f32(5.0));
            document_to_pdf(&canvas.finish(), None).expect("pdf")
        };
        assert_eq!(build(), build());
    }
}
