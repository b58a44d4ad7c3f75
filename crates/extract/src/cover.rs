//! Cover Selection and Thumbnailing
//!
//! The cover of a comic archive is taken to be its first page image in byte
//! order, which matches how every mainstream reader sorts pages. Selected
//! covers are downscaled to a bounded JPEG so records stay small enough to
//! store inline.

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};

/// Bounding box for stored thumbnails. Aspect ratio is preserved and images
/// already inside the box are never enlarged.
pub const MAX_WIDTH: u32 = 300;
pub const MAX_HEIGHT: u32 = 450;
const JPEG_QUALITY: u8 = 85;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// A processed cover ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Picks the entry to use as the cover: the byte-lexicographically first
/// entry that looks like a page image. Returns `None` for image-free
/// archives.
pub fn select_entry(entries: &[String]) -> Option<&str> {
    entries
        .iter()
        .filter(|name| is_page_image(name))
        .min_by(|a, b| a.as_bytes().cmp(b.as_bytes()))
        .map(String::as_str)
}

/// Recognizes page images by extension, excluding directories and hidden
/// files such as `.DS_Store` or `__MACOSX` resource forks' dot-entries.
fn is_page_image(name: &str) -> bool {
    if name.ends_with('/') {
        return false;
    }
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if basename.starts_with('.') {
        return false;
    }
    extension_of(basename)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Decodes `raw`, scales it into the thumbnail box, and re-encodes as JPEG.
///
/// Undecodable images fall through to the raw bytes with a MIME type guessed
/// from the entry name, so a cover is still stored even when the codec balks.
pub fn process(raw: Vec<u8>, entry_name: &str) -> Cover {
    match image::load_from_memory(&raw) {
        Ok(decoded) => {
            // Images already inside the box are re-encoded at their original
            // size; `thumbnail` alone would scale them up to fill it.
            let thumbnail = if decoded.width() <= MAX_WIDTH && decoded.height() <= MAX_HEIGHT {
                decoded.to_rgb8()
            } else {
                decoded.thumbnail(MAX_WIDTH, MAX_HEIGHT).to_rgb8()
            };
            let mut encoded = Vec::new();
            let result = {
                let mut encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
                encoder.encode_image(&thumbnail)
            };
            match result {
                Ok(()) => {
                    debug!(
                        entry = entry_name,
                        width = thumbnail.width(),
                        height = thumbnail.height(),
                        "thumbnailed cover",
                    );
                    Cover {
                        bytes: encoded,
                        mime: "image/jpeg".to_owned(),
                    }
                }
                Err(error) => {
                    warn!(entry = entry_name, %error, "cover re-encode failed, storing original");
                    Cover {
                        bytes: raw,
                        mime: guess_mime(entry_name),
                    }
                }
            }
        }
        Err(error) => {
            warn!(entry = entry_name, %error, "cover decode failed, storing original");
            Cover {
                bytes: raw,
                mime: guess_mime(entry_name),
            }
        }
    }
}

fn guess_mime(entry_name: &str) -> String {
    let basename = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);
    match extension_of(basename).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn picks_byte_order_first_image() {
        // Uppercase sorts before lowercase in byte order.
        let entries = names(&["img002.jpg", "cover.gif", "IMG001.PNG", "info.txt"]);
        assert_eq!(select_entry(&entries), Some("IMG001.PNG"));
    }

    #[rstest]
    #[case(&["ComicInfo.xml", "readme.txt"])]
    #[case(&["pages/", ".hidden.jpg", "art/.DS_Store"])]
    #[case(&[])]
    fn no_candidate_in_imageless_archives(#[case] list: &[&str]) {
        assert_eq!(select_entry(&names(list)), None);
    }

    #[test]
    fn nested_and_dotted_basenames() {
        let entries = names(&["vol1/.thumb.jpg", "vol1/page01.JPEG"]);
        assert_eq!(select_entry(&entries), Some("vol1/page01.JPEG"));
    }

    #[test]
    fn undecodable_bytes_pass_through_with_guessed_mime() {
        let raw = vec![0x00, 0x01, 0x02, 0x03];
        let cover = process(raw.clone(), "pages/broken.png");
        assert_eq!(cover.bytes, raw);
        assert_eq!(cover.mime, "image/png");
        let cover = process(raw.clone(), "mystery");
        assert_eq!(cover.mime, "application/octet-stream");
    }

    #[test]
    fn oversized_image_is_bounded() {
        let big = image::DynamicImage::new_rgb8(900, 900);
        let mut raw = Vec::new();
        big.write_to(&mut std::io::Cursor::new(&mut raw), image::ImageFormat::Png)
            .unwrap();
        let cover = process(raw, "page.png");
        assert_eq!(cover.mime, "image/jpeg");
        let decoded = image::load_from_memory(&cover.bytes).unwrap();
        assert!(decoded.width() <= MAX_WIDTH);
        assert!(decoded.height() <= MAX_HEIGHT);
    }

    #[test]
    fn small_image_is_not_enlarged() {
        let tiny = image::DynamicImage::new_rgb8(10, 15);
        let mut raw = Vec::new();
        tiny.write_to(&mut std::io::Cursor::new(&mut raw), image::ImageFormat::Png)
            .unwrap();
        let cover = process(raw, "page.png");
        let decoded = image::load_from_memory(&cover.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 15));
    }
}
