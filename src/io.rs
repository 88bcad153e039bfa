// ============================================================================
// IMAGE I/O — decode input files to RGBA, encode the working buffer back out
// ============================================================================

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Supported output formats for the headless CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tiff,
}

impl SaveFormat {
    /// Parse a format name (`png`, `jpeg`/`jpg`, …). `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    /// Infer from a path's extension; PNG when there is none or it is
    /// unknown (the source editor's save path is always a PNG download).
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
            .unwrap_or_default()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tiff => "tiff",
        }
    }
}

/// TIFF compression mode for `encode_and_write`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TiffCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

/// Error type for save operations.
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Encode(String),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {}", e),
            SaveError::Encode(e) => write!(f, "Encode error: {}", e),
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<ImageError> for SaveError {
    fn from(e: ImageError) -> Self {
        SaveError::Encode(e.to_string())
    }
}

/// Decode any supported image file to RGBA. Format decoding beyond this point
/// is out of the engine's hands — everything downstream sees only the raster.
pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    let img = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(format!("'{}' decoded to an empty image", path.display()));
    }
    Ok(img)
}

/// Encode and write an image to a file. Standalone so batch workers can call
/// it without shared state.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
    tiff_compression: TiffCompression,
) -> Result<(), SaveError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel; drop it.
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Webp => {
            let dyn_img = DynamicImage::ImageRgba8(image.clone());
            dyn_img.save(path)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tiff => {
            let err_map =
                |e: tiff::TiffError| SaveError::Encode(format!("TIFF encode error: {}", e));
            let mut tiff_enc = tiff::encoder::TiffEncoder::new(&mut writer).map_err(err_map)?;
            match tiff_compression {
                TiffCompression::None => {
                    tiff_enc
                        .write_image::<tiff::encoder::colortype::RGBA8>(
                            image.width(),
                            image.height(),
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
                TiffCompression::Lzw => {
                    tiff_enc
                        .write_image_with_compression::<tiff::encoder::colortype::RGBA8, _>(
                            image.width(),
                            image.height(),
                            tiff::encoder::compression::Lzw,
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
                TiffCompression::Deflate => {
                    tiff_enc
                        .write_image_with_compression::<tiff::encoder::colortype::RGBA8, _>(
                            image.width(),
                            image.height(),
                            tiff::encoder::compression::Deflate::default(),
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("instaedit_io_{}_{}", std::process::id(), name))
    }

    #[test]
    fn format_from_name_and_path() {
        assert_eq!(SaveFormat::from_name("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_name("exr"), None);
        assert_eq!(SaveFormat::from_path(Path::new("a/b/out.tif")), SaveFormat::Tiff);
        assert_eq!(SaveFormat::from_path(Path::new("noext")), SaveFormat::Png);
    }

    #[test]
    fn png_roundtrip_preserves_pixels() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([9, 120, 200, 255]));
        let path = temp_path("roundtrip.png");
        encode_and_write(&img, &path, SaveFormat::Png, 90, TiffCompression::None).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(img, back);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file_reports_error() {
        let err = load_image(Path::new("/definitely/not/here.png"));
        assert!(err.is_err());
    }
}
