use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::{self, StreamExt};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, Luma};

use crate::config::OcrConfig;
use crate::error::{Result, ScanError};
use crate::models::{ImageVariant, Recipe};

/// Recipes applied to every upload, in output order.
pub const RECIPES: [Recipe; 7] = [
    Recipe::Grayscale,
    Recipe::Normalized,
    Recipe::Sharpened,
    Recipe::Gamma,
    Recipe::DenoisedContrast,
    Recipe::Binarized,
    Recipe::Inverted,
];

const GAMMA: f32 = 0.6;
const UNSHARPEN_SIGMA: f32 = 1.0;
const UNSHARPEN_THRESHOLD: i32 = 4;
const DENOISE_SIGMA: f32 = 0.8;
const CONTRAST_BOOST: f32 = 35.0;

/// Turns an uploaded image into the ordered set of recognition variants.
#[async_trait]
pub trait ImagePreprocessor: Send + Sync {
    async fn preprocess(&self, bytes: Bytes) -> Result<Vec<ImageVariant>>;
}

/// Production preprocessor backed by the `image` crate.
///
/// The upload is decoded once; recipes then run on the blocking pool,
/// at most `config.concurrency` at a time.
#[derive(Debug, Clone)]
pub struct VariantPreprocessor {
    config: OcrConfig,
}

impl VariantPreprocessor {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ImagePreprocessor for VariantPreprocessor {
    async fn preprocess(&self, bytes: Bytes) -> Result<Vec<ImageVariant>> {
        let config = self.config.clone();
        let base = tokio::task::spawn_blocking(move || prepare_base(&bytes, &config))
            .await
            .map_err(|e| ScanError::Internal(format!("Preprocessing task panicked: {e}")))??;
        let base = Arc::new(base);

        let rendered = stream::iter(RECIPES.into_iter().enumerate())
            .map(|(id, recipe)| {
                let base = Arc::clone(&base);
                tokio::task::spawn_blocking(move || render_variant(id, recipe, &base))
            })
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        rendered
            .into_iter()
            .map(|joined| {
                joined
                    .map_err(|e| ScanError::Internal(format!("Variant task panicked: {e}")))
                    .and_then(|variant| variant)
            })
            .collect()
    }
}

/// Sequential variant generation, same output as [`VariantPreprocessor`].
pub fn build_variants(bytes: &[u8], config: &OcrConfig) -> Result<Vec<ImageVariant>> {
    let base = prepare_base(bytes, config)?;
    RECIPES
        .into_iter()
        .enumerate()
        .map(|(id, recipe)| render_variant(id, recipe, &base))
        .collect()
}

/// Decode, validate and reduce the upload to the grayscale base every
/// recipe starts from.
fn prepare_base(bytes: &[u8], config: &OcrConfig) -> Result<GrayImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ScanError::ImageDecode(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| ScanError::ImageDecode(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(ScanError::ImageDecode(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_to_canonical(img, config.canonical_width, config.max_image_dimension);
    Ok(flatten_alpha(img).to_luma8())
}

fn render_variant(id: usize, recipe: Recipe, base: &GrayImage) -> Result<ImageVariant> {
    let img = apply_recipe(recipe, base);

    let mut data = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| ScanError::Internal(format!("Failed to encode {recipe} variant: {e}")))?;

    Ok(ImageVariant { id, recipe, data })
}

pub(crate) fn apply_recipe(recipe: Recipe, base: &GrayImage) -> GrayImage {
    match recipe {
        Recipe::Grayscale => base.clone(),
        Recipe::Normalized => stretch_contrast(base),
        Recipe::Sharpened => {
            imageops::unsharpen(&stretch_contrast(base), UNSHARPEN_SIGMA, UNSHARPEN_THRESHOLD)
        }
        Recipe::Gamma => apply_gamma(&stretch_contrast(base), GAMMA),
        Recipe::DenoisedContrast => {
            imageops::contrast(&imageops::blur(base, DENOISE_SIGMA), CONTRAST_BOOST)
        }
        Recipe::Binarized => binarize(&stretch_contrast(base)),
        Recipe::Inverted => {
            let mut img = binarize(&stretch_contrast(base));
            imageops::invert(&mut img);
            img
        }
    }
}

/// Scale to the canonical width (up or down), keeping aspect ratio and
/// never exceeding `max_dim` on either side.
fn resize_to_canonical(img: DynamicImage, canonical_width: u32, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    let mut ratio = if canonical_width > 0 {
        canonical_width as f32 / width as f32
    } else {
        1.0
    };

    let longest = (width.max(height) as f32) * ratio;
    if longest > max_dim as f32 {
        ratio = max_dim as f32 / width.max(height) as f32;
    }

    let new_width = ((width as f32 * ratio).round() as u32).max(1);
    let new_height = ((height as f32 * ratio).round() as u32).max(1);

    if new_width == width && new_height == height {
        return img;
    }

    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Composite transparent pixels onto white. Label cut-outs are usually
/// dark text on a transparent background, which would otherwise turn black.
fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    fn over_white(channel: u8, alpha: u8) -> u8 {
        let a = alpha as u32;
        ((channel as u32 * a + 255 * (255 - a)) / 255) as u8
    }

    match img {
        DynamicImage::ImageRgba8(rgba) => {
            DynamicImage::ImageRgb8(image::RgbImage::from_fn(
                rgba.width(),
                rgba.height(),
                |x, y| {
                    let p = rgba.get_pixel(x, y);
                    image::Rgb([
                        over_white(p[0], p[3]),
                        over_white(p[1], p[3]),
                        over_white(p[2], p[3]),
                    ])
                },
            ))
        }
        DynamicImage::ImageLumaA8(luma_a) => DynamicImage::ImageLuma8(GrayImage::from_fn(
            luma_a.width(),
            luma_a.height(),
            |x, y| {
                let p = luma_a.get_pixel(x, y);
                Luma([over_white(p[0], p[1])])
            },
        )),
        _ => img,
    }
}

/// Histogram stretch: darkest pixel to 0, lightest to 255.
fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray.clone();
    }

    let range = (max_val - min_val) as f32;
    map_pixels(gray, |v| (((v - min_val) as f32 / range) * 255.0).round() as u8)
}

fn apply_gamma(gray: &GrayImage, gamma: f32) -> GrayImage {
    let lut: Vec<u8> = (0..=255u32)
        .map(|v| ((v as f32 / 255.0).powf(gamma) * 255.0).round() as u8)
        .collect();
    map_pixels(gray, |v| lut[v as usize])
}

fn binarize(gray: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(gray);
    map_pixels(gray, |v| if v > threshold { 255 } else { 0 })
}

/// Otsu's method: the threshold maximizing between-class variance.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 127;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0f64;

    for (t, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += t as f64 * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_weight as f64;
        let diff = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

fn map_pixels(gray: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([f(gray.get_pixel(x, y)[0])])
    })
}
