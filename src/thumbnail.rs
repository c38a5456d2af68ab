use eframe::egui::ColorImage;

/// Longest edge of the preview shown next to the title
const MAX_EDGE: u32 = 160;

/// Downloads the thumbnail the extractor reported and scales it for the title row.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    let bytes = match reqwest::blocking::get(url).and_then(|r| r.error_for_status()).and_then(|r| r.bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("thumbnail {url} unavailable: {e}");
            return None;
        }
    };
    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img.thumbnail(MAX_EDGE, MAX_EDGE).to_rgba8(),
        Err(e) => {
            tracing::debug!("thumbnail {url} could not be decoded: {e}");
            return None;
        }
    };
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
