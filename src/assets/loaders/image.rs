use super::{DecodedAsset, LoadRequest, ResourceLoader, spawn_load};
use crate::assets::io::{AssetReaderVariant, read_asset};
use crate::errors::{Error, Result};
use crate::resources::Image;

/// Loads a PNG, JPEG or GIF file as a 2D texture.
///
/// Rows are flipped so that the first row in memory is the bottom of the
/// picture, matching texture coordinates with `v = 0` at the bottom.
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    pub flip_y: bool,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self { flip_y: true }
    }
}

impl ResourceLoader for ImageLoader {
    fn load(&self, path: &str, request: LoadRequest) {
        let path = path.to_string();
        let flip_y = self.flip_y;
        spawn_load(request, async move {
            let bytes = read_asset(&path).await?;
            let label = AssetReaderVariant::source_filename(&path).to_string();
            let image = decode_image_async(bytes, label, flip_y).await?;
            Ok::<_, Error>(DecodedAsset::Image(image))
        });
    }
}

/// Decodes on the blocking thread pool.
pub(super) async fn decode_image_async(bytes: Vec<u8>, label: String, flip_y: bool) -> Result<Image> {
    tokio::task::spawn_blocking(move || decode_image(&bytes, &label, flip_y)).await?
}

/// Decodes any supported format into RGBA8.
pub(super) fn decode_image(bytes: &[u8], label: &str, flip_y: bool) -> Result<Image> {
    let img = ::image::load_from_memory(bytes)?;
    let img = if flip_y { img.flipv() } else { img };
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Decoded image {label} ({width}x{height})");
    Ok(Image::rgba8(Some(label), width, height, rgba.into_raw()))
}
