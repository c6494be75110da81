use super::image::decode_image_async;
use super::{DecodedAsset, LoadRequest, ResourceLoader, spawn_load};
use crate::assets::io::{AssetReaderVariant, read_asset};
use crate::errors::{AssetError, Error, Result};
use crate::resources::Image;

/// Placeholder in a cube map file name, replaced by each face name.
pub const CUBE_MAP_TOKEN: &str = "<CubeMap>";

/// Face names in layer order.
pub const CUBE_FACES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

const CUBE_SUFFIX: &str = "|cube";

/// Loads six face images into one cube map.
///
/// Registered for extensions like `jpg|cube`: `sky_<CubeMap>.jpg|cube` loads
/// `sky_posx.jpg`, `sky_negx.jpg` and so on. All faces are fetched
/// concurrently and must share the same size.
#[derive(Debug, Default, Clone, Copy)]
pub struct CubeMapLoader;

impl CubeMapLoader {
    /// Paths of the six faces, in layer order.
    #[must_use]
    pub fn face_paths(path: &str) -> [String; 6] {
        let base = path.strip_suffix(CUBE_SUFFIX).unwrap_or(path);
        CUBE_FACES.map(|face| base.replace(CUBE_MAP_TOKEN, face))
    }
}

impl ResourceLoader for CubeMapLoader {
    fn load(&self, path: &str, request: LoadRequest) {
        let faces = Self::face_paths(path);
        spawn_load(request, async move {
            let image = load_faces(faces).await?;
            Ok::<_, Error>(DecodedAsset::CubeMap(image))
        });
    }
}

async fn load_faces(faces: [String; 6]) -> Result<Image> {
    let futures = faces.into_iter().map(|face| async move {
        let bytes = read_asset(&face).await?;
        let label = AssetReaderVariant::source_filename(&face).to_string();
        decode_image_async(bytes, label, false).await
    });
    let images = futures::future::try_join_all(futures).await?;
    combine_faces(&images)
}

/// Stacks six equally sized faces into a six-layer image.
pub(super) fn combine_faces(images: &[Image]) -> Result<Image> {
    let Some(first) = images.first() else {
        return Err(AssetError::InvalidData("Cube map has no faces".to_string()).into());
    };
    let (width, height) = (first.width, first.height);
    if images
        .iter()
        .any(|img| img.width != width || img.height != height)
    {
        return Err(AssetError::InvalidData(
            "Cube map images must have same dimensions".to_string(),
        )
        .into());
    }

    let mut combined_data = Vec::with_capacity(first.data.len() * images.len());
    for img in images {
        combined_data.extend_from_slice(&img.data);
    }

    Ok(Image::new(
        Some("CubeMap"),
        width,
        height,
        images.len() as u32,
        first.format,
        combined_data,
    ))
}
