use std::fmt;

use crate::gpu::{DeviceRef, TextureId, TextureTarget, UniformValue};
use crate::resources::image::Image;

/// GPU texture owned exclusively by this value.
///
/// The texture object is deleted when the `Texture` is dropped.
pub struct Texture {
    device: DeviceRef,
    id: TextureId,
    target: TextureTarget,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads a single-layer image as a mipmapped 2D texture.
    #[must_use]
    pub fn new_2d(device: DeviceRef, image: &Image) -> Self {
        Self::upload(device, TextureTarget::D2, image, true)
    }

    /// Uploads a 6-layer image as a cube map without mipmaps.
    #[must_use]
    pub fn new_cube(device: DeviceRef, image: &Image) -> Self {
        Self::upload(device, TextureTarget::Cube, image, false)
    }

    fn upload(
        device: DeviceRef,
        target: TextureTarget,
        image: &Image,
        generate_mipmaps: bool,
    ) -> Self {
        let id = device.create_texture(target, image, generate_mipmaps);
        log::debug!(
            "Uploaded {target:?} texture '{}' ({}x{}x{})",
            image.label(),
            image.width,
            image.height,
            image.layers
        );
        Self {
            device,
            id,
            target,
            width: image.width,
            height: image.height,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TextureTarget {
        self.target
    }
}

impl From<&Texture> for UniformValue {
    fn from(texture: &Texture) -> Self {
        UniformValue::Texture(Some(texture.id))
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.device.delete_texture(self.id);
    }
}
