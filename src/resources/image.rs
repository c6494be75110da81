use std::borrow::Cow;

/// CPU-side pixel data waiting to be uploaded.
///
/// `layers` is 1 for 2D images and 6 for cube maps, whose faces are stored
/// back to back in `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    label: Cow<'static, str>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub format: wgpu::TextureFormat,
    pub data: Vec<u8>,
}

impl Image {
    #[must_use]
    pub fn new(
        label: Option<&str>,
        width: u32,
        height: u32,
        layers: u32,
        format: wgpu::TextureFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            label: label.map_or(Cow::Borrowed("Unnamed Image"), |s| Cow::Owned(s.to_string())),
            width,
            height,
            layers,
            format,
            data,
        }
    }

    /// Single-layer RGBA8 image.
    #[must_use]
    pub fn rgba8(label: Option<&str>, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(label, width, height, 1, wgpu::TextureFormat::Rgba8Unorm, data)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size of one layer in bytes.
    #[must_use]
    pub fn layer_size(&self) -> usize {
        let bytes_per_pixel = self.format.block_copy_size(None).unwrap_or(4) as usize;
        self.width as usize * self.height as usize * bytes_per_pixel
    }

    /// Pixel bytes of one layer, if present.
    #[must_use]
    pub fn layer(&self, index: u32) -> Option<&[u8]> {
        let size = self.layer_size();
        let start = index as usize * size;
        self.data.get(start..start + size)
    }
}
