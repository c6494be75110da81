use super::{DecodedAsset, LoadRequest, ResourceLoader, spawn_load};
use crate::assets::io::read_asset_text;
use crate::errors::Error;

/// Loads a combined GLSL source file.
///
/// Both stages live in one file, selected by `#ifdef VERTEX_SHADER` and
/// `#ifdef FRAGMENT_SHADER`. Compilation and linking happen when the manager
/// realizes the source; a failure there logs the info log and resolves the
/// resource without a payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaderLoader;

impl ResourceLoader for ShaderLoader {
    fn load(&self, path: &str, request: LoadRequest) {
        let path = path.to_string();
        spawn_load(request, async move {
            let source = read_asset_text(&path).await?;
            Ok::<_, Error>(DecodedAsset::ShaderSource(source))
        });
    }
}
