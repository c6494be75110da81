use super::{DecodedAsset, LoadRequest, ResourceLoader, spawn_load};
use crate::assets::io::read_asset;
use crate::errors::Error;
use crate::resources::ModelDescription;

/// Loads a JSON model description.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelLoader;

impl ResourceLoader for ModelLoader {
    fn load(&self, path: &str, request: LoadRequest) {
        let path = path.to_string();
        spawn_load(request, async move {
            let bytes = read_asset(&path).await?;
            let description: ModelDescription = serde_json::from_slice(&bytes)?;
            log::debug!("{path}: {} objects", description.objs.len());
            Ok::<_, Error>(DecodedAsset::Model(description))
        });
    }
}
