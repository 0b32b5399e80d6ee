//! Asset and Project Storage
//!
//! Project documents and their assets live with the host (`DocumentService`,
//! `AssetService`). Asset bytes cross the bridge as base64 text.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bridge_traits::{BridgeError, ServiceMethod};
use bytes::Bytes;
use core_bridge::{BridgeContext, BridgeTransport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

fn asset_method(name: &str) -> ServiceMethod {
    ServiceMethod::join("AssetService", name)
}

fn document_method(name: &str) -> ServiceMethod {
    ServiceMethod::join("DocumentService", name)
}

/// Identifies an asset the way the host indexes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetKey {
    pub asset_type: String,
    pub asset_id: String,
    pub data_format: String,
}

impl AssetKey {
    pub fn new(
        asset_type: impl Into<String>,
        asset_id: impl Into<String>,
        data_format: impl Into<String>,
    ) -> Self {
        Self {
            asset_type: asset_type.into(),
            asset_id: asset_id.into(),
            data_format: data_format.into(),
        }
    }

    /// `<id>.<format>`, the name assets are saved under.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.asset_id, self.data_format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub key: AssetKey,
    pub data: Bytes,
}

/// Host-backed asset storage.
#[derive(Clone)]
pub struct AssetStore {
    transport: BridgeTransport,
}

impl AssetStore {
    pub fn new(context: &BridgeContext) -> Self {
        Self {
            transport: context.transport().clone(),
        }
    }

    /// Load an asset bundled with or saved by the host.
    ///
    /// # Errors
    ///
    /// - `AssetNotFound` if the host has no such asset
    /// - `Bridge(Decode)` if the data is not valid base64
    pub async fn load(&self, key: AssetKey) -> Result<Asset> {
        let payload = serde_json::to_value(&key).map_err(BridgeError::from)?;
        let response = self.transport.call(asset_method("load"), Some(payload)).await?;

        let encoded = match response {
            Value::String(text) if !text.is_empty() && text != "null" => text,
            Value::Null | Value::String(_) | Value::Bool(false) => {
                return Err(AdapterError::AssetNotFound {
                    asset_id: key.asset_id,
                })
            }
            other => {
                return Err(BridgeError::decode(format!(
                    "asset {} must be base64 text, got {}",
                    key.asset_id, other
                ))
                .into())
            }
        };

        let data = BASE64.decode(encoded.trim()).map_err(|e| {
            BridgeError::decode(format!("asset {} is not valid base64: {}", key.asset_id, e))
        })?;
        debug!(asset = %key.file_name(), bytes = data.len(), "Asset loaded");

        Ok(Asset {
            key,
            data: Bytes::from(data),
        })
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let response = self
            .transport
            .call(asset_method("exists"), Some(Value::String(name.to_string())))
            .await?;
        Ok(is_affirmative(&response))
    }

    pub async fn save(&self, asset: &Asset) -> Result<()> {
        let name = asset.key.file_name();
        self.transport
            .call(
                asset_method("save"),
                Some(json!({ "name": name, "data": BASE64.encode(&asset.data) })),
            )
            .await?;
        debug!(asset = %name, "Asset saved");
        Ok(())
    }

    /// Tell the host which saved assets are still referenced.
    pub async fn preserve(&self, names: &[String]) -> Result<()> {
        self.transport
            .call(asset_method("preserve"), Some(json!(names)))
            .await?;
        Ok(())
    }
}

/// Host-backed project document.
pub struct ProjectStore {
    transport: BridgeTransport,
    assets: AssetStore,
}

impl ProjectStore {
    pub fn new(context: &BridgeContext) -> Self {
        Self {
            transport: context.transport().clone(),
            assets: AssetStore::new(context),
        }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// The project the host opened us with, if any.
    pub async fn load_project(&self) -> Result<Option<Value>> {
        let project: Value = self
            .transport
            .call_json(document_method("loadProject"), None)
            .await?;
        Ok(match project {
            Value::Null => None,
            project => Some(project),
        })
    }

    /// Upload assets the host lacks, mark the full set as preserved, save
    /// the project and close the document.
    ///
    /// Stops at the first failure; the document stays open in that case.
    /// Releasing the camera before leaving the project is the caller's job
    /// (`VideoProvider::disable_video`); this only talks to `AssetService`
    /// and `DocumentService`.
    pub async fn save_and_close(&self, project: Value, assets: &[Asset]) -> Result<()> {
        let mut names = Vec::with_capacity(assets.len());
        let mut uploaded = 0usize;

        for asset in assets {
            let name = asset.key.file_name();
            if !self.assets.exists(&name).await? {
                self.assets.save(asset).await?;
                uploaded += 1;
            }
            names.push(name);
        }

        self.assets.preserve(&names).await?;
        self.transport
            .call(document_method("save"), Some(project))
            .await?;
        info!(assets = names.len(), uploaded, "Project saved");

        self.close();
        Ok(())
    }

    pub fn close(&self) {
        self.transport.run(document_method("close"), None);
    }
}

fn is_affirmative(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.trim(), "" | "false" | "0" | "null"),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key_wire_shape() {
        let key = AssetKey::new("ImageBitmap", "abc123", "png");
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            json!({"assetType": "ImageBitmap", "assetId": "abc123", "dataFormat": "png"})
        );
        assert_eq!(key.file_name(), "abc123.png");
    }

    #[test]
    fn test_exists_answers() {
        assert!(is_affirmative(&json!(true)));
        assert!(is_affirmative(&json!("true")));
        assert!(is_affirmative(&json!(1)));
        assert!(!is_affirmative(&json!(false)));
        assert!(!is_affirmative(&json!("false")));
        assert!(!is_affirmative(&Value::Null));
    }
}
