use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{window, Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use crate::config::EXPORT_VERSION;
use crate::models::{AppSettings, ChatSession};

/// Versioned backup of one user's chats plus the global settings.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub user_id: String,
    pub chats: Vec<ChatSession>,
    pub settings: AppSettings,
}

impl ExportBundle {
    pub fn new(user_id: impl Into<String>, chats: Vec<ChatSession>, settings: AppSettings) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            user_id: user_id.into(),
            chats,
            settings,
        }
    }

    pub fn file_name(&self) -> String {
        format!("nexus_backup_{}.json", self.user_id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn js_err(e: JsValue) -> anyhow::Error {
    anyhow!("export download: {:?}", e)
}

/// Offers the bundle as a file download.
pub fn download(bundle: &ExportBundle) -> Result<()> {
    let json = bundle.to_json()?;
    let parts = js_sys::Array::of1(&JsValue::from_str(&json));
    let options = BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options).map_err(js_err)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(js_err)?;

    let document = window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow!("no document"))?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| anyhow!("anchor element cast failed"))?;
    anchor.set_href(&url);
    anchor.set_download(&bundle.file_name());
    anchor.click();
    Url::revoke_object_url(&url).map_err(js_err)?;
    tracing::info!(chats = bundle.chats.len(), file = %bundle.file_name(), "exported backup");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    #[test]
    fn bundle_shape_and_file_name() {
        let mut chat = ChatSession::new("u42", "Hello");
        chat.messages.push(Message::user("Hello", None));
        let bundle = ExportBundle::new("u42", vec![chat.clone()], AppSettings::default());

        assert_eq!(bundle.file_name(), "nexus_backup_u42.json");
        let json: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();
        assert_eq!(json["version"], EXPORT_VERSION);
        assert_eq!(json["userId"], "u42");
        assert_eq!(json["chats"][0]["id"], chat.id.as_str());
        assert_eq!(json["settings"]["creativeLevel"], "Balanced");

        let parsed: ExportBundle = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, bundle);
    }
}
