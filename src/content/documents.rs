//! Normalization boundary for CMS documents.
//!
//! Raw documents arrive as `serde_json::Value` with an arbitrary subset of
//! fields present. Every accessor here validates the shape and falls back,
//! so the rest of the crate only sees fully-populated structs.
//!
//! Expected shapes (all fields optional):
//!
//! ```text
//! collection:  { id, uid, data: { title, short_description, order,
//!                images: [ { asset: { id, uid, type, link_type } } ] } }
//! image_asset: { id, uid, data: { image: { url, alt, dimensions: { width, height } },
//!                caption, credits, order } }
//! ```
//!
//! Text fields may be plain strings or rich-text arrays (`[{ "text": ... }]`).

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Flatten a plain string or a rich-text node array to trimmed text.
///
/// Rich-text nodes contribute their `text` (non-strings count as empty) and
/// are joined with newlines. Empty results become `None`.
pub fn to_plain_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(nodes) => nodes
            .iter()
            .map(|node| node.get("text").and_then(Value::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Accept finite numbers and numeric-looking strings.
pub fn to_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Positive pixel dimension, rounded.
fn to_dimension(value: &Value) -> Option<u32> {
    to_numeric(value)
        .map(f64::round)
        .filter(|&f| f >= 1.0 && f <= u32::MAX as f64)
        .map(|f| f as u32)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

fn path<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter().fold(value, |v, key| v.get(key).unwrap_or(&Value::Null))
}

/// A content relationship pointing (hopefully) at an image asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetLink {
    pub id: Option<String>,
    pub uid: Option<String>,
    pub doc_type: Option<String>,
    pub link_type: Option<String>,
}

impl AssetLink {
    fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Self {
            id: string_field(value, "id"),
            uid: string_field(value, "uid"),
            doc_type: string_field(value, "type"),
            link_type: string_field(value, "link_type"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionDocument {
    pub id: String,
    pub uid: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<f64>,
    /// One slot per group item; `None` where the item has no relationship.
    pub references: Vec<Option<AssetLink>>,
}

impl CollectionDocument {
    pub fn from_value(value: &Value) -> Self {
        let data = path(value, &["data"]);
        let references = data
            .get("images")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| AssetLink::from_value(path(item, &["asset"])))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: string_field(value, "id").unwrap_or_default(),
            uid: string_field(value, "uid"),
            title: to_plain_text(path(data, &["title"])),
            description: to_plain_text(path(data, &["short_description"])),
            order: to_numeric(path(data, &["order"])),
            references,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAssetDocument {
    pub id: String,
    pub uid: Option<String>,
    pub url: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub caption: Option<String>,
    pub credits: Option<String>,
    pub order: Option<f64>,
}

impl ImageAssetDocument {
    pub fn from_value(value: &Value) -> Self {
        let data = path(value, &["data"]);
        let image = path(data, &["image"]);
        Self {
            id: string_field(value, "id").unwrap_or_default(),
            uid: string_field(value, "uid"),
            url: image
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            alt: to_plain_text(path(image, &["alt"])),
            width: to_dimension(path(image, &["dimensions", "width"])),
            height: to_dimension(path(image, &["dimensions", "height"])),
            caption: to_plain_text(path(data, &["caption"])),
            credits: to_plain_text(path(data, &["credits"])),
            order: to_numeric(path(data, &["order"])),
        }
    }
}

/// Why a collection's image reference was left out of the manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingRelationship,
    WrongLinkType(String),
    WrongDocumentType(String),
    Unresolved,
    MissingUrl { document_id: String },
    SourceNotFound { url: String },
    NoVariants { document_id: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingRelationship => write!(f, "no linked asset"),
            SkipReason::WrongLinkType(t) => write!(f, "link type {t} is not a document"),
            SkipReason::WrongDocumentType(t) => write!(f, "linked document has type {t}"),
            SkipReason::Unresolved => write!(f, "linked image asset not found"),
            SkipReason::MissingUrl { document_id } => {
                write!(f, "image asset {document_id} has no image URL")
            }
            SkipReason::SourceNotFound { url } => write!(f, "source image {url} not found"),
            SkipReason::NoVariants { document_id } => {
                write!(f, "no variants could be generated for {document_id}")
            }
        }
    }
}

/// A reference that resolved to an image asset with a usable source URL.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAsset<'a> {
    pub document: &'a ImageAssetDocument,
    pub url: &'a str,
}

/// Image assets indexed by id and by uid, built once per run.
#[derive(Debug)]
pub struct AssetIndex<'a> {
    by_id: HashMap<&'a str, &'a ImageAssetDocument>,
    by_uid: HashMap<&'a str, &'a ImageAssetDocument>,
}

impl<'a> AssetIndex<'a> {
    pub fn new(assets: &'a [ImageAssetDocument]) -> Self {
        let mut by_id = HashMap::with_capacity(assets.len());
        let mut by_uid = HashMap::new();
        for asset in assets {
            by_id.insert(asset.id.as_str(), asset);
            if let Some(uid) = asset.uid.as_deref().filter(|u| !u.is_empty()) {
                by_uid.insert(uid, asset);
            }
        }
        Self { by_id, by_uid }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve one reference: check link and document type, look up by id
    /// then uid, and require a source URL.
    pub fn resolve(
        &self,
        link: Option<&AssetLink>,
        image_type: &str,
    ) -> Result<ResolvedAsset<'a>, SkipReason> {
        let link = link.ok_or(SkipReason::MissingRelationship)?;
        match link.link_type.as_deref() {
            Some(lt) if !lt.is_empty() && lt != "Document" => {
                return Err(SkipReason::WrongLinkType(lt.to_string()));
            }
            _ => {}
        }
        match link.doc_type.as_deref() {
            Some(t) if !t.is_empty() && t != image_type => {
                return Err(SkipReason::WrongDocumentType(t.to_string()));
            }
            _ => {}
        }

        let document = link
            .id
            .as_deref()
            .and_then(|id| self.by_id.get(id))
            .or_else(|| link.uid.as_deref().and_then(|uid| self.by_uid.get(uid)))
            .copied()
            .ok_or(SkipReason::Unresolved)?;

        let url = document
            .url
            .as_deref()
            .ok_or_else(|| SkipReason::MissingUrl {
                document_id: document.id.clone(),
            })?;
        Ok(ResolvedAsset { document, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // Scalar coercion
    // =========================================================================

    #[test]
    fn plain_text_from_string() {
        assert_eq!(to_plain_text(&json!("  Alba ")), Some("Alba".into()));
        assert_eq!(to_plain_text(&json!("   ")), None);
    }

    #[test]
    fn plain_text_from_rich_text() {
        let rich = json!([{ "type": "paragraph", "text": "First" }, { "text": "Second " }]);
        assert_eq!(to_plain_text(&rich), Some("First\nSecond".into()));
    }

    #[test]
    fn plain_text_ignores_non_string_nodes() {
        let rich = json!([{ "text": 5 }, null, { "text": "ok" }]);
        assert_eq!(to_plain_text(&rich), Some("ok".into()));
        assert_eq!(to_plain_text(&json!([])), None);
    }

    #[test]
    fn plain_text_rejects_other_shapes() {
        assert_eq!(to_plain_text(&json!(3)), None);
        assert_eq!(to_plain_text(&json!({ "text": "x" })), None);
        assert_eq!(to_plain_text(&Value::Null), None);
    }

    #[test]
    fn numeric_accepts_numbers_and_numeric_strings() {
        assert_eq!(to_numeric(&json!(3)), Some(3.0));
        assert_eq!(to_numeric(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(to_numeric(&json!("")), None);
        assert_eq!(to_numeric(&json!("abc")), None);
        assert_eq!(to_numeric(&json!(true)), None);
    }

    // =========================================================================
    // Documents
    // =========================================================================

    #[test]
    fn collection_document_full() {
        let doc = CollectionDocument::from_value(&json!({
            "id": "C1", "uid": "linee",
            "data": {
                "title": "Linee",
                "short_description": [{ "text": "Desc" }],
                "order": "2",
                "images": [
                    { "asset": { "id": "A", "type": "image_asset", "link_type": "Document" } },
                    { "asset": null },
                    {}
                ]
            }
        }));
        assert_eq!(doc.id, "C1");
        assert_eq!(doc.uid.as_deref(), Some("linee"));
        assert_eq!(doc.title.as_deref(), Some("Linee"));
        assert_eq!(doc.description.as_deref(), Some("Desc"));
        assert_eq!(doc.order, Some(2.0));
        assert_eq!(doc.references.len(), 3);
        assert_eq!(doc.references[0].as_ref().unwrap().id.as_deref(), Some("A"));
        assert!(doc.references[1].is_none());
        assert!(doc.references[2].is_none());
    }

    #[test]
    fn collection_document_empty_shape() {
        let doc = CollectionDocument::from_value(&json!({ "data": "garbage" }));
        assert_eq!(doc, CollectionDocument::default());
    }

    #[test]
    fn image_document_full() {
        let doc = ImageAssetDocument::from_value(&json!({
            "id": "A", "uid": null,
            "data": {
                "image": {
                    "url": "https://cdn/a.jpg",
                    "alt": "An alt",
                    "dimensions": { "width": 4000.4, "height": "3000" }
                },
                "caption": [{ "text": "Cap" }],
                "credits": "Me",
                "order": 5
            }
        }));
        assert_eq!(doc.url.as_deref(), Some("https://cdn/a.jpg"));
        assert_eq!(doc.uid, None);
        assert_eq!(doc.width, Some(4000));
        assert_eq!(doc.height, Some(3000));
        assert_eq!(doc.caption.as_deref(), Some("Cap"));
        assert_eq!(doc.credits.as_deref(), Some("Me"));
        assert_eq!(doc.order, Some(5.0));
    }

    #[test]
    fn image_document_rejects_bad_dimensions() {
        let doc = ImageAssetDocument::from_value(&json!({
            "id": "A",
            "data": { "image": { "url": "  ", "dimensions": { "width": -3, "height": 0 } } }
        }));
        assert_eq!(doc.url, None);
        assert_eq!(doc.width, None);
        assert_eq!(doc.height, None);
    }

    // =========================================================================
    // AssetIndex
    // =========================================================================

    fn asset(id: &str, uid: Option<&str>, url: Option<&str>) -> ImageAssetDocument {
        ImageAssetDocument {
            id: id.into(),
            uid: uid.map(String::from),
            url: url.map(String::from),
            ..Default::default()
        }
    }

    fn link(id: Option<&str>, uid: Option<&str>) -> AssetLink {
        AssetLink {
            id: id.map(String::from),
            uid: uid.map(String::from),
            doc_type: Some("image_asset".into()),
            link_type: Some("Document".into()),
        }
    }

    #[test]
    fn resolves_by_id_then_uid() {
        let assets = vec![
            asset("A", Some("alba"), Some("u1")),
            asset("B", Some("bruma"), Some("u2")),
        ];
        let index = AssetIndex::new(&assets);
        assert_eq!(index.len(), 2);

        let by_id = index.resolve(Some(&link(Some("B"), None)), "image_asset").unwrap();
        assert_eq!(by_id.document.id, "B");

        // unknown id falls through to uid
        let by_uid = index
            .resolve(Some(&link(Some("Z"), Some("alba"))), "image_asset")
            .unwrap();
        assert_eq!(by_uid.url, "u1");
    }

    #[test]
    fn rejects_missing_and_mistyped_links() {
        let assets = vec![asset("A", None, Some("u"))];
        let index = AssetIndex::new(&assets);

        assert_eq!(
            index.resolve(None, "image_asset").unwrap_err(),
            SkipReason::MissingRelationship
        );

        let mut web = link(Some("A"), None);
        web.link_type = Some("Web".into());
        assert_eq!(
            index.resolve(Some(&web), "image_asset").unwrap_err(),
            SkipReason::WrongLinkType("Web".into())
        );

        let mut page = link(Some("A"), None);
        page.doc_type = Some("page".into());
        assert_eq!(
            index.resolve(Some(&page), "image_asset").unwrap_err(),
            SkipReason::WrongDocumentType("page".into())
        );
    }

    #[test]
    fn missing_type_fields_are_accepted() {
        let assets = vec![asset("A", None, Some("u"))];
        let index = AssetIndex::new(&assets);
        let bare = AssetLink {
            id: Some("A".into()),
            ..Default::default()
        };
        assert!(index.resolve(Some(&bare), "image_asset").is_ok());
    }

    #[test]
    fn unresolved_and_missing_url() {
        let assets = vec![asset("A", None, None)];
        let index = AssetIndex::new(&assets);
        assert_eq!(
            index.resolve(Some(&link(Some("Q"), Some("q"))), "image_asset").unwrap_err(),
            SkipReason::Unresolved
        );
        assert_eq!(
            index.resolve(Some(&link(Some("A"), None)), "image_asset").unwrap_err(),
            SkipReason::MissingUrl {
                document_id: "A".into()
            }
        );
    }
}
