//! Block types and their typed payloads.

use crate::theme::ColorToken;
use crate::validate::{validate_kind, SchemaError};
use crate::BlockId;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The closed set of block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Hero,
    Text,
    Image,
    Gallery,
    Features,
    Pricing,
    Cta,
    Form,
    Product,
    Embed,
    Footer,
}

impl BlockType {
    pub const ALL: [BlockType; 11] = [
        BlockType::Hero,
        BlockType::Text,
        BlockType::Image,
        BlockType::Gallery,
        BlockType::Features,
        BlockType::Pricing,
        BlockType::Cta,
        BlockType::Form,
        BlockType::Product,
        BlockType::Embed,
        BlockType::Footer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Hero => "hero",
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Gallery => "gallery",
            BlockType::Features => "features",
            BlockType::Pricing => "pricing",
            BlockType::Cta => "cta",
            BlockType::Form => "form",
            BlockType::Product => "product",
            BlockType::Embed => "embed",
            BlockType::Footer => "footer",
        }
    }

    /// Plan feature a block of this type needs, by its feature key
    pub fn required_feature(self) -> Option<&'static str> {
        match self {
            BlockType::Embed => Some("custom-code"),
            BlockType::Product => Some("ecommerce"),
            _ => None,
        }
    }
}

impl FromStr for BlockType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Shared layout style ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    None,
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl Spacing {
    pub fn as_str(self) -> &'static str {
        match self {
            Spacing::None => "none",
            Spacing::Sm => "sm",
            Spacing::Md => "md",
            Spacing::Lg => "lg",
            Spacing::Xl => "xl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaxWidth {
    Narrow,
    #[default]
    Normal,
    Wide,
    Full,
}

impl MaxWidth {
    pub fn as_str(self) -> &'static str {
        match self {
            MaxWidth::Narrow => "narrow",
            MaxWidth::Normal => "normal",
            MaxWidth::Wide => "wide",
            MaxWidth::Full => "full",
        }
    }
}

/// Layout attributes every block shares
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockStyle {
    #[serde(default)]
    pub padding_y: Spacing,
    #[serde(default)]
    pub padding_x: Spacing,
    #[serde(default)]
    pub max_width: MaxWidth,
    /// Section background, overriding the theme background
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<ColorToken>,
}

// --- Payloads ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeroLayout {
    #[default]
    Centered,
    Split,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeroData {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default)]
    pub layout: HeroLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub content: String,
    #[serde(default)]
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageData {
    pub src: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GalleryImage {
    pub src: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GalleryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub images: Vec<GalleryImage>,
    #[serde(default = "default_gallery_columns")]
    pub columns: u8,
}

fn default_gallery_columns() -> u8 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeaturesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub items: Vec<FeatureItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingTier {
    pub name: String,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,
    #[serde(default)]
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub tiers: Vec<PricingTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CtaData {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub button_label: String,
    pub button_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    Text,
    Email,
    Tel,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FormFieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub action: String,
    pub submit_label: String,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub buy_url: String,
}

/// Owner-supplied markup, emitted verbatim. Gated behind `custom-code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmbedData {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FooterData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub links: Vec<FooterLink>,
}

/// Validated payload of a block; the variant is the block's type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockData {
    Hero(HeroData),
    Text(TextData),
    Image(ImageData),
    Gallery(GalleryData),
    Features(FeaturesData),
    Pricing(PricingData),
    Cta(CtaData),
    Form(FormData),
    Product(ProductData),
    Embed(EmbedData),
    Footer(FooterData),
}

impl BlockData {
    pub fn kind(&self) -> BlockType {
        match self {
            BlockData::Hero(_) => BlockType::Hero,
            BlockData::Text(_) => BlockType::Text,
            BlockData::Image(_) => BlockType::Image,
            BlockData::Gallery(_) => BlockType::Gallery,
            BlockData::Features(_) => BlockType::Features,
            BlockData::Pricing(_) => BlockType::Pricing,
            BlockData::Cta(_) => BlockType::Cta,
            BlockData::Form(_) => BlockType::Form,
            BlockData::Product(_) => BlockType::Product,
            BlockData::Embed(_) => BlockType::Embed,
            BlockData::Footer(_) => BlockType::Footer,
        }
    }

    /// JSON form of the payload, as it appears under a block's `data` key
    pub fn to_value(&self) -> Result<serde_json::Value, SchemaError> {
        serde_json::to_value(self).map_err(|e| SchemaError::Malformed {
            block_type: self.kind(),
            message: e.to_string(),
        })
    }
}

// --- Block ---

/// One typed content unit on a page.
///
/// Fields are private: a block's type never changes after creation, and
/// its payload is always one that passed schema validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    id: BlockId,
    data: BlockData,
    style: BlockStyle,
}

/// Unvalidated wire form of a block
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
    #[serde(default)]
    style: BlockStyle,
}

impl TryFrom<RawBlock> for Block {
    type Error = SchemaError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let kind: BlockType = raw.kind.parse()?;
        let data = validate_kind(kind, &raw.data)?;
        Ok(Block::new(raw.id, data, raw.style))
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Block", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("style", &self.style)?;
        state.end()
    }
}

impl Block {
    /// Assemble a block from already-validated data
    pub fn new(id: BlockId, data: BlockData, style: BlockStyle) -> Self {
        Self { id, data, style }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> BlockType {
        self.data.kind()
    }

    pub fn data(&self) -> &BlockData {
        &self.data
    }

    pub fn style(&self) -> &BlockStyle {
        &self.style
    }

    /// Same block (same id) with new content.
    ///
    /// Fails when `data` belongs to a different block type.
    pub fn with_content(&self, data: BlockData, style: BlockStyle) -> Result<Block, SchemaError> {
        if data.kind() != self.kind() {
            return Err(SchemaError::TypeChange {
                from: self.kind(),
                to: data.kind(),
            });
        }
        Ok(Block {
            id: self.id.clone(),
            data,
            style,
        })
    }
}
