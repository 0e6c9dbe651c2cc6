//! Field registry for every block type.
//!
//! Registration is closed: [`schema_for`] is an exhaustive match over
//! [`BlockType`], so adding a type means adding a variant and a table here.

use crate::BlockType;

/// Value rule applied to a single field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    /// String with a character-count range; `min > 0` also rejects blank text
    Text { min: usize, max: usize },
    /// Machine name usable as an HTML id: an ASCII letter, then letters,
    /// digits, `-` or `_`
    Identifier { max: usize },
    /// Link or asset reference (see [`crate::is_well_formed_url`])
    Url,
    /// String from a fixed set of layout variants
    Choice(&'static [&'static str]),
    Integer { min: i64, max: i64 },
    Flag,
    /// Array of strings
    TextList { min: usize, max: usize, max_len: usize },
    /// Array of objects, each checked against `item`
    List {
        min: usize,
        max: usize,
        item: &'static [FieldSpec],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub rule: FieldRule,
}

impl FieldSpec {
    pub const fn required(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            required: true,
            rule,
        }
    }

    pub const fn optional(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            required: false,
            rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSchema {
    pub kind: BlockType,
    pub fields: &'static [FieldSpec],
}

impl BlockSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

const HEADING: FieldRule = FieldRule::Text { min: 1, max: 120 };
const LABEL: FieldRule = FieldRule::Text { min: 1, max: 40 };
const CAPTION: FieldRule = FieldRule::Text { min: 0, max: 200 };
const PRICE: FieldRule = FieldRule::Text { min: 1, max: 24 };

const HERO: &[FieldSpec] = &[
    FieldSpec::required("headline", HEADING),
    FieldSpec::optional("subheadline", FieldRule::Text { min: 0, max: 300 }),
    FieldSpec::optional("ctaLabel", LABEL),
    FieldSpec::optional("ctaUrl", FieldRule::Url),
    FieldSpec::optional("backgroundImage", FieldRule::Url),
    FieldSpec::optional("layout", FieldRule::Choice(&["centered", "split"])),
];

const TEXT: &[FieldSpec] = &[
    FieldSpec::optional("heading", HEADING),
    FieldSpec::required("content", FieldRule::Text { min: 1, max: 10_000 }),
    FieldSpec::optional("align", FieldRule::Choice(&["left", "center"])),
];

const IMAGE: &[FieldSpec] = &[
    FieldSpec::required("src", FieldRule::Url),
    FieldSpec::required("alt", CAPTION),
    FieldSpec::optional("caption", CAPTION),
    FieldSpec::optional("link", FieldRule::Url),
];

const GALLERY_IMAGE: &[FieldSpec] = &[
    FieldSpec::required("src", FieldRule::Url),
    FieldSpec::required("alt", CAPTION),
    FieldSpec::optional("caption", CAPTION),
];

const GALLERY: &[FieldSpec] = &[
    FieldSpec::optional("heading", HEADING),
    FieldSpec::required(
        "images",
        FieldRule::List {
            min: 1,
            max: 24,
            item: GALLERY_IMAGE,
        },
    ),
    FieldSpec::optional("columns", FieldRule::Integer { min: 2, max: 4 }),
];

const FEATURE_ITEM: &[FieldSpec] = &[
    FieldSpec::required("title", FieldRule::Text { min: 1, max: 80 }),
    FieldSpec::optional("description", FieldRule::Text { min: 0, max: 300 }),
    FieldSpec::optional("icon", FieldRule::Text { min: 1, max: 8 }),
];

const FEATURES: &[FieldSpec] = &[
    FieldSpec::optional("heading", HEADING),
    FieldSpec::required(
        "items",
        FieldRule::List {
            min: 1,
            max: 12,
            item: FEATURE_ITEM,
        },
    ),
];

const PRICING_TIER: &[FieldSpec] = &[
    FieldSpec::required("name", LABEL),
    FieldSpec::required("price", PRICE),
    FieldSpec::optional("period", FieldRule::Text { min: 0, max: 20 }),
    FieldSpec::optional(
        "features",
        FieldRule::TextList {
            min: 0,
            max: 20,
            max_len: 120,
        },
    ),
    FieldSpec::optional("ctaLabel", LABEL),
    FieldSpec::optional("ctaUrl", FieldRule::Url),
    FieldSpec::optional("highlighted", FieldRule::Flag),
];

const PRICING: &[FieldSpec] = &[
    FieldSpec::optional("heading", HEADING),
    FieldSpec::required(
        "tiers",
        FieldRule::List {
            min: 1,
            max: 4,
            item: PRICING_TIER,
        },
    ),
];

const CTA: &[FieldSpec] = &[
    FieldSpec::required("headline", HEADING),
    FieldSpec::optional("body", FieldRule::Text { min: 0, max: 300 }),
    FieldSpec::required("buttonLabel", LABEL),
    FieldSpec::required("buttonUrl", FieldRule::Url),
];

const FORM_FIELD: &[FieldSpec] = &[
    FieldSpec::required("name", FieldRule::Identifier { max: 40 }),
    FieldSpec::required("label", FieldRule::Text { min: 1, max: 80 }),
    FieldSpec::required(
        "kind",
        FieldRule::Choice(&["text", "email", "tel", "textarea"]),
    ),
    FieldSpec::optional("required", FieldRule::Flag),
];

const FORM: &[FieldSpec] = &[
    FieldSpec::optional("heading", HEADING),
    FieldSpec::required("action", FieldRule::Url),
    FieldSpec::required("submitLabel", LABEL),
    FieldSpec::required(
        "fields",
        FieldRule::List {
            min: 1,
            max: 12,
            item: FORM_FIELD,
        },
    ),
];

const PRODUCT: &[FieldSpec] = &[
    FieldSpec::required("name", HEADING),
    FieldSpec::optional("description", FieldRule::Text { min: 0, max: 1_000 }),
    FieldSpec::required("price", PRICE),
    FieldSpec::optional("image", FieldRule::Url),
    FieldSpec::required("buyUrl", FieldRule::Url),
];

const EMBED: &[FieldSpec] = &[FieldSpec::required(
    "html",
    FieldRule::Text { min: 1, max: 20_000 },
)];

const FOOTER_LINK: &[FieldSpec] = &[
    FieldSpec::required("label", LABEL),
    FieldSpec::required("url", FieldRule::Url),
];

const FOOTER: &[FieldSpec] = &[
    FieldSpec::optional("text", FieldRule::Text { min: 0, max: 300 }),
    FieldSpec::optional(
        "links",
        FieldRule::List {
            min: 0,
            max: 12,
            item: FOOTER_LINK,
        },
    ),
];

/// Registered schema for a block type
pub fn schema_for(kind: BlockType) -> BlockSchema {
    let fields = match kind {
        BlockType::Hero => HERO,
        BlockType::Text => TEXT,
        BlockType::Image => IMAGE,
        BlockType::Gallery => GALLERY,
        BlockType::Features => FEATURES,
        BlockType::Pricing => PRICING,
        BlockType::Cta => CTA,
        BlockType::Form => FORM,
        BlockType::Product => PRODUCT,
        BlockType::Embed => EMBED,
        BlockType::Footer => FOOTER,
    };
    BlockSchema { kind, fields }
}
