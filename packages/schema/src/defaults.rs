//! Placeholder content for new blocks.
//!
//! Every default passes its own schema; the placeholder text is what a
//! user sees right after adding a block by hand.

use crate::block::*;
use crate::IdGenerator;

/// Schema-conformant placeholder data for a block type
pub fn default_data(kind: BlockType) -> BlockData {
    match kind {
        BlockType::Hero => BlockData::Hero(HeroData {
            headline: "Your headline here".into(),
            subheadline: Some("Tell visitors what makes your business special.".into()),
            cta_label: Some("Get started".into()),
            cta_url: Some("#contact".into()),
            background_image: None,
            layout: HeroLayout::Centered,
        }),
        BlockType::Text => BlockData::Text(TextData {
            heading: None,
            content: "Write something about your business.".into(),
            align: TextAlign::Left,
        }),
        BlockType::Image => BlockData::Image(ImageData {
            src: "/images/placeholder.png".into(),
            alt: "Placeholder image".into(),
            caption: None,
            link: None,
        }),
        BlockType::Gallery => BlockData::Gallery(GalleryData {
            heading: Some("Gallery".into()),
            images: (1..=3)
                .map(|n| GalleryImage {
                    src: format!("/images/gallery-{n}.png"),
                    alt: format!("Gallery image {n}"),
                    caption: None,
                })
                .collect(),
            columns: 3,
        }),
        BlockType::Features => BlockData::Features(FeaturesData {
            heading: Some("Why choose us".into()),
            items: ["Fast", "Friendly", "Reliable"]
                .into_iter()
                .map(|title| FeatureItem {
                    title: title.into(),
                    description: "Describe this benefit in a sentence.".into(),
                    icon: None,
                })
                .collect(),
        }),
        BlockType::Pricing => BlockData::Pricing(PricingData {
            heading: Some("Pricing".into()),
            tiers: vec![PricingTier {
                name: "Basic".into(),
                price: "$0".into(),
                period: Some("/month".into()),
                features: vec!["Everything you need to start".into()],
                cta_label: Some("Choose plan".into()),
                cta_url: Some("#contact".into()),
                highlighted: false,
            }],
        }),
        BlockType::Cta => BlockData::Cta(CtaData {
            headline: "Ready to get started?".into(),
            body: None,
            button_label: "Contact us".into(),
            button_url: "#contact".into(),
        }),
        BlockType::Form => BlockData::Form(FormData {
            heading: Some("Contact us".into()),
            action: "/contact".into(),
            submit_label: "Send".into(),
            fields: vec![
                FormField {
                    name: "name".into(),
                    label: "Name".into(),
                    kind: FormFieldKind::Text,
                    required: true,
                },
                FormField {
                    name: "email".into(),
                    label: "Email".into(),
                    kind: FormFieldKind::Email,
                    required: true,
                },
                FormField {
                    name: "message".into(),
                    label: "Message".into(),
                    kind: FormFieldKind::Textarea,
                    required: false,
                },
            ],
        }),
        BlockType::Product => BlockData::Product(ProductData {
            name: "Product name".into(),
            description: None,
            price: "$10".into(),
            image: None,
            buy_url: "#buy".into(),
        }),
        BlockType::Embed => BlockData::Embed(EmbedData {
            html: "<!-- custom code -->".into(),
        }),
        BlockType::Footer => BlockData::Footer(FooterData {
            text: None,
            links: Vec::new(),
        }),
    }
}

/// New block of `kind` with a fresh id and placeholder data
pub fn create_default(kind: BlockType, ids: &mut IdGenerator) -> Block {
    Block::new(ids.new_id(), default_data(kind), BlockStyle::default())
}
