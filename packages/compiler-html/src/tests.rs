use crate::{render, render_block, render_with_options, RenderFault, RenderOptions};
use sitecraft_document::{Page, Project, Seo};
use sitecraft_schema::theme::Palette;
use serde_json::json;
use sitecraft_schema::*;

fn bakery() -> Project {
    let mut project = Project::new("p-1", "c-1", "Acme Bakery");
    let mut ids = IdGenerator::new(project.id.as_str());

    let home = &mut project.pages[0];
    home.blocks.push(create_default(BlockType::Hero, &mut ids));
    home.blocks.push(create_default(BlockType::Text, &mut ids));

    let mut menu = Page::new("menu", "menu", "Our Menu");
    menu.blocks.push(create_default(BlockType::Pricing, &mut ids));
    project.pages.push(menu);

    project
}

fn hero(headline: &str) -> Block {
    let data = HeroData {
        headline: headline.into(),
        subheadline: None,
        cta_label: None,
        cta_url: None,
        background_image: None,
        layout: HeroLayout::Centered,
    };
    Block::new(BlockId::new("p-1-b9"), BlockData::Hero(data), BlockStyle::default())
}

#[test]
fn test_render_is_deterministic() {
    let project = bakery();
    let page = project.home_page().unwrap();

    let first = render(&project, page, &project.theme);
    let second = render(&project, page, &project.theme);

    assert_eq!(first, second);
    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(first.content_hash().len(), 8);
}

#[test]
fn test_render_document_structure() {
    let project = bakery();
    let html = render(&project, project.home_page().unwrap(), &project.theme);
    let html = html.as_str();

    assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
    assert!(html.contains("<title>Acme Bakery</title>"));
    assert!(html.contains("--sc-primary: #2563eb;"));
    assert!(html.contains("<h1>Your headline here</h1>"));

    let head = html.find("<head>").unwrap();
    let main = html.find("<main>").unwrap();
    let hero = html.find("class=\"sc-block sc-hero").unwrap();
    let text = html.find("class=\"sc-block sc-text").unwrap();
    assert!(head < main && main < hero && hero < text);
    assert!(html.trim_end().ends_with("</html>"));
}

#[test]
fn test_every_default_block_renders() {
    let theme = ResolvedTheme::default();
    let mut ids = IdGenerator::new("p-1");

    for kind in BlockType::ALL {
        let block = create_default(kind, &mut ids);
        let html = render_block(&block, &theme, RenderOptions::default())
            .unwrap_or_else(|fault| panic!("{kind} failed to render: {fault}"));
        assert!(html.contains(&format!("class=\"sc-block sc-{kind} ")), "{html}");
        assert!(html.contains(&format!("id=\"block-{}\"", block.id())));
    }
}

#[test]
fn test_validated_payloads_render() {
    let payloads = [
        (
            "hero",
            json!({
                "headline": "Gâteaux & more 🍰",
                "subheadline": "",
                "ctaLabel": "Order",
                "ctaUrl": "https://shop.example.com:8443/order?size=large#top",
                "backgroundImage": "/img/hero.webp",
                "layout": "split"
            }),
        ),
        ("text", json!({ "heading": "Über uns", "content": "Line one\nline two\n\nNext", "align": "center" })),
        (
            "image",
            json!({ "src": "http://cdn.example.com/a.png", "alt": "", "caption": "", "link": "#gallery" }),
        ),
        (
            "gallery",
            json!({ "images": [{ "src": "/a.png", "alt": "A" }, { "src": "/b.png", "alt": "" }], "columns": 4 }),
        ),
        ("features", json!({ "items": [{ "title": "速い", "description": "", "icon": "⚡" }] })),
        (
            "pricing",
            json!({ "tiers": [{ "name": "Basic", "price": "€9", "features": [], "highlighted": true }] }),
        ),
        (
            "cta",
            json!({ "headline": "Questions?", "body": "", "buttonLabel": "Mail us", "buttonUrl": "mailto:hi@example.com" }),
        ),
        (
            "form",
            json!({
                "action": "/contact",
                "submitLabel": "Send",
                "fields": [{ "name": "phone_2", "label": "Téléphone", "kind": "tel" }]
            }),
        ),
        (
            "product",
            json!({ "name": "Sourdough", "price": "$6", "buyUrl": "https://shop.example.com/p/1", "image": "/p/1.jpg" }),
        ),
        ("embed", json!({ "html": "<iframe src=\"https://maps.example.com\"></iframe>" })),
        ("footer", json!({ "text": "", "links": [] })),
    ];

    for (block_type, payload) in payloads {
        let data = validate(block_type, &payload).unwrap_or_else(|e| panic!("{block_type}: {e}"));
        let block = Block::new(BlockId::new("b-1"), data, BlockStyle::default());

        for options in [RenderOptions::default(), RenderOptions { pretty: false, ..RenderOptions::default() }] {
            let html = render_block(&block, &ResolvedTheme::default(), options)
                .unwrap_or_else(|fault| panic!("{block_type} failed to render: {fault}"));
            assert!(html.contains(&format!("class=\"sc-block sc-{block_type} ")), "{html}");
        }
    }
}

#[test]
fn test_faulty_block_becomes_placeholder() {
    let mut project = bakery();
    project.pages[0].blocks.insert(1, hero("   "));

    let html = render(&project, &project.pages[0], &project.theme);

    assert!(html
        .as_str()
        .contains("<div class=\"sc-placeholder\" data-block-id=\"p-1-b9\"></div>"));
    // The rest of the page still renders.
    assert!(html.as_str().contains("Your headline here"));
    assert!(html.as_str().contains("class=\"sc-block sc-text"));

    assert_eq!(
        render_block(&hero(""), &ResolvedTheme::default(), RenderOptions::default()),
        Err(RenderFault::MissingContent { field: "headline" })
    );
}

#[test]
fn test_invalid_url_faults() {
    let data = CtaData {
        headline: "Call us".into(),
        body: None,
        button_label: "Call".into(),
        button_url: "javascript:alert(1)".into(),
    };
    let block = Block::new(BlockId::new("b"), BlockData::Cta(data), BlockStyle::default());

    let result = render_block(&block, &ResolvedTheme::default(), RenderOptions::default());
    assert!(matches!(result, Err(RenderFault::InvalidUrl { field: "buttonUrl", .. })));
}

#[test]
fn test_nav_marks_current_page() {
    let project = bakery();
    let menu = project.page_by_slug("menu").unwrap();
    let html = render(&project, menu, &project.theme);

    assert!(html
        .as_str()
        .contains("<li><a href=\"menu.html\" aria-current=\"page\">Our Menu</a></li>"));
    assert!(html.as_str().contains("<li><a href=\"index.html\">Home</a></li>"));
}

#[test]
fn test_hidden_pages_are_left_out_of_nav() {
    let mut project = bakery();
    project.pages[1].show_in_nav = false;

    let html = render(&project, &project.pages[0], &project.theme);
    assert!(!html.as_str().contains("menu.html"));
}

#[test]
fn test_page_seo_falls_back_to_site() {
    let mut project = bakery();
    project.seo = Seo {
        title: Some("Acme Bakery | Fresh bread".into()),
        description: Some("Baked every morning".into()),
        social_image: Some("https://cdn.example.com/og.png".into()),
    };
    project.pages[1].seo = Some(Seo {
        title: Some("Menu".into()),
        ..Seo::default()
    });

    let home = render(&project, &project.pages[0], &project.theme);
    assert!(home.as_str().contains("<title>Acme Bakery | Fresh bread</title>"));

    let menu = render(&project, &project.pages[1], &project.theme);
    let menu = menu.as_str();
    assert!(menu.contains("<title>Menu</title>"));
    assert!(menu.contains("<meta name=\"description\" content=\"Baked every morning\">"));
    assert!(menu.contains("<meta property=\"og:image\" content=\"https://cdn.example.com/og.png\">"));
}

#[test]
fn test_site_settings() {
    let mut project = bakery();
    let html = render(&project, &project.pages[0], &project.theme);
    assert!(html.as_str().contains("Built with Sitecraft"));
    assert!(!html.as_str().contains("rel=\"icon\""));

    project.settings.white_label = true;
    project.settings.favicon_url = Some("/favicon.ico".into());
    let html = render(&project, &project.pages[0], &project.theme);
    assert!(!html.as_str().contains("Built with Sitecraft"));
    assert!(!html.as_str().contains("<footer"));
    assert!(html.as_str().contains("<link rel=\"icon\" href=\"/favicon.ico\">"));

    project.settings.footer_text = Some("© Acme Bakery".into());
    let html = render(&project, &project.pages[0], &project.theme);
    assert!(html.as_str().contains("<p>© Acme Bakery</p>"));
}

#[test]
fn test_compact_output() {
    let project = bakery();
    let options = RenderOptions {
        pretty: false,
        ..RenderOptions::default()
    };
    let html = render_with_options(&project, &project.pages[0], &project.theme, options);

    assert!(!html.as_str().contains('\n'));
    assert!(html.as_str().starts_with("<!DOCTYPE html><html lang=\"en\"><head>"));
}

#[test]
fn test_text_is_escaped() {
    let mut project = bakery();
    project.business_name = "Tom & Jerry's <Deli>".into();
    project.pages[0].blocks = vec![hero("5 > 3 \"quoted\"")];

    let html = render(&project, &project.pages[0], &project.theme);
    let html = html.as_str();

    assert!(html.contains("<title>Tom &amp; Jerry&#39;s &lt;Deli&gt;</title>"));
    assert!(html.contains("<h1>5 &gt; 3 &quot;quoted&quot;</h1>"));
    assert!(!html.contains("<Deli>"));
}

#[test]
fn test_text_paragraphs() {
    let data = TextData {
        heading: Some("About".into()),
        content: "First line\nsame paragraph\n\nSecond paragraph".into(),
        align: TextAlign::Center,
    };
    let block = Block::new(BlockId::new("b"), BlockData::Text(data), BlockStyle::default());
    let html = render_block(&block, &ResolvedTheme::default(), RenderOptions::default()).unwrap();

    assert!(html.contains("sc-align-center"));
    assert!(html.contains("<p>First line<br>same paragraph</p>"));
    assert!(html.contains("<p>Second paragraph</p>"));
}

#[test]
fn test_block_style_classes_and_background() {
    let style = BlockStyle {
        padding_y: Spacing::Xl,
        padding_x: Spacing::None,
        max_width: MaxWidth::Narrow,
        background: Some(ColorToken::parse("#FAFAFA").unwrap()),
    };
    let block = Block::new(BlockId::new("b"), default_data(BlockType::Cta), style);
    let html = render_block(&block, &ResolvedTheme::default(), RenderOptions::default()).unwrap();

    assert!(html.contains("class=\"sc-block sc-cta sc-py-xl sc-px-none\" style=\"background: #fafafa\""));
    assert!(html.contains("sc-container sc-w-narrow"));
}

#[test]
fn test_page_theme_override() {
    let mut project = bakery();
    project.theme.palette.primary = Some(ColorToken::parse("#123456").unwrap());
    project.pages[1].theme_override = Some(Theme {
        palette: Palette {
            primary: Some(ColorToken::parse("#abcdef").unwrap()),
            ..Palette::default()
        },
        ..Theme::default()
    });

    let home = render(&project, &project.pages[0], &project.theme);
    assert!(home.as_str().contains("--sc-primary: #123456;"));

    let menu = render(&project, &project.pages[1], &project.theme);
    assert!(menu.as_str().contains("--sc-primary: #abcdef;"));
}

#[test]
fn test_form_field_ids_are_scoped_to_block() {
    let block = Block::new(BlockId::new("p-1-b4"), default_data(BlockType::Form), BlockStyle::default());
    let html = render_block(&block, &ResolvedTheme::default(), RenderOptions::default()).unwrap();

    assert!(html.contains("<label for=\"p-1-b4-email\">Email</label>"));
    assert!(html.contains("<input id=\"p-1-b4-email\" name=\"email\" type=\"email\" required>"));
    assert!(html.contains("<textarea id=\"p-1-b4-message\" name=\"message\" rows=\"5\"></textarea>"));
}

#[test]
fn test_form_name_must_be_an_identifier() {
    let data = FormData {
        heading: None,
        action: "/contact".into(),
        submit_label: "Send".into(),
        fields: vec![FormField {
            name: "full name".into(),
            label: "Full name".into(),
            kind: FormFieldKind::Text,
            required: false,
        }],
    };
    let block = Block::new(BlockId::new("b-1"), BlockData::Form(data), BlockStyle::default());

    assert!(matches!(
        render_block(&block, &ResolvedTheme::default(), RenderOptions::default()),
        Err(RenderFault::Unsupported { field: "fields.name", .. })
    ));
}
