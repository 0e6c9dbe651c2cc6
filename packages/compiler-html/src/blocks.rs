//! One generator per block type.
//!
//! Every generator re-checks what it emits: data that reached the renderer
//! without passing the schema faults instead of producing broken markup.

use crate::compiler::{escape_html, Context, RenderFault};
use sitecraft_schema::*;

pub(crate) fn compile_block(block: &Block, theme: &ResolvedTheme, ctx: &mut Context) -> Result<(), RenderFault> {
    let style = block.style();

    let background = match &style.background {
        Some(color) => format!(
            " style=\"background: {}\"",
            theme.with_block_background(Some(color)).background
        ),
        None => String::new(),
    };

    ctx.open(&format!(
        "<section id=\"block-{}\" class=\"sc-block sc-{} sc-py-{} sc-px-{}\"{}>",
        escape_html(block.id().as_str()),
        block.kind(),
        style.padding_y.as_str(),
        style.padding_x.as_str(),
        background
    ));
    ctx.open(&format!("<div class=\"sc-container sc-w-{}\">", style.max_width.as_str()));

    match block.data() {
        BlockData::Hero(data) => compile_hero(data, ctx)?,
        BlockData::Text(data) => compile_text(data, ctx)?,
        BlockData::Image(data) => compile_image(data, ctx)?,
        BlockData::Gallery(data) => compile_gallery(data, ctx)?,
        BlockData::Features(data) => compile_features(data, ctx)?,
        BlockData::Pricing(data) => compile_pricing(data, ctx)?,
        BlockData::Cta(data) => compile_cta(data, ctx)?,
        BlockData::Form(data) => compile_form(block.id(), data, ctx)?,
        BlockData::Product(data) => compile_product(data, ctx)?,
        BlockData::Embed(data) => compile_embed(data, ctx)?,
        BlockData::Footer(data) => compile_footer(data, ctx)?,
    }

    ctx.close("</div>");
    ctx.close("</section>");
    Ok(())
}

/// Escaped text that must not be blank
fn text(field: &'static str, value: &str) -> Result<String, RenderFault> {
    if value.trim().is_empty() {
        Err(RenderFault::MissingContent { field })
    } else {
        Ok(escape_html(value))
    }
}

/// Escaped URL that must be well formed
fn url(field: &'static str, value: &str) -> Result<String, RenderFault> {
    if is_well_formed_url(value) {
        Ok(escape_html(value))
    } else {
        Err(RenderFault::InvalidUrl {
            field,
            url: value.to_string(),
        })
    }
}

fn heading(tag: &str, value: &Option<String>, ctx: &mut Context) {
    if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        ctx.add_line(&format!("<{tag}>{}</{tag}>", escape_html(value)));
    }
}

fn button(label: &str, href: &str, ctx: &mut Context) {
    ctx.add_line(&format!("<a class=\"sc-button\" href=\"{href}\">{label}</a>"));
}

fn compile_hero(data: &HeroData, ctx: &mut Context) -> Result<(), RenderFault> {
    let layout = match data.layout {
        HeroLayout::Centered => "centered",
        HeroLayout::Split => "split",
    };
    let headline = text("headline", &data.headline)?;
    let image = data
        .background_image
        .as_deref()
        .map(|src| url("backgroundImage", src))
        .transpose()?;
    let cta = match (&data.cta_label, &data.cta_url) {
        (Some(label), Some(href)) => Some((text("ctaLabel", label)?, url("ctaUrl", href)?)),
        _ => None,
    };

    ctx.open(&format!("<div class=\"sc-hero sc-hero-{layout}\">"));
    ctx.open("<div class=\"sc-hero-copy\">");
    ctx.add_line(&format!("<h1>{headline}</h1>"));
    if let Some(sub) = data.subheadline.as_deref().filter(|s| !s.trim().is_empty()) {
        ctx.add_line(&format!("<p class=\"sc-lead\">{}</p>", escape_html(sub)));
    }
    if let Some((label, href)) = cta {
        button(&label, &href, ctx);
    }
    ctx.close("</div>");
    if let Some(src) = image {
        ctx.add_line(&format!("<img class=\"sc-hero-image\" src=\"{src}\" alt=\"\">"));
    }
    ctx.close("</div>");
    Ok(())
}

fn compile_text(data: &TextData, ctx: &mut Context) -> Result<(), RenderFault> {
    text("content", &data.content)?;
    let align = match data.align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
    };

    ctx.open(&format!("<div class=\"sc-text sc-align-{align}\">"));
    heading("h2", &data.heading, ctx);
    for paragraph in data.content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let lines: Vec<String> = paragraph.lines().map(escape_html).collect();
        ctx.add_line(&format!("<p>{}</p>", lines.join("<br>")));
    }
    ctx.close("</div>");
    Ok(())
}

fn compile_image(data: &ImageData, ctx: &mut Context) -> Result<(), RenderFault> {
    let src = url("src", &data.src)?;
    let link = data.link.as_deref().map(|href| url("link", href)).transpose()?;
    let img = format!("<img src=\"{src}\" alt=\"{}\">", escape_html(&data.alt));

    ctx.open("<figure class=\"sc-image\">");
    match link {
        Some(href) => ctx.add_line(&format!("<a href=\"{href}\">{img}</a>")),
        None => ctx.add_line(&img),
    }
    if let Some(caption) = &data.caption {
        ctx.add_line(&format!("<figcaption>{}</figcaption>", escape_html(caption)));
    }
    ctx.close("</figure>");
    Ok(())
}

fn compile_gallery(data: &GalleryData, ctx: &mut Context) -> Result<(), RenderFault> {
    if data.images.is_empty() {
        return Err(RenderFault::MissingContent { field: "images" });
    }
    if !(2..=4).contains(&data.columns) {
        return Err(RenderFault::Unsupported {
            field: "columns",
            value: data.columns.to_string(),
        });
    }
    let sources = data
        .images
        .iter()
        .map(|image| url("images.src", &image.src))
        .collect::<Result<Vec<_>, _>>()?;

    heading("h2", &data.heading, ctx);
    ctx.open(&format!("<div class=\"sc-gallery sc-cols-{}\">", data.columns));
    for (image, src) in data.images.iter().zip(sources) {
        ctx.open("<figure>");
        ctx.add_line(&format!("<img src=\"{src}\" alt=\"{}\" loading=\"lazy\">", escape_html(&image.alt)));
        if let Some(caption) = &image.caption {
            ctx.add_line(&format!("<figcaption>{}</figcaption>", escape_html(caption)));
        }
        ctx.close("</figure>");
    }
    ctx.close("</div>");
    Ok(())
}

fn compile_features(data: &FeaturesData, ctx: &mut Context) -> Result<(), RenderFault> {
    if data.items.is_empty() {
        return Err(RenderFault::MissingContent { field: "items" });
    }
    let titles = data
        .items
        .iter()
        .map(|item| text("items.title", &item.title))
        .collect::<Result<Vec<_>, _>>()?;

    heading("h2", &data.heading, ctx);
    ctx.open("<ul class=\"sc-features\">");
    for (item, title) in data.items.iter().zip(titles) {
        ctx.open("<li>");
        if let Some(icon) = &item.icon {
            ctx.add_line(&format!("<span class=\"sc-icon\" aria-hidden=\"true\">{}</span>", escape_html(icon)));
        }
        ctx.add_line(&format!("<h3>{title}</h3>"));
        if !item.description.is_empty() {
            ctx.add_line(&format!("<p>{}</p>", escape_html(&item.description)));
        }
        ctx.close("</li>");
    }
    ctx.close("</ul>");
    Ok(())
}

fn compile_pricing(data: &PricingData, ctx: &mut Context) -> Result<(), RenderFault> {
    if data.tiers.is_empty() {
        return Err(RenderFault::MissingContent { field: "tiers" });
    }

    let mut tiers = Vec::with_capacity(data.tiers.len());
    for tier in &data.tiers {
        let cta = match (&tier.cta_label, &tier.cta_url) {
            (Some(label), Some(href)) => Some((text("tiers.ctaLabel", label)?, url("tiers.ctaUrl", href)?)),
            _ => None,
        };
        tiers.push((tier, text("tiers.name", &tier.name)?, text("tiers.price", &tier.price)?, cta));
    }

    heading("h2", &data.heading, ctx);
    ctx.open("<div class=\"sc-pricing\">");
    for (tier, name, price, cta) in tiers {
        let class = if tier.highlighted {
            "sc-tier sc-highlighted"
        } else {
            "sc-tier"
        };
        ctx.open(&format!("<div class=\"{class}\">"));
        ctx.add_line(&format!("<h3>{name}</h3>"));
        match &tier.period {
            Some(period) => ctx.add_line(&format!(
                "<p class=\"sc-price\">{price}<span class=\"sc-period\">{}</span></p>",
                escape_html(period)
            )),
            None => ctx.add_line(&format!("<p class=\"sc-price\">{price}</p>")),
        }
        if !tier.features.is_empty() {
            ctx.open("<ul>");
            for feature in &tier.features {
                ctx.add_line(&format!("<li>{}</li>", escape_html(feature)));
            }
            ctx.close("</ul>");
        }
        if let Some((label, href)) = cta {
            button(&label, &href, ctx);
        }
        ctx.close("</div>");
    }
    ctx.close("</div>");
    Ok(())
}

fn compile_cta(data: &CtaData, ctx: &mut Context) -> Result<(), RenderFault> {
    let headline = text("headline", &data.headline)?;
    let label = text("buttonLabel", &data.button_label)?;
    let href = url("buttonUrl", &data.button_url)?;

    ctx.open("<div class=\"sc-cta\">");
    ctx.add_line(&format!("<h2>{headline}</h2>"));
    if let Some(body) = &data.body {
        ctx.add_line(&format!("<p>{}</p>", escape_html(body)));
    }
    button(&label, &href, ctx);
    ctx.close("</div>");
    Ok(())
}

fn compile_form(block_id: &BlockId, data: &FormData, ctx: &mut Context) -> Result<(), RenderFault> {
    if data.fields.is_empty() {
        return Err(RenderFault::MissingContent { field: "fields" });
    }
    let action = url("action", &data.action)?;
    let submit = text("submitLabel", &data.submit_label)?;

    heading("h2", &data.heading, ctx);
    ctx.open(&format!("<form class=\"sc-form\" method=\"post\" action=\"{action}\">"));
    for field in &data.fields {
        if !is_identifier(&field.name, usize::MAX) {
            return Err(RenderFault::Unsupported {
                field: "fields.name",
                value: field.name.clone(),
            });
        }
        let name = &field.name;
        let id = format!("{}-{}", escape_html(block_id.as_str()), name);
        let required = if field.required { " required" } else { "" };

        ctx.open("<div class=\"sc-field\">");
        ctx.add_line(&format!("<label for=\"{id}\">{}</label>", escape_html(&field.label)));
        let input_type = match field.kind {
            FormFieldKind::Text => Some("text"),
            FormFieldKind::Email => Some("email"),
            FormFieldKind::Tel => Some("tel"),
            FormFieldKind::Textarea => None,
        };
        match input_type {
            Some(kind) => ctx.add_line(&format!(
                "<input id=\"{id}\" name=\"{name}\" type=\"{kind}\"{required}>"
            )),
            None => ctx.add_line(&format!("<textarea id=\"{id}\" name=\"{name}\" rows=\"5\"{required}></textarea>")),
        }
        ctx.close("</div>");
    }
    ctx.add_line(&format!("<button class=\"sc-button\" type=\"submit\">{submit}</button>"));
    ctx.close("</form>");
    Ok(())
}

fn compile_product(data: &ProductData, ctx: &mut Context) -> Result<(), RenderFault> {
    let name = text("name", &data.name)?;
    let price = text("price", &data.price)?;
    let buy = url("buyUrl", &data.buy_url)?;
    let image = data.image.as_deref().map(|src| url("image", src)).transpose()?;

    ctx.open("<div class=\"sc-product\">");
    if let Some(src) = image {
        ctx.add_line(&format!("<img src=\"{src}\" alt=\"{name}\">"));
    }
    ctx.add_line(&format!("<h3>{name}</h3>"));
    if let Some(description) = &data.description {
        ctx.add_line(&format!("<p>{}</p>", escape_html(description)));
    }
    ctx.add_line(&format!("<p class=\"sc-price\">{price}</p>"));
    button("Buy now", &buy, ctx);
    ctx.close("</div>");
    Ok(())
}

/// Custom code is emitted as written
fn compile_embed(data: &EmbedData, ctx: &mut Context) -> Result<(), RenderFault> {
    if data.html.trim().is_empty() {
        return Err(RenderFault::MissingContent { field: "html" });
    }

    ctx.open("<div class=\"sc-embed\">");
    ctx.add_verbatim(&data.html);
    ctx.close("</div>");
    Ok(())
}

fn compile_footer(data: &FooterData, ctx: &mut Context) -> Result<(), RenderFault> {
    let links = data
        .links
        .iter()
        .map(|link| Ok((text("links.label", &link.label)?, url("links.url", &link.url)?)))
        .collect::<Result<Vec<_>, RenderFault>>()?;

    ctx.open("<div class=\"sc-footer\">");
    if let Some(text) = &data.text {
        ctx.add_line(&format!("<p>{}</p>", escape_html(text)));
    }
    if !links.is_empty() {
        ctx.open("<ul>");
        for (label, href) in links {
            ctx.add_line(&format!("<li><a href=\"{href}\">{label}</a></li>"));
        }
        ctx.close("</ul>");
    }
    ctx.close("</div>");
    Ok(())
}
