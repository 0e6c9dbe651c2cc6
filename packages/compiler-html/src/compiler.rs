use crate::blocks::compile_block;
use crate::html::Html;
use sitecraft_document::{Page, Project, Seo};
use sitecraft_schema::{apply_theme, is_well_formed_url, Block, ResolvedTheme, Theme};
use thiserror::Error;

/// Why a single block could not be rendered.
///
/// Faults never escape [`render`]; the block is replaced by a placeholder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderFault {
    #[error("Missing content: {field}")]
    MissingContent { field: &'static str },

    #[error("Invalid URL in {field}: {url}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("Unsupported value in {field}: {value}")]
    Unsupported { field: &'static str, value: String },
}

/// Options for HTML rendering
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Pretty print HTML
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

pub(crate) struct Context {
    options: RenderOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    pub(crate) fn new(options: RenderOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    /// Empty buffer at the same depth, for output that may be discarded
    pub(crate) fn nested(&self) -> Self {
        Self {
            options: self.options.clone(),
            depth: self.depth,
            buffer: String::new(),
        }
    }

    pub(crate) fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub(crate) fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }

    /// Multi-line text kept as written, re-indented when pretty printing
    pub(crate) fn add_verbatim(&mut self, text: &str) {
        if self.options.pretty {
            for line in text.lines() {
                self.add_line(line);
            }
        } else {
            self.add(text);
        }
    }

    pub(crate) fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    /// `<tag ...>` line followed by an indent
    pub(crate) fn open(&mut self, tag: &str) {
        self.add_line(tag);
        self.indent();
    }

    /// Dedent followed by the closing tag line
    pub(crate) fn close(&mut self, tag: &str) {
        self.dedent();
        self.add_line(tag);
    }

    pub(crate) fn get_output(self) -> String {
        self.buffer
    }
}

/// Render one page of a project with default options
pub fn render(project: &Project, page: &Page, theme: &Theme) -> Html {
    render_with_options(project, page, theme, RenderOptions::default())
}

/// Render one page of a project.
///
/// Pure: the same inputs always produce byte-identical output. Settings
/// are taken as given; plan checks happen before this point.
pub fn render_with_options(project: &Project, page: &Page, theme: &Theme, options: RenderOptions) -> Html {
    let resolved = apply_theme(theme, page.theme_override.as_ref());
    let mut ctx = Context::new(options);

    ctx.add_line("<!DOCTYPE html>");
    ctx.open("<html lang=\"en\">");

    compile_head(project, page, &resolved, &mut ctx);

    ctx.open("<body>");
    compile_header(project, page, &mut ctx);

    ctx.open("<main>");
    for block in &page.blocks {
        compile_block_or_placeholder(block, &resolved, &mut ctx);
    }
    ctx.close("</main>");

    compile_site_footer(project, &mut ctx);
    ctx.close("</body>");

    ctx.close("</html>");

    Html::new(ctx.get_output())
}

/// Render one block in isolation
pub fn render_block(block: &Block, theme: &ResolvedTheme, options: RenderOptions) -> Result<String, RenderFault> {
    let mut ctx = Context::new(options);
    compile_block(block, theme, &mut ctx)?;
    Ok(ctx.get_output())
}

fn compile_block_or_placeholder(block: &Block, theme: &ResolvedTheme, ctx: &mut Context) {
    let mut sub = ctx.nested();
    match compile_block(block, theme, &mut sub) {
        Ok(()) => ctx.add(&sub.get_output()),
        Err(fault) => {
            tracing::warn!(block = %block.id(), kind = %block.kind(), %fault, "block replaced by placeholder");
            ctx.add_line(&format!(
                "<div class=\"sc-placeholder\" data-block-id=\"{}\"></div>",
                escape_html(block.id().as_str())
            ));
        }
    }
}

fn compile_head(project: &Project, page: &Page, theme: &ResolvedTheme, ctx: &mut Context) {
    let page_seo = page.seo.as_ref();
    let site_seo = &project.seo;

    let title = seo_field(page_seo, site_seo, |s| s.title.as_ref()).unwrap_or(&project.business_name);
    let description = seo_field(page_seo, site_seo, |s| s.description.as_ref());
    let social_image =
        seo_field(page_seo, site_seo, |s| s.social_image.as_ref()).filter(|url| is_well_formed_url(url));

    ctx.open("<head>");
    ctx.add_line("<meta charset=\"utf-8\">");
    ctx.add_line("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    ctx.add_line(&format!("<title>{}</title>", escape_html(title)));
    ctx.add_line(&format!("<meta property=\"og:title\" content=\"{}\">", escape_html(title)));

    if let Some(description) = description {
        ctx.add_line(&format!("<meta name=\"description\" content=\"{}\">", escape_html(description)));
        ctx.add_line(&format!(
            "<meta property=\"og:description\" content=\"{}\">",
            escape_html(description)
        ));
    }
    if let Some(image) = social_image {
        ctx.add_line(&format!("<meta property=\"og:image\" content=\"{}\">", escape_html(image)));
    }
    if let Some(favicon) = project.settings.favicon_url.as_ref().filter(|url| is_well_formed_url(url)) {
        ctx.add_line(&format!("<link rel=\"icon\" href=\"{}\">", escape_html(favicon)));
    }

    compile_style(theme, ctx);
    ctx.close("</head>");
}

/// Page value, falling back to the site-wide value
fn seo_field<'a>(page: Option<&'a Seo>, site: &'a Seo, field: fn(&Seo) -> Option<&String>) -> Option<&'a String> {
    page.and_then(field).or_else(|| field(site))
}

/// Fixed rules; only the custom properties vary with the theme
const BASE_CSS: &[&str] = &[
    "*, *::before, *::after { box-sizing: border-box; }",
    "body { margin: 0; font-family: var(--sc-body-font); color: var(--sc-text); background: var(--sc-background); line-height: 1.6; }",
    "h1, h2, h3 { font-family: var(--sc-heading-font); line-height: 1.2; }",
    "img { max-width: 100%; height: auto; }",
    "a { color: var(--sc-primary); }",
    ".sc-header { display: flex; flex-wrap: wrap; align-items: center; justify-content: space-between; padding: var(--sc-space) calc(var(--sc-space) * 2); }",
    ".sc-brand { font-weight: 700; text-decoration: none; color: var(--sc-text); }",
    ".sc-nav ul { display: flex; flex-wrap: wrap; gap: var(--sc-space); list-style: none; margin: 0; padding: 0; }",
    ".sc-nav a[aria-current=\"page\"] { font-weight: 700; text-decoration: none; }",
    ".sc-block { background: var(--sc-background); }",
    ".sc-container { margin: 0 auto; }",
    ".sc-w-narrow { max-width: 40rem; }",
    ".sc-w-normal { max-width: 60rem; }",
    ".sc-w-wide { max-width: 80rem; }",
    ".sc-w-full { max-width: none; }",
    ".sc-py-none { padding-top: 0; padding-bottom: 0; }",
    ".sc-py-sm { padding-top: calc(var(--sc-space) * 1); padding-bottom: calc(var(--sc-space) * 1); }",
    ".sc-py-md { padding-top: calc(var(--sc-space) * 2); padding-bottom: calc(var(--sc-space) * 2); }",
    ".sc-py-lg { padding-top: calc(var(--sc-space) * 4); padding-bottom: calc(var(--sc-space) * 4); }",
    ".sc-py-xl { padding-top: calc(var(--sc-space) * 6); padding-bottom: calc(var(--sc-space) * 6); }",
    ".sc-px-none { padding-left: 0; padding-right: 0; }",
    ".sc-px-sm { padding-left: calc(var(--sc-space) * 1); padding-right: calc(var(--sc-space) * 1); }",
    ".sc-px-md { padding-left: calc(var(--sc-space) * 2); padding-right: calc(var(--sc-space) * 2); }",
    ".sc-px-lg { padding-left: calc(var(--sc-space) * 4); padding-right: calc(var(--sc-space) * 4); }",
    ".sc-px-xl { padding-left: calc(var(--sc-space) * 6); padding-right: calc(var(--sc-space) * 6); }",
    ".sc-button { display: inline-block; padding: 0.6em 1.2em; border-radius: 0.375rem; background: var(--sc-primary); color: #ffffff; text-decoration: none; }",
    ".sc-hero-centered, .sc-align-center, .sc-cta { text-align: center; }",
    ".sc-hero-split { display: grid; grid-template-columns: repeat(auto-fit, minmax(16rem, 1fr)); gap: calc(var(--sc-space) * 2); align-items: center; }",
    ".sc-gallery, .sc-features, .sc-pricing { display: grid; gap: calc(var(--sc-space) * 1.5); list-style: none; padding: 0; }",
    ".sc-cols-2 { grid-template-columns: repeat(2, 1fr); }",
    ".sc-cols-3 { grid-template-columns: repeat(3, 1fr); }",
    ".sc-cols-4 { grid-template-columns: repeat(4, 1fr); }",
    ".sc-features, .sc-pricing { grid-template-columns: repeat(auto-fit, minmax(14rem, 1fr)); }",
    ".sc-tier { padding: calc(var(--sc-space) * 1.5); border: 1px solid color-mix(in srgb, var(--sc-text) 15%, transparent); border-radius: 0.5rem; }",
    ".sc-highlighted { border-color: var(--sc-secondary); }",
    ".sc-price { font-size: 2rem; font-weight: 700; }",
    ".sc-form { display: grid; gap: var(--sc-space); max-width: 32rem; }",
    ".sc-form input, .sc-form textarea { width: 100%; padding: 0.5em; font: inherit; }",
    ".sc-footer ul { display: flex; flex-wrap: wrap; gap: var(--sc-space); list-style: none; padding: 0; }",
    ".sc-site-footer { padding: calc(var(--sc-space) * 2); text-align: center; font-size: 0.875rem; }",
    ".sc-placeholder { display: none; }",
];

fn compile_style(theme: &ResolvedTheme, ctx: &mut Context) {
    ctx.open("<style>");

    ctx.open(":root {");
    ctx.add_line(&format!("--sc-primary: {};", theme.primary));
    ctx.add_line(&format!("--sc-secondary: {};", theme.secondary));
    ctx.add_line(&format!("--sc-background: {};", theme.background));
    ctx.add_line(&format!("--sc-text: {};", theme.text));
    ctx.add_line(&format!("--sc-heading-font: {};", theme.heading_font));
    ctx.add_line(&format!("--sc-body-font: {};", theme.body_font));
    ctx.add_line(&format!("--sc-space: {};", theme.spacing_unit));
    ctx.close("}");

    for rule in BASE_CSS {
        ctx.add_line(rule);
    }

    ctx.close("</style>");
}

fn compile_header(project: &Project, current: &Page, ctx: &mut Context) {
    ctx.open("<header class=\"sc-header\">");
    ctx.add_line(&format!(
        "<a class=\"sc-brand\" href=\"index.html\">{}</a>",
        escape_html(&project.business_name)
    ));

    let nav: Vec<&Page> = project.pages.iter().filter(|p| p.show_in_nav).collect();
    if !nav.is_empty() {
        ctx.open("<nav class=\"sc-nav\">");
        ctx.open("<ul>");
        for page in nav {
            let current_marker = if page.id == current.id {
                " aria-current=\"page\""
            } else {
                ""
            };
            ctx.add_line(&format!(
                "<li><a href=\"{}\"{}>{}</a></li>",
                escape_html(&page.file_name()),
                current_marker,
                escape_html(&page.title)
            ));
        }
        ctx.close("</ul>");
        ctx.close("</nav>");
    }

    ctx.close("</header>");
}

fn compile_site_footer(project: &Project, ctx: &mut Context) {
    let settings = &project.settings;
    if settings.footer_text.is_none() && settings.white_label {
        return;
    }

    ctx.open("<footer class=\"sc-site-footer\">");
    if let Some(text) = &settings.footer_text {
        ctx.add_line(&format!("<p>{}</p>", escape_html(text)));
    }
    if !settings.white_label {
        ctx.add_line("<p class=\"sc-badge\">Built with Sitecraft</p>");
    }
    ctx.close("</footer>");
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
