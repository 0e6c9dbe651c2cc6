//! Project aggregate: pages, theme, SEO and site settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitecraft_schema::{Block, BlockId, CustomerId, PageId, ProjectId, Theme, ThemeOverrides};

/// Search/social metadata for a page or the whole site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Seo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_image: Option<String>,
}

/// Site-wide settings. Each one is only honoured when the owner's plan
/// enables the matching feature; resolution happens before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteSettings {
    /// Hide the builder badge in the page footer
    #[serde(default)]
    pub white_label: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Page {
    pub id: PageId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub is_home_page: bool,
    #[serde(default = "default_show_in_nav")]
    pub show_in_nav: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<Seo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_override: Option<ThemeOverrides>,
    /// Render order, top to bottom
    #[serde(default)]
    pub blocks: Vec<Block>,
}

fn default_show_in_nav() -> bool {
    true
}

impl Page {
    pub fn new(id: impl Into<PageId>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: title.into(),
            is_home_page: false,
            show_in_nav: true,
            seo: None,
            theme_override: None,
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, block_id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == block_id)
    }

    pub fn block_position(&self, block_id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == block_id)
    }

    /// File name the page is published under
    pub fn file_name(&self) -> String {
        if self.is_home_page {
            "index.html".to_string()
        } else {
            format!("{}.html", self.slug)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Project {
    pub id: ProjectId,
    pub customer_id: CustomerId,
    pub business_name: String,
    #[serde(default)]
    pub seo: Seo,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub settings: SiteSettings,
    /// Number of block ids handed out; ids are never reused
    #[serde(default)]
    pub block_sequence: u64,
    /// Tombstone; a deleted project is kept for billing and audit history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    /// New project with a single, empty home page
    pub fn new(
        id: impl Into<ProjectId>,
        customer_id: impl Into<CustomerId>,
        business_name: impl Into<String>,
    ) -> Self {
        let mut home = Page::new("home", "home", "Home");
        home.is_home_page = true;

        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            business_name: business_name.into(),
            seo: Seo::default(),
            pages: vec![home],
            theme: Theme::default(),
            settings: SiteSettings::default(),
            block_sequence: 0,
            deleted_at: None,
        }
    }

    pub fn page(&self, page_id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| &p.id == page_id)
    }

    pub fn page_by_slug(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    pub fn home_page(&self) -> Option<&Page> {
        self.pages.iter().find(|p| p.is_home_page)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Slugs no page may take; the home page is published as `index.html`
pub const RESERVED_SLUGS: &[&str] = &["index"];

/// Slugs are lowercase ASCII letters, digits and inner hyphens, and not
/// one of [`RESERVED_SLUGS`]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !RESERVED_SLUGS.contains(&slug)
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_has_home_page() {
        let project = Project::new("p-1", "c-1", "Acme Bakery");
        let home = project.home_page().unwrap();
        assert_eq!(home.slug, "home");
        assert_eq!(home.file_name(), "index.html");
        assert_eq!(project.pages.len(), 1);
        assert!(!project.is_deleted());
    }

    #[test]
    fn test_project_json_shape() {
        let json = r##"{
            "id": "p-1",
            "customerId": "c-1",
            "businessName": "Acme",
            "pages": [
                { "id": "home", "slug": "home", "title": "Home", "isHomePage": true,
                  "blocks": [ { "id": "b-1", "type": "text", "data": { "content": "Hi" } } ] }
            ],
            "theme": { "palette": { "primary": "#ff0000" } }
        }"##;

        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.pages[0].blocks.len(), 1);
        assert!(project.pages[0].show_in_nav);
        assert_eq!(project.block_sequence, 0);
    }

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("about"));
        assert!(is_valid_slug("our-team-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("About"));
        assert!(!is_valid_slug("-about"));
        assert!(!is_valid_slug("about us"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("index"));
        assert!(is_valid_slug("index-2"));
    }

    #[test]
    fn test_file_names_are_distinct() {
        let mut project = Project::new("p-1", "c-1", "Acme");
        project.pages.push(Page::new("about", "about", "About"));

        let names: Vec<String> = project.pages.iter().map(Page::file_name).collect();
        assert_eq!(names, vec!["index.html", "about.html"]);
    }
}
