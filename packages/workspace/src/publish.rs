//! Static site output: every page of a project rendered to a file.

use sitecraft_compiler_html::{render_with_options, Html, RenderOptions};
use sitecraft_document::Project;
use sitecraft_schema::ProjectId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPage {
    pub html: Html,
    /// CRC32 of the markup, for change detection on upload
    pub hash: String,
}

/// Rendered pages keyed by file name (`index.html`, `{slug}.html`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub project_id: ProjectId,
    pub pages: BTreeMap<String, PublishedPage>,
}

impl Site {
    pub fn page(&self, file_name: &str) -> Option<&PublishedPage> {
        self.pages.get(file_name)
    }

    /// Write every page below `dir`, creating it if needed
    pub fn write_to(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.pages.len());
        for (file_name, page) in &self.pages {
            let path = dir.join(file_name);
            std::fs::write(&path, page.html.as_str())?;
            written.push(path);
        }

        tracing::info!(project = %self.project_id, dir = %dir.display(), pages = written.len(), "site written");
        Ok(written)
    }
}

/// Render all pages of `project`.
///
/// Settings are rendered as given; callers resolve them against the
/// owner's plan first.
pub fn build_site(project: &Project, options: &RenderOptions) -> Site {
    let pages = project
        .pages
        .iter()
        .map(|page| {
            let html = render_with_options(project, page, &project.theme, options.clone());
            let hash = html.content_hash();
            (page.file_name(), PublishedPage { html, hash })
        })
        .collect();

    Site {
        project_id: project.id.clone(),
        pages,
    }
}
