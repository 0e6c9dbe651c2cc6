//! # Sitecraft HTML Renderer
//!
//! Turns one page of a project into a complete, static HTML document.
//!
//! Rendering is a pure function of its inputs: no clock, no randomness, no
//! I/O. A block whose data cannot be rendered is replaced by an invisible
//! placeholder so one bad block never takes the page down with it.
//!
//! ```rust,ignore
//! use sitecraft_compiler_html::render;
//!
//! let page = project.home_page();
//! let html = render(&project, page, &project.theme);
//! std::fs::write(page.file_name(), html.as_str())?;
//! ```

mod blocks;
mod compiler;
mod html;

#[cfg(test)]
mod tests;

pub use compiler::{render, render_block, render_with_options, RenderFault, RenderOptions};
pub use html::Html;
