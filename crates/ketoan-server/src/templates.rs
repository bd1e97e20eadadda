//! Embedded page templates.

use include_dir::{Dir, File, include_dir};
use ketoan_session::Flash;
use minijinja::{Environment, Value, context};
use serde::Serialize;

use crate::pages::{Page, navigation};

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Per-render data every page template receives on top of the globals.
#[derive(Debug, Default, Serialize)]
pub struct PageContext {
    pub username: Option<String>,
    pub flashes: Vec<Flash>,
}

/// Renders the embedded Jinja templates.
///
/// Globals available to every template: `BACKEND_URL` and `NAV` (the menu).
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new(backend_url: &str) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        let mut loaded = 0usize;
        for file in embedded_files(&TEMPLATES) {
            let (Some(name), Some(source)) = (file.path().to_str(), file.contents_utf8()) else {
                tracing::warn!(path = ?file.path(), "Skipping non UTF-8 template");
                continue;
            };
            env.add_template(name, source)?;
            loaded += 1;
        }
        env.add_global("BACKEND_URL", backend_url.to_string());
        env.add_global("NAV", Value::from_serialize(navigation()));

        tracing::debug!(templates = loaded, "Templates loaded");
        Ok(Self { env })
    }

    pub fn render(&self, page: Page, ctx: &PageContext) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(&page.template())?;
        template.render(context! {
            page => page.key(),
            title => page.title(),
            username => &ctx.username,
            flashes => &ctx.flashes,
        })
    }
}

fn embedded_files(dir: &'static Dir<'static>) -> Vec<&'static File<'static>> {
    let mut files: Vec<_> = dir.files().collect();
    for sub in dir.dirs() {
        files.extend(embedded_files(sub));
    }
    files
}
