//! View rendering for the HTML controller.

use anyhow::{anyhow, Context};
use minijinja::{AutoEscape, Environment};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Renders a named view (`<resource>/<view>`) with a JSON context.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, context: &JsonValue) -> anyhow::Result<String>;
}

/// Loads `<base_dir>/<view>.html` and renders it with minijinja.
pub struct TemplateDir {
    base_dir: PathBuf,
}

impl TemplateDir {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    fn map_path(&self, view: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(view.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        pb.set_extension("html");
        Some(pb)
    }
}

impl ViewRenderer for TemplateDir {
    fn render(&self, view: &str, context: &JsonValue) -> anyhow::Result<String> {
        let path = self
            .map_path(view)
            .ok_or_else(|| anyhow!("invalid view path '{}'", view))?;
        let source = fs::read_to_string(&path)
            .with_context(|| format!("reading view {}", path.display()))?;

        // View names carry no extension, so escaping is forced rather than inferred.
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(view, &source)?;
        let rendered = env.get_template(view)?.render(context)?;
        Ok(rendered)
    }
}
