#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::Path;

use log::info;
use regex::Regex;
use tera::{Context, Tera, Value};

use crate::utils::errors::Errors;
use crate::wiki::page::Page;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Built-in templates, used when no template directory is configured.
const BUILTIN_VIEW : &str = include_str!("../../templates/view.html");
const BUILTIN_EDIT : &str = include_str!("../../templates/edit.html");

const WIKILINKS_FILTER  : &str = "wikilinks";
const WIKILINK_PATTERN  : &str = r"\[([a-zA-Z0-9]+)\]";
const WIKILINK_REPLACE  : &str = r#"<a href="/view/$1">$1</a>"#;

// ***************************************************************************
//                                  View
// ***************************************************************************
/// The logical views a page can be rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    View,
    Edit,
}

impl View {
    pub const ALL: [View; 2] = [View::View, View::Edit];

    /// Template names end in .html so that tera autoescapes them.
    pub fn template_name(self) -> &'static str {
        match self {
            View::View => "view.html",
            View::Edit => "edit.html",
        }
    }
}

// ***************************************************************************
//                            TemplateRegistry
// ***************************************************************************
/** The parsed view and edit templates.  Built once at startup and never
 * modified afterwards.
 */
#[derive(Debug)]
pub struct TemplateRegistry {
    tera: Tera,
}

impl TemplateRegistry {
    /// Use the templates compiled into the binary.
    pub fn builtin() -> Result<Self, Errors> {
        let mut tera = Self::new_tera()?;
        tera.add_raw_templates(vec![
            (View::View.template_name(), BUILTIN_VIEW),
            (View::Edit.template_name(), BUILTIN_EDIT),
        ])?;
        info!("Using built-in page templates.");
        Ok(TemplateRegistry { tera })
    }

    /// Load `view.html` and `edit.html` from a directory.  Both must exist.
    pub fn from_dir(dir: &Path) -> Result<Self, Errors> {
        let mut tera = Self::new_tera()?;
        let files: Vec<_> = View::ALL
            .iter()
            .map(|v| (dir.join(v.template_name()), Some(v.template_name())))
            .collect();
        for (path, _) in &files {
            if !path.is_file() {
                return Err(Errors::WikiError(format!("Missing template file: {}", path.display())));
            }
        }
        tera.add_template_files(files)?;
        info!("Loaded page templates from {}.", dir.display());
        Ok(TemplateRegistry { tera })
    }

    /// Render a page.  Titles and bodies are always HTML escaped.
    pub fn render(&self, view: View, page: &Page) -> Result<String, Errors> {
        let mut context = Context::new();
        context.insert("title", page.title.as_str());
        context.insert("body", &String::from_utf8_lossy(&page.body));
        Ok(self.tera.render(view.template_name(), &context)?)
    }

    fn new_tera() -> Result<Tera, Errors> {
        let re = Regex::new(WIKILINK_PATTERN)
            .map_err(|e| Errors::WikiError(format!("Invalid wiki link pattern: {}", e)))?;
        let mut tera = Tera::default();
        tera.register_filter(WIKILINKS_FILTER, WikiLinks { re });
        Ok(tera)
    }
}

// ***************************************************************************
//                             WikiLinks Filter
// ***************************************************************************
/** Escapes its input and then turns `[PageName]` into a link to that page.
 * Because escaping happens first, the only markup in the output is the
 * generated anchors.
 */
struct WikiLinks {
    re: Regex,
}

impl tera::Filter for WikiLinks {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let s = value
            .as_str()
            .ok_or_else(|| tera::Error::msg("Filter `wikilinks` expects a string"))?;
        let escaped = tera::escape_html(s);
        Ok(Value::String(self.re.replace_all(&escaped, WIKILINK_REPLACE).into_owned()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}
