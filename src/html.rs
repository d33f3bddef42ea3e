use minijinja::{context, AutoEscape, Environment, Value};

use crate::article::Article;
use crate::site::{Result, SiteInfo};

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("article.html", include_str!("../templates/article.html")),
];

/// Resolve an image reference against the relative root of the page it
/// appears on. URLs and absolute paths are returned unchanged.
pub fn asset_url(reference: &str, root: &str) -> String {
    let is_absolute = reference.contains("://")
        || reference.starts_with('/')
        || reference.starts_with("data:");
    if is_absolute {
        reference.to_string()
    } else {
        format!("{}{}", root, reference)
    }
}

fn asset(reference: String, root: String) -> String {
    asset_url(&reference, &root)
}

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// With `escape_html` off, every field is interpolated verbatim.
    /// Article bodies are never escaped.
    pub fn new(escape_html: bool) -> Result<Templates> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(move |name: &str| {
            if escape_html && name.ends_with(".html") {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        env.add_filter("asset", asset);
        for (name, source) in TEMPLATES {
            env.add_template(*name, *source)?;
        }
        Ok(Templates { env })
    }

    /// The home page. Links are relative to the output root.
    pub fn render_index(&self, site: &SiteInfo, articles: &[Article]) -> Result<String> {
        let template = self.env.get_template("index.html")?;
        Ok(template.render(context! {
            site,
            root => Value::from_safe_string(String::new()),
            articles,
        })?)
    }

    /// A detail page, written one level below the output root.
    pub fn render_article(&self, site: &SiteInfo, article: &Article) -> Result<String> {
        let template = self.env.get_template("article.html")?;
        Ok(template.render(context! {
            site,
            root => Value::from_safe_string("../".to_string()),
            article,
        })?)
    }
}
