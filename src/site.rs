pub use anyhow::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use log::*;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::article::{self, Article, ArticleRecord};
use crate::feed;
use crate::html::Templates;

const STYLESHEET: &str = include_str!("../assets/styles.css");

const DEFAULTS: &[(&str, &str)] = &[
    ("output_dir", "dist"),
    ("data_file", "articles.json"),
    ("images_dir", "images"),
    ("site_title", "Newsroom"),
    ("site_description", "Latest articles"),
    ("site_url", ""),
    ("escape_html", "false"),
];

#[derive(Debug, Default)]
pub struct Config(BTreeMap<String, String>);

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Ok(Config(toml::from_str(&s).with_context(|| {
            format!("invalid config: {}", path.display())
        })?))
    }

    /// Like `read`, but a missing file yields an empty config.
    pub fn read_if_exists(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if path.exists() {
            Config::read(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn extend(&mut self, config: &mut Config) {
        self.0.append(&mut config.0);
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(v) => v.as_str(),
            None => DEFAULTS
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .unwrap_or(""),
        }
    }

    fn get_bool(&self, key: &str) -> bool {
        self.get(key) == "true"
    }
}

/// Site-wide values available to every template.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Default)]
pub struct SiteInfo {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl SiteInfo {
    pub fn new(config: &Config) -> SiteInfo {
        SiteInfo {
            title: config.get("site_title").to_string(),
            description: config.get("site_description").to_string(),
            url: config.get("site_url").trim_end_matches('/').to_string(),
        }
    }

    /// `path` relative to the site root, made absolute when `url` is set.
    pub fn link(&self, path: &str) -> String {
        if self.url.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.url, path)
        }
    }
}

/// A rendered file, with its path relative to the output directory.
#[derive(PartialEq, Eq, Debug)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

impl OutputFile {
    fn new(path: impl Into<PathBuf>, contents: String) -> OutputFile {
        OutputFile {
            path: path.into(),
            contents,
        }
    }
}

pub fn load_articles(records: &[ArticleRecord], build_time: DateTime<Utc>) -> Vec<Article> {
    let mut articles = records
        .par_iter()
        .map(|r| Article::new(r, build_time))
        .collect::<Vec<_>>();
    article::sort_newest_first(&mut articles);

    let mut seen = HashSet::new();
    for a in &articles {
        if !seen.insert(a.slug.as_str()) {
            warn!("{:32} => duplicate slug, only one page will be written", a.slug);
        }
    }
    articles
}

/// Remove `dir` and everything below it, then create it again empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("failed to remove {}", dir.display()));
        }
    }
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(())
}

/// Copy every file below `src_dir` into `out_dir`, keeping relative paths.
/// A missing `src_dir` is skipped with a warning.
pub fn copy_images(src_dir: &Path, out_dir: &Path) -> Result<usize> {
    if !src_dir.is_dir() {
        warn!("No images directory at {}, skipped", src_dir.display());
        return Ok(0);
    }
    info!("Copy images: {} => {}", src_dir.display(), out_dir.display());
    let mut copied = 0;
    for entry in walkdir::WalkDir::new(src_dir) {
        let entry = entry?;
        let src_path = entry.path();
        let relative_path = src_path.strip_prefix(src_dir)?;
        let out_path = out_dir.join(relative_path);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            debug!("{:32} => {}", relative_path.display(), out_path.display());
            std::fs::copy(src_path, &out_path)
                .with_context(|| format!("failed to copy {}", src_path.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub struct Site {
    config: Config,
    root_dir: PathBuf,
    out_dir: PathBuf,
    build_time: DateTime<Utc>,
}

impl Site {
    /// `out_dir` defaults to the configured `output_dir` below `root_dir`.
    pub fn new(
        config: Config,
        root_dir: PathBuf,
        out_dir: Option<PathBuf>,
        build_time: DateTime<Utc>,
    ) -> Site {
        let out_dir = out_dir.unwrap_or_else(|| root_dir.join(config.get("output_dir")));
        Site {
            config,
            root_dir,
            out_dir,
            build_time,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn build(&self) -> Result<()> {
        let records = self.read_records()?;
        info!("Found {} articles", records.len());

        let articles = load_articles(&records, self.build_time);
        let files = self.render(&articles)?;

        self.write(&files)?;
        copy_images(
            &self.root_dir.join(self.config.get("images_dir")),
            &self.out_dir.join("images"),
        )?;
        info!("Built {} files into {}", files.len(), self.out_dir.display());
        Ok(())
    }

    /// Read the article records. A missing, unreadable, or empty data file
    /// yields the sample article; malformed JSON is an error.
    pub fn read_records(&self) -> Result<Vec<ArticleRecord>> {
        let path = self.root_dir.join(self.config.get("data_file"));
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot read {} ({}), using a sample article", path.display(), e);
                return Ok(vec![ArticleRecord::sample()]);
            }
        };
        if s.trim().is_empty() {
            warn!("{} is empty, using a sample article", path.display());
            return Ok(vec![ArticleRecord::sample()]);
        }
        let records: Vec<ArticleRecord> = serde_json::from_str(&s)
            .with_context(|| format!("invalid article data: {}", path.display()))?;
        if records.is_empty() {
            warn!("{} has no articles, using a sample article", path.display());
            return Ok(vec![ArticleRecord::sample()]);
        }
        Ok(records)
    }

    /// Render every output file. `articles` must already be sorted.
    pub fn render(&self, articles: &[Article]) -> Result<Vec<OutputFile>> {
        let site = SiteInfo::new(&self.config);
        let templates = Templates::new(self.config.get_bool("escape_html"))?;

        info!("Render pages");
        let mut files = vec![
            OutputFile::new("index.html", templates.render_index(&site, articles)?),
            OutputFile::new(
                "feed.xml",
                feed::render_feed(&site, articles, self.build_time)?,
            ),
            OutputFile::new("styles.css", STYLESHEET.to_string()),
        ];
        let pages = articles
            .par_iter()
            .map(|a| -> Result<OutputFile> {
                Ok(OutputFile::new(a.url(), templates.render_article(&site, a)?))
            })
            .collect::<Result<Vec<OutputFile>>>()?;
        files.extend(pages);
        Ok(files)
    }

    fn write(&self, files: &[OutputFile]) -> Result<()> {
        self.check_out_dir()?;
        reset_dir(&self.out_dir)?;
        std::fs::create_dir_all(self.out_dir.join("articles"))?;
        files.par_iter().try_for_each(|file| -> Result<()> {
            let out_file = self.out_dir.join(&file.path);
            debug!("{:32} => {}", file.path.display(), out_file.display());
            std::fs::write(&out_file, &file.contents)
                .with_context(|| format!("failed to write {}", out_file.display()))
        })
    }

    /// The output directory is wiped on every build, so it must not contain
    /// the site root.
    fn check_out_dir(&self) -> Result<()> {
        let (Ok(root), Ok(out)) = (self.root_dir.canonicalize(), self.out_dir.canonicalize()) else {
            return Ok(());
        };
        if root.starts_with(&out) {
            bail!(
                "output directory {} contains the site root {}",
                self.out_dir.display(),
                self.root_dir.display()
            );
        }
        Ok(())
    }
}
