use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::article::Article;
use crate::site::SiteInfo;

/// Maximum number of items in the feed.
pub const FEED_LIMIT: usize = 20;

const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Wrap `s` in a CDATA section. A `]]>` inside `s` is split across two
/// sections.
pub fn cdata(s: &str) -> String {
    format!("<![CDATA[{}]]>", s.replace("]]>", "]]]]><![CDATA[>"))
}

fn rfc822(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// An RSS 2.0 document listing the first `FEED_LIMIT` of `articles`, which
/// must already be sorted newest first.
pub fn render_feed(
    site: &SiteInfo,
    articles: &[Article],
    build_time: DateTime<Utc>,
) -> Result<String, std::fmt::Error> {
    let mut xml = String::new();
    writeln!(&mut xml, "{XML_PROLOG}")?;
    writeln!(&mut xml, r#"<rss version="2.0">"#)?;
    writeln!(&mut xml, "  <channel>")?;
    writeln!(&mut xml, "    <title>{}</title>", cdata(&site.title))?;
    writeln!(
        &mut xml,
        "    <description>{}</description>",
        cdata(&site.description)
    )?;
    writeln!(&mut xml, "    <link>{}</link>", site.link("index.html"))?;
    writeln!(
        &mut xml,
        "    <lastBuildDate>{}</lastBuildDate>",
        rfc822(&build_time)
    )?;

    for article in articles.iter().take(FEED_LIMIT) {
        let link = site.link(&article.url());
        writeln!(&mut xml, "    <item>")?;
        writeln!(&mut xml, "      <title>{}</title>", cdata(&article.title))?;
        writeln!(&mut xml, "      <link>{link}</link>")?;
        writeln!(
            &mut xml,
            "      <description>{}</description>",
            cdata(&article.excerpt)
        )?;
        if let Some(category) = article.category.as_ref() {
            writeln!(&mut xml, "      <category>{}</category>", cdata(category))?;
        }
        writeln!(&mut xml, "      <pubDate>{}</pubDate>", rfc822(&article.date))?;
        writeln!(
            &mut xml,
            r#"      <guid isPermaLink="{}">{link}</guid>"#,
            !site.url.is_empty()
        )?;
        writeln!(&mut xml, "    </item>")?;
    }

    writeln!(&mut xml, "  </channel>")?;
    write!(&mut xml, "</rss>")?;
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{self, ArticleRecord};
    use chrono::TimeZone;

    fn build_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    fn site(url: &str) -> SiteInfo {
        SiteInfo {
            title: "Daily".to_string(),
            description: "All the news".to_string(),
            url: url.to_string(),
        }
    }

    fn article(title: &str, date: Option<&str>) -> Article {
        let record = ArticleRecord {
            title: Some(title.to_string()),
            content: Some(format!("About {}", title)),
            date: date.map(str::to_string),
            ..Default::default()
        };
        Article::new(&record, build_time())
    }

    #[test]
    fn cdata_test() {
        assert_eq!(cdata("Test"), "<![CDATA[Test]]>");
        assert_eq!(cdata("a < b & c"), "<![CDATA[a < b & c]]>");
        assert_eq!(cdata("x]]>y"), "<![CDATA[x]]]]><![CDATA[>y]]>");
    }

    #[test]
    fn render_feed_test() {
        let articles = vec![article("Test", Some("2024-01-01T00:00:00Z"))];
        let xml = render_feed(&site(""), &articles, build_time()).unwrap();

        assert!(xml.starts_with(XML_PROLOG));
        assert!(xml.contains("<title><![CDATA[Daily]]></title>"));
        assert!(xml.contains("<lastBuildDate>Sat, 01 Jun 2030 12:00:00 GMT</lastBuildDate>"));
        assert!(xml.contains("<title><![CDATA[Test]]></title>"));
        assert!(xml.contains("<link>articles/test.html</link>"));
        assert!(xml.contains("<description><![CDATA[About Test]]></description>"));
        assert!(xml.contains("<pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>"));
        assert!(xml.contains(r#"<guid isPermaLink="false">articles/test.html</guid>"#));
        assert!(!xml.contains("<category>"));
        assert!(xml.ends_with("</rss>"));
    }

    #[test]
    fn absolute_links_test() {
        let mut a = article("Test", None);
        a.category = Some("Tech".to_string());
        let xml = render_feed(&site("https://example.com"), &[a], build_time()).unwrap();
        assert!(xml.contains("<link>https://example.com/index.html</link>"));
        assert!(xml.contains("<link>https://example.com/articles/test.html</link>"));
        assert!(xml.contains(
            r#"<guid isPermaLink="true">https://example.com/articles/test.html</guid>"#
        ));
        assert!(xml.contains("<category><![CDATA[Tech]]></category>"));
        // Undated articles carry the build time.
        assert!(xml.contains("<pubDate>Sat, 01 Jun 2030 12:00:00 GMT</pubDate>"));
    }

    #[test]
    fn feed_limit_test() {
        let mut articles = (1..=25)
            .map(|n| article(&format!("Post {n}"), Some(format!("2024-02-{n:02}").as_str())))
            .collect::<Vec<_>>();
        article::sort_newest_first(&mut articles);
        let xml = render_feed(&site(""), &articles, build_time()).unwrap();

        assert_eq!(xml.matches("<item>").count(), FEED_LIMIT);
        for n in 6..=25 {
            assert!(xml.contains(&format!("articles/post-{n}.html")), "post {}", n);
        }
        for n in 1..=5 {
            assert!(!xml.contains(&format!("articles/post-{n}.html")), "post {}", n);
        }
    }

    #[test]
    fn markup_in_title_stays_inside_cdata_test() {
        let a = article("<b>Bold</b> & brave", None);
        let xml = render_feed(&site(""), &[a], build_time()).unwrap();
        assert!(xml.contains("<title><![CDATA[<b>Bold</b> & brave]]></title>"));
    }
}
