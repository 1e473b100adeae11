//! CrossRef adapter: direct-DOI GET and title+author search.

use std::time::Duration;

use super::{AdapterFuture, SourceAdapter, user_agent};
use crate::matching::{author_similarity, search_confidence, title_similarity, titles_match,
    year_similarity};
use crate::model::{MatchFields, ParsedReference, SourceMatch};

pub struct CrossRef {
    pub email: Option<String>,
    pub title_match_floor: f64,
}

fn parse_item(item: &serde_json::Value) -> MatchFields {
    let title = item["title"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(String::from);

    let authors: Vec<String> = item["author"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|a| {
                    let given = a["given"].as_str().unwrap_or("");
                    let family = a["family"].as_str().unwrap_or("");
                    format!("{given} {family}").trim().to_string()
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let year = item["published"]["date-parts"][0][0]
        .as_i64()
        .or_else(|| item["published-print"]["date-parts"][0][0].as_i64())
        .map(|y| y as i32);

    let journal = item["container-title"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(String::from);

    let doi = item["DOI"].as_str().map(String::from);

    MatchFields {
        title,
        authors,
        year,
        journal,
        doi,
        confidence: 0.0,
    }
}

impl SourceAdapter for CrossRef {
    fn name(&self) -> &'static str {
        "CrossRef"
    }

    fn lookup_by_doi<'a>(
        &'a self,
        doi: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> AdapterFuture<'a, SourceMatch> {
        Box::pin(async move {
            let url = format!("https://api.crossref.org/works/{}", urlencoding::encode(doi));
            let resp = client
                .get(&url)
                .header("User-Agent", user_agent(self.email.as_deref()))
                .timeout(timeout)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Ok(None);
            }

            let data: serde_json::Value = resp.json().await?;
            let mut fields = parse_item(&data["message"]);
            // Direct DOI hits represent identity, not similarity.
            fields.confidence = 0.95;
            Ok(Some(SourceMatch::CrossRef(fields)))
        })
    }

    fn search<'a>(
        &'a self,
        reference: &'a ParsedReference,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> AdapterFuture<'a, SourceMatch> {
        Box::pin(async move {
            let Some(title) = &reference.title else {
                return Ok(None);
            };
            let first_author = reference.authors.first().map(String::as_str).unwrap_or("");

            let mut url = format!(
                "https://api.crossref.org/works?query.title={}&rows=5",
                urlencoding::encode(title)
            );
            if !first_author.is_empty() {
                url.push_str(&format!("&query.author={}", urlencoding::encode(first_author)));
            }
            if let Some(email) = &self.email {
                url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
            }

            let resp = client
                .get(&url)
                .header("User-Agent", user_agent(self.email.as_deref()))
                .timeout(timeout)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Ok(None);
            }

            let data: serde_json::Value = resp.json().await?;
            let items = data["message"]["items"].as_array().cloned().unwrap_or_default();

            for item in items {
                let mut fields = parse_item(&item);
                let found_title = fields.title.as_deref().unwrap_or("");
                if !titles_match(title, found_title) {
                    continue;
                }
                // CrossRef occasionally returns a title match with no author
                // data; let other sources verify instead of a false mismatch.
                if fields.authors.is_empty() {
                    continue;
                }

                let title_sim = title_similarity(Some(title), fields.title.as_deref());
                let author_sim = author_similarity(&reference.authors, &fields.authors);
                let year_sim = year_similarity(reference.year, fields.year);
                fields.confidence =
                    search_confidence(title_sim, author_sim, year_sim, self.title_match_floor);
                if fields.confidence == 0.0 {
                    continue;
                }
                return Ok(Some(SourceMatch::CrossRef(fields)));
            }

            Ok(None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_item_extracts_all_fields() {
        let item = json!({
            "title": ["Effects of yoga on anxiety"],
            "author": [
                {"given": "Jane", "family": "Smith"},
                {"given": "", "family": "Jones"},
            ],
            "published": {"date-parts": [[2020, 3]]},
            "container-title": ["Journal of Wellbeing"],
            "DOI": "10.1000/xyz",
        });
        let fields = parse_item(&item);
        assert_eq!(fields.title.as_deref(), Some("Effects of yoga on anxiety"));
        assert_eq!(fields.authors, vec!["Jane Smith", "Jones"]);
        assert_eq!(fields.year, Some(2020));
        assert_eq!(fields.journal.as_deref(), Some("Journal of Wellbeing"));
        assert_eq!(fields.doi.as_deref(), Some("10.1000/xyz"));
    }

    #[test]
    fn parse_item_falls_back_to_published_print_date() {
        let item = json!({
            "published-print": {"date-parts": [[2018]]},
        });
        let fields = parse_item(&item);
        assert_eq!(fields.year, Some(2018));
    }

    #[test]
    fn parse_item_missing_fields_yield_none() {
        let item = json!({});
        let fields = parse_item(&item);
        assert_eq!(fields.title, None);
        assert!(fields.authors.is_empty());
        assert_eq!(fields.year, None);
        assert_eq!(fields.journal, None);
        assert_eq!(fields.doi, None);
    }
}
