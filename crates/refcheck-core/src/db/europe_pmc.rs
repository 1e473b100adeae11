//! Europe PMC adapter: title+author query, used per §4.4 Step 4 as a
//! fallback for European and preprint coverage PubMed misses.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{AdapterFuture, SourceAdapter};
use crate::matching::{text_search_confidence, title_similarity};
use crate::model::{MatchFields, ParsedReference, SourceMatch};

pub struct EuropePmc {
    pub title_match_floor: f64,
}

static SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'\[\](){}:;]"#).unwrap());
static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

impl SourceAdapter for EuropePmc {
    fn name(&self) -> &'static str {
        "Europe PMC"
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

            let clean_title = SPECIAL.replace_all(title, " ");
            let clean_title = WS.replace_all(&clean_title, " ");
            let title_fragment: String = clean_title.chars().take(100).collect();

            let mut query = format!("TITLE:\"{title_fragment}\"");
            if let Some(surname) = crate::authors::surname_set(&reference.authors).into_iter().next() {
                query.push_str(&format!(" AND AUTH:\"{surname}\""));
            }

            let url = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";
            let resp = client
                .get(url)
                .query(&[
                    ("query", query.as_str()),
                    ("format", "json"),
                    ("pageSize", "5"),
                    ("resultType", "core"),
                ])
                .timeout(timeout)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Ok(None);
            }

            let data: serde_json::Value = resp.json().await?;
            let results = data["resultList"]["result"].as_array().cloned().unwrap_or_default();

            for item in &results {
                let fields = parse_result(item);
                let title_sim = title_similarity(Some(title), fields.title.as_deref());
                if title_sim < self.title_match_floor {
                    continue;
                }

                let confidence = text_search_confidence(title_sim, self.title_match_floor);
                if confidence == 0.0 {
                    continue;
                }

                return Ok(Some(SourceMatch::EuropePmc(MatchFields {
                    confidence,
                    ..fields
                })));
            }

            Ok(None)
        })
    }
}

/// Extract the match fields from one Europe PMC search result item.
fn parse_result(item: &serde_json::Value) -> MatchFields {
    let title = item["title"].as_str().map(String::from);

    let author_string = item["authorString"].as_str().unwrap_or("");
    let authors: Vec<String> = author_string
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let year = item["pubYear"].as_str().and_then(|y| y.parse().ok());
    let journal = item["journalInfo"]["journal"]["title"].as_str().map(String::from);
    let doi = item["doi"].as_str().map(String::from);

    MatchFields {
        title,
        authors,
        year,
        journal,
        doi,
        confidence: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_result_extracts_all_fields() {
        let item = json!({
            "title": "Effects of yoga on anxiety",
            "authorString": "Smith J, Jones A, Brown C",
            "pubYear": "2020",
            "journalInfo": {"journal": {"title": "Journal of Wellbeing"}},
            "doi": "10.1000/xyz"
        });
        let fields = parse_result(&item);
        assert_eq!(fields.title.as_deref(), Some("Effects of yoga on anxiety"));
        assert_eq!(fields.authors, vec!["Smith J", "Jones A", "Brown C"]);
        assert_eq!(fields.year, Some(2020));
        assert_eq!(fields.journal.as_deref(), Some("Journal of Wellbeing"));
        assert_eq!(fields.doi.as_deref(), Some("10.1000/xyz"));
    }

    #[test]
    fn parse_result_missing_fields_yield_none() {
        let item = json!({"title": "A lonely title"});
        let fields = parse_result(&item);
        assert_eq!(fields.title.as_deref(), Some("A lonely title"));
        assert!(fields.authors.is_empty());
        assert_eq!(fields.year, None);
        assert_eq!(fields.journal, None);
        assert_eq!(fields.doi, None);
    }

    #[test]
    fn parse_result_empty_author_string_filtered() {
        let item = json!({"authorString": ""});
        let fields = parse_result(&item);
        assert!(fields.authors.is_empty());
    }
}
