//! OpenAlex adapter: direct-DOI GET and free-text title search, used per
//! §4.4 Step 5 as a last resort for non-biomedical literature.

use std::time::Duration;

use super::{AdapterFuture, SourceAdapter, user_agent};
use crate::matching::{text_search_confidence, title_similarity};
use crate::model::{MatchFields, ParsedReference, SourceMatch};

pub struct OpenAlex {
    pub email: Option<String>,
    pub title_match_floor: f64,
}

fn parse_work(item: &serde_json::Value) -> MatchFields {
    let title = item["title"].as_str().map(String::from);

    let authors: Vec<String> = item["authorships"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["author"]["display_name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let year = item["publication_year"].as_i64().map(|y| y as i32);

    let journal = item["primary_location"]["source"]["display_name"]
        .as_str()
        .map(String::from);

    let doi = item["doi"]
        .as_str()
        .map(|d| d.trim_start_matches("https://doi.org/").to_string());

    MatchFields {
        title,
        authors,
        year,
        journal,
        doi,
        confidence: 0.0,
    }
}

impl SourceAdapter for OpenAlex {
    fn name(&self) -> &'static str {
        "OpenAlex"
    }

    fn lookup_by_doi<'a>(
        &'a self,
        doi: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> AdapterFuture<'a, SourceMatch> {
        Box::pin(async move {
            let url = format!("https://api.openalex.org/works/doi:{}", urlencoding::encode(doi));
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
            let mut fields = parse_work(&data);
            fields.confidence = 0.95;
            Ok(Some(SourceMatch::OpenAlex(fields)))
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

            let url = format!(
                "https://api.openalex.org/works?search={}&per_page=5",
                urlencoding::encode(title)
            );

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
            let results = data["results"].as_array().cloned().unwrap_or_default();

            for item in results.iter().take(5) {
                let mut fields = parse_work(item);
                let title_sim = title_similarity(Some(title), fields.title.as_deref());
                if title_sim < self.title_match_floor {
                    continue;
                }
                // Require the first author's surname to actually appear.
                let first_author_surname = crate::authors::surname_set(&reference.authors)
                    .into_iter()
                    .next();
                if let Some(surname) = &first_author_surname {
                    let appears = fields
                        .authors
                        .iter()
                        .any(|a| a.to_lowercase().contains(&surname.to_lowercase()));
                    if !appears {
                        continue;
                    }
                }

                fields.confidence = text_search_confidence(title_sim, self.title_match_floor);
                if fields.confidence == 0.0 {
                    continue;
                }
                return Ok(Some(SourceMatch::OpenAlex(fields)));
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
    fn parse_work_extracts_all_fields() {
        let item = json!({
            "title": "Effects of yoga on anxiety",
            "authorships": [
                {"author": {"display_name": "Jane Smith"}},
                {"author": {"display_name": "Alan Jones"}},
            ],
            "publication_year": 2020,
            "primary_location": {"source": {"display_name": "Journal of Wellbeing"}},
            "doi": "https://doi.org/10.1000/xyz",
        });
        let fields = parse_work(&item);
        assert_eq!(fields.title.as_deref(), Some("Effects of yoga on anxiety"));
        assert_eq!(fields.authors, vec!["Jane Smith", "Alan Jones"]);
        assert_eq!(fields.year, Some(2020));
        assert_eq!(fields.journal.as_deref(), Some("Journal of Wellbeing"));
        assert_eq!(fields.doi.as_deref(), Some("10.1000/xyz"));
    }

    #[test]
    fn parse_work_missing_fields_yield_none() {
        let item = json!({});
        let fields = parse_work(&item);
        assert_eq!(fields.title, None);
        assert!(fields.authors.is_empty());
        assert_eq!(fields.year, None);
        assert_eq!(fields.journal, None);
        assert_eq!(fields.doi, None);
    }

    #[test]
    fn parse_work_doi_without_url_prefix_passes_through() {
        let item = json!({"doi": "10.1000/abc"});
        let fields = parse_work(&item);
        assert_eq!(fields.doi.as_deref(), Some("10.1000/abc"));
    }
}
