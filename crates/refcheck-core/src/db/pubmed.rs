//! PubMed adapter: NCBI E-utilities `esearch` + `esummary`, always
//! executed per §4.4 Step 2, rate-limited to ≤3 req/s with 2/4/6 s backoff
//! on 429.

use std::time::Duration;

use super::{AdapterFuture, SourceAdapter};
use crate::matching::{author_similarity, search_confidence, title_similarity, titles_match,
    year_similarity};
use crate::model::{MatchFields, ParsedReference, SourceMatch};
use crate::rate_limit::{AdaptiveDbLimiter, DbQueryError, check_rate_limit_response,
    with_pubmed_backoff};

pub struct PubMed {
    pub email: Option<String>,
    pub title_match_floor: f64,
    pub limiter: AdaptiveDbLimiter,
}

impl PubMed {
    pub fn new(email: Option<String>, title_match_floor: f64) -> Self {
        Self {
            email,
            title_match_floor,
            limiter: AdaptiveDbLimiter::per_second(3),
        }
    }

    fn user_agent(&self) -> String {
        super::user_agent(self.email.as_deref())
    }

    /// First five words of the title, used when the full-title query finds
    /// nothing — a cheap broadening step before giving up.
    fn title_words(title: &str, n: usize) -> String {
        title.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
    }
}

impl SourceAdapter for PubMed {
    fn name(&self) -> &'static str {
        "PubMed"
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

            let mut term = build_term(title, &reference.authors, reference.year);
            let mut id_list = self.esearch(&term, client, timeout).await?;

            if id_list.is_empty() {
                term = build_term(&Self::title_words(title, 5), &[], None);
                id_list = self.esearch(&term, client, timeout).await?;
            }

            if id_list.is_empty() {
                return Ok(None);
            }

            let items = self.esummary(&id_list, client, timeout).await?;

            for pmid in &id_list {
                let item = &items[pmid];
                let found_title = item["title"].as_str().map(String::from);
                let found_title_str = found_title.clone().unwrap_or_default();
                if !titles_match(title, &found_title_str) {
                    continue;
                }

                let authors: Vec<String> = item["authors"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|a| a["name"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();

                let year = item["pubdate"]
                    .as_str()
                    .and_then(|d| d.split_whitespace().next())
                    .and_then(|y| y.parse().ok());

                let journal = item["fulljournalname"].as_str().map(String::from);

                let title_sim = title_similarity(Some(title), found_title.as_deref());
                let author_sim = author_similarity(&reference.authors, &authors);
                let year_sim = year_similarity(reference.year, year);
                let confidence =
                    search_confidence(title_sim, author_sim, year_sim, self.title_match_floor);
                if confidence == 0.0 {
                    continue;
                }

                return Ok(Some(SourceMatch::PubMed {
                    fields: MatchFields {
                        title: found_title,
                        authors,
                        year,
                        journal,
                        doi: None,
                        confidence,
                    },
                    pmid: pmid.clone(),
                }));
            }

            Ok(None)
        })
    }
}

impl PubMed {
    async fn esearch(
        &self,
        term: &str,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Vec<String>, DbQueryError> {
        let url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
        let user_agent = self.user_agent();

        let data = with_pubmed_backoff(&self.limiter, || async {
            let resp = client
                .get(url)
                .query(&[
                    ("db", "pubmed"),
                    ("term", term),
                    ("retmode", "json"),
                    ("retmax", "10"),
                    ("sort", "relevance"),
                ])
                .header("User-Agent", &user_agent)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| DbQueryError::Other(e.to_string()))?;

            check_rate_limit_response(&resp)?;
            if !resp.status().is_success() {
                return Err(DbQueryError::Other(format!("HTTP {}", resp.status())));
            }
            resp.json::<serde_json::Value>()
                .await
                .map_err(|e| DbQueryError::Other(e.to_string()))
        })
        .await?;

        Ok(data["esearchresult"]["idlist"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default())
    }

    async fn esummary(
        &self,
        ids: &[String],
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<serde_json::Value, DbQueryError> {
        let url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";
        let joined = ids.join(",");
        let user_agent = self.user_agent();

        let data = with_pubmed_backoff(&self.limiter, || async {
            let resp = client
                .get(url)
                .query(&[("db", "pubmed"), ("id", joined.as_str()), ("retmode", "json")])
                .header("User-Agent", &user_agent)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| DbQueryError::Other(e.to_string()))?;

            check_rate_limit_response(&resp)?;
            if !resp.status().is_success() {
                return Err(DbQueryError::Other(format!("HTTP {}", resp.status())));
            }
            resp.json::<serde_json::Value>()
                .await
                .map_err(|e| DbQueryError::Other(e.to_string()))
        })
        .await?;

        Ok(data["result"].clone())
    }
}

/// Build an esearch term from title phrase, first author, and year.
fn build_term(title: &str, authors: &[String], year: Option<i32>) -> String {
    let mut parts = vec![format!("{title}[Title]")];
    if let Some(surname) = crate::authors::surname_set(authors).into_iter().next() {
        parts.push(format!("{surname}[Author]"));
    }
    if let Some(year) = year {
        parts.push(format!("{year}[pdat]"));
    }
    parts.join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_includes_title_author_year() {
        let term = build_term("Effects of yoga", &["Smith, J.".to_string()], Some(2020));
        assert!(term.contains("Effects of yoga[Title]"));
        assert!(term.contains("smith[Author]"));
        assert!(term.contains("2020[pdat]"));
    }

    #[test]
    fn term_without_authors_or_year() {
        let term = build_term("Effects of yoga", &[], None);
        assert_eq!(term, "Effects of yoga[Title]");
    }
}
