//! Summary statistics over stored postings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use internscout_shared::Posting;

/// Skill groups reported by [`KeywordAnalysis`], in display order.
pub const SKILL_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Programming Languages",
        &["python", "java", "javascript", "c++", "go", "rust", "ruby", "php"],
    ),
    (
        "Frontend",
        &["react", "angular", "vue", "html", "css", "javascript", "typescript"],
    ),
    (
        "Backend",
        &["node.js", "django", "flask", "spring", "express", "rails"],
    ),
    (
        "Data/ML",
        &["machine learning", "data science", "tensorflow", "pytorch", "pandas", "numpy"],
    ),
    ("Cloud", &["aws", "azure", "gcp", "docker", "kubernetes"]),
    ("Databases", &["sql", "postgresql", "mysql", "mongodb", "redis"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentPosting {
    pub company_name: String,
    pub title: String,
    pub scraped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    /// Postings with at least one keyword.
    pub with_keywords: usize,
    pub top_companies: Vec<(String, usize)>,
    pub top_locations: Vec<(String, usize)>,
    pub seasons: Vec<(String, usize)>,
    pub sponsorships: Vec<(String, usize)>,
    pub top_keywords: Vec<(String, usize)>,
    pub recent: Vec<RecentPosting>,
}

impl Stats {
    pub fn compute(postings: &[Posting]) -> Self {
        let mut companies = HashMap::new();
        let mut locations = HashMap::new();
        let mut seasons = HashMap::new();
        let mut sponsorships = HashMap::new();
        let mut keywords = HashMap::new();
        let mut with_keywords = 0;

        for posting in postings {
            bump(&mut companies, &posting.company_name);
            bump(&mut seasons, &posting.season);
            bump(&mut sponsorships, &posting.sponsorship);
            for location in &posting.locations {
                bump(&mut locations, location);
            }
            if let Some(found) = posting.keywords.as_ref().filter(|k| !k.is_empty()) {
                with_keywords += 1;
                for keyword in found {
                    bump(&mut keywords, keyword);
                }
            }
        }

        let mut by_recency: Vec<&Posting> = postings.iter().collect();
        by_recency.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        let recent = by_recency
            .into_iter()
            .take(5)
            .map(|p| RecentPosting {
                company_name: p.company_name.clone(),
                title: p.title.clone(),
                scraped_at: p.scraped_at,
            })
            .collect();

        Self {
            total: postings.len(),
            with_keywords,
            top_companies: ranked(companies, Some(10)),
            top_locations: ranked(locations, Some(10)),
            seasons: ranked(seasons, None),
            sponsorships: ranked(sponsorships, None),
            top_keywords: ranked(keywords, Some(20)),
            recent,
        }
    }

    pub fn keyword_share_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.with_keywords as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    pub name: &'static str,
    /// Skills of the category that occur at least once, in category order.
    pub skills: Vec<(&'static str, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordAnalysis {
    /// Most frequent co-occurring pairs, each pair sorted.
    pub top_pairs: Vec<((String, String), usize)>,
    /// Only categories with at least one occurrence.
    pub categories: Vec<CategoryCounts>,
}

impl KeywordAnalysis {
    pub fn compute(postings: &[Posting]) -> Self {
        let mut pairs: HashMap<(String, String), usize> = HashMap::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for found in postings.iter().filter_map(|p| p.keywords.as_ref()) {
            let terms: Vec<&String> = found.iter().collect();
            for (i, first) in terms.iter().enumerate() {
                *counts.entry(first.as_str()).or_default() += 1;
                for second in &terms[i + 1..] {
                    // BTreeSet iteration is sorted, so (first, second) is ordered.
                    *pairs
                        .entry(((*first).clone(), (*second).clone()))
                        .or_default() += 1;
                }
            }
        }

        let mut top_pairs: Vec<_> = pairs.into_iter().collect();
        top_pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_pairs.truncate(15);

        let categories = SKILL_CATEGORIES
            .iter()
            .filter_map(|&(name, skills)| {
                let skills: Vec<(&'static str, usize)> = skills
                    .iter()
                    .filter_map(|skill| counts.get(skill).map(|&n| (*skill, n)))
                    .collect();
                (!skills.is_empty()).then_some(CategoryCounts { name, skills })
            })
            .collect();

        Self {
            top_pairs,
            categories,
        }
    }
}

fn bump(counter: &mut HashMap<String, usize>, key: &str) {
    *counter.entry(key.to_string()).or_default() += 1;
}

/// Sort by count descending, then name, optionally keeping the first `limit`.
fn ranked(counter: HashMap<String, usize>, limit: Option<usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counter.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posting(id: &str, company: &str, locations: &[&str], keywords: Option<&[&str]>) -> Posting {
        let mut p = Posting::from_feed_value(json!({
            "id": id,
            "company_name": company,
            "title": format!("Intern {id}"),
            "locations": locations,
            "season": "Summer",
            "sponsorship": "Other",
        }))
        .unwrap();
        p.keywords = keywords.map(|k| k.iter().map(|s| s.to_string()).collect());
        p.scraped_at = DateTime::from_timestamp(1_750_000_000 + id.len() as i64, 0);
        p
    }

    #[test]
    fn counts_and_rankings() {
        let postings = vec![
            posting("a", "Acme", &["NYC", "Remote"], Some(&["python", "sql"])),
            posting("bb", "Acme", &["NYC"], Some(&[])),
            posting("ccc", "Globex", &["Remote"], None),
        ];
        let stats = Stats::compute(&postings);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_keywords, 1);
        assert_eq!(stats.top_companies[0], ("Acme".to_string(), 2));
        assert_eq!(
            stats.top_locations,
            vec![("NYC".to_string(), 2), ("Remote".to_string(), 2)]
        );
        assert_eq!(stats.seasons, vec![("Summer".to_string(), 3)]);
        assert_eq!(stats.recent[0].title, "Intern ccc");
        assert!((stats.keyword_share_percent() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn pairs_and_categories() {
        let postings = vec![
            posting("a", "Acme", &[], Some(&["python", "sql", "docker"])),
            posting("b", "Acme", &[], Some(&["python", "sql"])),
        ];
        let analysis = KeywordAnalysis::compute(&postings);

        assert_eq!(
            analysis.top_pairs[0],
            (("python".to_string(), "sql".to_string()), 2)
        );
        assert_eq!(analysis.top_pairs.len(), 3);

        let names: Vec<&str> = analysis.categories.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Programming Languages", "Cloud", "Databases"]);
        assert_eq!(analysis.categories[0].skills, vec![("python", 2)]);
    }

    #[test]
    fn empty_input() {
        let stats = Stats::compute(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.keyword_share_percent(), 0.0);
        assert!(KeywordAnalysis::compute(&[]).categories.is_empty());
    }
}
