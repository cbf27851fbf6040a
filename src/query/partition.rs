//! Query partitioner
//!
//! Expands the configured facet dimensions into their full cross-product.
//! Iteration order is fixed (language, then window, then star range) so a
//! rerun with the same configuration visits facets in the same sequence.

use crate::config::SearchConfig;
use crate::query::{SearchFacet, SearchQuery, StarRange, TimeWindow};
use crate::ConfigError;

/// The three facet axes, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetDimensions {
    pub languages: Vec<String>,
    pub windows: Vec<TimeWindow>,
    pub star_ranges: Vec<StarRange>,
}

impl FacetDimensions {
    /// Builds the dimensions from the `[search]` config section
    ///
    /// Year shorthands are expanded to calendar-year windows and placed
    /// before the explicit windows.
    pub fn from_config(search: &SearchConfig) -> Result<Self, ConfigError> {
        let mut windows = Vec::with_capacity(search.years.len() + search.windows.len());
        for &year in &search.years {
            let window = TimeWindow::calendar_year(year).ok_or_else(|| {
                ConfigError::Validation(format!("year {} is out of range", year))
            })?;
            windows.push(window);
        }
        windows.extend(
            search
                .windows
                .iter()
                .map(|entry| TimeWindow::new(entry.from, entry.to)),
        );

        let star_ranges = search
            .star_buckets
            .iter()
            .map(|bucket| StarRange::new(bucket.min, bucket.max))
            .collect();

        Ok(Self {
            languages: search
                .languages
                .iter()
                .map(|language| language.trim().to_string())
                .collect(),
            windows,
            star_ranges,
        })
    }

    /// Number of facets the cross-product yields
    pub fn facet_count(&self) -> usize {
        self.languages.len() * self.windows.len() * self.star_ranges.len()
    }

    /// Iterates the cross-product in stable order
    pub fn facets(&self) -> impl Iterator<Item = SearchFacet> + '_ {
        self.languages.iter().flat_map(move |language| {
            self.windows.iter().flat_map(move |window| {
                self.star_ranges.iter().map(move |stars| SearchFacet {
                    language: language.clone(),
                    window: *window,
                    stars: *stars,
                })
            })
        })
    }
}

/// Builds the complete query set for the given dimensions
///
/// An empty dimension yields an empty set.
pub fn build_queries(dimensions: &FacetDimensions) -> Vec<SearchQuery> {
    dimensions
        .facets()
        .map(|facet| SearchQuery::from_facet(&facet))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StarBucketEntry, WindowEntry};
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn dimensions(languages: &[&str], years: &[i32], buckets: &[(u64, u64)]) -> FacetDimensions {
        FacetDimensions {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            windows: years
                .iter()
                .map(|&y| TimeWindow::calendar_year(y).unwrap())
                .collect(),
            star_ranges: buckets
                .iter()
                .map(|&(min, max)| StarRange::new(min, Some(max)))
                .collect(),
        }
    }

    #[test]
    fn test_cross_product_size_and_distinctness() {
        let dims = dimensions(
            &["Rust", "Go", "Python"],
            &[2022, 2023],
            &[(1, 9), (10, 49), (50, 199), (200, 999)],
        );
        let queries = build_queries(&dims);

        assert_eq!(queries.len(), 3 * 2 * 4);
        assert_eq!(dims.facet_count(), queries.len());

        let distinct: HashSet<_> = queries.iter().collect();
        assert_eq!(distinct.len(), queries.len());
    }

    #[test]
    fn test_order_is_stable() {
        let dims = dimensions(&["Rust", "Go"], &[2023], &[(1, 9), (10, 49)]);
        let first = build_queries(&dims);
        let second = build_queries(&dims);
        assert_eq!(first, second);

        assert_eq!(
            first[0].as_str(),
            "language:Rust stars:1..9 created:2023-01-01..2023-12-31"
        );
        assert_eq!(
            first[1].as_str(),
            "language:Rust stars:10..49 created:2023-01-01..2023-12-31"
        );
        assert!(first[2].as_str().starts_with("language:Go"));
    }

    #[test]
    fn test_empty_dimension_yields_no_queries() {
        let dims = dimensions(&["Rust"], &[], &[(1, 9)]);
        assert!(build_queries(&dims).is_empty());
        assert_eq!(dims.facet_count(), 0);
    }

    #[test]
    fn test_from_config_expands_years_before_windows() {
        let search = SearchConfig {
            languages: vec!["Rust".to_string()],
            years: vec![2020],
            windows: vec![WindowEntry {
                from: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
            }],
            star_buckets: vec![StarBucketEntry { min: 5, max: None }],
        };

        let dims = FacetDimensions::from_config(&search).unwrap();
        assert_eq!(dims.windows.len(), 2);
        assert_eq!(dims.windows[0].as_calendar_year(), Some(2020));
        assert_eq!(dims.windows[1].as_calendar_year(), None);
        assert_eq!(dims.star_ranges, vec![StarRange::new(5, None)]);
    }

    #[test]
    fn test_from_config_trims_languages() {
        let search = SearchConfig {
            languages: vec![" Rust".to_string(), "Go\t".to_string()],
            years: vec![2023],
            windows: vec![],
            star_buckets: vec![StarBucketEntry { min: 10, max: None }],
        };

        let dims = FacetDimensions::from_config(&search).unwrap();
        assert_eq!(dims.languages, vec!["Rust".to_string(), "Go".to_string()]);

        let queries = build_queries(&dims);
        assert!(queries[0].as_str().starts_with("language:Rust "));
        assert!(queries[1].as_str().starts_with("language:Go "));
    }
}
