//! The local view pipeline: filter, sort, paginate.

use std::cmp::Ordering;

use crate::column::Column;
use crate::pagination::PageSize;
use crate::row::Row;
use crate::sort::{SortDirective, SortOrder};

/// The materialized current view: one page of rows plus the filtered total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewResult {
    pub rows: Vec<Row>,
    /// Row count after filtering, before pagination.
    pub total: usize,
}

/// Inputs to a local view computation.
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery<'a> {
    pub phrase: &'a str,
    pub directive: &'a SortDirective,
    pub page: usize,
    pub size: PageSize,
    pub case_sensitive: bool,
}

/// Pure view computation over an in-memory row set.
pub struct ViewPipeline;

impl ViewPipeline {
    /// Filters, sorts and paginates `rows`.
    ///
    /// The input is left untouched; sorting works on a copy so the store
    /// keeps insertion order.
    pub fn compute(rows: &[Row], columns: &[Column], query: ViewQuery<'_>) -> ViewResult {
        let mut matched = Self::filter(rows, columns, query.phrase, query.case_sensitive);
        Self::sort(&mut matched, query.directive);
        let total = matched.len();
        let rows = Self::paginate(matched, query.page, query.size);
        log::trace!(
            "Computed view: page {} of {:?}, {} rows, total {}",
            query.page,
            query.size,
            rows.len(),
            total
        );
        ViewResult { rows, total }
    }

    /// Keeps rows where any searchable, visible column's display text
    /// contains the phrase. An empty phrase keeps everything.
    pub fn filter(rows: &[Row], columns: &[Column], phrase: &str, case_sensitive: bool) -> Vec<Row> {
        if phrase.is_empty() {
            return rows.to_vec();
        }
        let needle = if case_sensitive {
            phrase.to_string()
        } else {
            phrase.to_lowercase()
        };
        let searched: Vec<&Column> = columns.iter().filter(|c| c.searchable && c.visible).collect();

        rows.iter()
            .filter(|row| {
                searched.iter().any(|column| {
                    let text = column.display(row.get(&column.id));
                    if case_sensitive {
                        text.contains(&needle)
                    } else {
                        text.to_lowercase().contains(&needle)
                    }
                })
            })
            .cloned()
            .collect()
    }

    /// Stable multi-key sort on raw values, keys in directive order.
    pub fn sort(rows: &mut [Row], directive: &SortDirective) {
        if directive.is_empty() {
            return;
        }
        rows.sort_by(|a, b| compare(a, b, directive));
    }

    /// Slices out one page. A page past the end yields no rows.
    pub fn paginate(rows: Vec<Row>, page: usize, size: PageSize) -> Vec<Row> {
        match size {
            PageSize::All => rows,
            PageSize::Rows(n) => {
                let start = page.saturating_sub(1).saturating_mul(n);
                rows.into_iter().skip(start).take(n).collect()
            }
        }
    }
}

fn compare(a: &Row, b: &Row, directive: &SortDirective) -> Ordering {
    for (column_id, order) in directive.iter() {
        let ordering = a.get(column_id).cmp(b.get(column_id));
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnRegistry, ConverterSet, FormatterSet};
    use crate::pagination::total_pages;
    use crate::value::Value;

    fn columns(defs: Vec<ColumnDef>) -> Vec<Column> {
        let (registry, _) =
            ColumnRegistry::register(defs, &ConverterSet::default(), &FormatterSet::default(), true)
                .unwrap();
        registry.columns().to_vec()
    }

    fn sample() -> (Vec<Row>, Vec<Column>) {
        let rows = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, name)| Row::new().with("id", i as i64 + 1).with("name", *name))
            .collect();
        let columns = columns(vec![
            ColumnDef::new("id").identifier().converter("numeric").searchable(false),
            ColumnDef::new("name"),
        ]);
        (rows, columns)
    }

    fn ids(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|r| r.get("id").clone()).collect()
    }

    fn query<'a>(phrase: &'a str, directive: &'a SortDirective, page: usize, size: PageSize) -> ViewQuery<'a> {
        ViewQuery {
            phrase,
            directive,
            page,
            size,
            case_sensitive: true,
        }
    }

    #[test]
    fn test_paging_five_rows_by_two() {
        let (rows, columns) = sample();
        let directive = SortDirective::new();
        let pages: Vec<Vec<Value>> = (1..=3)
            .map(|page| {
                ids(&ViewPipeline::compute(&rows, &columns, query("", &directive, page, PageSize::Rows(2))).rows)
            })
            .collect();
        assert_eq!(pages[0], vec![Value::from(1), Value::from(2)]);
        assert_eq!(pages[1], vec![Value::from(3), Value::from(4)]);
        assert_eq!(pages[2], vec![Value::from(5)]);
        assert_eq!(total_pages(rows.len(), PageSize::Rows(2)), 3);
    }

    #[test]
    fn test_page_beyond_range_is_empty() {
        let (rows, columns) = sample();
        let directive = SortDirective::new();
        let view = ViewPipeline::compute(&rows, &columns, query("", &directive, 9, PageSize::Rows(2)));
        assert!(view.rows.is_empty());
        assert_eq!(view.total, 5);
    }

    #[test]
    fn test_sort_desc_by_name() {
        let (rows, columns) = sample();
        let directive = SortDirective::desc("name");
        let view = ViewPipeline::compute(&rows, &columns, query("", &directive, 1, PageSize::All));
        let names: Vec<String> = view.rows.iter().map(|r| r.get("name").to_string()).collect();
        assert_eq!(names, vec!["e", "d", "c", "b", "a"]);
    }

    #[test]
    fn test_search_matches_searchable_columns_only() {
        let (rows, columns) = sample();
        let directive = SortDirective::new();
        let view = ViewPipeline::compute(&rows, &columns, query("c", &directive, 1, PageSize::Rows(10)));
        assert_eq!(ids(&view.rows), vec![Value::from(3)]);
        assert_eq!(view.total, 1);

        // "3" is only in the non-searchable id column.
        let view = ViewPipeline::compute(&rows, &columns, query("3", &directive, 1, PageSize::Rows(10)));
        assert_eq!(view.total, 0);
    }

    #[test]
    fn test_search_skips_hidden_columns() {
        let rows = vec![Row::new().with("id", 1).with("secret", "xyz")];
        let columns = columns(vec![ColumnDef::new("id"), ColumnDef::new("secret").visible(false)]);
        assert!(ViewPipeline::filter(&rows, &columns, "xyz", true).is_empty());
    }

    #[test]
    fn test_search_case_sensitivity() {
        let (rows, columns) = sample();
        assert!(ViewPipeline::filter(&rows, &columns, "C", true).is_empty());
        assert_eq!(ViewPipeline::filter(&rows, &columns, "C", false).len(), 1);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (rows, columns) = sample();
        let once = ViewPipeline::filter(&rows, &columns, "b", true);
        let twice = ViewPipeline::filter(&once, &columns, "b", true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sort_is_stable_and_multi_key() {
        let mut rows: Vec<Row> = [(1, "x", 2), (2, "y", 1), (3, "x", 1), (4, "y", 1), (5, "x", 2)]
            .iter()
            .map(|(id, group, rank)| Row::new().with("id", *id).with("group", *group).with("rank", *rank))
            .collect();

        ViewPipeline::sort(&mut rows, &SortDirective::asc("group"));
        assert_eq!(ids(&rows), [1, 3, 5, 2, 4].map(Value::from).to_vec());

        ViewPipeline::sort(&mut rows, &SortDirective::asc("group").then_asc("rank"));
        assert_eq!(ids(&rows), [3, 1, 5, 2, 4].map(Value::from).to_vec());
    }

    #[test]
    fn test_pages_concatenate_to_sorted_filtered_set() {
        let rows: Vec<Row> = (1..=23)
            .map(|i| Row::new().with("id", i).with("name", format!("n{}", i % 7)))
            .collect();
        let columns = columns(vec![ColumnDef::new("id").identifier(), ColumnDef::new("name")]);
        let directive = SortDirective::desc("name");
        let size = PageSize::Rows(4);

        let mut expected = ViewPipeline::filter(&rows, &columns, "n", true);
        ViewPipeline::sort(&mut expected, &directive);

        let first = ViewPipeline::compute(&rows, &columns, query("n", &directive, 1, size));
        let mut concat = Vec::new();
        for page in 1..=total_pages(first.total, size) {
            concat.extend(ViewPipeline::compute(&rows, &columns, query("n", &directive, page, size)).rows);
        }
        assert_eq!(concat, expected);
    }

    #[test]
    fn test_compute_leaves_input_order() {
        let (rows, columns) = sample();
        let before = rows.clone();
        let directive = SortDirective::desc("id");
        ViewPipeline::compute(&rows, &columns, query("", &directive, 1, PageSize::All));
        assert_eq!(rows, before);
    }
}
