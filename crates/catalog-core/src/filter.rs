//! Text and type filtering for list views
//!
//! Pure functions over borrowed collections; nothing here holds state.

use crate::asset::{AssetKind, TypeFilter};
use crate::item::CatalogItem;
use crate::registry::RegistryEntry;

/// Something a list view can filter
pub trait Searchable {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn asset_kind(&self) -> AssetKind;
}

impl Searchable for CatalogItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn asset_kind(&self) -> AssetKind {
        self.asset_kind
    }
}

impl Searchable for RegistryEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn asset_kind(&self) -> AssetKind {
        self.asset_kind
    }
}

fn matches_text<T: Searchable>(value: &T, needle: &str) -> bool {
    value.name().to_lowercase().contains(needle)
        || value.description().to_lowercase().contains(needle)
}

/// Filter `items` by a case-insensitive substring `query` (matched against
/// name and description) AND the `type_filter` gate, preserving order.
///
/// A blank query disables the text predicate.
pub fn filter_view<'a, T: Searchable>(
    items: &'a [T],
    query: &str,
    type_filter: TypeFilter,
) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| type_filter.accepts(item.asset_kind()))
        .filter(|item| needle.is_empty() || matches_text(*item, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionSpec;
    use crate::types::RepoId;

    fn items() -> Vec<CatalogItem> {
        let repo = RepoId::new();
        vec![
            CatalogItem::new(repo, AssetKind::Skill, "PDF Tools", "skills/pdf")
                .with_description("Extract text from documents"),
            CatalogItem::new(repo, AssetKind::SubAgent, "Reviewer", "agents/reviewer.md")
                .with_description("Reviews pull requests"),
            CatalogItem::new(repo, AssetKind::Skill, "Spreadsheets", "skills/xlsx")
                .with_description("Edit PDF-exported tables"),
        ]
    }

    fn names<T: Searchable>(view: &[&T]) -> Vec<String> {
        view.iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_empty_query_and_all_is_identity() {
        let items = items();
        let view = filter_view(&items, "", TypeFilter::All);
        assert_eq!(view.len(), items.len());
        assert!(view.iter().zip(items.iter()).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_text_match_is_case_insensitive_on_name_and_description() {
        let items = items();
        let view = filter_view(&items, "pdf", TypeFilter::All);
        assert_eq!(names(&view), vec!["PDF Tools", "Spreadsheets"]);

        let view = filter_view(&items, "  PULL ", TypeFilter::All);
        assert_eq!(names(&view), vec!["Reviewer"]);
    }

    #[test]
    fn test_type_gate_combines_with_and() {
        let items = items();
        let view = filter_view(&items, "", TypeFilter::Only(AssetKind::SubAgent));
        assert_eq!(names(&view), vec!["Reviewer"]);

        let view = filter_view(&items, "reviews", TypeFilter::Only(AssetKind::Skill));
        assert!(view.is_empty());
    }

    #[test]
    fn test_text_filter_is_subset_of_type_only_view() {
        let items = items();
        for filter in [TypeFilter::All, TypeFilter::Only(AssetKind::Skill)] {
            let wide = filter_view(&items, "", filter);
            for query in ["pdf", "e", "zzz", "TEXT"] {
                let narrow = filter_view(&items, query, filter);
                assert!(narrow.iter().all(|n| wide.iter().any(|w| std::ptr::eq(*n, *w))));
            }
        }
    }

    #[test]
    fn test_registry_entries_are_searchable() {
        let entries = vec![
            RegistryEntry::new("a", "github", ConnectionSpec::stdio("npx"))
                .with_description("Issues and PRs"),
            RegistryEntry::new("b", "postgres", ConnectionSpec::stdio("uvx")),
        ];
        let view = filter_view(&entries, "issues", TypeFilter::Only(AssetKind::Connector));
        assert_eq!(names(&view), vec!["github"]);
        assert!(filter_view(&entries, "", TypeFilter::Only(AssetKind::Skill)).is_empty());
    }
}
