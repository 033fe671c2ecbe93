//! Hierarchical category matching.

/// Separator between parent and child categories.
pub const CATEGORY_SEPARATOR: char = '/';

/// Which categories a listing is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// No filtering.
    #[default]
    Unset,
    /// Only torrents without a category.
    Uncategorized,
    /// A category and all of its subcategories.
    Path(String),
}

impl CategoryFilter {
    /// Build from an optional CLI value. `Some("")` means uncategorized.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => CategoryFilter::Unset,
            Some(s) if s.trim_end_matches(CATEGORY_SEPARATOR).is_empty() => {
                CategoryFilter::Uncategorized
            }
            Some(s) => CategoryFilter::Path(s.trim_end_matches(CATEGORY_SEPARATOR).to_string()),
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::Unset => true,
            CategoryFilter::Uncategorized => category.is_empty(),
            CategoryFilter::Path(path) => is_within(category, path),
        }
    }
}

/// Whether `category` is `parent` or one of its subcategories.
pub fn is_within(category: &str, parent: &str) -> bool {
    match category.strip_prefix(parent) {
        Some(rest) => rest.is_empty() || rest.starts_with(CATEGORY_SEPARATOR),
        None => false,
    }
}

/// Free-function form: `None` is an unset filter.
pub fn matches(torrent_category: &str, filter: Option<&str>) -> bool {
    CategoryFilter::from_arg(filter).matches(torrent_category)
}
