//! Title normalization helpers for collected file titles

const FILE_PREFIX: &str = "File:";
const CATEGORY_PREFIX: &str = "Category:";

/// Prefix `title` with the File namespace unless it already has it
pub fn ensure_file_namespace(title: &str) -> String {
    if title.starts_with(FILE_PREFIX) {
        title.to_string()
    } else {
        format!("{}{}", FILE_PREFIX, title)
    }
}

/// Prefix `title` with the Category namespace unless it already has it
pub fn ensure_category_namespace(title: &str) -> String {
    if title.starts_with(CATEGORY_PREFIX) {
        title.to_string()
    } else {
        format!("{}{}", CATEGORY_PREFIX, title)
    }
}

pub fn is_file_title(title: &str) -> bool {
    title.starts_with(FILE_PREFIX)
}

/// Split pasted input into file titles
///
/// Entries are separated by `|`, newlines or tabs; blank entries are dropped
/// and the File namespace is added where missing.
pub fn split_title_input(input: &str) -> Vec<String> {
    input
        .split(['|', '\n', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ensure_file_namespace)
        .collect()
}

/// Drop suggestions that are already collected
pub fn filter_suggestions(suggestions: Vec<String>, collected: &[String]) -> Vec<String> {
    suggestions
        .into_iter()
        .filter(|s| !collected.contains(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_file_namespace() {
        assert_eq!(ensure_file_namespace("Example.png"), "File:Example.png");
        assert_eq!(ensure_file_namespace("File:Example.png"), "File:Example.png");
    }

    #[test]
    fn test_split_title_input() {
        let titles = split_title_input(" A.jpg | File:B.jpg\nC.jpg\t\t|  | ");
        assert_eq!(titles, vec!["File:A.jpg", "File:B.jpg", "File:C.jpg"]);
    }

    #[test]
    fn test_ensure_category_namespace() {
        assert_eq!(ensure_category_namespace("Maps"), "Category:Maps");
        assert_eq!(ensure_category_namespace("Category:Maps"), "Category:Maps");
    }

    #[test]
    fn test_filter_suggestions_excludes_collected() {
        let suggestions = vec!["File:A.jpg".to_string(), "File:B.jpg".to_string()];
        let collected = vec!["File:A.jpg".to_string()];
        assert_eq!(
            filter_suggestions(suggestions, &collected),
            vec!["File:B.jpg".to_string()]
        );
    }
}
