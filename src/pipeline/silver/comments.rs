use once_cell::sync::Lazy;

use crate::domain::RawCell;
use crate::pipeline::silver::placeholders::{scrub_raw_text, PlaceholderSet};

/// Reserved label for absent or placeholder-valued comments.
pub const CATEGORY_NA: &str = "NA";
/// Reserved label for non-empty comments no rule recognizes.
pub const CATEGORY_OTHER: &str = "OTHER";

/// Punch-comment taxonomy in priority order. A comment matching keywords
/// from two categories resolves to the earlier one.
pub static STANDARD_TAXONOMY: Lazy<CategoryTaxonomy> = Lazy::new(|| {
    CategoryTaxonomy::new(vec![
        Category::new(
            "EARLY OUT",
            &["EARLY_OUT", "EARLY OUT", "EARLYOUT", "EARLY", "LEFT_EARLY", "LEFT EARLY"],
        ),
        Category::new(
            "LATE OUT",
            &["LATE_OUT", "LATE OUT", "LATEOUT", "VERY_LATE_OUT", "VERY LATE OUT", "VERY_LATE"],
        ),
        Category::new(
            "LATE IN",
            &["LATE_IN", "LATE IN", "LATEIN", "LATE", "VERY_LATE", "ARRIVED_LATE", "ARRIVED LATE"],
        ),
        Category::new(
            "MISSED PUNCH",
            &[
                "MISSED_PUNCH",
                "MISSED PUNCH",
                "MISSEDPUNCH",
                "MISSING_PUNCH",
                "FORGOT_PUNCH",
                "FORGOT PUNCH",
                "NO_PUNCH",
                "NO PUNCH",
                "IN_CHAIN",
                "IN CHAIN",
            ],
        ),
        Category::new(
            "PTO",
            &[
                "PTO",
                "PAID_TIME_OFF",
                "PAID TIME OFF",
                "VACATION",
                "PERSONAL_DAY",
                "PERSONAL DAY",
                "SICK",
                "SICK_DAY",
                "SICK DAY",
                "HOLIDAY",
                "LEAVE",
                "TIME_OFF",
                "TIME OFF",
            ],
        ),
        Category::new(
            "UNSCHEDULED",
            &[
                "UNSCHEDULED",
                "UN_SCHEDULED",
                "NOT_SCHEDULED",
                "NOT SCHEDULED",
                "EXTRA_SHIFT",
                "EXTRA SHIFT",
                "OVERTIME",
                "OT",
            ],
        ),
        Category::new(
            "MEAL ISSUE",
            &[
                "MEAL_NOT_TAKEN",
                "MEAL NOT TAKEN",
                "MEAL_ISSUE",
                "MEAL ISSUE",
                "NO_MEAL",
                "NO MEAL",
                "MISSED_MEAL",
                "MISSED MEAL",
            ],
        ),
        Category::new(
            "SHORT SHIFT",
            &["SHORT_SHIFT", "SHORT SHIFT", "SHORTSHIFT", "PARTIAL_SHIFT", "PARTIAL SHIFT"],
        ),
        Category::new(
            "CANCELLED DEDUCTION",
            &[
                "CANCELLED_DEDUCTION",
                "CANCELLED DEDUCTION",
                "CANCELED_DEDUCT",
                "CANCELED DEDUCTION",
                "DEDUCTION_CANCELLED",
                "DEDUCTION CANCELLED",
            ],
        ),
    ])
});

#[derive(Debug, Clone)]
pub struct Category {
    pub label: String,
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Explicit ordered rule list; evaluation walks it strictly in sequence so
/// categorization never depends on map iteration order.
#[derive(Debug, Clone)]
pub struct CategoryTaxonomy {
    categories: Vec<Category>,
}

impl CategoryTaxonomy {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn standard() -> &'static CategoryTaxonomy {
        &STANDARD_TAXONOMY
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

/// How a keyword is tested against a normalized comment. `Substring` keeps
/// the documented behavior where a short keyword like `"OT"` also hits
/// unrelated text containing it; `Exact` is the strict alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    #[default]
    Substring,
    Exact,
}

impl MatchStrategy {
    fn matches(self, keyword: &str, text: &str) -> bool {
        match self {
            MatchStrategy::Exact => text == keyword,
            MatchStrategy::Substring => text.contains(keyword),
        }
    }
}

/// Multi-token heuristic applied after the keyword table, independent of the
/// keyword match strategy. Catches narrative comments like
/// "EMPLOYEE MISSED OUT PUNCH" that no single keyword covers.
#[derive(Debug, Clone)]
pub struct CompositeRule {
    pub required: String,
    pub any_of: Vec<String>,
    pub label: String,
}

impl CompositeRule {
    pub fn new(required: &str, any_of: &[&str], label: &str) -> Self {
        Self {
            required: required.to_string(),
            any_of: any_of.iter().map(|t| t.to_string()).collect(),
            label: label.to_string(),
        }
    }

    fn applies(&self, text: &str) -> bool {
        text.contains(&self.required) && self.any_of.iter().any(|t| text.contains(t.as_str()))
    }
}

fn standard_composites() -> Vec<CompositeRule> {
    vec![
        CompositeRule::new("MISSED", &["PUNCH", "IN", "OUT"], "MISSED PUNCH"),
        CompositeRule::new("MEAL", &["NOT", "TAKEN", "SKIP", "MISSED"], "MEAL ISSUE"),
    ]
}

/// Classifies free-text punch comments into the taxonomy. Holds only
/// read-only rule data, so one instance is safely shared across runs.
#[derive(Debug, Clone)]
pub struct CommentCategorizer {
    taxonomy: CategoryTaxonomy,
    strategy: MatchStrategy,
    upper_placeholders: Vec<String>,
    composites: Vec<CompositeRule>,
}

impl CommentCategorizer {
    pub fn new(
        taxonomy: CategoryTaxonomy,
        placeholders: &PlaceholderSet,
        strategy: MatchStrategy,
    ) -> Self {
        Self {
            taxonomy,
            strategy,
            upper_placeholders: placeholders.uppercased_tokens(),
            composites: standard_composites(),
        }
    }

    pub fn standard() -> Self {
        Self::new(
            CategoryTaxonomy::standard().clone(),
            PlaceholderSet::standard(),
            MatchStrategy::default(),
        )
    }

    pub fn with_composites(mut self, composites: Vec<CompositeRule>) -> Self {
        self.composites = composites;
        self
    }

    /// Categorizes one raw cell; a missing cell is `NA`.
    pub fn categorize_cell(&self, cell: Option<&str>) -> String {
        match cell {
            None => CATEGORY_NA.to_string(),
            Some(text) => self.categorize(text),
        }
    }

    /// Categorizes one comment. Pipe-delimited comments are decomposed and
    /// each non-empty part labeled on its own; labels join with `", "` in
    /// left-to-right order, duplicates preserved.
    pub fn categorize(&self, text: &str) -> String {
        let normalized = scrub_raw_text(text).to_uppercase();
        if normalized.is_empty() {
            return CATEGORY_NA.to_string();
        }
        if self.is_placeholder(&normalized) {
            return CATEGORY_NA.to_string();
        }
        if normalized.contains('|') {
            let labels: Vec<String> = normalized
                .split('|')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| self.categorize_part(part))
                .collect();
            if !labels.is_empty() {
                return labels.join(", ");
            }
            // a bare delimiter carries no parts; treated as one plain value
        }
        self.categorize_part(&normalized)
    }

    fn categorize_part(&self, part: &str) -> String {
        let normalized = scrub_raw_text(part).to_uppercase();
        if normalized.is_empty() || self.is_placeholder(&normalized) {
            return CATEGORY_NA.to_string();
        }
        match self.match_label(&normalized) {
            Some(label) => label.to_string(),
            None => CATEGORY_OTHER.to_string(),
        }
    }

    fn match_label(&self, text: &str) -> Option<&str> {
        for category in self.taxonomy.categories() {
            if category
                .keywords
                .iter()
                .any(|keyword| self.strategy.matches(keyword, text))
            {
                return Some(&category.label);
            }
        }
        for rule in &self.composites {
            if rule.applies(text) {
                return Some(&rule.label);
            }
        }
        None
    }

    fn is_placeholder(&self, normalized: &str) -> bool {
        self.upper_placeholders.iter().any(|t| t == normalized)
    }
}

/// Cleans a whole comment column into category labels.
pub fn clean_comment_column(column: &[RawCell], categorizer: &CommentCategorizer) -> Vec<String> {
    column
        .iter()
        .map(|cell| categorizer.categorize_cell(cell.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> CommentCategorizer {
        CommentCategorizer::standard()
    }

    #[test]
    fn absent_and_empty_are_na() {
        let c = standard();
        assert_eq!(c.categorize_cell(None), "NA");
        assert_eq!(c.categorize(""), "NA");
        assert_eq!(c.categorize("   "), "NA");
    }

    #[test]
    fn placeholder_spellings_are_na_after_uppercasing() {
        let c = standard();
        assert_eq!(c.categorize("[NULL]"), "NA");
        assert_eq!(c.categorize("Null"), "NA");
        assert_eq!(c.categorize("n/a"), "NA");
        assert_eq!(c.categorize("'--'"), "NA");
    }

    #[test]
    fn exact_keywords_match_case_insensitively() {
        let c = standard();
        assert_eq!(c.categorize("EARLY_OUT"), "EARLY OUT");
        assert_eq!(c.categorize("early out"), "EARLY OUT");
        assert_eq!(c.categorize("Vacation"), "PTO");
        assert_eq!(c.categorize("LATE"), "LATE IN");
    }

    #[test]
    fn priority_order_resolves_overlaps() {
        // VERY_LATE appears under both LATE OUT and LATE IN; the earlier
        // category wins.
        assert_eq!(standard().categorize("VERY_LATE"), "LATE OUT");
    }

    #[test]
    fn unknown_text_is_other() {
        assert_eq!(standard().categorize("RANDOM_TEXT_XYZ"), "OTHER");
    }

    #[test]
    fn substring_matching_keeps_documented_false_positives() {
        // "OT" is an UNSCHEDULED keyword and matches inside ROTATION.
        assert_eq!(standard().categorize("ROTATION"), "UNSCHEDULED");
    }

    #[test]
    fn exact_strategy_disarms_substring_hits() {
        let c = CommentCategorizer::new(
            CategoryTaxonomy::standard().clone(),
            PlaceholderSet::standard(),
            MatchStrategy::Exact,
        );
        assert_eq!(c.categorize("ROTATION"), "OTHER");
        assert_eq!(c.categorize("OT"), "UNSCHEDULED");
    }

    #[test]
    fn pipe_comments_join_in_order_with_duplicates() {
        let c = standard();
        assert_eq!(c.categorize("LATE_IN|MISSED_PUNCH"), "LATE IN, MISSED PUNCH");
        assert_eq!(c.categorize("MISSED_PUNCH|LATE_IN"), "MISSED PUNCH, LATE IN");
        assert_eq!(c.categorize("LATE_IN|LATE"), "LATE IN, LATE IN");
        assert_eq!(c.categorize(" SICK | bogus part "), "PTO, OTHER");
    }

    #[test]
    fn pipe_part_that_is_a_placeholder_labels_na() {
        assert_eq!(standard().categorize("LATE_IN|NULL"), "LATE IN, NA");
    }

    #[test]
    fn bare_pipe_falls_back_to_other() {
        assert_eq!(standard().categorize("|"), "OTHER");
        assert_eq!(standard().categorize(" | "), "OTHER");
    }

    #[test]
    fn composite_rules_catch_narrative_comments() {
        let c = standard();
        assert_eq!(c.categorize("EMPLOYEE MISSED OUT PUNCH AT GATE"), "MISSED PUNCH");
        assert_eq!(c.categorize("MEAL WAS SKIPPED TODAY"), "MEAL ISSUE");
    }

    #[test]
    fn custom_taxonomy_is_injected_not_ambient() {
        let taxonomy = CategoryTaxonomy::new(vec![Category::new("GATE", &["BADGE"])]);
        let c = CommentCategorizer::new(taxonomy, PlaceholderSet::standard(), MatchStrategy::Substring)
            .with_composites(Vec::new());
        assert_eq!(c.categorize("BADGE FAILURE"), "GATE");
        assert_eq!(c.categorize("EARLY_OUT"), "OTHER");
    }

    #[test]
    fn column_cleaning_preserves_row_order() {
        let column = vec![
            Some("EARLY_OUT".to_string()),
            None,
            Some("something else".to_string()),
        ];
        let labels = clean_comment_column(&column, &standard());
        assert_eq!(labels, vec!["EARLY OUT", "NA", "OTHER"]);
    }
}
