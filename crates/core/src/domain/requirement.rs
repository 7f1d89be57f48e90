use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Fields a category needs collected from the user before routing proceeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRequirement {
    pub category: String,
    pub required_fields: BTreeSet<String>,
}

impl CategoryRequirement {
    pub fn new<I, S>(category: impl Into<String>, required_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            required_fields: required_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn find<'a>(requirements: &'a [Self], category: &str) -> Option<&'a Self> {
        requirements.iter().find(|requirement| requirement.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryRequirement;

    #[test]
    fn find_matches_exact_category() {
        let requirements = vec![
            CategoryRequirement::new("BillingQuestion", ["account_number"]),
            CategoryRequirement::new("TechnicalSupport", ["problem_details"]),
        ];

        let found = CategoryRequirement::find(&requirements, "BillingQuestion")
            .expect("billing requirement");
        assert!(found.required_fields.contains("account_number"));
        assert!(CategoryRequirement::find(&requirements, "Unknown").is_none());
    }
}
