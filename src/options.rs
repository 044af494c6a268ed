//! Filter dropdown options derived from a broad item sample.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::item::{DisplayItem, NOT_AVAILABLE};
use crate::resource::OptionFields;

/// Unique values for the filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptionSet {
    pub cities: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub postcodes_by_city: BTreeMap<String, BTreeSet<String>>,
}

impl FilterOptionSet {
    pub fn from_items(items: &[DisplayItem], fields: &OptionFields) -> Self {
        let mut options = FilterOptionSet::default();

        for item in items {
            let city = item.get(&fields.city);
            if city != NOT_AVAILABLE {
                options.cities.insert(city.to_string());
                let postcode = item.get(&fields.postcode);
                if postcode != NOT_AVAILABLE {
                    options
                        .postcodes_by_city
                        .entry(city.to_string())
                        .or_default()
                        .insert(postcode.to_string());
                }
            }

            if let Some(category_field) = &fields.category {
                let category = item.get(category_field);
                if category != NOT_AVAILABLE {
                    options.categories.insert(category.to_string());
                }
            }
        }

        options
    }

    /// Postcodes seen within `city`, empty when the city is unknown.
    pub fn postcodes_for(&self, city: &str) -> Vec<&str> {
        self.postcodes_by_city
            .get(city)
            .map(|codes| codes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.categories.is_empty()
    }
}
