//! Heuristic pairing of lost items with found items.
//!
//! A candidate is a potential match for a source item when the categories are
//! equal, or when the names share a significant word. "Significant" means
//! longer than two characters; words are compared by substring containment in
//! either direction, so "backpack" pairs with "backpacks". The candidate's
//! description is also searched for the source's significant words.

use crate::models::Item;

const MIN_WORD_LEN: usize = 3;

/// Lowercased words of `text` longer than two characters.
pub fn significant_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .collect()
}

pub fn is_potential_match(source: &Item, candidate: &Item) -> bool {
    if candidate.category == source.category {
        return true;
    }

    let source_words = significant_words(&source.name);
    if source_words.is_empty() {
        return false;
    }

    let candidate_words = significant_words(&candidate.name);
    let shares_name_word = source_words.iter().any(|sw| {
        candidate_words
            .iter()
            .any(|cw| cw.contains(sw.as_str()) || sw.contains(cw.as_str()))
    });
    if shares_name_word {
        return true;
    }

    let description = candidate.description.to_lowercase();
    source_words.iter().any(|sw| description.contains(sw.as_str()))
}

/// Single pass over `candidates`, keeping their order.
pub fn potential_matches(source: &Item, candidates: Vec<Item>) -> Vec<Item> {
    candidates
        .into_iter()
        .filter(|c| c.id != source.id && is_potential_match(source, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemStatus, ItemType};
    use chrono::Utc;

    fn item(id: &str, item_type: ItemType, name: &str, category: &str, description: &str) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            location: "Campus".to_string(),
            date: "2024-06-01".to_string(),
            description: description.to_string(),
            image_url: String::new(),
            user_id: "u".to_string(),
            user_name: "U".to_string(),
            contact_info: String::new(),
            created_at: Utc::now(),
            item_type,
            status: ItemStatus::Searching,
        }
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(significant_words("Blue Backpack"), vec!["blue", "backpack"]);
        assert_eq!(significant_words("An ID card, w/ lanyard"), vec!["card", "lanyard"]);
        assert!(significant_words("a b c").is_empty());
    }

    #[test]
    fn test_backpack_scenario() {
        let source = item("l1", ItemType::Lost, "Blue Backpack", "Bags", "");
        let purse = item("f1", ItemType::Found, "Red Purse", "Bags", "");
        let black = item("f2", ItemType::Found, "Black Backpack", "Electronics", "");
        let phone = item("f3", ItemType::Found, "Phone", "Electronics", "cracked screen");

        let matches = potential_matches(&source, vec![purse, black, phone]);
        let ids: Vec<_> = matches.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
    }

    #[test]
    fn test_substring_in_either_direction() {
        let source = item("l1", ItemType::Lost, "Backpacks", "Bags", "");
        let candidate = item("f1", ItemType::Found, "backpack", "Other", "");
        assert!(is_potential_match(&source, &candidate));

        let source = item("l2", ItemType::Lost, "Pack", "Bags", "");
        let candidate = item("f2", ItemType::Found, "Backpack", "Other", "");
        assert!(is_potential_match(&source, &candidate));
    }

    #[test]
    fn test_description_match() {
        let source = item("l1", ItemType::Lost, "Silver Watch", "Accessories", "");
        let candidate = item("f1", ItemType::Found, "Wristband", "Jewelry", "Found a silver band near the gym");
        assert!(is_potential_match(&source, &candidate));
    }

    #[test]
    fn test_short_words_are_ignored() {
        let source = item("l1", ItemType::Lost, "ID", "Cards", "");
        let candidate = item("f1", ItemType::Found, "Kid's ID holder", "Other", "id inside");
        assert!(!is_potential_match(&source, &candidate));
    }

    #[test]
    fn test_category_is_case_sensitive() {
        let source = item("l1", ItemType::Lost, "Keys", "Keys", "");
        let candidate = item("f1", ItemType::Found, "Wallet", "keys", "");
        assert!(!is_potential_match(&source, &candidate));
    }
}
