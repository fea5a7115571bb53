use regex::Regex;

use crate::models::FoodItem;

/// Parses the model's free-text analysis into structured food items.
///
/// The model is asked to list items as
/// `- Item: [Name] - Calories: [X kcal], Carbs: [X g], Proteins: [X g], Fats: [X g]`
/// but the reply is free-form generation, so every line is classified
/// independently and anything unrecognized is skipped. Parsing never fails;
/// the worst case is an empty list or items carrying only a name.
pub struct ResponseParser {
    calories: Regex,
    carbs: Regex,
    proteins: Regex,
    fats: Regex,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            calories: Regex::new(r"Calories: ([\d.]+) kcal").expect("static pattern"),
            carbs: Regex::new(r"Carbs: ([\d.]+) g").expect("static pattern"),
            proteins: Regex::new(r"Proteins: ([\d.]+) g").expect("static pattern"),
            fats: Regex::new(r"Fats: ([\d.]+) g").expect("static pattern"),
        }
    }

    /// Single pass over the reply, keeping one item under construction.
    ///
    /// A `- Item:` line finalizes the previous item and starts a new one;
    /// the same line is still scanned for nutrient fields since the model
    /// usually puts everything on one line. Field lines seen before any
    /// item marker are ignored.
    pub fn parse(&self, response_text: &str) -> Vec<FoodItem> {
        let mut food_items = Vec::new();
        let mut current: Option<FoodItem> = None;

        for line in response_text.lines() {
            if line.starts_with("- Item:") {
                if let Some(item) = current.take() {
                    food_items.push(item);
                }
                current = Some(FoodItem::new(extract_name(line)));
            }

            if let Some(item) = current.as_mut() {
                if line.contains("Calories:") {
                    if let Some(value) = capture_number(&self.calories, line) {
                        item.calories = Some(value);
                    }
                }
                if line.contains("Carbs:") {
                    if let Some(value) = capture_number(&self.carbs, line) {
                        item.carbs = Some(value);
                    }
                }
                if line.contains("Proteins:") {
                    if let Some(value) = capture_number(&self.proteins, line) {
                        item.proteins = Some(value);
                    }
                }
                if line.contains("Fats:") {
                    if let Some(value) = capture_number(&self.fats, line) {
                        item.fats = Some(value);
                    }
                }
            }
        }

        if let Some(item) = current.take() {
            food_items.push(item);
        }

        food_items
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Name is the text between `"Item: "` and the first `" - "`. Either
/// marker missing means the model drifted from the format, so we keep the
/// record with a sentinel name rather than dropping it.
fn extract_name(line: &str) -> String {
    line.split_once("Item: ")
        .and_then(|(_, rest)| rest.split_once(" - "))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn capture_number(pattern: &Regex, line: &str) -> Option<f64> {
    pattern
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
}
