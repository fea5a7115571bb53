use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One food item identified in a single analysis call.
///
/// Numeric fields stay `None` when the model reply never produced a
/// matching line; they only count as zero at summation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,  // kcal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,     // g
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proteins: Option<f64>,  // g
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fats: Option<f64>,      // g
}

impl FoodItem {
    pub fn new(name: String) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            calories: None,
            carbs: None,
            proteins: None,
            fats: None,
        }
    }
}

/// Running totals over the whole food log, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub total_calories: f64,
    pub total_carbs: f64,
    pub total_proteins: f64,
    pub total_fats: f64,
}

/// One user-message/model-reply pair from the advice chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub bot: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub food_items: Vec<FoodItem>,
    pub food_log: Vec<FoodItem>,
    pub summary: NutritionSummary,
}

#[derive(Debug, Serialize)]
pub struct FoodLogResponse {
    pub food_log: Vec<FoodItem>,
    pub summary: NutritionSummary,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub chat_history: Vec<ChatTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_item_skips_absent_fields() {
        let mut item = FoodItem::new("Apple".to_string());
        item.calories = Some(95.0);

        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["name"], "Apple");
        assert_eq!(json["calories"], 95.0);
        assert!(json.get("carbs").is_none());
        assert!(json.get("proteins").is_none());
        assert!(json.get("fats").is_none());
    }

    #[test]
    fn test_chat_request_deserialization() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "What should I eat for dinner?"}"#).unwrap();
        assert_eq!(req.message, "What should I eat for dinner?");
    }
}
