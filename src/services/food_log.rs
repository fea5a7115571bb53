use std::sync::Mutex;

use crate::models::{ChatTurn, FoodItem, NutritionSummary};

/// Process-lifetime, append-only store for parsed food items and chat turns.
///
/// Constructed once in `main` and shared across handlers via `Arc`. The
/// mutexes serialize appends and snapshots so concurrent requests never
/// observe a partially-extended log. Nothing here is ever removed or
/// rewritten; the log lives exactly as long as the process.
pub struct FoodLogService {
    food_log: Mutex<Vec<FoodItem>>,
    chat_history: Mutex<Vec<ChatTurn>>,
}

impl FoodLogService {
    pub fn new() -> Self {
        Self {
            food_log: Mutex::new(Vec::new()),
            chat_history: Mutex::new(Vec::new()),
        }
    }

    /// Appends the newly parsed items in order and returns fresh totals
    /// over the whole log. One lock acquisition covers both, so a
    /// concurrent reader sees either none or all of the new items.
    pub fn append_and_summarize(&self, items: Vec<FoodItem>) -> NutritionSummary {
        let mut log = self.food_log.lock().expect("food log mutex poisoned");
        log.extend(items);
        summarize(&log)
    }

    /// Snapshot of the full log in insertion order plus current totals.
    pub fn get_log(&self) -> (Vec<FoodItem>, NutritionSummary) {
        let log = self.food_log.lock().expect("food log mutex poisoned");
        (log.clone(), summarize(&log))
    }

    pub fn record_chat(&self, user_message: &str, reply: &str) {
        let mut history = self.chat_history.lock().expect("chat history mutex poisoned");
        history.push(ChatTurn {
            user: user_message.to_string(),
            bot: reply.to_string(),
        });
    }

    pub fn get_chat_history(&self) -> Vec<ChatTurn> {
        self.chat_history
            .lock()
            .expect("chat history mutex poisoned")
            .clone()
    }
}

impl Default for FoodLogService {
    fn default() -> Self {
        Self::new()
    }
}

/// Full scan on every call; absent fields count as zero. The log stays
/// session-sized, so recomputing beats maintaining an incremental total.
fn summarize(log: &[FoodItem]) -> NutritionSummary {
    NutritionSummary {
        total_calories: log.iter().map(|i| i.calories.unwrap_or(0.0)).sum(),
        total_carbs: log.iter().map(|i| i.carbs.unwrap_or(0.0)).sum(),
        total_proteins: log.iter().map(|i| i.proteins.unwrap_or(0.0)).sum(),
        total_fats: log.iter().map(|i| i.fats.unwrap_or(0.0)).sum(),
    }
}
