use std::collections::VecDeque;

use crate::models::ConversationTurn;

/// Bounded FIFO window over the most recent conversation turns.
///
/// Capacity counts individual turns (a completed exchange appends two)
/// and is fixed at construction. When full, the oldest turn is evicted
/// first. Owned exclusively by one orchestrator.
#[derive(Debug)]
pub struct ConversationWindow {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest if at capacity.
    pub fn push(&mut self, turn: ConversationTurn) {
        if self.capacity == 0 {
            return;
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Current window, oldest to newest.
    pub fn as_context(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut window = ConversationWindow::new(4);
        for i in 0..20 {
            window.push(ConversationTurn::user(format!("turn {}", i)));
            assert!(window.len() <= 4);
        }
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = ConversationWindow::new(2);
        window.push(ConversationTurn::user("A"));
        window.push(ConversationTurn::user("B"));
        window.push(ConversationTurn::user("C"));

        let texts: Vec<&str> = window.as_context().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "C"]);
    }

    #[test]
    fn test_context_ordered_oldest_to_newest() {
        let mut window = ConversationWindow::new(10);
        window.push(ConversationTurn::user("question"));
        window.push(ConversationTurn::assistant("answer"));

        let texts: Vec<&str> = window.as_context().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["question", "answer"]);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut window = ConversationWindow::new(0);
        window.push(ConversationTurn::user("dropped"));
        assert!(window.is_empty());
    }
}
