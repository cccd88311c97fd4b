// This file is part of pol_spec_scan.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde_json::Value;

/// Run events in the order they happened. Each event is a JSON object with
/// the "id" field.
#[derive(Default)]
pub struct EventQueue {
    _events: Vec<Value>,
}

impl EventQueue {
    /// Create a new empty event queue.
    ///
    /// # Returns
    /// New event queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_event(&self) -> bool {
        !self._events.is_empty()
    }

    /// Add an event.
    ///
    /// # Arguments
    /// * `event` - Event with the "id" field.
    pub fn add_event(&mut self, event: Value) {
        self._events.push(event);
    }

    /// Events with the id.
    ///
    /// # Arguments
    /// * `id` - Event id.
    ///
    /// # Returns
    /// Events in the queue with the id.
    pub fn find_events(&self, id: &str) -> Vec<&Value> {
        self._events
            .iter()
            .filter(|event| event["id"] == id)
            .collect()
    }

    /// Take all the events out of the queue.
    ///
    /// # Returns
    /// Events in the order they were added.
    pub fn get_events_and_clear(&mut self) -> Vec<Value> {
        std::mem::take(&mut self._events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn create_event_queue() -> EventQueue {
        let mut event_queue = EventQueue::new();
        event_queue.add_event(json!({"id": "runState", "state": "Idle"}));
        event_queue.add_event(json!({"id": "positionReached", "index": 0}));
        event_queue.add_event(json!({"id": "runState", "state": "Stepping"}));

        event_queue
    }

    #[test]
    fn test_has_event() {
        assert!(!EventQueue::new().has_event());
        assert!(create_event_queue().has_event());
    }

    #[test]
    fn test_find_events() {
        let event_queue = create_event_queue();

        let events = event_queue.find_events("runState");

        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["state"], "Stepping");
        assert!(event_queue.find_events("wrong").is_empty());
    }

    #[test]
    fn test_get_events_and_clear() {
        let mut event_queue = create_event_queue();

        let events = event_queue.get_events_and_clear();

        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["id"], "positionReached");
        assert!(!event_queue.has_event());
    }
}
