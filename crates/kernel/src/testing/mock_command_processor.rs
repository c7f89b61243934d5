// Copyright (C) 2026 The Loomhaven Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A [`CommandProcessor`] that records every send instead of delivering
//! it anywhere, so tests can assert on what a verb told a player.

use parking_lot::Mutex;

use crate::store::CommandProcessor;

#[derive(Default)]
pub struct MockCommandProcessor {
    sent: Mutex<Vec<(String, Option<String>)>>,
}

impl MockCommandProcessor {
    pub fn new() -> Self {
        MockCommandProcessor::default()
    }

    pub fn sent_messages(&self) -> Vec<(String, Option<String>)> {
        self.sent.lock().clone()
    }
}

impl CommandProcessor for MockCommandProcessor {
    fn send_to_player(&self, message: &str, session_handle: Option<&str>) {
        self.sent.lock().push((message.to_string(), session_handle.map(str::to_string)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sends_in_order() {
        let cp = MockCommandProcessor::new();
        cp.send_to_player("hi", Some("sess-1"));
        cp.send_to_player("bye", None);
        assert_eq!(
            cp.sent_messages(),
            vec![
                ("hi".to_string(), Some("sess-1".to_string())),
                ("bye".to_string(), None),
            ]
        );
    }
}
