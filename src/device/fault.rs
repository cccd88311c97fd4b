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

use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};

use crate::constants::BOUND_FAULT_CHANNEL;

/// Fault reported asynchronously by a device driver.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct FaultEvent {
    // Error code of the device.
    pub code: i32,
    // Description from the device.
    pub message: String,
}

impl FaultEvent {
    /// Create a new fault event.
    ///
    /// # Arguments
    /// * `code` - Error code of the device.
    /// * `message` - Description from the device.
    ///
    /// # Returns
    /// A new fault event.
    pub fn new(code: i32, message: &str) -> Self {
        Self {
            code,
            message: String::from(message),
        }
    }
}

impl fmt::Display for FaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error code {}: {}", self.code, self.message)
    }
}

/// Sending half of the fault channel. The driver keeps it and reports the
/// faults from its own context with `try_send()`.
pub type FaultSender = SyncSender<FaultEvent>;

/// Receiving half of the fault channel with a latch of the most recent fault.
pub struct FaultLatch {
    _receiver: Receiver<FaultEvent>,
    // Most recent fault. It is kept for the diagnosis after it was consumed.
    pub last_fault: Option<FaultEvent>,
    // The driver dropped the sender.
    pub is_sender_dropped: bool,
}

impl FaultLatch {
    /// Create the fault channel.
    ///
    /// # Returns
    /// The sender to register to the driver and the latch to poll.
    pub fn channel() -> (FaultSender, Self) {
        let (sender, receiver) = sync_channel(BOUND_FAULT_CHANNEL);

        (
            sender,
            Self {
                _receiver: receiver,
                last_fault: None,
                is_sender_dropped: false,
            },
        )
    }

    /// Consume the faults reported since the last poll.
    ///
    /// # Returns
    /// The most recent new fault. None if nothing was reported since the
    /// last poll.
    pub fn poll(&mut self) -> Option<FaultEvent> {
        let mut latest = None;
        loop {
            match self._receiver.try_recv() {
                Ok(fault) => latest = Some(fault),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.is_sender_dropped = true;
                    break;
                }
            }
        }

        if latest.is_some() {
            self.last_fault = latest.clone();
        }

        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc::TrySendError;

    #[test]
    fn test_poll() {
        let (sender, mut latch) = FaultLatch::channel();

        assert!(latch.poll().is_none());

        sender.send(FaultEvent::new(1, "first")).unwrap();
        sender.send(FaultEvent::new(2, "second")).unwrap();

        assert_eq!(latch.poll(), Some(FaultEvent::new(2, "second")));

        // Consumed by the previous poll but still latched
        assert!(latch.poll().is_none());
        assert_eq!(latch.last_fault, Some(FaultEvent::new(2, "second")));
    }

    #[test]
    fn test_try_send_full_channel() {
        let (sender, mut latch) = FaultLatch::channel();

        for code in 0..BOUND_FAULT_CHANNEL {
            sender
                .try_send(FaultEvent::new(code as i32, "queued"))
                .unwrap();
        }

        // The driver does not block when nobody polls
        assert!(matches!(
            sender.try_send(FaultEvent::new(-1, "dropped")),
            Err(TrySendError::Full(_))
        ));

        assert_eq!(
            latch.poll(),
            Some(FaultEvent::new((BOUND_FAULT_CHANNEL - 1) as i32, "queued"))
        );
        assert!(sender.try_send(FaultEvent::new(-1, "again")).is_ok());
    }

    #[test]
    fn test_poll_sender_dropped() {
        let (sender, mut latch) = FaultLatch::channel();
        drop(sender);

        assert!(latch.poll().is_none());
        assert!(latch.is_sender_dropped);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FaultEvent::new(3, "overcurrent").to_string(),
            "error code 3: overcurrent"
        );
    }
}
