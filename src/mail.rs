//! Mail delivery capture.
//!
//! Controllers that send mail do so through an outbox the test owns; the
//! harness clears it before every test so each spec sees only its own
//! deliveries.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A captured outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDelivery {
	pub to: Vec<String>,
	pub subject: String,
	pub body: String,
}

/// In-memory delivery list, reset at the start of every test.
///
/// # Examples
///
/// ```
/// use webspec::mail::{EmailDelivery, MailOutbox};
///
/// let outbox = MailOutbox::new();
/// outbox.deliver(EmailDelivery {
///     to: vec!["user@example.com".to_string()],
///     subject: "Welcome".to_string(),
///     body: "hi".to_string(),
/// });
/// assert_eq!(outbox.deliveries().len(), 1);
/// outbox.clear();
/// assert!(outbox.is_empty());
/// ```
#[derive(Default)]
pub struct MailOutbox {
	deliveries: Mutex<Vec<EmailDelivery>>,
}

impl MailOutbox {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn deliver(&self, delivery: EmailDelivery) {
		self.deliveries.lock().push(delivery);
	}

	pub fn deliveries(&self) -> Vec<EmailDelivery> {
		self.deliveries.lock().clone()
	}

	pub fn clear(&self) {
		self.deliveries.lock().clear();
	}

	pub fn is_empty(&self) -> bool {
		self.deliveries.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_outbox_capture_and_clear() {
		let outbox = MailOutbox::new();
		assert!(outbox.is_empty());

		outbox.deliver(EmailDelivery {
			to: vec!["a@example.com".to_string()],
			subject: "s".to_string(),
			body: "b".to_string(),
		});
		assert_eq!(outbox.deliveries().len(), 1);

		outbox.clear();
		assert!(outbox.is_empty());
	}
}
