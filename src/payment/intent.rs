//! What to pay, and the form that produces it.

use crate::error::{Error, Result};
use crate::identity::Identifier;
use crate::requests::{PaymentRequest, RequestKey};

/// A transfer to perform: destination identifier and native amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Identifier to pay, as entered. The registry decides if it exists.
    pub destination_id: Identifier,
    /// Amount in the native unit, as a decimal string.
    pub amount_native: String,
    /// The request this intent pays, if any.
    pub origin: Option<RequestKey>,
}

impl PaymentIntent {
    /// A manually entered intent.
    #[must_use]
    pub fn manual(destination: &str, amount: &str) -> Self {
        Self {
            destination_id: Identifier::from(destination.trim()),
            amount_native: amount.trim().to_string(),
            origin: None,
        }
    }

    /// Intent paying `request`: its payee receives its amount.
    #[must_use]
    pub fn from_request(request: &PaymentRequest) -> Self {
        Self {
            destination_id: request.to_id.clone(),
            amount_native: request.amount.clone(),
            origin: Some(request.key()),
        }
    }
}

/// Payment form state: one active intent at a time.
///
/// Selecting a request binds the form to it and locks manual edits until
/// the selection is cancelled.
#[derive(Debug, Clone, Default)]
pub struct IntentForm {
    destination: String,
    amount: String,
    selected: Option<PaymentRequest>,
}

impl IntentForm {
    /// Empty form in manual-entry mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntentLocked`] while a request is selected.
    pub fn set_destination(&mut self, destination: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.destination = destination.into();
        Ok(())
    }

    /// Set the amount.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntentLocked`] while a request is selected.
    pub fn set_amount(&mut self, amount: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.amount = amount.into();
        Ok(())
    }

    /// Bind the form to `request`, replacing any manual entry.
    pub fn select_request(&mut self, request: PaymentRequest) {
        self.destination = request.to_id.to_string();
        self.amount.clone_from(&request.amount);
        self.selected = Some(request);
    }

    /// Drop the selected request and return to an empty manual form.
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Clear the form after a payment or a session change.
    pub fn reset(&mut self) {
        self.destination.clear();
        self.amount.clear();
        self.selected = None;
    }

    /// The selected request, if the form is bound to one.
    #[must_use]
    pub fn selected(&self) -> Option<&PaymentRequest> {
        self.selected.as_ref()
    }

    /// True while manual edits are rejected.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.selected.is_some()
    }

    /// Current destination text.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Current amount text.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Whether the submit control is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.selected.is_some()
            || (!self.destination.trim().is_empty() && !self.amount.trim().is_empty())
    }

    /// The intent the form currently describes.
    #[must_use]
    pub fn intent(&self) -> PaymentIntent {
        match &self.selected {
            Some(request) => PaymentIntent::from_request(request),
            None => PaymentIntent::manual(&self.destination, &self.amount),
        }
    }

    fn ensure_unlocked(&self) -> Result<()> {
        match &self.selected {
            Some(request) => Err(Error::IntentLocked(format!(
                "paying request from {} to {}; cancel it to edit",
                request.from_id, request.to_id
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn request() -> PaymentRequest {
        PaymentRequest::new("@bob@cupid".into(), "@alice@cupid".into(), "0.75", 1_000)
    }

    #[test]
    fn test_manual_entry() {
        let mut form = IntentForm::new();
        assert!(!form.can_submit());
        form.set_destination(" @alice@cupid ").expect("destination");
        assert!(!form.can_submit());
        form.set_amount("2").expect("amount");
        assert!(form.can_submit());

        let intent = form.intent();
        assert_eq!(intent.destination_id.as_str(), "@alice@cupid");
        assert_eq!(intent.amount_native, "2");
        assert!(intent.origin.is_none());
    }

    #[test]
    fn test_selected_request_locks_edits() {
        let mut form = IntentForm::new();
        form.set_destination("@carol@cupid").expect("destination");
        form.select_request(request());

        assert!(form.is_locked());
        assert!(matches!(form.set_amount("100"), Err(Error::IntentLocked(_))));
        assert!(matches!(
            form.set_destination("@mallory@cupid"),
            Err(Error::IntentLocked(_))
        ));

        let intent = form.intent();
        assert_eq!(intent.destination_id.as_str(), "@alice@cupid");
        assert_eq!(intent.amount_native, "0.75");
        assert_eq!(intent.origin, Some(request().key()));
    }

    #[test]
    fn test_cancel_restores_manual_mode() {
        let mut form = IntentForm::new();
        form.select_request(request());
        form.cancel();

        assert!(!form.is_locked());
        assert!(form.destination().is_empty());
        assert!(form.amount().is_empty());
        form.set_amount("1").expect("amount");
    }
}
