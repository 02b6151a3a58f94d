//! Pure request validation. Each function returns `Ok(())` or a
//! `CoreError::Validation` describing the first problem found.

use crate::core::request::CreateOrderRequest;
use crate::error::{CoreError, Result};

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CoreError::Validation("customer.email must not be empty".into()));
    }
    let parts: Vec<&str> = email.splitn(2, '@').collect();
    let valid = parts.len() == 2 && !parts[0].is_empty() && parts[1].contains('.') && !parts[1].starts_with('.');
    if !valid {
        return Err(CoreError::Validation(format!("customer.email is not a valid address: {email}")));
    }
    Ok(())
}

pub fn validate_address(address: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(CoreError::Validation("address must not be empty".into()));
    }
    Ok(())
}

pub fn validate_credit_card(card: &str) -> Result<()> {
    let digits: String = card.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() < 16 || digits.len() > 19 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::Validation(
            "paymentDetails.creditCard must be 16-19 digits".into(),
        ));
    }
    Ok(())
}

pub fn validate_items(items: &[crate::core::request::RequestedItemDto]) -> Result<()> {
    if items.is_empty() {
        return Err(CoreError::Validation("items must not be empty".into()));
    }
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(CoreError::Validation("items[].productId must not be empty".into()));
        }
        if item.quantity == 0 {
            return Err(CoreError::Validation(
                "items[].quantity must be a positive integer".into(),
            ));
        }
    }
    Ok(())
}

pub fn validate_idempotency_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CoreError::Validation(
            "Idempotency-Key header must not be empty when present".into(),
        ));
    }
    Ok(())
}

pub fn validate_request(request: &CreateOrderRequest) -> Result<()> {
    validate_email(&request.customer.email)?;
    validate_address(&request.address)?;
    validate_credit_card(&request.payment_details.credit_card)?;
    validate_items(&request.items)?;
    Ok(())
}
