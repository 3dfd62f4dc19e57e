//! Validation utilities for user-entered inventory and contact data

use std::borrow::Cow;
use std::str::FromStr;

use rust_decimal::Decimal;
use validator::ValidationError;

/// `validator` hook: required text must contain more than whitespace
pub fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("must not be blank"));
        return Err(error);
    }
    Ok(())
}

// ============================================================================
// Product Validations
// ============================================================================

/// Parse a price typed by the user. Accepts a comma as decimal separator.
pub fn parse_price(text: &str) -> Result<Decimal, &'static str> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err("Price is required");
    }
    let price = Decimal::from_str(&normalized).map_err(|_| "Price must be a number")?;
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(price)
}

/// `validator` hook for price fields
pub fn validate_price_text(text: &str) -> Result<(), ValidationError> {
    parse_price(text).map(|_| ()).map_err(|message| {
        let mut error = ValidationError::new("price");
        error.message = Some(Cow::Borrowed(message));
        error
    })
}

/// Parse a capacity typed by the user; blank means "use the default"
pub fn parse_max_slots(text: &str) -> Result<Option<u32>, &'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| "Max slots must be a whole number")
}

// ============================================================================
// Contact Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// `validator` hook: email is optional, but must look like one when given
pub fn validate_optional_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Ok(());
    }
    validate_email(email.trim()).map_err(|message| {
        let mut error = ValidationError::new("email");
        error.message = Some(Cow::Borrowed(message));
        error
    })
}

/// Keep only the digits of a phone number
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a phone number to international digits for messaging links.
///
/// A 10-digit national number with a trunk `0` loses the `0` and gains the
/// country code; any other number without the country code gets it prefixed.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let digits = digits_only(phone);
    if digits.is_empty() {
        return digits;
    }
    if digits.len() == 10 && digits.starts_with('0') {
        return format!("{}{}", country_code, &digits[1..]);
    }
    if digits.starts_with(country_code) {
        return digits;
    }
    format!("{}{}", country_code, digits)
}
