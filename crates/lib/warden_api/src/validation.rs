//! Request body validation.
//!
//! Failures are collected per field and returned together as
//! [`AppError::InvalidFields`].

use std::collections::BTreeMap;

use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest, UpdateUserRequest};

const MIN_NAME_LEN: usize = 5;
const MIN_USERNAME_LEN: usize = 5;
const MIN_PASSWORD_LEN: usize = 5;

const REQUIRED: &str = "This field is required";
const INVALID_EMAIL: &str = "Invalid email";
const USERNAME_AT: &str = "Username cannot contain '@'";
const WEAK_PASSWORD: &str = "A minimum of 5 characters including an uppercase letter, a lowercase letter, and a number is required";

#[derive(Default)]
struct Report(BTreeMap<&'static str, String>);

impl Report {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    fn required(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.fail(field, REQUIRED);
            return false;
        }
        true
    }

    fn min_len(&mut self, field: &'static str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.fail(
                field,
                format!("Too short. A minimum of {min} characters is required"),
            );
        }
    }

    /// A username with `@` would always be looked up as an email at login.
    fn username(&mut self, field: &'static str, value: &str) {
        if value.contains('@') {
            self.fail(field, USERNAME_AT);
        } else {
            self.min_len(field, value, MIN_USERNAME_LEN);
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if !is_email(value) {
            self.fail(field, INVALID_EMAIL);
        }
    }

    fn password(&mut self, field: &'static str, value: &str) {
        if !is_strong_password(value) {
            self.fail(field, WEAK_PASSWORD);
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.0))
        }
    }
}

pub fn validate_register(body: &RegisterRequest) -> Result<(), AppError> {
    let mut report = Report::default();
    if report.required("name", &body.name) {
        report.min_len("name", &body.name, MIN_NAME_LEN);
    }
    if report.required("username", &body.username) {
        report.username("username", &body.username);
    }
    if report.required("email", &body.email) {
        report.email("email", &body.email);
    }
    if report.required("password", &body.password) {
        report.password("password", &body.password);
    }
    report.finish()
}

pub fn validate_login(body: &LoginRequest) -> Result<(), AppError> {
    let mut report = Report::default();
    report.required("identity", &body.identity);
    report.required("password", &body.password);
    report.finish()
}

/// Present fields follow the registration rules; absent fields are skipped.
pub fn validate_update(body: &UpdateUserRequest) -> Result<(), AppError> {
    let mut report = Report::default();
    if let Some(name) = &body.name {
        report.min_len("name", name, MIN_NAME_LEN);
    }
    if let Some(username) = &body.username {
        report.username("username", username);
    }
    if let Some(email) = &body.email {
        report.email("email", email);
    }
    if let Some(password) = &body.password {
        report.password("password", password);
    }
    report.finish()
}

/// `local@domain.tld` with no whitespace and a dot inside the domain.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.starts_with('.'),
        None => false,
    }
}

/// At least 5 characters with an uppercase letter, a lowercase letter and a
/// digit.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= MIN_PASSWORD_LEN
        && value.chars().any(char::is_uppercase)
        && value.chars().any(char::is_lowercase)
        && value.chars().any(|c| c.is_ascii_digit())
}
