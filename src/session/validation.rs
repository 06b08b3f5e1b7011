// Syntactic checks on raw user input. Nothing here talks to the network.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

use crate::errors::{Field, FlowResult, ValidationErrors};
use crate::session::languages;
use crate::session::types::{Intake, IntakeForm, SignupForm};

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

static SIX_DIGIT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("code pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Exactly six ASCII decimal digits
pub fn is_six_digit_code(code: &str) -> bool {
    SIX_DIGIT_CODE_RE.is_match(code)
}

/// Video references must be absolute http(s) URLs
pub fn is_valid_video_url(video_url: &str) -> bool {
    match Url::parse(video_url) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    if email.is_empty() {
        errors.push(Field::Email, "Email is required");
    } else if !is_valid_email(email) {
        errors.push(Field::Email, "Please enter a valid email address");
    }
}

fn check_language(code: &str, field: Field, errors: &mut ValidationErrors) {
    if code.trim().is_empty() {
        errors.push(field, "Language is required");
    } else if !languages::is_supported(code) {
        errors.push(field, format!("Unsupported language code '{code}'"));
    }
}

pub fn validate_intake(form: &IntakeForm) -> FlowResult<Intake> {
    let mut errors = ValidationErrors::new();
    let email = form.email.trim();
    let video_url = form.video_url.trim();

    check_email(email, &mut errors);

    if video_url.is_empty() {
        errors.push(Field::VideoUrl, "Video URL is required");
    } else if !is_valid_video_url(video_url) {
        errors.push(Field::VideoUrl, "Please enter a valid URL");
    }

    check_language(&form.subtitle_language, Field::SubtitleLanguage, &mut errors);
    check_language(&form.dubbing_language, Field::DubbingLanguage, &mut errors);

    errors.into_result()?;

    Ok(Intake {
        email: email.to_string(),
        video_url: video_url.to_string(),
        subtitle_language: form.subtitle_language.trim().to_ascii_lowercase(),
        dubbing_language: form.dubbing_language.trim().to_ascii_lowercase(),
    })
}

pub fn validate_signup(form: &SignupForm) -> FlowResult<()> {
    let mut errors = ValidationErrors::new();

    if form.full_name.trim().is_empty() {
        errors.push(Field::FullName, "Full name is required");
    }

    check_email(form.email.trim(), &mut errors);

    if form.password.is_empty() {
        errors.push(Field::Password, "Password is required");
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(Field::Password, format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }

    errors.into_result()
}

pub fn validate_code(code: &str) -> FlowResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(crate::errors::FlowError::validation(Field::Code, "Please enter the verification code"));
    }
    Ok(code.to_string())
}
