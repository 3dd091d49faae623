// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission input validator.
//!
//! Implements pre-submission checks for guestbook entries and blog comments:
//! - Required fields and length limits
//! - Injection patterns (SQL, script, event handlers, dangerous tags)
//! - Contact details (URLs, e-mail addresses, phone numbers)
//! - Markup, code and excessive repetition (comments only)

use crate::config::ValidationConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be {max} characters or less")]
    TooLong { field: &'static str, max: usize },

    #[error("Security Threat: SQL injection patterns are not allowed")]
    SqlInjection,

    #[error("Security Threat: JavaScript execution patterns are not allowed")]
    ScriptExecution,

    #[error("Security Threat: Event handler patterns are not allowed")]
    EventHandler,

    #[error("Security Threat: Script tags are not allowed")]
    ScriptTag,

    #[error("Security Threat: Iframe tags are not allowed")]
    IframeTag,

    #[error("Security Threat: Dangerous HTML tags are not allowed")]
    DangerousTag,

    #[error("Security Threat: JavaScript/XSS patterns are not allowed")]
    CrossSiteScripting,

    #[error("HTML/BBCode tags are not allowed - please use plain text only")]
    Markup,

    #[error("Code blocks are not allowed - please describe code in plain text")]
    CodeBlock,

    #[error("URLs are not allowed - please share website names instead")]
    Url,

    #[error("Email addresses are not allowed")]
    Email,

    #[error("Phone numbers are not allowed")]
    Phone,

    #[error("URLs, emails, and phone numbers are not allowed")]
    ContactDetails,

    #[error("Invalid formatting detected - please use plain text only")]
    Formatting,

    #[error("Please reduce excessive character repetition")]
    Repetition,
}

/// Result of validation. A valid result carries the trimmed input.
#[derive(Debug, Clone)]
pub enum ValidationResult<T> {
    /// Input is valid
    Valid(T),
    /// Input is invalid, with every distinct problem found
    Invalid(Vec<ValidationError>),
}

impl<T> ValidationResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<T, Vec<ValidationError>> {
        match self {
            ValidationResult::Valid(value) => Ok(value),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Trimmed guestbook input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestbookInput {
    pub display_name: String,
    pub message: String,
}

/// Trimmed blog comment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    pub post_id: String,
    pub name: String,
    pub message: String,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

static SQL_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    regex(r#"(?i)['"]\s*;\s*(UNION|SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|SCRIPT)"#)
});
static SQL_QUOTED_TAUTOLOGY: Lazy<Regex> =
    Lazy::new(|| regex(r#"(?i)['"]\s*(OR|AND)\s*['"]\w*['"]\s*=\s*['"]\w*['"]"#));
static SQL_QUOTED_OR_TAUTOLOGY: Lazy<Regex> =
    Lazy::new(|| regex(r#"(?i)['"]\s*OR\s*['"]\w*['"]\s*=\s*['"]\w*['"]"#));
static SQL_NUMERIC_TAUTOLOGY: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b(OR|AND)\s+\d+\s*=\s*\d+"));
static SQL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\b(UNION|SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|SCRIPT)\b")
});

static JAVASCRIPT_URI: Lazy<Regex> = Lazy::new(|| regex(r"(?i)javascript\s*:"));
static QUOTED_EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| regex(r#"(?i)on\w+\s*=\s*['"][^'"]*['"]"#));
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| regex(r"(?i)on\w+\s*="));
static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| regex(r"(?i)<\s*script"));
static IFRAME_TAG: Lazy<Regex> = Lazy::new(|| regex(r"(?i)<\s*iframe"));
static DANGEROUS_TAG: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)<\s*/?\s*(script|iframe|object|embed|form|input|button|link|meta|style)\b[^>]*>")
});
static HTML_TAG: Lazy<Regex> = Lazy::new(|| regex(r"<[^>]*>"));
static BBCODE_TAG: Lazy<Regex> = Lazy::new(|| regex(r"\[/?[^\]]*\]"));

static HTTP_URL: Lazy<Regex> = Lazy::new(|| regex(r"(?i)https?://\S+"));
static WWW_URL: Lazy<Regex> = Lazy::new(|| regex(r"(?i)www\.\S+"));
static BARE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| regex(r"[a-zA-Z0-9][a-zA-Z0-9-]{1,61}[a-zA-Z0-9]\.[a-zA-Z]{2,}"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| regex(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"));
static PHONE: Lazy<Regex> = Lazy::new(|| regex(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b"));
static INTERNATIONAL_PHONE: Lazy<Regex> =
    Lazy::new(|| regex(r"\+\d{1,3}[-.]?\d{3}[-.]?\d{3}[-.]?\d{4}\b"));

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| regex(r"```[\s\S]*?```"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| regex(r"`[^`]+`"));
static PUNCTUATION_RUN: Lazy<Regex> = Lazy::new(|| regex(r"[!?]{6,}"));

/// Lengths of maximal runs of one repeated character.
fn char_runs(text: &str) -> impl Iterator<Item = (char, usize)> + '_ {
    let mut chars = text.chars().peekable();
    std::iter::from_fn(move || {
        let c = chars.next()?;
        let mut len = 1;
        while chars.next_if_eq(&c).is_some() {
            len += 1;
        }
        Some((c, len))
    })
}

/// Collects distinct errors in detection order.
#[derive(Default)]
struct Errors(Vec<ValidationError>);

impl Errors {
    fn push(&mut self, error: ValidationError) {
        if !self.0.contains(&error) {
            self.0.push(error);
        }
    }

    fn finish<T>(self, value: T) -> ValidationResult<T> {
        if self.0.is_empty() {
            ValidationResult::Valid(value)
        } else {
            ValidationResult::Invalid(self.0)
        }
    }
}

/// Guestbook and blog comment validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    fn check_field(&self, errors: &mut Errors, field: &'static str, value: &str, max: usize) {
        if value.is_empty() {
            errors.push(ValidationError::Required(field));
        } else if value.chars().count() > max {
            errors.push(ValidationError::TooLong { field, max });
        }
    }

    /// Validate a guestbook entry.
    pub fn validate_guestbook(
        &self,
        display_name: &str,
        message: &str,
    ) -> ValidationResult<GuestbookInput> {
        let display_name = display_name.trim();
        let message = message.trim();
        let mut errors = Errors::default();

        self.check_field(&mut errors, "Display name", display_name, self.config.max_name_chars);
        self.check_field(&mut errors, "Message", message, self.config.max_message_chars);

        let text = format!("{} {}", display_name, message);
        let checks: [(&Lazy<Regex>, ValidationError); 11] = [
            (&SQL_STATEMENT, ValidationError::SqlInjection),
            (&SQL_QUOTED_OR_TAUTOLOGY, ValidationError::SqlInjection),
            (&JAVASCRIPT_URI, ValidationError::ScriptExecution),
            (&QUOTED_EVENT_HANDLER, ValidationError::EventHandler),
            (&SCRIPT_TAG, ValidationError::ScriptTag),
            (&IFRAME_TAG, ValidationError::IframeTag),
            (&DANGEROUS_TAG, ValidationError::DangerousTag),
            (&HTTP_URL, ValidationError::Url),
            (&EMAIL, ValidationError::Email),
            (&PHONE, ValidationError::Phone),
            (&INTERNATIONAL_PHONE, ValidationError::Phone),
        ];
        for (pattern, error) in checks {
            if pattern.is_match(&text) {
                errors.push(error);
            }
        }

        if !errors.0.is_empty() {
            debug!(errors = errors.0.len(), "Guestbook entry rejected");
        }

        errors.finish(GuestbookInput {
            display_name: display_name.to_string(),
            message: message.to_string(),
        })
    }

    /// Validate a blog comment.
    pub fn validate_comment(
        &self,
        post_id: &str,
        name: &str,
        message: &str,
    ) -> ValidationResult<CommentInput> {
        let post_id = post_id.trim();
        let name = name.trim();
        let message = message.trim();
        let mut errors = Errors::default();

        self.check_field(&mut errors, "Post ID", post_id, self.config.max_post_id_chars);
        self.check_field(&mut errors, "Display name", name, self.config.max_name_chars);
        self.check_field(&mut errors, "Comment", message, self.config.max_message_chars);

        let text = format!("{} {} {}", post_id, name, message);

        if [&*HTTP_URL, &*WWW_URL, &*EMAIL, &*PHONE, &*INTERNATIONAL_PHONE]
            .iter()
            .any(|p| p.is_match(&text))
        {
            errors.push(contact_error(&text));
        }
        if BARE_DOMAIN.is_match(&text) {
            errors.push(ValidationError::Formatting);
        }
        if [&*SQL_KEYWORD, &*SQL_QUOTED_TAUTOLOGY, &*SQL_NUMERIC_TAUTOLOGY]
            .iter()
            .any(|p| p.is_match(&text))
        {
            errors.push(ValidationError::SqlInjection);
        }
        if [&*JAVASCRIPT_URI, &*EVENT_HANDLER, &*SCRIPT_TAG, &*IFRAME_TAG]
            .iter()
            .any(|p| p.is_match(&text))
        {
            errors.push(ValidationError::CrossSiteScripting);
        }
        if HTML_TAG.is_match(&text) || BBCODE_TAG.is_match(&text) {
            errors.push(ValidationError::Markup);
        }
        if CODE_FENCE.is_match(&text) || INLINE_CODE.is_match(&text) {
            errors.push(ValidationError::CodeBlock);
        }
        if PUNCTUATION_RUN.is_match(&text)
            || char_runs(&text).any(|(c, len)| c.is_ascii_alphanumeric() && len >= 8)
        {
            errors.push(ValidationError::Formatting);
        }
        if char_runs(message).filter(|&(_, len)| len >= 7).count() > 1 {
            errors.push(ValidationError::Repetition);
        }

        if !errors.0.is_empty() {
            debug!(post_id, errors = errors.0.len(), "Blog comment rejected");
        }

        errors.finish(CommentInput {
            post_id: post_id.to_string(),
            name: name.to_string(),
            message: message.to_string(),
        })
    }
}

/// Pick the most specific contact-detail error for `text`.
fn contact_error(text: &str) -> ValidationError {
    if HTTP_URL.is_match(text) || WWW_URL.is_match(text) {
        ValidationError::Url
    } else if EMAIL.is_match(text) {
        ValidationError::Email
    } else if PHONE.is_match(text) {
        ValidationError::Phone
    } else {
        ValidationError::ContactDetails
    }
}
