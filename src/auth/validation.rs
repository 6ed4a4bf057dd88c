//! Registration form rules. Each check returns the message shown next to
//! the offending field, or `None` when the value is acceptable.

use validator::ValidateEmail;

pub const MIN_LOGIN_LENGTH: usize = 3;
pub const MAX_LOGIN_LENGTH: usize = 60;
pub const MIN_EMAIL_LENGTH: usize = 7;
pub const MAX_EMAIL_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 12;
pub const MAX_PASSWORD_LENGTH: usize = 60;

pub fn login_error(login: &str) -> Option<&'static str> {
    let len = login.chars().count();
    if len < MIN_LOGIN_LENGTH {
        Some("Login must be at least 3 characters long")
    } else if len > MAX_LOGIN_LENGTH {
        Some("Login must be at most 60 characters long")
    } else if !login.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Some("Login may contain only alphanum chars, underscores and minus")
    } else {
        None
    }
}

pub fn email_error(email: &str) -> Option<&'static str> {
    let len = email.chars().count();
    if len < MIN_EMAIL_LENGTH {
        Some("Email must be at least 7 characters long")
    } else if len > MAX_EMAIL_LENGTH {
        Some("Email must be at most 150 characters long")
    } else if !email.validate_email() {
        Some("Email is invalid")
    } else {
        None
    }
}

pub fn password_error(password: &str) -> Option<&'static str> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 12 characters long")
    } else if len > MAX_PASSWORD_LENGTH {
        Some("Password must be at most 60 characters long")
    } else {
        None
    }
}
