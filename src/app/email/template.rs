/// A rendered email, ready for [`super::client::EmailTransport`].
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
}

pub const PASSWORD_RESET_OTP_SUBJECT: &str = "Your password reset code";

/// Email carrying a password reset code.
///
/// The code is embedded verbatim, so whatever is stored is exactly what the
/// user receives.
pub fn password_reset_otp(code: &str, expire_in_minutes: i64) -> EmailMessage {
    let html_body = format!(
        "<p>Use the following code to reset your password:</p>\
         <h2>{code}</h2>\
         <p>The code expires in {expire_in_minutes} minutes. \
         If you did not request a password reset you can ignore this email.</p>"
    );

    EmailMessage {
        subject: PASSWORD_RESET_OTP_SUBJECT.to_string(),
        html_body,
    }
}
