pub mod docs;
pub mod health_check;
pub mod otp;
