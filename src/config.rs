use secrecy::SecretString;

#[derive(clap::Parser, Debug, Clone)]
pub struct AppConfig {
    #[clap(long, env)]
    pub stage: Stage,

    // App configs
    #[clap(long, env)]
    pub app_application_port: u16,

    #[clap(long, env)]
    pub app_application_host: String,

    // OTP storage
    #[clap(long, env, value_enum, default_value_t = OtpStoreKind::Memory)]
    pub otp_store: OtpStoreKind,

    /// Required when `otp_store` is `redis`
    #[clap(long, env)]
    pub redis_uri: Option<SecretString>,

    // Email
    #[clap(long, env)]
    pub email_sender: String,

    #[clap(long, env, default_value_t = false)]
    pub email_should_mock: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[clap(rename_all = "kebab_case")]
pub enum Stage {
    Dev,
    Prod,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[clap(rename_all = "kebab_case")]
pub enum OtpStoreKind {
    Memory,
    Redis,
}
