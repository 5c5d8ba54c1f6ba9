use reqwest::Client;
use std::time::Duration;

const DISABLE_SYSTEM_PROXY_ENV: &str = "MNEMO_DISABLE_SYSTEM_PROXY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_http_client() -> Client {
    let builder = Client::builder().timeout(REQUEST_TIMEOUT);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };
    builder.build().unwrap_or_else(|_| Client::new())
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
