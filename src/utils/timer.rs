use std::time::Duration;

#[cfg(feature = "web")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await
}

#[cfg(not(feature = "web"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}
