const APP_NAME: &str = "taskdock";
const SUMMARY: &str = "Task guide";

pub const POPUP_BLOCKED_MESSAGE: &str =
    "The guide window could not be opened. Allow taskdock to create floating windows and try again.";

pub trait UserNotifier {
    fn notify(&self, body: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl UserNotifier for DesktopNotifier {
    fn notify(&self, body: &str) {
        send(body);
    }
}

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(SUMMARY)
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}
