/// Severity or category for user-visible notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    /// Neutral informational message.
    Info,
    /// A requested operation completed.
    Success,
    /// Something was ignored or degraded, alignment keeps running.
    Warning,
    /// A request failed.
    Error,
}

/// A notification payload intended for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    /// The type/severity of the notification, determining its visual style.
    pub notification_type: NotificationType,
    /// The text content to display to the user.
    pub message: String,
}
