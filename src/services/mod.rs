pub mod notifier;
pub mod reconciler;
pub mod router;
pub mod token;

pub use notifier::{ConversionNotifier, NotifyOutcome};
pub use reconciler::WebhookReconciler;
pub use router::{ClickRouter, RoutedClick};
