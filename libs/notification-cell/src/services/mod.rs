pub mod notifier;

pub use notifier::ChangeNotifier;
