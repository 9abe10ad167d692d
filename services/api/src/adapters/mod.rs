pub mod clock;
pub mod directory;
pub mod notifier;
pub mod scan;

pub use clock::{ManualClock, SystemClock};
pub use directory::InMemoryDirectory;
pub use notifier::InMemoryNotifier;
pub use scan::{ReportedGeolocation, TextPayloadDecoder};
