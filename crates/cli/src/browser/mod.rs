pub mod js;
pub mod session;

pub use session::{AuthInjectionReport, BrowserSession, DownloadInfo, SessionConfig, SessionEndpoints, ShutdownMode};
